// SPDX-License-Identifier: GPL-3.0-only

//! ROI Reader - live QR code and barcode reading from camera regions
//!
//! Frames are captured from a V4L2 camera on a dedicated thread and
//! published to a single-slot buffer. The operator draws regions of interest
//! over the live view; each decode pass crops those regions from one frame
//! snapshot, optionally upsamples them, and runs the QR and barcode readers.
//!
//! # Architecture
//!
//! - [`backends`]: camera capture, frame slot and V4L2 controls
//! - [`app`]: ROI extraction, decoding and viewer state
//! - [`terminal`]: the terminal viewer
//! - [`config`]: persisted settings and ROI layout
//! - [`storage`]: saving ROI crops

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::frame_processor::{DecodeEngine, DecodeResult, DecodeWorker, Roi};
pub use backends::camera::{CaptureSession, Frame, FrameSlot};
pub use config::Config;
pub use errors::{AppError, AppResult};
