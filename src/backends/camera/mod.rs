// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  CaptureDevice   │ ──▶ │ capture loop │ ──▶ │  FrameSlot   │
//! │ (V4L2, mmap I/O) │     │   (thread)   │     │ Arc<Frame>   │
//! └──────────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Decoding and display only ever see `Arc<Frame>` snapshots taken from the
//! slot; the device itself stays on the capture thread.

pub mod capture;
pub mod format_converters;
pub mod frame_loop;
pub mod frame_slot;
pub mod types;
pub mod v4l2;
pub mod v4l2_controls;

pub use capture::CaptureSession;
pub use frame_slot::FrameSlot;
pub use types::*;
pub use v4l2::list_devices;
pub use v4l2_controls::CameraControls;

use crate::errors::CameraError;

/// A source of RGB frames
///
/// Implementations are created and dropped on the capture thread, so they
/// do not need to be `Send`.
pub trait CaptureDevice {
    /// Block until the next frame is available
    fn read_frame(&mut self) -> Result<Frame, CameraError>;

    /// Format negotiated with the device
    fn format(&self) -> CameraFormat;
}
