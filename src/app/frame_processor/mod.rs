// SPDX-License-Identifier: GPL-3.0-only

//! ROI decoding
//!
//! ```text
//! Arc<Frame> ──▶ extract_region ──▶ Upscaler? ──▶ QrDetector ──▶ BarcodeDetector
//!                  (per ROI)                       (first hit wins)
//! ```
//!
//! [`DecodeEngine`] runs one pass synchronously; [`DecodeWorker`] runs passes
//! in the background with a single decode slot.

pub mod engine;
pub mod roi;
pub mod tasks;
pub mod types;
pub mod worker;

pub use engine::{CodeKind, DecodeEngine};
pub use roi::extract_region;
pub use types::{DecodeResult, Roi};
pub use worker::DecodeWorker;
