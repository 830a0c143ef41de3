// SPDX-License-Identifier: GPL-3.0-only

//! Per-region decode tasks
//!
//! A region goes through an optional [`Upscaler`] and is then handed to the
//! [`CodeReader`]s in order: QR first, then 1-D barcodes.

pub mod barcode_detector;
pub mod qr_detector;
pub mod upscaler;

pub use barcode_detector::BarcodeDetector;
pub use qr_detector::QrDetector;
pub use upscaler::{InterpolationUpscaler, UpscaleFilter, UpscaleSettings, Upscaler};

use image::GrayImage;

/// Reads a single code from a grayscale image
pub trait CodeReader: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Decoded text of the first readable code, if any
    fn read(&self, image: &GrayImage) -> Option<String>;
}
