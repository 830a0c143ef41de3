// SPDX-License-Identifier: GPL-3.0-only

//! QR code reader backed by rqrr

use super::CodeReader;
use image::GrayImage;
use tracing::{debug, trace};

/// QR code detector
///
/// Scans the whole image for finder patterns and returns the content of the
/// first grid that decodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDetector;

impl QrDetector {
    pub fn new() -> Self {
        Self
    }
}

impl CodeReader for QrDetector {
    fn name(&self) -> &'static str {
        "qr"
    }

    fn read(&self, image: &GrayImage) -> Option<String> {
        let start = std::time::Instant::now();
        let (width, height) = image.dimensions();

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                image.get_pixel(x as u32, y as u32).0[0]
            });
        let grids = prepared.detect_grids();

        trace!(
            grids = grids.len(),
            width,
            height,
            detection_ms = start.elapsed().as_millis(),
            "QR grid detection complete"
        );

        grids.iter().find_map(|grid| match grid.decode() {
            Ok((meta, content)) => {
                debug!(version = meta.version.0, content = %content, "Decoded QR code");
                Some(content)
            }
            Err(e) => {
                debug!(error = ?e, "Failed to decode QR grid");
                None
            }
        })
    }
}
