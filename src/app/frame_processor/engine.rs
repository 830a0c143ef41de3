// SPDX-License-Identifier: GPL-3.0-only

//! One decode pass over a frame snapshot

use super::roi::extract_region;
use super::tasks::{BarcodeDetector, CodeReader, QrDetector, Upscaler};
use super::types::{DecodeResult, Roi};
use crate::backends::camera::Frame;
use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Which reader produced a code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Qr,
    Barcode,
}

/// Runs the extract, upscale and read pipeline for each ROI
#[derive(Clone)]
pub struct DecodeEngine {
    upscaler: Option<Arc<dyn Upscaler>>,
    qr: Arc<dyn CodeReader>,
    barcode: Arc<dyn CodeReader>,
}

impl Default for DecodeEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DecodeEngine {
    pub fn new(upscaler: Option<Arc<dyn Upscaler>>) -> Self {
        Self::with_readers(upscaler, Arc::new(QrDetector), Arc::new(BarcodeDetector))
    }

    pub fn with_readers(
        upscaler: Option<Arc<dyn Upscaler>>,
        qr: Arc<dyn CodeReader>,
        barcode: Arc<dyn CodeReader>,
    ) -> Self {
        Self {
            upscaler,
            qr,
            barcode,
        }
    }

    /// Decode every ROI of one frame, in list order
    ///
    /// A ROI that does not overlap the frame or holds no readable code
    /// contributes nothing. The frame is only read.
    pub fn decode_pass(&self, frame: &Frame, rois: &[Roi]) -> DecodeResult {
        let start = Instant::now();
        let mut result = DecodeResult {
            frame_sequence: frame.sequence,
            rois_attempted: rois.len(),
            ..Default::default()
        };

        for (index, roi) in rois.iter().enumerate() {
            let Some(region) = extract_region(frame, roi) else {
                debug!(index, roi = %roi, "ROI is outside the frame");
                continue;
            };

            match self.decode_region(&region) {
                Some((CodeKind::Qr, text)) => result.qrcode.push(text),
                Some((CodeKind::Barcode, text)) => result.barcode.push(text),
                None => trace!(index, "No code in ROI"),
            }
        }

        result.elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(
            sequence = frame.sequence,
            rois = rois.len(),
            qr = result.qrcode.len(),
            barcode = result.barcode.len(),
            elapsed_ms = result.elapsed_ms,
            "Decode pass complete"
        );
        result
    }

    /// Upscale if configured, then try the QR reader and the barcode reader
    pub fn decode_region(&self, region: &RgbImage) -> Option<(CodeKind, String)> {
        // Readers cannot handle empty images
        if region.width() == 0 || region.height() == 0 {
            return None;
        }
        let gray = match &self.upscaler {
            Some(upscaler) => image::imageops::grayscale(&upscaler.upscale(region)),
            None => image::imageops::grayscale(region),
        };

        if let Some(text) = self.qr.read(&gray).filter(|t| !t.is_empty()) {
            return Some((CodeKind::Qr, text));
        }
        trace!(reader = self.barcode.name(), "Falling back to barcode reader");
        self.barcode
            .read(&gray)
            .filter(|t| !t.is_empty())
            .map(|text| (CodeKind::Barcode, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reader that "decodes" the mean brightness bucket of the image
    struct Bucket {
        below: u8,
        label: &'static str,
        calls: AtomicUsize,
    }

    impl CodeReader for Bucket {
        fn name(&self) -> &'static str {
            self.label
        }

        fn read(&self, image: &GrayImage) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let sum: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
            let mean = sum / (image.width() as u64 * image.height() as u64);
            (mean < self.below as u64).then(|| format!("{}-{}", self.label, mean))
        }
    }

    fn bucket(below: u8, label: &'static str) -> Arc<Bucket> {
        Arc::new(Bucket {
            below,
            label,
            calls: AtomicUsize::new(0),
        })
    }

    /// Black, gray and white vertical bands, 10 px each
    fn banded_frame() -> Frame {
        let image = RgbImage::from_fn(30, 10, |x, _| match x {
            0..10 => image::Rgb([0, 0, 0]),
            10..20 => image::Rgb([100, 100, 100]),
            _ => image::Rgb([255, 255, 255]),
        });
        Frame::from_image(image)
    }

    #[test]
    fn test_qr_first_then_barcode() {
        let qr = bucket(50, "qr");
        let barcode = bucket(200, "bar");
        let engine = DecodeEngine::with_readers(None, qr.clone(), barcode.clone());

        let rois = [
            Roi::new(0, 0, 10, 10),
            Roi::new(10, 0, 10, 10),
            Roi::new(20, 0, 10, 10),
        ];
        let result = engine.decode_pass(&banded_frame(), &rois);

        assert_eq!(result.qrcode, vec!["qr-0"]);
        assert_eq!(result.barcode.len(), 1);
        assert!(result.barcode[0].starts_with("bar-"));
        assert_eq!(result.rois_attempted, 3);
        // The barcode reader is skipped when the QR reader succeeds
        assert_eq!(qr.calls.load(Ordering::SeqCst), 3);
        assert_eq!(barcode.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_at_most_one_entry_per_roi() {
        let engine = DecodeEngine::with_readers(None, bucket(255, "qr"), bucket(255, "bar"));
        let frame = banded_frame();

        for n in 0..6 {
            let rois: Vec<Roi> = (0..n).map(|i| Roi::new(i * 3, 0, 8, 8)).collect();
            let result = engine.decode_pass(&frame, &rois);
            assert!(result.len() <= n as usize);
        }
    }

    #[test]
    fn test_roi_outside_frame_is_skipped() {
        let engine = DecodeEngine::with_readers(None, bucket(255, "qr"), bucket(255, "bar"));
        let result = engine.decode_pass(&banded_frame(), &[Roi::new(500, 500, 10, 10)]);
        assert!(result.is_empty());
        assert_eq!(result.rois_attempted, 1);
    }

    #[test]
    fn test_zero_size_roi_never_reaches_readers() {
        let qr = bucket(255, "qr");
        let engine = DecodeEngine::with_readers(None, qr.clone(), bucket(255, "bar"));
        let flat = Roi {
            width: 0,
            ..Roi::new(0, 0, 1, 10)
        };

        let result = engine.decode_pass(&banded_frame(), &[flat, flat.with_angle(30.0)]);
        assert!(result.is_empty());
        assert_eq!(result.rois_attempted, 2);
        assert_eq!(qr.calls.load(Ordering::SeqCst), 0);

        assert!(DecodeEngine::default().decode_region(&RgbImage::new(0, 10)).is_none());
    }

    #[test]
    fn test_pass_does_not_mutate_frame() {
        let engine = DecodeEngine::default();
        let frame = banded_frame();
        let before = frame.data.to_vec();
        engine.decode_pass(&frame, &[Roi::new(0, 0, 30, 10).with_angle(10.0)]);
        assert_eq!(frame.data.to_vec(), before);
    }

    #[test]
    fn test_upscaler_is_applied() {
        struct SizeReader;
        impl CodeReader for SizeReader {
            fn name(&self) -> &'static str {
                "size"
            }
            fn read(&self, image: &GrayImage) -> Option<String> {
                Some(format!("{}x{}", image.width(), image.height()))
            }
        }

        let upscaler = crate::app::frame_processor::tasks::UpscaleSettings {
            factor: 4,
            ..Default::default()
        }
        .build();
        let engine = DecodeEngine::with_readers(upscaler, Arc::new(SizeReader), bucket(0, "bar"));
        let result = engine.decode_pass(&banded_frame(), &[Roi::new(0, 0, 5, 3)]);
        assert_eq!(result.qrcode, vec!["20x12"]);
    }
}
