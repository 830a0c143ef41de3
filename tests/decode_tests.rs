// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end decode tests against rendered QR symbols

use image::{Rgb, RgbImage};
use qrcode::{Color, QrCode};
use roi_reader::app::frame_processor::tasks::{UpscaleFilter, UpscaleSettings};
use roi_reader::backends::camera::RowOrder;
use roi_reader::errors::DecodeError;
use roi_reader::{DecodeEngine, DecodeResult, DecodeWorker, Frame, Roi};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MODULE_PX: u32 = 6;
const QUIET: u32 = 4;

/// Paste a QR symbol for `text` onto a white canvas at (`left`, `top`)
///
/// Returns the canvas and the symbol's side length including quiet zone.
fn scene_with_qr(text: &str, canvas: (u32, u32), left: u32, top: u32) -> (RgbImage, u32) {
    let code = QrCode::new(text.as_bytes()).unwrap();
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let size = (modules + QUIET * 2) * MODULE_PX;

    let image = RgbImage::from_fn(canvas.0, canvas.1, |x, y| {
        let inside = x >= left && y >= top && x < left + size && y < top + size;
        if !inside {
            return Rgb([255, 255, 255]);
        }
        let mx = ((x - left) / MODULE_PX) as i64 - QUIET as i64;
        let my = ((y - top) / MODULE_PX) as i64 - QUIET as i64;
        let dark = mx >= 0
            && my >= 0
            && (mx as u32) < modules
            && (my as u32) < modules
            && colors[(my as u32 * modules + mx as u32) as usize] == Color::Dark;
        if dark { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
    });
    (image, size)
}

fn wait_for_result(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<DecodeResult>,
) -> DecodeResult {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(result) = rx.try_recv() {
            return result;
        }
        assert!(Instant::now() < deadline, "no decode result");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_hello_qr_in_roi() {
    let (image, size) = scene_with_qr("HELLO", (400, 300), 150, 60);
    let frame = Frame::from_image(image);

    let result = DecodeEngine::default().decode_pass(&frame, &[Roi::new(150, 60, size, size)]);

    assert_eq!(result.qrcode, vec!["HELLO".to_string()]);
    assert!(result.barcode.is_empty());
    assert_eq!(result.summary(), "QR: [HELLO] | Barcode: []");
}

#[test]
fn test_roi_away_from_code_finds_nothing() {
    let (image, _) = scene_with_qr("HELLO", (400, 300), 150, 60);
    let frame = Frame::from_image(image);

    let result = DecodeEngine::default().decode_pass(&frame, &[Roi::new(0, 0, 120, 120)]);
    assert!(result.is_empty());
    assert_eq!(result.rois_attempted, 1);
}

#[test]
fn test_pass_yields_at_most_one_entry_per_roi() {
    let (image, size) = scene_with_qr("HELLO", (400, 300), 150, 60);
    let frame = Frame::from_image(image);
    let qr = Roi::new(150, 60, size, size);
    let rois = [qr, qr, Roi::new(0, 0, 50, 50), Roi::new(1000, 1000, 10, 10)];

    let result = DecodeEngine::default().decode_pass(&frame, &rois);
    assert!(result.len() <= rois.len());
    assert_eq!(result.qrcode, vec!["HELLO".to_string(), "HELLO".to_string()]);
}

#[test]
fn test_bottom_up_frame_decodes_in_display_coordinates() {
    // Camera delivers the scene upside down; the capture flip rights it
    let (image, size) = scene_with_qr("HELLO", (400, 300), 150, 60);
    let upside_down = image::imageops::flip_vertical(&image);
    let frame = Frame::from_image(upside_down).into_flipped();
    assert_eq!(frame.row_order, RowOrder::BottomUp);

    let roi = Roi::new(150, 60, size, size);
    let result = DecodeEngine::default().decode_pass(&frame, &[roi]);
    assert_eq!(result.qrcode, vec!["HELLO".to_string()]);
}

#[test]
fn test_upscaled_small_symbol() {
    let (image, size) = scene_with_qr("HELLO", (300, 300), 10, 10);
    let small = image::imageops::resize(&image, 150, 150, image::imageops::FilterType::Nearest);
    let frame = Frame::from_image(small);
    let roi = Roi::new(5, 5, size / 2, size / 2);

    let upscaler = UpscaleSettings {
        factor: 2,
        filter: UpscaleFilter::Nearest,
    }
    .build();
    let result = DecodeEngine::new(upscaler).decode_pass(&frame, &[roi]);
    assert_eq!(result.qrcode, vec!["HELLO".to_string()]);
}

#[test]
fn test_worker_delivers_result() {
    let (image, size) = scene_with_qr("HELLO", (400, 300), 150, 60);
    let frame = Arc::new(Frame::from_image(image));
    let (worker, mut rx) = DecodeWorker::new(DecodeEngine::default());

    assert_eq!(
        worker.request(Some(Arc::clone(&frame)), &[]),
        Err(DecodeError::NoRegions)
    );
    assert!(rx.try_recv().is_err());

    worker
        .request(Some(frame), &[Roi::new(150, 60, size, size)])
        .unwrap();
    let result = wait_for_result(&mut rx);
    assert_eq!(result.qrcode, vec!["HELLO".to_string()]);
    assert!(result.barcode.is_empty());
}
