// SPDX-License-Identifier: GPL-3.0-only

//! Pixel extraction for regions of interest

use super::types::Roi;
use crate::backends::camera::{Frame, RowOrder};
use image::{Rgb, RgbImage};
use tracing::trace;

/// Extract the pixels under a ROI as they appear on screen
///
/// Axis-aligned ROIs are cropped and clipped to the frame. Rotated ROIs are
/// resampled in their own axes with bilinear interpolation; samples that
/// fall outside the frame are black. Returns `None` when the ROI does not
/// overlap the frame at all or covers no pixels.
pub fn extract_region(frame: &Frame, roi: &Roi) -> Option<RgbImage> {
    if roi.width == 0 || roi.height == 0 {
        return None;
    }

    // Work in buffer rows, then turn the crop back to display orientation
    let buffer_roi = match frame.row_order {
        RowOrder::TopDown => *roi,
        RowOrder::BottomUp => roi.mirrored(frame.height),
    };

    let mut region = if buffer_roi.is_rotated() {
        extract_rotated(frame, &buffer_roi)?
    } else {
        crop(frame, &buffer_roi)?
    };

    if frame.row_order == RowOrder::BottomUp {
        image::imageops::flip_vertical_in_place(&mut region);
    }

    trace!(
        roi = %roi,
        width = region.width(),
        height = region.height(),
        "Extracted region"
    );
    Some(region)
}

fn crop(frame: &Frame, roi: &Roi) -> Option<RgbImage> {
    let x0 = roi.x.max(0) as i64;
    let y0 = roi.y.max(0) as i64;
    let x1 = (roi.x as i64 + roi.width as i64).min(frame.width as i64);
    let y1 = (roi.y as i64 + roi.height as i64).min(frame.height as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);
    let stride = frame.stride();
    let mut data = Vec::with_capacity((x1 - x0) * (y1 - y0) * 3);
    for row in y0..y1 {
        let start = row * stride + x0 * 3;
        data.extend_from_slice(frame.data.get(start..start + (x1 - x0) * 3)?);
    }

    RgbImage::from_raw((x1 - x0) as u32, (y1 - y0) as u32, data)
}

fn extract_rotated(frame: &Frame, roi: &Roi) -> Option<RgbImage> {
    let (min_x, min_y, max_x, max_y) = roi.bounds();
    if max_x <= 0.0 || max_y <= 0.0 || min_x >= frame.width as f32 || min_y >= frame.height as f32
    {
        return None;
    }

    Some(RgbImage::from_fn(roi.width, roi.height, |u, v| {
        // Sample at pixel centres
        let (fx, fy) = roi.to_frame(u as f32 + 0.5, v as f32 + 0.5);
        Rgb(sample_bilinear(frame, fx - 0.5, fy - 0.5))
    }))
}

/// Bilinear sample at continuous buffer coordinates; out-of-frame is black
fn sample_bilinear(frame: &Frame, x: f32, y: f32) -> [u8; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;

    let fetch = |px: f32, py: f32| -> [f32; 3] {
        if px < 0.0 || py < 0.0 {
            return [0.0; 3];
        }
        frame
            .pixel(px as u32, py as u32)
            .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
            .unwrap_or([0.0; 3])
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1.0, y0);
    let p01 = fetch(x0, y0 + 1.0);
    let p11 = fetch(x0 + 1.0, y0 + 1.0);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - tx) + p10[c] * tx;
        let bottom = p01[c] * (1.0 - tx) + p11[c] * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame where each pixel encodes its own coordinates
    fn coordinate_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 255]);
            }
        }
        Frame::from_rgb(width, height, data).unwrap()
    }

    #[test]
    fn test_crop_axis_aligned() {
        let frame = coordinate_frame(20, 10);
        let region = extract_region(&frame, &Roi::new(3, 2, 4, 5)).unwrap();
        assert_eq!(region.dimensions(), (4, 5));
        assert_eq!(region.get_pixel(0, 0).0, [3, 2, 255]);
        assert_eq!(region.get_pixel(3, 4).0, [6, 6, 255]);
    }

    #[test]
    fn test_crop_clips_to_frame() {
        let frame = coordinate_frame(20, 10);
        let region = extract_region(&frame, &Roi::new(-5, 8, 10, 10)).unwrap();
        assert_eq!(region.dimensions(), (5, 2));
        assert_eq!(region.get_pixel(0, 0).0, [0, 8, 255]);
    }

    #[test]
    fn test_no_overlap_is_none() {
        let frame = coordinate_frame(20, 10);
        assert!(extract_region(&frame, &Roi::new(20, 0, 5, 5)).is_none());
        assert!(extract_region(&frame, &Roi::new(-10, -10, 10, 10)).is_none());
        assert!(extract_region(&frame, &Roi::new(100, 100, 5, 5).with_angle(30.0)).is_none());
    }

    #[test]
    fn test_bottom_up_crop_matches_display() {
        let frame = coordinate_frame(8, 8);

        // Same picture stored the other way round
        let copied = frame.flipped_vertical();
        let region = extract_region(&copied, &Roi::new(0, 0, 2, 2)).unwrap();
        assert_eq!(region.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(region.get_pixel(0, 1).0, [0, 1, 255]);

        // Same buffer shown upside down
        let upside_down = frame.into_flipped();
        let region = extract_region(&upside_down, &Roi::new(0, 0, 2, 2)).unwrap();
        assert_eq!(region.get_pixel(0, 0).0, [0, 7, 255]);
        assert_eq!(region.get_pixel(0, 1).0, [0, 6, 255]);
    }

    #[test]
    fn test_rotated_bottom_up_matches_display() {
        let frame = coordinate_frame(12, 12);
        let roi = Roi::new(3, 2, 5, 4).with_angle(30.0);

        let direct = extract_region(&frame, &roi).unwrap();
        let stored_flipped = extract_region(&frame.flipped_vertical(), &roi).unwrap();
        assert_eq!(direct.dimensions(), stored_flipped.dimensions());
        for (a, b) in direct.pixels().zip(stored_flipped.pixels()) {
            for c in 0..3 {
                assert!((a.0[c] as i32 - b.0[c] as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_empty_roi_is_none() {
        let frame = coordinate_frame(16, 16);
        let flat = Roi {
            width: 0,
            ..Roi::new(0, 0, 1, 10)
        };
        assert!(extract_region(&frame, &flat).is_none());
        assert!(extract_region(&frame, &flat.with_angle(30.0)).is_none());
        assert!(extract_region(&frame.into_flipped(), &flat.with_angle(30.0)).is_none());
    }

    #[test]
    fn test_rotated_180_reverses_pixels() {
        let frame = coordinate_frame(10, 10);
        let region = extract_region(&frame, &Roi::new(2, 2, 4, 4).with_angle(180.0)).unwrap();
        assert_eq!(region.dimensions(), (4, 4));
        assert_eq!(region.get_pixel(0, 0).0, [5, 5, 255]);
        assert_eq!(region.get_pixel(3, 3).0, [2, 2, 255]);
    }

    #[test]
    fn test_rotated_outside_is_black() {
        let frame = coordinate_frame(10, 10);
        let region = extract_region(&frame, &Roi::new(-4, 0, 6, 6).with_angle(90.0)).unwrap();
        // Some samples fall left of the frame
        assert!(region.pixels().any(|p| p.0 == [0, 0, 0]));
        assert!(region.pixels().any(|p| p.0[2] == 255));
    }

    #[test]
    fn test_extraction_leaves_frame_untouched() {
        let frame = coordinate_frame(6, 6);
        let before = frame.data.to_vec();
        let _ = extract_region(&frame.flipped_vertical(), &Roi::new(1, 1, 3, 3).with_angle(15.0));
        let _ = extract_region(&frame, &Roi::new(1, 1, 3, 3));
        assert_eq!(frame.data.to_vec(), before);
    }
}
