// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion to packed RGB24
//!
//! Every device format the capture loop accepts is converted here, so the
//! rest of the crate only ever sees RGB frames.

use super::types::PixelFormat;
use crate::errors::CameraError;

/// Convert one raw device buffer to packed RGB24
pub fn to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>, CameraError> {
    let expected = (width as usize) * (height as usize) * 3;
    let rgb = match format {
        PixelFormat::Mjpeg => decode_mjpeg(data, width, height)?,
        PixelFormat::Yuyv => yuyv_to_rgb(data, width, height),
        PixelFormat::Uyvy => uyvy_to_rgb(data, width, height),
        PixelFormat::Rgb24 => data.get(..expected).map(<[u8]>::to_vec).unwrap_or_default(),
        PixelFormat::Bgr24 => bgr_to_rgb(data, width, height),
    };

    if rgb.len() != expected {
        return Err(CameraError::ReadFailed(format!(
            "{} buffer of {} bytes is too short for {}x{}",
            format,
            data.len(),
            width,
            height
        )));
    }
    Ok(rgb)
}

/// Decode a Motion-JPEG frame
///
/// Some webcams emit JPEGs whose dimensions differ from the negotiated
/// format; those are rejected rather than silently reshaped.
fn decode_mjpeg(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CameraError> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| CameraError::ReadFailed(format!("MJPEG decode failed: {}", e)))?
        .to_rgb8();

    if decoded.dimensions() != (width, height) {
        return Err(CameraError::ReadFailed(format!(
            "MJPEG frame is {}x{}, expected {}x{}",
            decoded.width(),
            decoded.height(),
            width,
            height
        )));
    }
    Ok(decoded.into_raw())
}

/// BT.601 YUV to RGB for a single sample
fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [u8; 3] {
    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    [r, g, b]
}

/// Convert YUYV (Y0 U Y1 V) to RGB
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            if rgb.len() >= pixel_count * 3 {
                break;
            }
            rgb.extend_from_slice(&yuv_to_rgb(y, u, v));
        }
    }

    rgb
}

/// Convert UYVY (U Y0 V Y1) to RGB
pub fn uyvy_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in data.chunks_exact(4) {
        let u = chunk[0] as f32 - 128.0;
        let y0 = chunk[1] as f32;
        let v = chunk[2] as f32 - 128.0;
        let y1 = chunk[3] as f32;

        for y in [y0, y1] {
            if rgb.len() >= pixel_count * 3 {
                break;
            }
            rgb.extend_from_slice(&yuv_to_rgb(y, u, v));
        }
    }

    rgb
}

/// Swap BGR channel order to RGB
pub fn bgr_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    data.chunks_exact(3)
        .take(pixel_count)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect()
}
