// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera capture

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Represents a camera device discovered on the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Device index (`/dev/video<index>`)
    pub index: usize,
    /// Human-readable name (V4L2 card)
    pub name: String,
    /// Device node path
    pub path: String,
}

impl std::fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.path)
    }
}

/// Pixel layout delivered by a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Motion JPEG, one JPEG image per frame
    Mjpeg,
    /// Packed 4:2:2 (Y0 U Y1 V)
    Yuyv,
    /// Packed 4:2:2 (U Y0 V Y1)
    Uyvy,
    /// 24-bit RGB
    Rgb24,
    /// 24-bit BGR (OpenCV-style channel order)
    Bgr24,
}

impl PixelFormat {
    /// All formats in order of preference when negotiating with a device
    pub const PREFERRED: [PixelFormat; 5] = [
        PixelFormat::Mjpeg,
        PixelFormat::Yuyv,
        PixelFormat::Uyvy,
        PixelFormat::Rgb24,
        PixelFormat::Bgr24,
    ];

    /// V4L2 FourCC code
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::Mjpeg => *b"MJPG",
            Self::Yuyv => *b"YUYV",
            Self::Uyvy => *b"UYVY",
            Self::Rgb24 => *b"RGB3",
            Self::Bgr24 => *b"BGR3",
        }
    }

    /// Parse a V4L2 FourCC code
    pub fn from_fourcc(code: &[u8; 4]) -> Option<Self> {
        match code {
            b"MJPG" | b"JPEG" => Some(Self::Mjpeg),
            b"YUYV" => Some(Self::Yuyv),
            b"UYVY" => Some(Self::Uyvy),
            b"RGB3" => Some(Self::Rgb24),
            b"BGR3" => Some(Self::Bgr24),
            _ => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.fourcc();
        write!(f, "{}", String::from_utf8_lossy(&code))
    }
}

/// Negotiated capture format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    /// Frames per second; `None` when the driver does not report it
    pub framerate: Option<u32>,
    pub pixel_format: PixelFormat,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(fps) = self.framerate {
            write!(
                f,
                "{}x{} @ {}fps {}",
                self.width, self.height, fps, self.pixel_format
            )
        } else {
            write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
        }
    }
}

/// What the capture loop asks the device for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub device_index: usize,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    /// Flip every frame upside down before publishing
    pub flip_vertical: bool,
}

/// Adjustable camera controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraProperty {
    Focus,
    Brightness,
    Contrast,
    Saturation,
}

impl CameraProperty {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
        }
    }
}

impl std::fmt::Display for CameraProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Row order of the pixel buffer
///
/// `BottomUp` frames store the bottom scene row first, which is what the
/// capture loop produces when vertical flipping is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrder {
    #[default]
    TopDown,
    BottomUp,
}

impl RowOrder {
    pub fn flipped(self) -> Self {
        match self {
            Self::TopDown => Self::BottomUp,
            Self::BottomUp => Self::TopDown,
        }
    }
}

/// A single captured frame
///
/// Pixel data is packed RGB24 with no row padding and is never mutated after
/// construction, so clones and `Arc<Frame>` snapshots can be shared between
/// the capture, decode and display threads freely.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub row_order: RowOrder,
    /// Set by the frame slot on publish (0 for unpublished frames)
    pub sequence: u64,
    pub captured_at: Instant,
}

impl Frame {
    /// Wrap packed RGB24 pixels, or `None` if the buffer length does not match
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data: Arc::from(data),
            row_order: RowOrder::TopDown,
            sequence: 0,
            captured_at: Instant::now(),
        })
    }

    /// Build a frame from an `image` RGB buffer
    pub fn from_image(image: image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw()),
            row_order: RowOrder::TopDown,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * 3
    }

    /// RGB value at buffer coordinates, or `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.stride() + x as usize * 3;
        self.data
            .get(idx..idx + 3)
            .map(|px| [px[0], px[1], px[2]])
    }

    /// Buffer row that holds the given on-screen row (row 0 = top of scene)
    pub fn buffer_row(&self, display_row: u32) -> u32 {
        match self.row_order {
            RowOrder::TopDown => display_row,
            RowOrder::BottomUp => self.height.saturating_sub(1).saturating_sub(display_row),
        }
    }

    /// Show the frame upside down without touching the pixels
    pub fn into_flipped(mut self) -> Self {
        self.row_order = self.row_order.flipped();
        self
    }

    /// Copy of this frame with rows reversed
    ///
    /// The copy is displayed identically to `self`.
    #[cfg(test)]
    pub(crate) fn flipped_vertical(&self) -> Self {
        let stride = self.stride();
        let mut data = Vec::with_capacity(self.data.len());
        for row in self.data.chunks_exact(stride.max(1)).rev() {
            data.extend_from_slice(row);
        }
        Self {
            width: self.width,
            height: self.height,
            data: Arc::from(data),
            row_order: self.row_order.flipped(),
            sequence: self.sequence,
            captured_at: self.captured_at,
        }
    }

    /// Copy the pixels into an `image` buffer, rows as stored
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        Frame::from_rgb(width, height, data).unwrap()
    }

    #[test]
    fn test_from_rgb_rejects_wrong_length() {
        assert!(Frame::from_rgb(2, 2, vec![0; 11]).is_none());
        assert!(Frame::from_rgb(2, 2, vec![0; 12]).is_some());
    }

    #[test]
    fn test_pixel_lookup() {
        let frame = gradient(4, 3);
        assert_eq!(frame.pixel(2, 1), Some([2, 1, 7]));
        assert_eq!(frame.pixel(4, 0), None);
        assert_eq!(frame.pixel(0, 3), None);
    }

    #[test]
    fn test_flip_vertical_reverses_rows() {
        let frame = gradient(3, 4);
        let flipped = frame.flipped_vertical();
        assert_eq!(flipped.row_order, RowOrder::BottomUp);
        assert_eq!(flipped.pixel(1, 0), Some([1, 3, 7]));
        assert_eq!(flipped.pixel(1, 3), Some([1, 0, 7]));
        // Source untouched
        assert_eq!(frame.pixel(1, 0), Some([1, 0, 7]));
    }

    #[test]
    fn test_buffer_row_follows_row_order() {
        let frame = gradient(2, 10);
        assert_eq!(frame.buffer_row(0), 0);
        let flipped = frame.flipped_vertical();
        assert_eq!(flipped.buffer_row(0), 9);
        assert_eq!(flipped.buffer_row(9), 0);
    }

    #[test]
    fn test_into_flipped_keeps_pixels() {
        let frame = gradient(2, 10).into_flipped();
        assert_eq!(frame.row_order, RowOrder::BottomUp);
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 7]));
        // Top displayed row is the last buffer row
        assert_eq!(frame.pixel(0, frame.buffer_row(0)), Some([0, 9, 7]));
        assert_eq!(frame.into_flipped().row_order, RowOrder::TopDown);
    }

    #[test]
    fn test_pixel_format_fourcc() {
        for format in PixelFormat::PREFERRED {
            assert_eq!(PixelFormat::from_fourcc(&format.fourcc()), Some(format));
        }
        assert_eq!(PixelFormat::from_fourcc(b"H264"), None);
        assert_eq!(PixelFormat::Mjpeg.to_string(), "MJPG");
    }

    #[test]
    fn test_camera_format_display() {
        let format = CameraFormat {
            width: 1280,
            height: 720,
            framerate: Some(30),
            pixel_format: PixelFormat::Yuyv,
        };
        assert_eq!(format.to_string(), "1280x720 @ 30fps YUYV");
    }
}
