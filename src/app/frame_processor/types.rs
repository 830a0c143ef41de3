// SPDX-License-Identifier: GPL-3.0-only

//! Core types for ROI decoding
//!
//! These types are shared by the decode engine, the terminal viewer and the
//! headless `scan` command, and are persisted in the config file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A region of interest in display pixel coordinates
///
/// `x`/`y` is the origin of the unrotated rectangle (column and displayed
/// row, row 0 at the top of the shown image); the rectangle is rotated by
/// `angle_deg` about its centre. The origin may
/// lie outside the frame, only the overlapping part is ever sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRoi")]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Rotation in degrees, normalised to (-180, 180]
    pub angle_deg: f32,
}

impl Roi {
    /// Create an axis-aligned ROI; zero sizes are raised to one pixel
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width: width.max(1),
            height: height.max(1),
            angle_deg: 0.0,
        }
    }

    pub fn with_angle(mut self, angle_deg: f32) -> Self {
        self.angle_deg = normalize_angle(angle_deg);
        self
    }

    pub fn is_rotated(&self) -> bool {
        self.angle_deg.abs() > f32::EPSILON
    }

    /// Rectangle centre
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Map a point given in the ROI's own axes (origin at its top-left
    /// corner) to frame coordinates
    pub fn to_frame(&self, u: f32, v: f32) -> (f32, f32) {
        let (cx, cy) = self.center();
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let du = u - self.width as f32 / 2.0;
        let dv = v - self.height as f32 / 2.0;
        (cx + du * cos - dv * sin, cy + du * sin + dv * cos)
    }

    /// Corners, clockwise from the origin corner
    pub fn corners(&self) -> [(f32, f32); 4] {
        let (w, h) = (self.width as f32, self.height as f32);
        [
            self.to_frame(0.0, 0.0),
            self.to_frame(w, 0.0),
            self.to_frame(w, h),
            self.to_frame(0.0, h),
        ]
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        self.corners().iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.x = self.x.saturating_add(dx);
        self.y = self.y.saturating_add(dy);
    }

    /// Grow or shrink, keeping the origin fixed
    pub fn resize(&mut self, dw: i32, dh: i32) {
        self.width = self.width.saturating_add_signed(dw).max(1);
        self.height = self.height.saturating_add_signed(dh).max(1);
    }

    pub fn rotate(&mut self, delta_deg: f32) {
        self.angle_deg = normalize_angle(self.angle_deg + delta_deg);
    }

    /// The same region seen upside down in a frame `frame_height` rows tall
    pub fn mirrored(&self, frame_height: u32) -> Self {
        Self {
            y: (frame_height as i64 - self.y as i64 - self.height as i64)
                .clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            angle_deg: normalize_angle(-self.angle_deg),
            ..*self
        }
    }
}

/// Serialized form of [`Roi`]; loading goes through [`Roi::new`] so saved
/// layouts get the same size and angle limits as edited ones
#[derive(Deserialize)]
struct RawRoi {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    #[serde(default)]
    angle_deg: f32,
}

impl From<RawRoi> for Roi {
    fn from(raw: RawRoi) -> Self {
        Roi::new(raw.x, raw.y, raw.width, raw.height).with_angle(raw.angle_deg)
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)?;
        if self.is_rotated() {
            write!(f, " @{:.0}°", self.angle_deg)?;
        }
        Ok(())
    }
}

/// Parse `x,y,w,h` or `x,y,w,h,angle`
impl FromStr for Roi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 && parts.len() != 5 {
            return Err(format!("expected x,y,w,h[,angle], got '{}'", s));
        }

        let int = |v: &str| {
            v.parse::<i32>()
                .map_err(|e| format!("invalid number '{}': {}", v, e))
        };
        let size = |v: &str| match v.parse::<u32>() {
            Ok(0) => Err("ROI width and height must be at least 1".to_string()),
            Ok(n) => Ok(n),
            Err(e) => Err(format!("invalid size '{}': {}", v, e)),
        };

        let roi = Roi::new(int(parts[0])?, int(parts[1])?, size(parts[2])?, size(parts[3])?);
        match parts.get(4) {
            Some(angle) => {
                let angle = angle
                    .parse::<f32>()
                    .map_err(|e| format!("invalid angle '{}': {}", angle, e))?;
                Ok(roi.with_angle(angle))
            }
            None => Ok(roi),
        }
    }
}

fn normalize_angle(deg: f32) -> f32 {
    if !deg.is_finite() {
        return 0.0;
    }
    let mut a = deg % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// Outcome of one decode pass
///
/// `qrcode` and `barcode` hold decoded strings in ROI order. A ROI that
/// yielded nothing contributes no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeResult {
    pub qrcode: Vec<String>,
    pub barcode: Vec<String>,
    /// Sequence number of the frame that was decoded
    pub frame_sequence: u64,
    pub rois_attempted: usize,
    pub elapsed_ms: u64,
}

impl DecodeResult {
    /// Total number of decoded entries
    pub fn len(&self) -> usize {
        self.qrcode.len() + self.barcode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "QR: [{}] | Barcode: [{}]",
            self.qrcode.join(", "),
            self.barcode.join(", ")
        )
    }
}

impl fmt::Display for DecodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
