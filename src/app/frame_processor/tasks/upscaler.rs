// SPDX-License-Identifier: GPL-3.0-only

//! Region upsampling before decode
//!
//! Small or distant codes often have modules only one or two pixels wide.
//! Enlarging the region first gives the readers more to work with.

use image::RgbImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Enlarges a region image
///
/// A learned super-resolution model can be plugged in by implementing this
/// trait; [`InterpolationUpscaler`] is the built-in implementation.
pub trait Upscaler: Send + Sync {
    fn upscale(&self, image: &RgbImage) -> RgbImage;
}

/// Resampling filter
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum UpscaleFilter {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
    Lanczos3,
}

impl UpscaleFilter {
    fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Bicubic => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Integer-factor interpolation upscaler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpolationUpscaler {
    factor: u32,
    filter: UpscaleFilter,
}

impl InterpolationUpscaler {
    pub const MAX_FACTOR: u32 = 8;

    /// The factor is clamped to `1..=MAX_FACTOR`
    pub fn new(factor: u32, filter: UpscaleFilter) -> Self {
        Self {
            factor: factor.clamp(1, Self::MAX_FACTOR),
            filter,
        }
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    pub fn filter(&self) -> UpscaleFilter {
        self.filter
    }
}

impl Upscaler for InterpolationUpscaler {
    fn upscale(&self, image: &RgbImage) -> RgbImage {
        if self.factor == 1 {
            return image.clone();
        }
        let (width, height) = image.dimensions();
        trace!(
            width,
            height,
            factor = self.factor,
            filter = ?self.filter,
            "Upscaling region"
        );
        image::imageops::resize(
            image,
            width * self.factor,
            height * self.factor,
            self.filter.filter_type(),
        )
    }
}

/// Persisted upscaler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscaleSettings {
    /// 1 disables upscaling
    pub factor: u32,
    pub filter: UpscaleFilter,
}

impl Default for UpscaleSettings {
    fn default() -> Self {
        Self {
            factor: 1,
            filter: UpscaleFilter::default(),
        }
    }
}

impl UpscaleSettings {
    /// Build the configured upscaler, or `None` when disabled
    pub fn build(&self) -> Option<Arc<dyn Upscaler>> {
        (self.factor > 1).then(|| {
            Arc::new(InterpolationUpscaler::new(self.factor, self.filter)) as Arc<dyn Upscaler>
        })
    }
}
