// SPDX-License-Identifier: GPL-3.0-only

//! Persistent settings
//!
//! Stored as JSON at `<config_dir>/roi-reader/config.json`. Unknown fields
//! are ignored and missing fields take their defaults, so older files keep
//! loading after upgrades.

use crate::app::frame_processor::Roi;
use crate::app::frame_processor::tasks::UpscaleSettings;
use crate::backends::camera::CaptureSettings;
use crate::constants::{APP_NAME, capture, decode};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera index (`/dev/video<index>`)
    pub device_index: usize,
    /// Requested resolution width
    pub width: u32,
    /// Requested resolution height
    pub height: u32,
    /// Requested frame rate
    pub framerate: u32,
    /// Flip frames upside down before display and decode
    pub flip_vertical: bool,
    /// Region upsampling before decode
    pub upscale: UpscaleSettings,
    /// Pause between continuous decode passes
    pub continuous_interval_ms: u64,
    /// Where ROI crops are saved (default: ~/Pictures/roi-reader)
    pub output_dir: Option<PathBuf>,
    /// ROI layout from the last session
    pub rois: Vec<Roi>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_index: capture::DEFAULT_DEVICE_INDEX,
            width: capture::DEFAULT_WIDTH,
            height: capture::DEFAULT_HEIGHT,
            framerate: capture::DEFAULT_FRAMERATE,
            flip_vertical: capture::DEFAULT_FLIP_VERTICAL,
            upscale: UpscaleSettings::default(),
            continuous_interval_ms: decode::DEFAULT_CONTINUOUS_INTERVAL.as_millis() as u64,
            output_dir: None,
            rois: Vec::new(),
        }
    }
}

impl Config {
    /// `<config_dir>/roi-reader/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.json"))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), rois = config.rois.len(), "Loaded config");
        Ok(config)
    }

    /// Write to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), rois = self.rois.len(), "Saved config");
        Ok(())
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            device_index: self.device_index,
            width: self.width,
            height: self.height,
            framerate: self.framerate,
            flip_vertical: self.flip_vertical,
        }
    }

    pub fn continuous_interval(&self) -> Duration {
        Duration::from_millis(self.continuous_interval_ms.max(1))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(crate::storage::default_output_dir)
    }
}
