// SPDX-License-Identifier: GPL-3.0-only

//! Storage utilities for saved ROI crops

use crate::app::frame_processor::{Roi, extract_region};
use crate::backends::camera::Frame;
use crate::constants::{APP_NAME, file_formats};
use crate::errors::AppResult;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default directory for saved crops (`~/Pictures/roi-reader`)
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Save the pixels under each ROI as `roi_<index>.png` in `dir`
///
/// The index is the ROI's position in `rois`. ROIs that do not overlap the
/// frame are skipped, so the returned list may be shorter than `rois`.
pub fn save_roi_crops(frame: &Frame, rois: &[Roi], dir: &Path) -> AppResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut saved = Vec::with_capacity(rois.len());
    for (index, roi) in rois.iter().enumerate() {
        let Some(region) = extract_region(frame, roi) else {
            warn!(index, roi = %roi, "ROI is outside the frame, not saved");
            continue;
        };

        let path = dir.join(file_formats::roi_crop_name(index));
        region.save(&path)?;
        debug!(index, path = %path.display(), "Saved ROI crop");
        saved.push(path);
    }

    info!(count = saved.len(), dir = %dir.display(), "ROI crops saved");
    Ok(saved)
}
