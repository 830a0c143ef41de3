// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Decoding ROIs of a still image without a camera

use roi_reader::app::frame_processor::tasks::{UpscaleFilter, UpscaleSettings};
use roi_reader::app::frame_processor::{DecodeEngine, Roi};
use roi_reader::backends::camera::{Frame, list_devices};
use roi_reader::errors::{AppError, DecodeError};
use std::path::Path;
use tracing::info;

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = list_devices();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  [{}] {}", camera.index, camera.name);
        println!("      Path: {}", camera.path);
    }
    println!();
    println!("Use --device <INDEX> to pick one.");

    Ok(())
}

/// Run one decode pass over `image` and print the result
pub fn scan_image(
    image: &Path,
    rois: &[Roi],
    upscale: u32,
    filter: UpscaleFilter,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if rois.is_empty() {
        return Err(AppError::Decode(DecodeError::NoRegions).into());
    }

    let picture = image::open(image).map_err(AppError::from)?.to_rgb8();
    let frame = Frame::from_image(picture);
    info!(
        path = %image.display(),
        width = frame.width,
        height = frame.height,
        rois = rois.len(),
        "Scanning image"
    );

    let settings = UpscaleSettings {
        factor: upscale,
        filter,
    };
    let engine = DecodeEngine::new(settings.build());
    let result = engine.decode_pass(&frame, rois);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.summary());
    }

    Ok(())
}
