// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use roi_reader::Config;
use roi_reader::{DecodeEngine, Frame, Roi};
use roi_reader::app::frame_processor::tasks::{UpscaleFilter, UpscaleSettings};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(config.flip_vertical, "Frames should be flipped by default");
    assert!(config.rois.is_empty(), "No ROIs before the first session");
    assert_eq!(config.upscale.factor, 1, "Upscaling should be off by default");
}

#[test]
fn test_roi_layout_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        device_index: 3,
        upscale: UpscaleSettings {
            factor: 2,
            filter: UpscaleFilter::Lanczos3,
        },
        rois: vec![Roi::new(20, 20, 100, 100), Roi::new(-5, 40, 60, 30).with_angle(15.0)],
        ..Default::default()
    };
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_roi_without_angle_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"rois": [{"x": 1, "y": 2, "width": 3, "height": 4}], "unknown": true}"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.rois, vec![Roi::new(1, 2, 3, 4)]);
}

#[test]
fn test_output_dir_override() {
    let config = Config {
        output_dir: Some("/tmp/crops".into()),
        ..Default::default()
    };
    assert_eq!(config.output_dir(), std::path::PathBuf::from("/tmp/crops"));
    assert!(Config::default().output_dir().ends_with("roi-reader"));
}

#[test]
fn test_zero_size_roi_in_file_is_raised_and_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"rois": [{"x": 0, "y": 0, "width": 0, "height": 10, "angle_deg": 30.0}]}"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    let roi = config.rois[0];
    assert_eq!((roi.width, roi.height), (1, 10));

    // A pass over the loaded layout completes instead of panicking
    let frame = Frame::from_image(image::RgbImage::new(16, 16));
    let result = DecodeEngine::default().decode_pass(&frame, &config.rois);
    assert!(result.is_empty());
    assert_eq!(result.rois_attempted, 1);
}
