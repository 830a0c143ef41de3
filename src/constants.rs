// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Name used for the config directory and the default output folder
pub const APP_NAME: &str = "roi-reader";

/// Capture defaults
///
/// The defaults ask for the full sensor mode of common 5 MP USB modules;
/// drivers fall back to the nearest mode they support.
pub mod capture {
    /// Camera index (`/dev/video0`)
    pub const DEFAULT_DEVICE_INDEX: usize = 0;

    pub const DEFAULT_WIDTH: u32 = 2592;

    pub const DEFAULT_HEIGHT: u32 = 1944;

    pub const DEFAULT_FRAMERATE: u32 = 200;

    /// Frames are flipped upside down before publishing
    pub const DEFAULT_FLIP_VERTICAL: bool = true;
}

/// ROI editing defaults
pub mod roi {
    /// Origin of a newly added ROI
    pub const DEFAULT_ORIGIN: (i32, i32) = (20, 20);

    /// Side length of a newly added ROI
    pub const DEFAULT_SIZE: u32 = 100;

    /// Pixels moved or resized per key press
    pub const STEP: i32 = 10;

    /// Pixels moved or resized per key press with Shift held
    pub const FINE_STEP: i32 = 1;

    /// Degrees rotated per key press
    pub const ROTATE_STEP_DEG: f32 = 5.0;
}

/// Decode loop timing
pub mod decode {
    use std::time::Duration;

    /// Pause between continuous decode iterations
    pub const DEFAULT_CONTINUOUS_INTERVAL: Duration = Duration::from_millis(200);
}

/// Camera control slider ranges
pub mod controls {
    pub const FOCUS_MIN: i32 = 0;
    pub const FOCUS_MAX: i32 = 1000;
    pub const BRIGHTNESS_MIN: i32 = -100;
    pub const BRIGHTNESS_MAX: i32 = 100;
    /// Change per key press
    pub const STEP: i32 = 5;
}

/// Terminal viewer timing
pub mod timing {
    use super::Duration;

    /// Input poll timeout, which also bounds the redraw rate
    pub const INPUT_POLL: Duration = Duration::from_millis(16);

    /// How long a status notice stays visible
    pub const NOTICE_DURATION: Duration = Duration::from_secs(4);
}

/// File names for saved ROI crops
pub mod file_formats {
    /// `roi_<index>.png`
    pub fn roi_crop_name(index: usize) -> String {
        format!("roi_{}.png", index)
    }
}
