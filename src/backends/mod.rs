// SPDX-License-Identifier: GPL-3.0-only

//! Hardware access
//!
//! - [`camera`]: V4L2 capture, frame publishing and camera controls

pub mod camera;
