// SPDX-License-Identifier: GPL-3.0-only

//! Application logic for the ROI reader
//!
//! - `frame_processor`: ROI extraction, upscaling and code reading
//! - `state`: viewer state (ROI editor, notices, control levels)

pub mod frame_processor;
pub mod state;

pub use state::{Action, ControlLevels, Notice, RoiEditor};
