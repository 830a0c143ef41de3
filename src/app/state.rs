// SPDX-License-Identifier: GPL-3.0-only

//! Viewer state
//!
//! Everything the terminal viewer mutates in response to input lives here,
//! independent of rendering, so it can be unit tested.

use crate::app::frame_processor::Roi;
use crate::constants::{controls, roi, timing};
use std::time::Instant;

/// Operator actions, decoupled from the key bindings that trigger them
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    ToggleHelp,
    /// Open the camera, or stop it when running
    ToggleCamera,
    /// Decode the current frame once
    Decode,
    ToggleContinuous,
    AddRoi,
    RemoveRoi,
    SelectNext,
    /// Move the selected ROI by on-screen pixels (down is positive)
    Move(i32, i32),
    /// Resize the selected ROI by on-screen pixels, keeping its top-left fixed
    Resize(i32, i32),
    Rotate(f32),
    SaveCrops,
    AdjustFocus(i32),
    AdjustBrightness(i32),
}

/// Ordered, editable list of ROIs with a selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoiEditor {
    rois: Vec<Roi>,
    selected: Option<usize>,
}

impl RoiEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a saved layout; the last ROI is selected
    pub fn from_rois(rois: Vec<Roi>) -> Self {
        let selected = rois.len().checked_sub(1);
        Self { rois, selected }
    }

    pub fn rois(&self) -> &[Roi] {
        &self.rois
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_roi(&self) -> Option<&Roi> {
        self.selected.and_then(|i| self.rois.get(i))
    }

    /// Append a default-sized ROI and select it
    pub fn add_default(&mut self) -> usize {
        let (x, y) = roi::DEFAULT_ORIGIN;
        self.add(Roi::new(x, y, roi::DEFAULT_SIZE, roi::DEFAULT_SIZE))
    }

    /// Append a ROI and select it
    pub fn add(&mut self, new_roi: Roi) -> usize {
        self.rois.push(new_roi);
        let index = self.rois.len() - 1;
        self.selected = Some(index);
        index
    }

    pub fn select_next(&mut self) {
        if self.rois.is_empty() {
            self.selected = None;
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => (i + 1) % self.rois.len(),
            None => 0,
        });
    }

    /// Remove the selected ROI; the selection moves to its predecessor
    pub fn remove_selected(&mut self) -> Option<Roi> {
        let index = self.selected?;
        let removed = self.rois.remove(index);
        self.selected = if self.rois.is_empty() {
            None
        } else {
            Some(index.saturating_sub(1).min(self.rois.len() - 1))
        };
        Some(removed)
    }

    pub fn move_selected(&mut self, dx: i32, dy: i32) {
        if let Some(selected) = self.selected_mut() {
            selected.translate(dx, dy);
        }
    }

    /// Resize the selection, keeping its top-left corner in place
    pub fn resize_selected(&mut self, dw: i32, dh: i32) {
        if let Some(selected) = self.selected_mut() {
            selected.resize(dw, dh);
        }
    }

    pub fn rotate_selected(&mut self, delta_deg: f32) {
        if let Some(selected) = self.selected_mut() {
            selected.rotate(delta_deg);
        }
    }

    fn selected_mut(&mut self) -> Option<&mut Roi> {
        self.selected.and_then(|i| self.rois.get_mut(i))
    }
}

/// Status line message that expires
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
    shown_at: Instant,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            shown_at: Instant::now(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= timing::NOTICE_DURATION
    }
}

/// Last requested focus and brightness values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLevels {
    pub focus: i32,
    pub brightness: i32,
}

impl Default for ControlLevels {
    fn default() -> Self {
        Self {
            focus: controls::FOCUS_MIN,
            brightness: 0,
        }
    }
}

impl ControlLevels {
    /// Apply a focus step and return the new target value
    pub fn step_focus(&mut self, delta: i32) -> i32 {
        self.focus = (self.focus + delta).clamp(controls::FOCUS_MIN, controls::FOCUS_MAX);
        self.focus
    }

    /// Apply a brightness step and return the new target value
    pub fn step_brightness(&mut self, delta: i32) -> i32 {
        self.brightness =
            (self.brightness + delta).clamp(controls::BRIGHTNESS_MIN, controls::BRIGHTNESS_MAX);
        self.brightness
    }
}
