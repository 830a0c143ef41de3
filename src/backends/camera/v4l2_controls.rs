// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera control interface
//!
//! Sets focus, brightness, contrast and saturation through the raw
//! `VIDIOC_*_CTRL` ioctls. Values are clamped to the range the driver
//! reports before they are written.
//!
//! Inspired by [cameractrls](https://github.com/soyersoyer/cameractrls).

use super::types::CameraProperty;
use crate::errors::CameraError;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ===== V4L2 Control Class Bases =====
const V4L2_CTRL_CLASS_USER: u32 = 0x00980000;
const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;

const V4L2_CID_BASE: u32 = V4L2_CTRL_CLASS_USER | 0x900;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

// ===== V4L2 Control IDs =====

/// Brightness control
pub const V4L2_CID_BRIGHTNESS: u32 = V4L2_CID_BASE;
/// Contrast control
pub const V4L2_CID_CONTRAST: u32 = V4L2_CID_BASE + 1;
/// Saturation control
pub const V4L2_CID_SATURATION: u32 = V4L2_CID_BASE + 2;
/// Focus control (manual focus position)
pub const V4L2_CID_FOCUS_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 10;
/// Continuous autofocus enable
pub const V4L2_CID_FOCUS_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 12;

// ===== V4L2 Control Flags =====
const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;

// ===== V4L2 ioctl Numbers =====
// Calculated as: (dir << 30) | (size << 16) | ('V' << 8) | nr
// where dir: 2=READ, 1=WRITE, 3=READ|WRITE

/// Get control value (v4l2_control: 8 bytes)
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
/// Query control info (v4l2_queryctrl: 68 bytes)
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;

// ===== V4L2 ioctl Structures =====

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

/// Range information for one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRange {
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
}

impl ControlRange {
    /// Clamp a requested value into range and snap it to the step grid
    pub fn clamp(&self, value: i32) -> i32 {
        let clamped = value.clamp(self.minimum, self.maximum.max(self.minimum));
        if self.step <= 1 {
            return clamped;
        }
        // Offsets can exceed i32 when the driver reports an extreme range
        let minimum = self.minimum as i64;
        let step = self.step as i64;
        let snapped = minimum + (clamped as i64 - minimum) / step * step;
        snapped as i32
    }
}

/// V4L2 control ID for a property
pub fn control_id(property: CameraProperty) -> u32 {
    match property {
        CameraProperty::Focus => V4L2_CID_FOCUS_ABSOLUTE,
        CameraProperty::Brightness => V4L2_CID_BRIGHTNESS,
        CameraProperty::Contrast => V4L2_CID_CONTRAST,
        CameraProperty::Saturation => V4L2_CID_SATURATION,
    }
}

/// Run-time controls of one capture device
#[derive(Debug, Clone)]
pub struct CameraControls {
    path: PathBuf,
}

impl CameraControls {
    /// Controls of `/dev/video<index>`
    pub fn for_device(index: usize) -> Self {
        Self::for_path(format!("/dev/video{}", index))
    }

    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Range of a property, or `None` if the device lacks it
    pub fn range(&self, property: CameraProperty) -> Option<ControlRange> {
        let file = File::open(&self.path).ok()?;
        query_range(&file, control_id(property))
    }

    /// Set a property and return the value the driver settled on
    pub fn set(&self, property: CameraProperty, value: i32) -> Result<i32, CameraError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| CameraError::ControlFailed {
                property,
                reason: format!("failed to open {}: {}", self.path.display(), e),
            })?;

        let id = control_id(property);
        let Some(range) = query_range(&file, id) else {
            info!(path = %self.path.display(), %property, "Control not supported");
            return Err(CameraError::Unsupported(property));
        };

        if property == CameraProperty::Focus && query_range(&file, V4L2_CID_FOCUS_AUTO).is_some() {
            // Manual focus is ignored while continuous autofocus is on
            if let Err(e) = set_control(&file, V4L2_CID_FOCUS_AUTO, 0) {
                warn!(error = %e, "Failed to disable autofocus");
            }
        }

        let clamped = range.clamp(value);
        if clamped != value {
            debug!(
                %property,
                requested = value,
                clamped,
                min = range.minimum,
                max = range.maximum,
                "Clamped control value"
            );
        }

        set_control(&file, id, clamped).map_err(|e| CameraError::ControlFailed {
            property,
            reason: e.to_string(),
        })?;

        let actual = get_control(&file, id).unwrap_or(clamped);
        info!(%property, value = actual, "Camera control set");
        Ok(actual)
    }
}

/// Query a control, treating disabled controls as missing
fn query_range(file: &File, control_id: u32) -> Option<ControlRange> {
    let mut qctrl = V4l2Queryctrl {
        id: control_id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    let result = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            VIDIOC_QUERYCTRL,
            &mut qctrl as *mut V4l2Queryctrl,
        )
    };

    if result < 0 || qctrl.flags & V4L2_CTRL_FLAG_DISABLED != 0 {
        return None;
    }

    Some(ControlRange {
        minimum: qctrl.minimum,
        maximum: qctrl.maximum,
        step: qctrl.step,
        default_value: qctrl.default_value,
    })
}

fn get_control(file: &File, control_id: u32) -> Option<i32> {
    let mut ctrl = V4l2Control {
        id: control_id,
        value: 0,
    };

    let result = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            VIDIOC_G_CTRL,
            &mut ctrl as *mut V4l2Control,
        )
    };

    (result >= 0).then_some(ctrl.value)
}

fn set_control(file: &File, control_id: u32, value: i32) -> std::io::Result<()> {
    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };

    let result = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            VIDIOC_S_CTRL,
            &mut ctrl as *mut V4l2Control,
        )
    };

    if result < 0 {
        let errno = std::io::Error::last_os_error();
        warn!(control_id, value, ?errno, "Failed to set V4L2 control");
        return Err(errno);
    }
    Ok(())
}
