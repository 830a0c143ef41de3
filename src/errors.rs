// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the ROI reader

use crate::backends::camera::CameraProperty;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(CameraError),
    /// Decode request errors
    Decode(DecodeError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Camera-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// The device could not be opened or configured
    DeviceUnavailable { index: usize, reason: String },
    /// The device does not expose this control
    Unsupported(CameraProperty),
    /// The device rejected a control value
    ControlFailed {
        property: CameraProperty,
        reason: String,
    },
    /// Failed to start the capture stream
    StreamFailed(String),
    /// A single frame could not be read or converted
    ReadFailed(String),
}

/// Reasons a decode request is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No regions of interest defined
    NoRegions,
    /// Nothing has been captured yet
    NoFrame,
    /// Another decode pass is still running
    Busy,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Decode(e) => write!(f, "Decode error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::DeviceUnavailable { index, reason } => {
                write!(f, "Could not open camera {}: {}", index, reason)
            }
            CameraError::Unsupported(property) => {
                write!(f, "Camera does not support {} control", property)
            }
            CameraError::ControlFailed { property, reason } => {
                write!(f, "Failed to set {}: {}", property, reason)
            }
            CameraError::StreamFailed(msg) => write!(f, "Failed to start stream: {}", msg),
            CameraError::ReadFailed(msg) => write!(f, "Failed to read frame: {}", msg),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NoRegions => write!(f, "No regions of interest defined"),
            DecodeError::NoFrame => write!(f, "No frame captured yet"),
            DecodeError::Busy => write!(f, "Previous decode still running"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for DecodeError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        AppError::Decode(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_display() {
        let err = CameraError::DeviceUnavailable {
            index: 3,
            reason: "No such device".to_string(),
        };
        assert_eq!(err.to_string(), "Could not open camera 3: No such device");
        assert_eq!(
            CameraError::Unsupported(CameraProperty::Focus).to_string(),
            "Camera does not support focus control"
        );
    }

    #[test]
    fn test_every_camera_error_has_a_message() {
        let property = CameraProperty::Brightness;
        let all = [
            CameraError::DeviceUnavailable {
                index: 0,
                reason: "busy".into(),
            },
            CameraError::Unsupported(property),
            CameraError::ControlFailed {
                property,
                reason: "EINVAL".into(),
            },
            CameraError::StreamFailed("no buffers".into()),
            CameraError::ReadFailed("timeout".into()),
        ];
        for err in &all {
            // Exhaustive so a new variant has to be listed here
            let expected = match err {
                CameraError::DeviceUnavailable { .. } => "Could not open camera",
                CameraError::Unsupported(_) => "Camera does not support",
                CameraError::ControlFailed { .. } => "Failed to set brightness",
                CameraError::StreamFailed(_) => "Failed to start stream",
                CameraError::ReadFailed(_) => "Failed to read frame",
            };
            assert!(err.to_string().starts_with(expected), "{}", err);
        }
    }

    #[test]
    fn test_app_error_wraps_sources() {
        let err: AppError = DecodeError::NoRegions.into();
        assert_eq!(
            err.to_string(),
            "Decode error: No regions of interest defined"
        );

        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
