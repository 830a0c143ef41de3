// SPDX-License-Identifier: GPL-3.0-only

//! Camera capture session
//!
//! Opens a device on a dedicated thread, then keeps reading frames and
//! publishing them to a [`FrameSlot`] until stopped. The device is created,
//! used and dropped on that thread only. The last published frame stays in
//! the slot after a stop, until the next session replaces it.

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::frame_slot::FrameSlot;
use super::types::{CameraFormat, CaptureSettings};
use super::v4l2::V4l2Capture;
use super::CaptureDevice;
use crate::errors::CameraError;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause after a failed read before trying again
const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Log one read failure in this many
const READ_ERROR_LOG_INTERVAL: u64 = 100;

/// A running capture loop
pub struct CaptureSession {
    controller: CaptureLoopController,
    format: CameraFormat,
}

struct LoopState<D> {
    device: D,
    flip_vertical: bool,
    frames: u64,
    read_errors: u64,
}

impl CaptureSession {
    /// Open a V4L2 device with the given settings and start capturing
    pub fn open_v4l2(settings: CaptureSettings, slot: Arc<FrameSlot>) -> Result<Self, CameraError> {
        Self::start(
            move || V4l2Capture::open(&settings),
            slot,
            settings.flip_vertical,
        )
    }

    /// Start capturing from the device returned by `opener`
    ///
    /// Blocks until the device is open. If opening fails the error is
    /// returned, the thread has already exited, and nothing was published.
    pub fn start<D, O>(opener: O, slot: Arc<FrameSlot>, flip_vertical: bool) -> Result<Self, CameraError>
    where
        D: CaptureDevice + 'static,
        O: FnOnce() -> Result<D, CameraError> + Send + 'static,
    {
        let negotiated = Arc::new(OnceLock::new());
        let negotiated_init = Arc::clone(&negotiated);

        let controller = CaptureLoopController::start_with_init(
            "capture",
            move || {
                let device = opener()?;
                let _ = negotiated_init.set(device.format());
                Ok(LoopState {
                    device,
                    flip_vertical,
                    frames: 0,
                    read_errors: 0,
                })
            },
            move |state: &mut LoopState<D>| capture_iteration(state, &slot),
        )?;

        let format = negotiated.get().copied().ok_or_else(|| {
            CameraError::StreamFailed("device did not report its format".to_string())
        })?;
        info!(format = %format, flip_vertical, "Capture session started");

        Ok(Self { controller, format })
    }

    /// Format the device actually negotiated
    pub fn format(&self) -> CameraFormat {
        self.format
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Stop capturing and release the device
    ///
    /// The last frame is left in the slot. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.controller.is_running() {
            info!("Stopping capture session");
        }
        self.controller.stop();
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_iteration<D: CaptureDevice>(state: &mut LoopState<D>, slot: &FrameSlot) -> LoopAction {
    match state.device.read_frame() {
        Ok(frame) => {
            let frame = if state.flip_vertical {
                frame.into_flipped()
            } else {
                frame
            };
            let sequence = slot.publish(frame);
            state.frames += 1;
            if state.frames % 300 == 0 {
                debug!(sequence, frames = state.frames, "Capture progress");
            }
        }
        Err(e) => {
            state.read_errors += 1;
            if state.read_errors % READ_ERROR_LOG_INTERVAL == 1 {
                warn!(error = %e, count = state.read_errors, "Frame read failed, retrying");
            }
            thread::sleep(READ_RETRY_DELAY);
        }
    }
    LoopAction::Continue
}
