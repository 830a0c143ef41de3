// SPDX-License-Identifier: GPL-3.0-only

//! Background decoding
//!
//! At most one decode pass runs at a time. An on-demand request occupies the
//! slot for one pass; continuous mode occupies it until stopped. Results are
//! delivered on an unbounded channel, one [`DecodeResult`] per pass.

use super::engine::DecodeEngine;
use super::types::{DecodeResult, Roi};
use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction};
use crate::backends::camera::{Frame, FrameSlot};
use crate::errors::DecodeError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Releases the single decode slot when dropped, even on panic
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DecodeWorker {
    engine: Arc<DecodeEngine>,
    in_flight: Arc<AtomicBool>,
    results: mpsc::UnboundedSender<DecodeResult>,
    regions: Arc<RwLock<Vec<Roi>>>,
    continuous: Option<CaptureLoopController>,
}

impl DecodeWorker {
    /// Create a worker and the receiving end of its result channel
    pub fn new(engine: DecodeEngine) -> (Self, mpsc::UnboundedReceiver<DecodeResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            engine: Arc::new(engine),
            in_flight: Arc::new(AtomicBool::new(false)),
            results: tx,
            regions: Arc::new(RwLock::new(Vec::new())),
            continuous: None,
        };
        (worker, rx)
    }

    /// Whether a pass or the continuous loop currently holds the decode slot
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
            .as_ref()
            .is_some_and(CaptureLoopController::is_running)
    }

    /// Run one pass over `frame` on a background thread
    ///
    /// Rejected without side effects when there are no ROIs, no frame, or a
    /// decode is already in flight.
    pub fn request(&self, frame: Option<Arc<Frame>>, rois: &[Roi]) -> Result<(), DecodeError> {
        if rois.is_empty() {
            return Err(DecodeError::NoRegions);
        }
        let frame = frame.ok_or(DecodeError::NoFrame)?;
        let guard = InFlightGuard::acquire(&self.in_flight).ok_or(DecodeError::Busy)?;

        let engine = Arc::clone(&self.engine);
        let results = self.results.clone();
        let rois = rois.to_vec();

        debug!(
            sequence = frame.sequence,
            rois = rois.len(),
            "Starting on-demand decode"
        );

        thread::spawn(move || {
            let result = engine.decode_pass(&frame, &rois);
            drop(guard);
            if results.send(result).is_err() {
                warn!("Decode result dropped, receiver closed");
            }
        });

        Ok(())
    }

    /// Replace the ROI list used by continuous decoding
    pub fn update_regions(&self, rois: &[Roi]) {
        let mut regions = self.regions.write().unwrap_or_else(PoisonError::into_inner);
        regions.clear();
        regions.extend_from_slice(rois);
    }

    /// Decode the latest frame repeatedly until [`stop_continuous`](Self::stop_continuous)
    ///
    /// A pass only runs when a new frame has been published since the last
    /// one and at least one ROI is set. `interval` is the pause between
    /// iterations.
    pub fn start_continuous(
        &mut self,
        slot: Arc<FrameSlot>,
        interval: Duration,
    ) -> Result<(), DecodeError> {
        if self.is_continuous() {
            return Err(DecodeError::Busy);
        }
        // Reap a loop that stopped on its own
        self.stop_continuous();

        let guard = InFlightGuard::acquire(&self.in_flight).ok_or(DecodeError::Busy)?;
        let engine = Arc::clone(&self.engine);
        let results = self.results.clone();
        let regions = Arc::clone(&self.regions);
        let mut last_sequence = 0u64;

        info!(interval_ms = interval.as_millis(), "Starting continuous decode");

        let controller = CaptureLoopController::start("decode-continuous", move || {
            // Held for the lifetime of the loop
            let _slot_held = &guard;

            let rois = regions
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();

            if let Some(frame) = slot.latest()
                && frame.sequence != last_sequence
                && !rois.is_empty()
            {
                last_sequence = frame.sequence;
                let result = engine.decode_pass(&frame, &rois);
                if results.send(result).is_err() {
                    debug!("Result receiver closed, ending continuous decode");
                    return LoopAction::Stop;
                }
            }

            thread::sleep(interval);
            LoopAction::Continue
        });

        self.continuous = Some(controller);
        Ok(())
    }

    /// Stop continuous decoding and wait for the loop to exit
    ///
    /// Returns whether a loop was running.
    pub fn stop_continuous(&mut self) -> bool {
        match self.continuous.take() {
            Some(mut controller) => {
                let was_running = controller.is_running();
                controller.stop();
                if was_running {
                    info!("Continuous decode stopped");
                }
                was_running
            }
            None => false,
        }
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.stop_continuous();
    }
}
