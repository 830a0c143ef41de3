// SPDX-License-Identifier: GPL-3.0-only

//! Latest-frame slot shared between capture, decode and display
//!
//! The capture loop publishes complete frames; readers take an `Arc`
//! snapshot. Publishing swaps the pointer under a short write lock, so a
//! reader either sees the previous frame or the new one, never a mix.

use super::types::Frame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

#[derive(Debug, Default)]
pub struct FrameSlot {
    current: RwLock<Option<Arc<Frame>>>,
    next_sequence: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame and return the sequence number assigned to it
    pub fn publish(&self, mut frame: Frame) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        frame.sequence = sequence;
        let frame = Arc::new(frame);

        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            current.replace(frame)
        };
        // Old snapshot is released outside the lock
        drop(previous);

        trace!(sequence, "Published frame");
        sequence
    }

    /// Snapshot of the most recently published frame
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sequence number of the most recently published frame (0 if none)
    pub fn latest_sequence(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn solid(value: u8) -> Frame {
        Frame::from_rgb(4, 4, vec![value; 48]).unwrap()
    }

    #[test]
    fn test_empty_slot() {
        let slot = FrameSlot::new();
        assert!(slot.latest().is_none());
        assert_eq!(slot.latest_sequence(), 0);
    }

    #[test]
    fn test_publish_assigns_increasing_sequence() {
        let slot = FrameSlot::new();
        assert_eq!(slot.publish(solid(1)), 1);
        assert_eq!(slot.publish(solid(2)), 2);

        let latest = slot.latest().unwrap();
        assert_eq!(latest.sequence, 2);
        assert_eq!(latest.data[0], 2);
    }

    #[test]
    fn test_snapshot_survives_republish() {
        let slot = FrameSlot::new();
        slot.publish(solid(10));
        let snapshot = slot.latest().unwrap();

        slot.publish(solid(20));

        assert!(snapshot.data.iter().all(|&b| b == 10));
        assert_eq!(slot.latest().unwrap().data[0], 20);
    }

    #[test]
    fn test_readers_never_see_torn_frames() {
        let slot = Arc::new(FrameSlot::new());
        slot.publish(solid(0));

        let writer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for value in 1..=200u8 {
                    slot.publish(solid(value));
                }
            })
        };

        for _ in 0..500 {
            let frame = slot.latest().unwrap();
            let first = frame.data[0];
            assert!(frame.data.iter().all(|&b| b == first));
        }

        writer.join().unwrap();
        assert_eq!(slot.latest().unwrap().data[0], 200);
    }
}
