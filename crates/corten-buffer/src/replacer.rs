//! Page replacement policies for the buffer pool.

use crate::frame::FrameId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Trait for page replacement algorithms.
///
/// Evictability is decided by the caller through the `is_evictable`
/// predicate (the pool checks pin counts directly); the replacer only
/// chooses among the candidates.
pub trait Replacer: Send + Sync {
    /// Records that the given frame was accessed.
    fn record_access(&self, frame_id: FrameId);

    /// Selects a victim frame for eviction.
    ///
    /// Returns None if no frame satisfies `is_evictable`.
    fn evict(&self, is_evictable: &dyn Fn(FrameId) -> bool) -> Option<FrameId>;

    /// Removes a frame from the replacer, clearing its access history.
    fn remove(&self, frame_id: FrameId);
}

/// Clock replacement algorithm implementation.
///
/// Uses atomic reference bits for lock-free access recording; only the
/// clock hand is behind a mutex.
pub struct ClockReplacer {
    /// Number of frames.
    num_frames: usize,
    /// Reference bits for each frame (atomic for lock-free access).
    reference_bits: Vec<AtomicBool>,
    /// Current clock hand position.
    clock_hand: Mutex<usize>,
}

impl ClockReplacer {
    /// Creates a new clock replacer with the given number of frames.
    pub fn new(num_frames: usize) -> Self {
        let reference_bits: Vec<AtomicBool> =
            (0..num_frames).map(|_| AtomicBool::new(false)).collect();

        Self {
            num_frames,
            reference_bits,
            clock_hand: Mutex::new(0),
        }
    }

    /// Returns the total capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.num_frames
    }
}

impl Replacer for ClockReplacer {
    #[inline]
    fn record_access(&self, frame_id: FrameId) {
        let idx = frame_id.0 as usize;
        if idx < self.num_frames {
            self.reference_bits[idx].store(true, Ordering::Relaxed);
        }
    }

    fn evict(&self, is_evictable: &dyn Fn(FrameId) -> bool) -> Option<FrameId> {
        let mut hand = self.clock_hand.lock();
        let num_frames = self.num_frames;

        // Two full rotations: the first clears reference bits, the second
        // must then find any candidate whose bit stayed clear.
        for _ in 0..(2 * num_frames) {
            let pos = *hand;
            *hand = (pos + 1) % num_frames;

            let frame_id = FrameId(pos as u32);
            if !is_evictable(frame_id) {
                continue;
            }

            if self.reference_bits[pos].load(Ordering::Relaxed) {
                self.reference_bits[pos].store(false, Ordering::Relaxed);
            } else {
                return Some(frame_id);
            }
        }

        // Candidates re-referenced during the sweep: take any evictable one.
        for pos in 0..num_frames {
            let frame_id = FrameId(pos as u32);
            if is_evictable(frame_id) {
                self.reference_bits[pos].store(false, Ordering::Relaxed);
                return Some(frame_id);
            }
        }

        None
    }

    fn remove(&self, frame_id: FrameId) {
        let idx = frame_id.0 as usize;
        if idx < self.num_frames {
            self.reference_bits[idx].store(false, Ordering::Relaxed);
        }
    }
}
