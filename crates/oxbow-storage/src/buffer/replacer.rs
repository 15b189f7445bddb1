//! Clock (second-chance) eviction policy for the buffer pool.
//!
//! The clock replacer tracks which frames currently hold an unpinned page
//! and therefore may be evicted. Each candidate frame carries a reference
//! bit; a clock hand sweeps the frame range, clearing reference bits and
//! choosing the first candidate whose bit is already clear. A frame whose
//! bit was cleared during the sweep is remembered as a fallback, so a
//! single sweep always succeeds when any candidate exists.

use oxbow_common::types::FrameId;
use parking_lot::Mutex;

/// Clock replacer state, kept apart from the frames themselves.
///
/// The replacer owns its candidate and reference bits rather than
/// shadowing them in frame metadata; the pool talks to it purely in
/// frame ids.
struct ClockState {
    /// Frames currently eligible for eviction.
    in_replacer: Vec<bool>,
    /// Reference bits, re-raised when a candidate is unpinned again.
    ref_bits: Vec<bool>,
    /// Current position of the clock hand.
    hand: usize,
}

/// Clock-based page replacement over a fixed capacity of frames.
///
/// All state lives behind one internal mutex; the replacer serializes
/// itself and callers never observe a partial sweep.
pub struct ClockReplacer {
    capacity: usize,
    state: Mutex<ClockState>,
}

impl ClockReplacer {
    /// Creates a replacer for `capacity` frames, none of them candidates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(ClockState {
                in_replacer: vec![false; capacity],
                ref_bits: vec![false; capacity],
                hand: 0,
            }),
        }
    }

    /// Selects an unpinned frame to evict.
    ///
    /// Sweeps at most `capacity` positions from the clock hand. A
    /// candidate with a clear reference bit is chosen outright; a
    /// candidate with a raised bit loses the bit and is remembered as
    /// the fallback. If the sweep finds no clear candidate the fallback
    /// (whose bit is now clear) is evicted. Returns `None` only when no
    /// frame is in the replacer at all.
    pub fn victim(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        let mut fallback: Option<usize> = None;

        for i in 0..self.capacity {
            let pos = (state.hand + i) % self.capacity;
            if !state.in_replacer[pos] {
                continue;
            }
            if state.ref_bits[pos] {
                state.ref_bits[pos] = false;
                fallback.get_or_insert(pos);
            } else {
                state.in_replacer[pos] = false;
                state.hand = (pos + 1) % self.capacity;
                return Some(FrameId::new(pos));
            }
        }

        let pos = fallback?;
        state.in_replacer[pos] = false;
        state.hand = (pos + 1) % self.capacity;
        Some(FrameId::new(pos))
    }

    /// Removes a frame from the candidate set.
    ///
    /// Called when a page in the frame gains its first pin, or when the
    /// frame is recycled. Out-of-range ids are ignored; repeated calls
    /// are harmless.
    pub fn pin(&self, frame_id: FrameId) {
        let f = frame_id.index();
        if f >= self.capacity {
            return;
        }
        let mut state = self.state.lock();
        state.in_replacer[f] = false;
    }

    /// Registers a frame as an eviction candidate.
    ///
    /// A frame entering the replacer starts with a clear reference bit;
    /// unpinning a frame that is already a candidate re-raises the bit,
    /// granting it a second chance on the next sweep. Out-of-range ids
    /// are ignored.
    pub fn unpin(&self, frame_id: FrameId) {
        let f = frame_id.index();
        if f >= self.capacity {
            return;
        }
        let mut state = self.state.lock();
        if state.in_replacer[f] {
            state.ref_bits[f] = true;
        } else {
            state.in_replacer[f] = true;
            state.ref_bits[f] = false;
        }
    }

    /// Number of frames currently in the candidate set.
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.in_replacer.iter().filter(|&&c| c).count()
    }
}

impl std::fmt::Debug for ClockReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClockReplacer")
            .field("capacity", &self.capacity)
            .field("hand", &state.hand)
            .field("size", &state.in_replacer.iter().filter(|&&c| c).count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpin_all(replacer: &ClockReplacer, frames: &[usize]) {
        for &f in frames {
            replacer.unpin(FrameId::new(f));
        }
    }

    #[test]
    fn test_empty_replacer() {
        let replacer = ClockReplacer::new(4);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_victim_in_clock_order() {
        let replacer = ClockReplacer::new(7);
        unpin_all(&replacer, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(replacer.size(), 6);

        assert_eq!(replacer.victim(), Some(FrameId::new(1)));

        // Re-registering frame 1 puts it behind the hand; the sweep
        // continues with 2 and 3.
        replacer.unpin(FrameId::new(1));
        assert_eq!(replacer.victim(), Some(FrameId::new(2)));
        assert_eq!(replacer.victim(), Some(FrameId::new(3)));

        // A pinned frame is skipped.
        replacer.pin(FrameId::new(4));
        assert_eq!(replacer.victim(), Some(FrameId::new(5)));
    }

    #[test]
    fn test_second_chance() {
        let replacer = ClockReplacer::new(3);
        unpin_all(&replacer, &[0, 1, 2]);
        // A second unpin re-raises frame 0's reference bit.
        replacer.unpin(FrameId::new(0));

        // The sweep clears 0's bit and takes 1, the first clear candidate.
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        // The hand resumes at 2; frame 0's bit stays clear until its turn.
        assert_eq!(replacer.victim(), Some(FrameId::new(2)));
        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_all_referenced_falls_back() {
        let replacer = ClockReplacer::new(3);
        unpin_all(&replacer, &[0, 1, 2]);
        // Raise every reference bit.
        unpin_all(&replacer, &[0, 1, 2]);

        // One clearing pass, then the first remembered position.
        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
        assert_eq!(replacer.size(), 2);
    }

    #[test]
    fn test_pin_is_idempotent() {
        let replacer = ClockReplacer::new(4);
        unpin_all(&replacer, &[0, 1]);

        replacer.pin(FrameId::new(0));
        replacer.pin(FrameId::new(0));
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_out_of_range_ignored() {
        let replacer = ClockReplacer::new(2);
        replacer.unpin(FrameId::new(9));
        replacer.pin(FrameId::new(9));
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_hand_wraps_around() {
        let replacer = ClockReplacer::new(3);
        unpin_all(&replacer, &[0, 1, 2]);

        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        assert_eq!(replacer.victim(), Some(FrameId::new(2)));

        // Hand is past the end; a fresh candidate is still found.
        replacer.unpin(FrameId::new(1));
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
    }
}
