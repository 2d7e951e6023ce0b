//! Fully materialized working zone with random access.
//!
//! Used instead of a [`PreBuffer`](crate::PreBuffer) when every frame of the
//! zone fits in the memory budget. The cache is filled in one import pass
//! on a worker thread, then used from the playback thread only; it is
//! `Send` but takes `&mut self` for every mutation and has no lock.

use crate::container::{FrameContainer, MoveOutcome};
use crate::releaser::FrameReleaser;
use crate::ring::FrameRing;
use framezone_core::{Frame, FrameBuffer, TimeRange, Timestamp};
use std::sync::Arc;
use tracing::debug;

pub struct FrameCache {
    frames: FrameRing,
    current: Option<usize>,
    working_zone: Option<TimeRange>,
    prepending: bool,
    insert_index: usize,
    releaser: Arc<dyn FrameReleaser>,
}

impl FrameCache {
    pub fn new(releaser: Arc<dyn FrameReleaser>) -> Self {
        Self {
            frames: FrameRing::new(),
            current: None,
            working_zone: None,
            prepending: false,
            insert_index: 0,
            releaser,
        }
    }

    /// Store a frame.
    ///
    /// In prepend mode each frame goes right after the previously prepended
    /// one, so a block can be imported in increasing time order in front of
    /// the existing content.
    pub fn add(&mut self, frame: Frame) {
        if self.prepending {
            self.frames.insert(self.insert_index, frame);
            if let Some(current) = self.current {
                if current >= self.insert_index {
                    self.current = Some(current + 1);
                }
            }
            self.insert_index += 1;
        } else {
            self.frames.push_back(frame);
        }
        self.update_working_zone();
    }

    /// Toggle prepend mode. Resets the insertion cursor to the front.
    pub fn set_prepend_block(&mut self, enabled: bool) {
        self.prepending = enabled;
        self.insert_index = 0;
    }

    /// Advance by `frames`. Misses, without moving, past the last frame.
    pub fn move_by(&mut self, frames: usize) -> MoveOutcome {
        let base = self.current.map_or(-1, |c| c as i64);
        let requested = base + frames as i64;
        if requested < 0 || requested >= self.frames.len() as i64 {
            return MoveOutcome::Miss;
        }
        self.current = Some(requested as usize);
        MoveOutcome::Hit
    }

    /// Make the first frame at or after `timestamp` current.
    pub fn move_to(&mut self, timestamp: Timestamp) -> MoveOutcome {
        if !self.contains(timestamp) {
            return MoveOutcome::Miss;
        }
        if self.current_timestamp() == Some(timestamp) {
            return MoveOutcome::Hit;
        }
        self.current = self.frames.position_at_or_after(timestamp);
        MoveOutcome::Hit
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.working_zone
            .is_some_and(|zone| zone.contains(timestamp))
    }

    /// A jump back to the zone start: contiguous when the zone end is held.
    pub fn is_rollover_jump(&self, timestamp: Timestamp) -> bool {
        self.working_zone
            .is_some_and(|zone| timestamp == zone.start && self.contains(zone.end))
    }

    /// Release every frame outside `zone`, keeping the position on the
    /// same frame when it survives.
    pub fn reduce_working_zone(&mut self, zone: TimeRange) {
        debug!(from = ?self.working_zone, to = %zone, "Reducing cached working zone");
        let removed = self
            .frames
            .release_where(|frame| zone.contains(frame.timestamp()), &*self.releaser);

        if let Some(current) = self.current {
            let removed_before = removed.iter().take_while(|&&i| i < current).count();
            self.current = Some(current - removed_before);
        }
        self.clamp_current();
        self.update_working_zone();
    }

    /// Reverse the order of the pictures, leaving timestamps in place.
    pub fn revert(&mut self) {
        let len = self.frames.len();
        for i in 0..len / 2 {
            self.frames.swap_images(i, len - 1 - i);
        }
    }

    /// The middle picture, as a preview of zone-wide operations.
    pub fn representative(&self) -> Option<&FrameBuffer> {
        self.frames.get(self.frames.len() / 2).map(Frame::image)
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.get(self.current?)
    }

    pub fn current_timestamp(&self) -> Option<Timestamp> {
        self.current().map(Frame::timestamp)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Bounds of the cached frames, `None` when empty.
    pub fn working_zone(&self) -> Option<TimeRange> {
        self.working_zone
    }

    /// Pictures in timestamp order.
    pub fn images(&self) -> impl Iterator<Item = &FrameBuffer> + '_ {
        self.frames.iter_sorted().map(Frame::image)
    }

    /// Frames in timestamp order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.frames.iter_sorted()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Estimated pixel memory held, in bytes.
    pub fn memory_size(&self) -> usize {
        self.images().map(FrameBuffer::memory_size).sum()
    }

    pub fn clear(&mut self) {
        debug!(len = self.frames.len(), "Clearing frame cache");
        self.frames.release_all(&*self.releaser);
        self.current = None;
        self.working_zone = None;
        self.insert_index = 0;
    }

    fn update_working_zone(&mut self) {
        self.working_zone = self.frames.segment();
    }

    fn clamp_current(&mut self) {
        let len = self.frames.len();
        if len == 0 {
            self.current = None;
        } else if let Some(current) = self.current {
            debug_assert!(current <= len, "current index {current} far out of {len} frames");
            self.current = Some(current.min(len - 1));
        }
    }
}

impl Drop for FrameCache {
    fn drop(&mut self) {
        self.frames.release_all(&*self.releaser);
    }
}

impl FrameContainer for FrameCache {
    fn move_by(&mut self, frames: usize) -> MoveOutcome {
        FrameCache::move_by(self, frames)
    }

    fn move_to(&mut self, timestamp: Timestamp) -> MoveOutcome {
        FrameCache::move_to(self, timestamp)
    }

    fn contains(&self, timestamp: Timestamp) -> bool {
        FrameCache::contains(self, timestamp)
    }

    fn current_timestamp(&self) -> Option<Timestamp> {
        FrameCache::current_timestamp(self)
    }

    fn drop_count(&self) -> usize {
        0
    }

    fn len(&self) -> usize {
        FrameCache::len(self)
    }

    fn clear(&mut self) {
        FrameCache::clear(self)
    }
}
