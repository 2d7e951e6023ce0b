//! Bounded frame buffer filled by a decoding thread.
//!
//! The prebuffer anticipates frames from the future and remembers a few
//! from the past. Its content (the *segment*) is a contiguous run of the
//! working zone, except that it may wrap over the end of the zone when
//! playback loops.
//!
//! # Threading
//!
//! One producer (the decoder) calls [`PreBuffer::add`], which blocks while
//! the buffer is full. One consumer (the playback driver) navigates with
//! [`PreBuffer::move_by`] and [`PreBuffer::move_to`], which never wait for
//! the producer: a frame that is not there yet is a drop, not a stall.
//! Every eviction notifies the condition variable so a blocked producer
//! resumes.
//!
//! Cancellation belongs to the producer: its owner calls [`PreBuffer::clear`]
//! or [`PreBuffer::unblock_and_make_room`] to wake it, and the producer
//! checks its own stop flag.

use crate::container::{FrameContainer, MoveOutcome};
use crate::releaser::FrameReleaser;
use crate::ring::FrameRing;
use framezone_core::{BufferConfig, Frame, Result, TimeRange, Timestamp};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::{debug, trace};

/// Frames kept free by [`PreBuffer::unblock_and_make_room`]: one for the
/// push that wakes the producer, one so the next push does not block.
const UNBLOCK_SLACK: usize = 2;

/// Bounded, asynchronously filled frame buffer over a working zone.
pub struct PreBuffer {
    state: Mutex<PreBufferState>,
    space_available: Condvar,
    releaser: Arc<dyn FrameReleaser>,
}

struct PreBufferState {
    frames: FrameRing,
    current: Option<usize>,
    drops: usize,
    segment: Option<TimeRange>,
    working_zone: TimeRange,
    total_capacity: usize,
    old_frames_capacity: usize,
}

impl PreBuffer {
    /// Create an empty prebuffer for `working_zone`.
    pub fn new(
        config: &BufferConfig,
        working_zone: TimeRange,
        releaser: Arc<dyn FrameReleaser>,
    ) -> Result<Self> {
        config.validate()?;
        debug!(
            total = config.total_capacity,
            old = config.old_frames_capacity,
            zone = %working_zone,
            "Creating prebuffer"
        );
        Ok(Self {
            state: Mutex::new(PreBufferState {
                frames: FrameRing::new(),
                current: None,
                drops: 0,
                segment: None,
                working_zone,
                total_capacity: config.total_capacity,
                old_frames_capacity: config.old_frames_capacity,
            }),
            space_available: Condvar::new(),
            releaser,
        })
    }

    /// Push a decoded frame. Blocks while the buffer is full.
    ///
    /// The frame is stored before waiting, so a producer woken by
    /// [`clear`](Self::clear) gets to check for cancellation before it
    /// decodes and pushes another frame.
    pub fn add(&self, frame: Frame) {
        let mut state = self.state.lock();
        trace!(timestamp = frame.timestamp(), len = state.frames.len() + 1, "Pushing frame");
        state.frames.push_back(frame);
        state.update_segment();
        while state.frames.len() >= state.total_capacity {
            self.space_available.wait(&mut state);
        }
    }

    /// Advance by `frames` positions without waiting for the decoder.
    ///
    /// Pending drops are added to the request. When the target is not
    /// buffered yet, the current frame becomes the last available one and
    /// the shortfall is recorded as drops.
    pub fn move_by(&self, frames: usize) -> MoveOutcome {
        let mut state = self.state.lock();
        let outcome = state.move_by(frames);
        self.forget_old_frames(&mut state);
        outcome
    }

    /// Make the first frame at or after `timestamp` current.
    ///
    /// Misses without touching the position when the timestamp is outside
    /// the buffered segment.
    pub fn move_to(&self, timestamp: Timestamp) -> MoveOutcome {
        let mut state = self.state.lock();
        state.drops = 0;

        if !state.contains(timestamp) {
            return MoveOutcome::Miss;
        }
        if state.current_timestamp() == Some(timestamp) {
            return MoveOutcome::Hit;
        }

        state.current = state.frames.position_at_or_after(timestamp);
        self.forget_old_frames(&mut state);
        MoveOutcome::Hit
    }

    /// Whether `timestamp` is inside the buffered segment.
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.state.lock().contains(timestamp)
    }

    /// Whether `move_by(skip + 1)` would land on a buffered frame.
    pub fn has_next(&self, skip: usize) -> bool {
        let state = self.state.lock();
        state.requested_index(skip + 1) < state.frames.len() as i64
    }

    /// A jump back to the zone start while the zone end is buffered.
    ///
    /// The buffer stays contiguous across such a jump, so it need not be
    /// cleared.
    pub fn is_rollover_jump(&self, timestamp: Timestamp) -> bool {
        let state = self.state.lock();
        timestamp == state.working_zone.start && state.contains(state.working_zone.end)
    }

    /// Drop every frame outside the (narrowed) working zone.
    pub fn purge_outsiders(&self) {
        let mut state = self.state.lock();
        let zone = state.working_zone;
        debug!(zone = %zone, "Purging frames outside the working zone");

        let removed = state
            .frames
            .release_where(|frame| zone.contains(frame.timestamp()), &*self.releaser);
        if let Some(current) = state.current {
            let removed_before = removed.iter().take_while(|&&i| i < current).count();
            state.current = Some(current - removed_before);
        }
        state.clamp_current();
        state.update_segment();
        self.space_available.notify_one();
    }

    /// Evict old frames until a blocked producer can push twice without
    /// blocking.
    ///
    /// Used to suspend prebuffering without a full clear: the decoding
    /// thread wakes up, notices it was cancelled and exits, and the next
    /// push (from whoever decodes synchronously) does not block either.
    pub fn unblock_and_make_room(&self) {
        let mut state = self.state.lock();
        let target = state.total_capacity.saturating_sub(UNBLOCK_SLACK);
        let excess = state.frames.len().saturating_sub(target);
        debug!(excess, "Unblocking prebuffering thread and making room");

        if excess > 0 {
            state.frames.release_front(excess, &*self.releaser);
            // An evicted current frame leaves the position before the first
            // frame, so the next move lands on the frame that followed it.
            state.current = state.current.and_then(|c| c.checked_sub(excess));
            state.clamp_current();
            state.update_segment();
        }
        self.space_available.notify_one();
    }

    /// Shrink the working zone while keeping the frames still inside it.
    pub fn narrow_working_zone(&self, zone: TimeRange) {
        self.state.lock().working_zone = zone;
        self.purge_outsiders();
    }

    /// Assign a new working zone, clearing any buffered frames first.
    pub fn update_working_zone(&self, zone: TimeRange) {
        let mut state = self.state.lock();
        if !state.frames.is_empty() {
            self.clear_locked(&mut state);
        }
        debug!(zone = %zone, "Prebuffer working zone updated");
        state.working_zone = zone;
    }

    /// Release every frame, reset counters and wake the producer.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        self.clear_locked(&mut state);
    }

    /// Forget pending drops.
    pub fn reset_drops(&self) {
        self.state.lock().drops = 0;
    }

    /// Run `f` on the current frame while it is guaranteed resident.
    pub fn with_current<R>(&self, f: impl FnOnce(&Frame) -> R) -> Option<R> {
        let state = self.state.lock();
        let frame = state.frames.get(state.current?)?;
        Some(f(frame))
    }

    pub fn current_timestamp(&self) -> Option<Timestamp> {
        self.state.lock().current_timestamp()
    }

    /// Storage index of the current frame.
    pub fn current_index(&self) -> Option<usize> {
        self.state.lock().current
    }

    pub fn drop_count(&self) -> usize {
        self.state.lock().drops
    }

    /// Range of buffered timestamps, `None` when empty.
    pub fn segment(&self) -> Option<TimeRange> {
        self.state.lock().segment
    }

    pub fn working_zone(&self) -> TimeRange {
        self.state.lock().working_zone
    }

    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().frames.is_empty()
    }

    pub fn total_capacity(&self) -> usize {
        self.state.lock().total_capacity
    }

    pub fn old_frames_capacity(&self) -> usize {
        self.state.lock().old_frames_capacity
    }

    /// Buffered timestamps in time order, for diagnostics.
    pub fn sorted_timestamps(&self) -> Vec<Timestamp> {
        let state = self.state.lock();
        state.frames.iter_sorted().map(Frame::timestamp).collect()
    }

    /// Keep at most `old_frames_capacity` frames behind the current one.
    fn forget_old_frames(&self, state: &mut PreBufferState) {
        let Some(current) = state.current else {
            return;
        };
        if current <= state.old_frames_capacity {
            return;
        }

        let forget = current - state.old_frames_capacity;
        trace!(forget, "Forgetting old frames");
        state.frames.release_front(forget, &*self.releaser);
        state.current = Some(current - forget);
        state.update_segment();
        self.space_available.notify_one();
    }

    fn clear_locked(&self, state: &mut PreBufferState) {
        debug!(len = state.frames.len(), "Clearing prebuffer");
        state.frames.release_all(&*self.releaser);
        state.current = None;
        state.drops = 0;
        state.segment = None;
        self.space_available.notify_one();
    }
}

impl PreBufferState {
    /// Index `frames` positions ahead of the current one, pending drops
    /// included. `-1` stands for "before the first frame".
    fn requested_index(&self, frames: usize) -> i64 {
        let base = self.current.map_or(-1, |c| c as i64);
        base + self.drops as i64 + frames as i64
    }

    fn move_by(&mut self, frames: usize) -> MoveOutcome {
        let requested = self.requested_index(frames);
        if requested < 0 {
            return MoveOutcome::Miss;
        }
        let last = self.frames.len() as i64 - 1;

        if !self.frames.is_empty() && requested <= last {
            self.current = Some(requested as usize);
            self.drops = 0;
            return MoveOutcome::Hit;
        }

        self.drops = (requested - last).max(0) as usize;
        if !self.frames.is_empty() {
            self.current = Some(last as usize);
        }
        trace!(drops = self.drops, "Decoding drop");
        MoveOutcome::Miss
    }

    fn contains(&self, timestamp: Timestamp) -> bool {
        self.segment
            .is_some_and(|segment| segment.contains_within(timestamp, self.working_zone))
    }

    fn current_timestamp(&self) -> Option<Timestamp> {
        self.frames.timestamp(self.current?)
    }

    fn update_segment(&mut self) {
        self.segment = self.frames.segment();
    }

    /// Bring `current` back inside the storage after a removal.
    fn clamp_current(&mut self) {
        let len = self.frames.len();
        if len == 0 {
            self.current = None;
            return;
        }
        if let Some(current) = self.current {
            debug_assert!(current <= len, "current index {current} far out of {len} frames");
            self.current = Some(current.min(len - 1));
        }
    }
}

impl Drop for PreBuffer {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.frames.release_all(&*self.releaser);
        state.current = None;
        state.segment = None;
    }
}

impl FrameContainer for Arc<PreBuffer> {
    fn move_by(&mut self, frames: usize) -> MoveOutcome {
        self.as_ref().move_by(frames)
    }

    fn move_to(&mut self, timestamp: Timestamp) -> MoveOutcome {
        self.as_ref().move_to(timestamp)
    }

    fn contains(&self, timestamp: Timestamp) -> bool {
        self.as_ref().contains(timestamp)
    }

    fn current_timestamp(&self) -> Option<Timestamp> {
        self.as_ref().current_timestamp()
    }

    fn drop_count(&self) -> usize {
        self.as_ref().drop_count()
    }

    fn len(&self) -> usize {
        self.as_ref().len()
    }

    fn clear(&mut self) {
        self.as_ref().clear()
    }
}
