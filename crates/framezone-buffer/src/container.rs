//! Common consumer-side interface of the frame containers.

use framezone_core::Timestamp;

/// Result of a navigation request.
///
/// A miss is the expected outcome when the requested frame is not
/// resident yet (a drop) or lies outside the working zone.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Hit,
    Miss,
}

impl MoveOutcome {
    #[inline]
    pub fn is_hit(self) -> bool {
        self == Self::Hit
    }

    #[inline]
    pub fn is_miss(self) -> bool {
        self == Self::Miss
    }
}

/// What the playback controller needs from whichever container is active.
pub trait FrameContainer {
    /// Advance by `frames` positions.
    fn move_by(&mut self, frames: usize) -> MoveOutcome;

    /// Jump to the first frame at or after `timestamp`.
    fn move_to(&mut self, timestamp: Timestamp) -> MoveOutcome;

    fn contains(&self, timestamp: Timestamp) -> bool;

    fn current_timestamp(&self) -> Option<Timestamp>;

    /// Frames requested but not yet available. Always zero for a cache.
    fn drop_count(&self) -> usize;

    /// Number of resident frames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every resident frame.
    fn clear(&mut self);
}
