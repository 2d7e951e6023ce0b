//! Insertion-ordered frame storage with an explicit wrap index.
//!
//! Frames are stored in the order they were decoded. When the working zone
//! loops, timestamps drop once inside the storage: `[7, 8, 9, 0, 1]`. The
//! index right after that drop (3 here) is kept up to date on every
//! mutation so timestamp-ordered scans never have to search for it.

use crate::releaser::FrameReleaser;
use framezone_core::{Frame, TimeRange, Timestamp};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub(crate) struct FrameRing {
    frames: VecDeque<Frame>,
    /// Index of the first frame after the timestamp discontinuity.
    wrap: Option<usize>,
}

impl FrameRing {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    #[inline]
    pub(crate) fn timestamp(&self, index: usize) -> Option<Timestamp> {
        self.frames.get(index).map(Frame::timestamp)
    }

    /// Storage index where timestamp order starts.
    #[inline]
    pub(crate) fn wrap_index(&self) -> usize {
        self.wrap.unwrap_or(0)
    }

    /// First to last stored timestamp. Wrapped when the storage wraps.
    pub(crate) fn segment(&self) -> Option<TimeRange> {
        let first = self.frames.front()?.timestamp();
        let last = self.frames.back()?.timestamp();
        Some(TimeRange::new(first, last))
    }

    pub(crate) fn push_back(&mut self, frame: Frame) {
        if self.wrap.is_none() {
            if let Some(last) = self.frames.back() {
                if frame.timestamp() < last.timestamp() {
                    self.wrap = Some(self.frames.len());
                }
            }
        }
        self.frames.push_back(frame);
    }

    /// Insert at `index`, updating the wrap index from the new frame's
    /// neighbours only.
    pub(crate) fn insert(&mut self, index: usize, frame: Frame) {
        self.frames.insert(index, frame);
        // A discontinuity right at `index` now straddles the new frame.
        let shifted = match self.wrap {
            Some(wrap) if wrap > index => Some(wrap + 1),
            Some(wrap) if wrap < index => Some(wrap),
            _ => None,
        };
        let local = self.descent_around(index);
        self.wrap = match (shifted, local) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    /// Release the `count` oldest frames.
    pub(crate) fn release_front(&mut self, count: usize, releaser: &dyn FrameReleaser) {
        let count = count.min(self.frames.len());
        for frame in self.frames.drain(..count) {
            releaser.release(frame);
        }
        match self.wrap {
            Some(wrap) if wrap > count => self.wrap = Some(wrap - count),
            Some(_) => self.rescan_wrap(),
            None => {}
        }
    }

    /// Release every frame rejected by `keep`.
    ///
    /// Returns the storage indices (before removal) of the released frames,
    /// in increasing order.
    pub(crate) fn release_where<F>(&mut self, keep: F, releaser: &dyn FrameReleaser) -> Vec<usize>
    where
        F: Fn(&Frame) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.frames.len());
        for (index, frame) in self.frames.drain(..).enumerate() {
            if keep(&frame) {
                kept.push_back(frame);
            } else {
                removed.push(index);
                releaser.release(frame);
            }
        }
        self.frames = kept;
        self.rescan_wrap();
        removed
    }

    pub(crate) fn release_all(&mut self, releaser: &dyn FrameReleaser) {
        for frame in self.frames.drain(..) {
            releaser.release(frame);
        }
        self.wrap = None;
    }

    /// Storage indices in timestamp order: `[7, 8, 9, 0, 1]` yields
    /// the indices of `[0, 1, 7, 8, 9]`.
    pub(crate) fn sorted_indices(&self) -> impl Iterator<Item = usize> + '_ {
        let len = self.frames.len();
        let wrap = self.wrap_index();
        (0..len).map(move |i| (i + wrap) % len)
    }

    /// First storage index, in timestamp order, whose timestamp is at or
    /// after `target`. Falls back to the latest frame when none is.
    pub(crate) fn position_at_or_after(&self, target: Timestamp) -> Option<usize> {
        let mut last = None;
        for index in self.sorted_indices() {
            if self.frames[index].timestamp() >= target {
                return Some(index);
            }
            last = Some(index);
        }
        last
    }

    /// Exchange the pictures of two frames, leaving timestamps in place.
    pub(crate) fn swap_images(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let slice = self.frames.make_contiguous();
        let (left, right) = slice.split_at_mut(high);
        left[low].swap_images(&mut right[0]);
    }

    pub(crate) fn iter_sorted(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.sorted_indices().map(move |i| &self.frames[i])
    }

    /// First index among `index` and `index + 1` whose timestamp is below
    /// its predecessor's.
    fn descent_around(&self, index: usize) -> Option<usize> {
        [index, index + 1].into_iter().find(|&i| {
            i > 0 && i < self.frames.len() && self.frames[i].timestamp() < self.frames[i - 1].timestamp()
        })
    }

    fn rescan_wrap(&mut self) {
        self.wrap = self
            .frames
            .iter()
            .zip(self.frames.iter().skip(1))
            .position(|(prev, next)| next.timestamp() < prev.timestamp())
            .map(|i| i + 1);
    }
}
