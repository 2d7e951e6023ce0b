//! Timestamps, frame rates and wrap-aware time ranges.
//!
//! Timestamps are integers in the time base of the source video. A range
//! whose end lies before its start is *wrapped*: it runs from `start` to the
//! end of the enclosing timeline, then from the timeline start to `end`.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A presentation timestamp in source time-base units.
pub type Timestamp = i64;

/// An inclusive timestamp interval, possibly wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// First timestamp (inclusive)
    pub start: Timestamp,
    /// Last timestamp (inclusive)
    pub end: Timestamp,
}

impl TimeRange {
    #[inline]
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// True when the range crosses the loop point of its timeline.
    #[inline]
    pub fn is_wrapped(self) -> bool {
        self.end < self.start
    }

    /// Containment without knowledge of the enclosing timeline.
    ///
    /// For a wrapped range everything at or after `start` and everything at
    /// or before `end` is inside.
    #[inline]
    pub fn contains(self, t: Timestamp) -> bool {
        if self.is_wrapped() {
            t >= self.start || t <= self.end
        } else {
            t >= self.start && t <= self.end
        }
    }

    /// Containment bounded by the timeline the range lives in.
    ///
    /// A wrapped range covers `[timeline.start, end] ∪ [start, timeline.end]`.
    pub fn contains_within(self, t: Timestamp, timeline: TimeRange) -> bool {
        if self.is_wrapped() {
            let post_wrap = t >= timeline.start && t <= self.end;
            let pre_wrap = t >= self.start && t <= timeline.end;
            post_wrap || pre_wrap
        } else {
            self.contains(t)
        }
    }

    /// Distance from start to end. Zero for wrapped ranges, whose length
    /// depends on the timeline.
    #[inline]
    pub fn duration(self) -> Timestamp {
        if self.is_wrapped() {
            0
        } else {
            self.end - self.start
        }
    }

    /// Check if two plain ranges overlap.
    pub fn overlaps(self, other: Self) -> bool {
        !self.is_wrapped()
            && !other.is_wrapped()
            && self.start <= other.end
            && other.start <= self.end
    }

    /// Intersection of two plain ranges, if any.
    pub fn intersection(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self::new(
            self.start.max(other.start),
            self.end.min(other.end),
        ))
    }

    /// Whether `other` lies entirely inside this plain range.
    pub fn encloses(self, other: Self) -> bool {
        if self.is_wrapped() {
            return false;
        }
        self.contains(other.start) && self.contains(other.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wrapped() {
            write!(f, "[{}, {}] (wrapped)", self.start, self.end)
        } else {
            write!(f, "[{}, {}]", self.start, self.end)
        }
    }
}

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Exact number of timestamp units between two frames.
    pub fn timestamps_per_frame(self, timestamps_per_second: i64) -> Rational64 {
        Rational64::new(
            timestamps_per_second * self.denominator as i64,
            self.numerator as i64,
        )
    }

    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_25
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}
