//! Description of a video stream, as far as buffering cares.

use crate::frame::PixelFormat;
use crate::time::{FrameRate, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};

/// Geometry and timing of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Reference width in pixels
    pub width: u32,
    /// Reference height in pixels
    pub height: u32,
    /// Format frames are decoded to
    pub pixel_format: PixelFormat,
    pub frame_rate: FrameRate,
    /// Time base of the stream's timestamps
    pub timestamps_per_second: i64,
    /// Timestamp of the first frame
    pub first_timestamp: Timestamp,
    /// Number of frames in the stream
    pub frame_count: i64,
}

impl VideoInfo {
    /// Average distance between two frames, rounded to whole units.
    pub fn average_timestamps_per_frame(&self) -> i64 {
        self.frame_rate
            .timestamps_per_frame(self.timestamps_per_second)
            .round()
            .to_integer()
            .max(1)
    }

    /// Timestamp of frame `index`.
    pub fn timestamp_of(&self, index: i64) -> Timestamp {
        let offset = self.frame_rate.timestamps_per_frame(self.timestamps_per_second) * index;
        self.first_timestamp + offset.floor().to_integer()
    }

    /// Frame index holding `timestamp` (the frame at or before it).
    pub fn index_of(&self, timestamp: Timestamp) -> i64 {
        let per_frame = self.frame_rate.timestamps_per_frame(self.timestamps_per_second);
        let relative = num_rational::Rational64::from_integer(timestamp - self.first_timestamp);
        (relative / per_frame).floor().to_integer()
    }

    /// Range from the first to the last frame timestamp.
    pub fn timeline(&self) -> TimeRange {
        TimeRange::new(
            self.first_timestamp,
            self.timestamp_of((self.frame_count - 1).max(0)),
        )
    }

    /// Number of frames of the stream inside `zone`.
    pub fn zone_frame_count(&self, zone: TimeRange) -> i64 {
        if zone.is_wrapped() {
            let timeline = self.timeline();
            return self.frames_between(zone.start, timeline.end)
                + self.frames_between(timeline.start, zone.end);
        }
        self.frames_between(zone.start, zone.end)
    }

    fn frames_between(&self, start: Timestamp, end: Timestamp) -> i64 {
        if end < start {
            return 0;
        }
        let mut first = self.index_of(start).max(0);
        if self.timestamp_of(first) < start {
            first += 1;
        }
        let last = self.index_of(end).min(self.frame_count - 1);
        (last - first + 1).max(0)
    }

    /// Bytes needed by one decoded frame at the reference size.
    pub fn frame_bytes(&self) -> usize {
        self.pixel_format.frame_size(self.width, self.height)
    }

    /// Estimated memory in megabytes to hold every frame of a plain zone.
    pub fn zone_megabytes(&self, zone: TimeRange) -> f64 {
        let seconds = zone.duration() as f64 / self.timestamps_per_second as f64;
        let frame_megabytes = self.frame_bytes() as f64 / 1_048_576.0;
        seconds * self.frame_rate.to_fps_f64() * frame_megabytes
    }
}
