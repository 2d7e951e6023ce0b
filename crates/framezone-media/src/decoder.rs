//! Synthetic video decoder.
//!
//! Produces test-pattern frames on the frame grid of a [`VideoInfo`], the
//! way a real decoder would produce pictures: sequentially from the last
//! seek point, one frame per call.

use crate::pool::FramePool;
use framezone_core::{Frame, FrameZoneError, Result, TimeRange, Timestamp, VideoInfo};
use std::sync::Arc;
use tracing::{debug, info};

/// A decoder over a synthetic stream.
pub struct VideoDecoder {
    info: VideoInfo,
    next_index: i64,
    pool: Arc<FramePool>,
}

impl VideoDecoder {
    /// Open a synthetic stream described by `info`.
    pub fn open(info: VideoInfo, pool: Arc<FramePool>) -> Result<Self> {
        if info.frame_count <= 0 || info.timestamps_per_second <= 0 {
            return Err(FrameZoneError::Decoder(format!(
                "empty stream: {} frames, {} timestamps per second",
                info.frame_count, info.timestamps_per_second
            )));
        }
        if info.frame_rate.numerator == 0 || info.frame_rate.denominator == 0 {
            return Err(FrameZoneError::Decoder(format!(
                "invalid frame rate {}/{}",
                info.frame_rate.numerator, info.frame_rate.denominator
            )));
        }

        info!(
            width = info.width,
            height = info.height,
            frames = info.frame_count,
            rate = %info.frame_rate,
            "Opening synthetic stream"
        );
        Ok(Self {
            info,
            next_index: 0,
            pool,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn pool(&self) -> &Arc<FramePool> {
        &self.pool
    }

    /// Timestamp of the frame the next read returns.
    pub fn position(&self) -> Timestamp {
        self.info.timestamp_of(self.next_index)
    }

    /// Decode the next frame. `None` at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.next_index >= self.info.frame_count {
            return Ok(None);
        }

        let index = self.next_index;
        let mut image = self
            .pool
            .acquire(self.info.width, self.info.height, self.info.pixel_format);
        image.paint_test_pattern(index as u64);
        self.next_index += 1;

        Ok(Some(Frame::new(image, self.info.timestamp_of(index))))
    }

    /// Decode the next frame of `zone`, looping back to its start after
    /// its end.
    pub fn read_in_zone(&mut self, zone: TimeRange) -> Result<Frame> {
        let position = self.position();
        if self.next_index >= self.info.frame_count || !zone.contains(position) {
            self.seek_at_or_after(zone.start)?;
        }

        let frame = self.read_frame()?.ok_or_else(|| {
            FrameZoneError::Decoder(format!("working zone {} has no frame", zone))
        })?;
        if !zone.contains(frame.timestamp()) {
            return Err(FrameZoneError::Decoder(format!(
                "working zone {} has no frame",
                zone
            )));
        }
        Ok(frame)
    }

    /// Position on the frame holding `timestamp`.
    pub fn seek(&mut self, timestamp: Timestamp) -> Result<()> {
        let timeline = self.info.timeline();
        if !timeline.contains(timestamp) {
            return Err(FrameZoneError::InvalidParameter(format!(
                "timestamp {} outside stream {}",
                timestamp, timeline
            )));
        }

        self.next_index = self.info.index_of(timestamp);
        debug!(timestamp, index = self.next_index, "Seeked");
        Ok(())
    }

    /// Position on the first frame at or after `timestamp`.
    pub fn seek_at_or_after(&mut self, timestamp: Timestamp) -> Result<()> {
        self.seek(timestamp)?;
        if self.position() < timestamp {
            self.next_index += 1;
        }
        Ok(())
    }
}
