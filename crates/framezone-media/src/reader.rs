//! Video reader: one decoder, two containers, and the policy between them.
//!
//! A working zone that fits in the memory budget is imported whole into a
//! [`FrameCache`]; anything larger streams through a [`PreBuffer`] fed by a
//! [`PreBufferingThread`]. The reader owns the decoder while no thread is
//! running and lends it to the thread otherwise.

use crate::decoder::VideoDecoder;
use crate::pool::FramePool;
use crate::worker::{DecoderEvent, PreBufferingThread};
use crossbeam_channel::{Receiver, Sender};
use framezone_buffer::{
    choose_strategy, BufferingStrategy, FrameCache, FrameContainer, FrameReleaser, MoveOutcome,
    PreBuffer,
};
use framezone_core::{
    BufferConfig, Frame, FrameBuffer, FrameZoneError, Result, TimeRange, Timestamp, VideoInfo,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where frames currently come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodingMode {
    /// No working zone yet
    #[default]
    Idle,
    /// Streaming through the prebuffer
    PreBuffering,
    /// Whole working zone in the cache
    Caching,
}

pub struct VideoReader {
    config: BufferConfig,
    info: VideoInfo,
    pool: Arc<FramePool>,
    /// `None` while lent to the prebuffering thread.
    decoder: Option<VideoDecoder>,
    worker: Option<PreBufferingThread>,
    prebuffer: Arc<PreBuffer>,
    cache: FrameCache,
    mode: DecodingMode,
    working_zone: Option<TimeRange>,
    events_tx: Sender<DecoderEvent>,
    events_rx: Receiver<DecoderEvent>,
}

impl VideoReader {
    /// Open a reader over the stream described by `info`.
    pub fn new(info: VideoInfo, config: BufferConfig) -> Result<Self> {
        config.validate()?;
        let pool = Arc::new(FramePool::new(config.pool_size));
        let decoder = VideoDecoder::open(info, pool.clone())?;
        let prebuffer = PreBuffer::new(&config, info.timeline(), pool.clone())?;
        let cache = FrameCache::new(pool.clone());
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        info!(timeline = %info.timeline(), "Video reader ready");
        Ok(Self {
            config,
            info,
            pool,
            decoder: Some(decoder),
            worker: None,
            prebuffer: Arc::new(prebuffer),
            cache,
            mode: DecodingMode::Idle,
            working_zone: None,
            events_tx,
            events_rx,
        })
    }

    /// Switch to `zone`, choosing the container it fits in.
    ///
    /// The zone is first clipped to the stream. Returns the strategy in use
    /// afterwards.
    pub fn update_working_zone(&mut self, zone: TimeRange) -> Result<BufferingStrategy> {
        let timeline = self.info.timeline();
        let zone = zone.intersection(timeline).ok_or_else(|| {
            FrameZoneError::InvalidParameter(format!("working zone {zone} outside stream {timeline}"))
        })?;

        let strategy = choose_strategy(zone, &self.info, &self.config);
        info!(zone = %zone, ?strategy, "Updating working zone");

        match strategy {
            BufferingStrategy::Cache => {
                self.stop_prebuffering()?;
                if self.mode != DecodingMode::Caching {
                    self.prebuffer.clear();
                }
                if let Err(e) = self.import_to_cache(zone) {
                    warn!(zone = %zone, error = %e, "Caching failed, prebuffering instead");
                    self.cache.clear();
                    self.mode = DecodingMode::Idle;
                    self.working_zone = None;
                    self.switch_to_prebuffering(zone, None)?;
                    return Ok(BufferingStrategy::PreBuffer);
                }
                self.mode = DecodingMode::Caching;
                self.working_zone = self.cache.working_zone().or(Some(zone));
            }
            BufferingStrategy::PreBuffer => {
                // Read before the thread stops: stopping may evict the
                // current frame to make room.
                let resume_at = self.current_timestamp();
                self.switch_to_prebuffering(zone, resume_at)?;
            }
        }
        Ok(strategy)
    }

    /// Advance by `skip + 1` frames.
    ///
    /// When prebuffering and the frame is not decoded yet, `decode_if_necessary`
    /// decodes it synchronously instead of recording a drop.
    pub fn move_next(&mut self, skip: usize, decode_if_necessary: bool) -> Result<MoveOutcome> {
        match self.mode {
            DecodingMode::Idle => Ok(MoveOutcome::Miss),
            DecodingMode::Caching => Ok(self.cache.move_by(skip + 1)),
            DecodingMode::PreBuffering => {
                if decode_if_necessary && !self.prebuffer.has_next(skip) {
                    self.stop_prebuffering()?;
                    let filled = self.fill_until_next(skip);
                    self.start_prebuffering()?;
                    filled?;
                }
                Ok(self.prebuffer.move_by(skip + 1))
            }
        }
    }

    /// Make the first frame at or after `timestamp` current, decoding it if
    /// it is not buffered.
    pub fn move_to(&mut self, timestamp: Timestamp) -> Result<MoveOutcome> {
        match self.mode {
            DecodingMode::Idle => Ok(MoveOutcome::Miss),
            DecodingMode::Caching => Ok(self.cache.move_to(timestamp)),
            DecodingMode::PreBuffering => {
                if !self.prebuffer.working_zone().contains(timestamp) {
                    return Ok(MoveOutcome::Miss);
                }
                if self.prebuffer.contains(timestamp) {
                    return Ok(self.prebuffer.move_to(timestamp));
                }

                self.stop_prebuffering()?;
                let outcome = self.seek_prebuffer(timestamp);
                self.start_prebuffering()?;
                outcome
            }
        }
    }

    /// The active container, if any.
    pub fn container(&mut self) -> Option<&mut dyn FrameContainer> {
        match self.mode {
            DecodingMode::Idle => None,
            DecodingMode::Caching => Some(&mut self.cache),
            DecodingMode::PreBuffering => Some(&mut self.prebuffer),
        }
    }

    pub fn container_ref(&self) -> Option<&dyn FrameContainer> {
        match self.mode {
            DecodingMode::Idle => None,
            DecodingMode::Caching => Some(&self.cache),
            DecodingMode::PreBuffering => Some(&self.prebuffer),
        }
    }

    pub fn current_timestamp(&self) -> Option<Timestamp> {
        self.container_ref()?.current_timestamp()
    }

    pub fn drop_count(&self) -> usize {
        self.container_ref().map_or(0, |c| c.drop_count())
    }

    /// Run `f` on the current frame.
    pub fn with_current<R>(&self, f: impl FnOnce(&Frame) -> R) -> Option<R> {
        match self.mode {
            DecodingMode::Idle => None,
            DecodingMode::Caching => self.cache.current().map(f),
            DecodingMode::PreBuffering => self.prebuffer.with_current(f),
        }
    }

    /// Reverse the cached pictures. Only a cached zone can be reverted.
    pub fn revert(&mut self) -> Result<()> {
        if self.mode != DecodingMode::Caching {
            return Err(FrameZoneError::InvalidParameter(
                "revert needs a cached working zone".into(),
            ));
        }
        self.cache.revert();
        Ok(())
    }

    /// Middle picture of the cached zone.
    pub fn representative(&self) -> Option<&FrameBuffer> {
        match self.mode {
            DecodingMode::Caching => self.cache.representative(),
            _ => None,
        }
    }

    /// Events reported by the prebuffering thread since the last call.
    pub fn poll_events(&self) -> Vec<DecoderEvent> {
        self.events_rx.try_iter().collect()
    }

    /// Stop decoding and release every buffered frame.
    pub fn close(&mut self) -> Result<()> {
        self.stop_prebuffering()?;
        self.prebuffer.clear();
        self.cache.clear();
        self.mode = DecodingMode::Idle;
        self.working_zone = None;
        debug!("Video reader closed");
        Ok(())
    }

    pub fn mode(&self) -> DecodingMode {
        self.mode
    }

    /// Effective working zone: clipped to the stream, and snapped to the
    /// cached frames when caching.
    pub fn working_zone(&self) -> Option<TimeRange> {
        self.working_zone
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn pool(&self) -> &Arc<FramePool> {
        &self.pool
    }

    pub fn prebuffer(&self) -> &Arc<PreBuffer> {
        &self.prebuffer
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    /// Whether a prebuffering thread is decoding right now.
    pub fn is_prebuffering(&self) -> bool {
        self.worker.as_ref().is_some_and(PreBufferingThread::is_running)
    }

    fn decoder_mut(&mut self) -> Result<&mut VideoDecoder> {
        self.decoder
            .as_mut()
            .ok_or_else(decoder_lent)
    }

    fn start_prebuffering(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let decoder = self.decoder.take().ok_or_else(|| {
            FrameZoneError::Worker("no decoder available to start prebuffering".into())
        })?;
        let worker =
            PreBufferingThread::start(decoder, Arc::clone(&self.prebuffer), self.events_tx.clone())?;
        self.worker = Some(worker);
        Ok(())
    }

    fn stop_prebuffering(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            self.decoder = Some(worker.stop()?);
        }
        Ok(())
    }

    /// Stream `zone` through the prebuffer. `resume_at` is the playback
    /// position to keep when the zone only shrank around it.
    fn switch_to_prebuffering(&mut self, zone: TimeRange, resume_at: Option<Timestamp>) -> Result<()> {
        self.stop_prebuffering()?;
        self.cache.clear();
        self.retarget_prebuffer(zone, resume_at)?;
        self.mode = DecodingMode::PreBuffering;
        self.working_zone = Some(zone);
        self.start_prebuffering()
    }

    /// Point the prebuffer at `zone`, keeping buffered frames when the zone
    /// only shrank around the playback position.
    fn retarget_prebuffer(&mut self, zone: TimeRange, resume_at: Option<Timestamp>) -> Result<()> {
        let narrowed = self.mode == DecodingMode::PreBuffering
            && self.working_zone.is_some_and(|old| old.encloses(zone))
            && resume_at.is_some_and(|t| zone.contains(t));

        if narrowed {
            self.prebuffer.narrow_working_zone(zone);
            debug!(zone = %zone, kept = self.prebuffer.len(), "Prebuffer narrowed");
            return Ok(());
        }

        self.prebuffer.update_working_zone(zone);
        self.decoder_mut()?.seek_at_or_after(zone.start)
    }

    /// Decode synchronously until `move_by(skip + 1)` can hit or the buffer
    /// is one frame short of full.
    fn fill_until_next(&mut self, skip: usize) -> Result<()> {
        let zone = self.prebuffer.working_zone();
        let capacity = self.prebuffer.total_capacity();
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(decoder_lent)?;

        let mut decoded = 0;
        while !self.prebuffer.has_next(skip) && self.prebuffer.len() + 1 < capacity {
            self.prebuffer.add(decoder.read_in_zone(zone)?);
            decoded += 1;
        }
        debug!(decoded, skip, "Decoded synchronously");
        Ok(())
    }

    /// Bring `timestamp` into the prebuffer with the thread stopped.
    fn seek_prebuffer(&mut self, timestamp: Timestamp) -> Result<MoveOutcome> {
        let zone = self.prebuffer.working_zone();
        let capacity = self.prebuffer.total_capacity();
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(decoder_lent)?;

        // Looping back to the zone start: keep the end of the zone and let
        // the decoder wrap naturally.
        if self.prebuffer.is_rollover_jump(timestamp) {
            debug!(timestamp, "Rollover jump");
            while !self.prebuffer.contains(timestamp) && self.prebuffer.len() + 1 < capacity {
                self.prebuffer.add(decoder.read_in_zone(zone)?);
            }
            if self.prebuffer.contains(timestamp) {
                return Ok(self.prebuffer.move_to(timestamp));
            }
        }

        self.prebuffer.clear();
        decoder.seek(timestamp)?;
        let frame = decoder.read_in_zone(zone)?;
        let landed = frame.timestamp();
        debug!(timestamp, landed, "Prebuffer reset on seek");
        self.prebuffer.add(frame);
        Ok(self.prebuffer.move_to(landed))
    }

    /// Bring the cache to `zone`, decoding only what it does not hold.
    fn import_to_cache(&mut self, zone: TimeRange) -> Result<()> {
        let held = match (self.mode, self.cache.working_zone()) {
            (DecodingMode::Caching, Some(held)) if held.overlaps(zone) => held,
            _ => {
                self.cache.clear();
                let imported = self.import_section(zone, false)?;
                info!(zone = %zone, imported, "Working zone imported to cache");
                return Ok(());
            }
        };

        if !zone.encloses(held) {
            if let Some(kept) = held.intersection(zone) {
                self.cache.reduce_working_zone(kept);
            }
        }

        let Some(held) = self.cache.working_zone() else {
            let imported = self.import_section(zone, false)?;
            info!(zone = %zone, imported, "Working zone imported to cache");
            return Ok(());
        };

        let per_frame = self.info.average_timestamps_per_frame();
        let mut imported = 0;
        if held.start - zone.start >= per_frame {
            imported += self.import_section(TimeRange::new(zone.start, held.start - 1), true)?;
        }
        if zone.end - held.end >= per_frame {
            imported += self.import_section(TimeRange::new(held.end + 1, zone.end), false)?;
        }
        debug!(zone = %zone, imported, cached = self.cache.len(), "Cache updated incrementally");
        Ok(())
    }

    /// Decode every frame of `section` the cache does not hold yet.
    fn import_section(&mut self, section: TimeRange, prepend: bool) -> Result<usize> {
        self.cache.set_prepend_block(prepend);
        let result = self.decode_section(section);
        self.cache.set_prepend_block(false);

        if let Err(e) = &result {
            warn!(section = %section, error = %e, "Caching section failed");
        }
        result
    }

    fn decode_section(&mut self, section: TimeRange) -> Result<usize> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(decoder_lent)?;

        decoder.seek_at_or_after(section.start)?;
        let mut imported = 0;
        while decoder.position() <= section.end {
            let Some(frame) = decoder.read_frame()? else {
                break;
            };
            if self.cache.contains(frame.timestamp()) {
                self.pool.release(frame);
                continue;
            }
            self.cache.add(frame);
            imported += 1;
        }
        Ok(imported)
    }
}

fn decoder_lent() -> FrameZoneError {
    FrameZoneError::Worker("decoder is lent to the prebuffering thread".into())
}
