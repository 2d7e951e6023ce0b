//! Choosing between caching a whole working zone and prebuffering it.

use framezone_core::{BufferConfig, TimeRange, VideoInfo};
use tracing::debug;

/// Which container holds the frames of a working zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferingStrategy {
    /// Decode every frame of the zone into a [`FrameCache`](crate::FrameCache).
    Cache,
    /// Stream the zone through a bounded [`PreBuffer`](crate::PreBuffer).
    PreBuffer,
}

/// Whether every frame of `zone`, decoded at the reference size, fits in
/// `max_memory_mb` megabytes.
pub fn working_zone_fits_in_memory(zone: TimeRange, info: &VideoInfo, max_memory_mb: usize) -> bool {
    if zone.is_wrapped() {
        return false;
    }
    info.zone_megabytes(zone) <= max_memory_mb as f64
}

/// Pick the container for `zone`.
///
/// A zone that fits in the memory budget is cached. So is a zone with no
/// more frames than the prebuffer holds: streamed, it would loop inside
/// the buffer more than once.
pub fn choose_strategy(zone: TimeRange, info: &VideoInfo, config: &BufferConfig) -> BufferingStrategy {
    let frames = info.zone_frame_count(zone);
    let fits_in_prebuffer = !zone.is_wrapped() && frames > 0 && frames <= config.total_capacity as i64;
    let strategy = if fits_in_prebuffer || working_zone_fits_in_memory(zone, info, config.max_memory_mb) {
        BufferingStrategy::Cache
    } else {
        BufferingStrategy::PreBuffer
    };
    debug!(
        zone = %zone,
        frames,
        estimate_mb = info.zone_megabytes(zone),
        max_memory_mb = config.max_memory_mb,
        ?strategy,
        "Chose buffering strategy"
    );
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;
    use framezone_core::{FrameRate, PixelFormat};

    fn info() -> VideoInfo {
        VideoInfo {
            width: 1920,
            height: 1080,
            pixel_format: PixelFormat::Bgr24,
            frame_rate: FrameRate::FPS_25,
            timestamps_per_second: 1000,
            first_timestamp: 0,
            frame_count: 25 * 600,
        }
    }

    fn budget(max_memory_mb: usize) -> BufferConfig {
        BufferConfig {
            max_memory_mb,
            ..Default::default()
        }
    }

    #[test]
    fn test_short_zone_is_cached() {
        // One second of 1080p BGR is about 148 MB.
        let zone = TimeRange::new(0, 1000);
        assert!(working_zone_fits_in_memory(zone, &info(), 512));
        assert_eq!(choose_strategy(zone, &info(), &budget(512)), BufferingStrategy::Cache);
    }

    #[test]
    fn test_long_zone_is_prebuffered() {
        let zone = TimeRange::new(0, 60_000);
        assert_eq!(choose_strategy(zone, &info(), &budget(512)), BufferingStrategy::PreBuffer);
    }

    #[test]
    fn test_zone_shorter_than_prebuffer_is_cached() {
        let config = BufferConfig {
            total_capacity: 6,
            old_frames_capacity: 2,
            max_memory_mb: 0,
            ..Default::default()
        };
        // Four frames, six slots: over budget but cached anyway.
        let zone = TimeRange::new(0, 120);
        assert!(!working_zone_fits_in_memory(zone, &info(), 0));
        assert_eq!(choose_strategy(zone, &info(), &config), BufferingStrategy::Cache);

        assert_eq!(choose_strategy(TimeRange::new(0, 240), &info(), &config), BufferingStrategy::PreBuffer);
        // No frame at all: streaming reports the empty zone.
        assert_eq!(choose_strategy(TimeRange::new(10, 30), &info(), &config), BufferingStrategy::PreBuffer);
    }

    #[test]
    fn test_wrapped_zone_is_prebuffered() {
        let zone = TimeRange::new(50_000, 1_000);
        assert!(!working_zone_fits_in_memory(zone, &info(), usize::MAX));
    }
}
