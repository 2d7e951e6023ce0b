//! The video reader driving decoder, prebuffering thread and containers.

use framezone_buffer::{BufferingStrategy, MoveOutcome};
use framezone_core::{
    BufferConfig, FrameRate, FrameZoneError, PixelFormat, TimeRange, Timestamp, VideoInfo,
};
use framezone_media::{DecoderEvent, DecodingMode, VideoReader};
use std::thread;
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

fn info() -> VideoInfo {
    VideoInfo {
        width: 16,
        height: 4,
        pixel_format: PixelFormat::Rgba8,
        frame_rate: FrameRate::FPS_25,
        timestamps_per_second: 1000,
        first_timestamp: 0,
        frame_count: 500,
    }
}

/// A reader that never caches: every zone goes through the prebuffer.
fn streaming_reader(total: usize, old: usize) -> VideoReader {
    let config = BufferConfig {
        total_capacity: total,
        old_frames_capacity: old,
        max_memory_mb: 0,
        pool_size: total,
    };
    VideoReader::new(info(), config).unwrap()
}

fn play(reader: &mut VideoReader, ticks: usize) -> Vec<Timestamp> {
    (0..ticks)
        .map(|_| {
            assert_eq!(reader.move_next(0, true).unwrap(), MoveOutcome::Hit);
            reader.current_timestamp().unwrap()
        })
        .collect()
}

// ── Prebuffered playback ───────────────────────────────────────

#[test]
fn prebuffered_playback_loops_over_the_zone() {
    let mut reader = streaming_reader(6, 2);
    let strategy = reader.update_working_zone(TimeRange::new(0, 400)).unwrap();
    assert_eq!(strategy, BufferingStrategy::PreBuffer);

    let played = play(&mut reader, 15);
    let expected: Vec<Timestamp> = (0..15).map(|i| (i % 11) * 40).collect();
    assert_eq!(played, expected);
    assert_eq!(reader.drop_count(), 0);
    assert!(reader.prebuffer().len() <= 6);
}

#[test]
fn skipping_frames_while_prebuffering() {
    let mut reader = streaming_reader(8, 2);
    reader.update_working_zone(TimeRange::new(0, 8000)).unwrap();

    assert!(reader.move_next(0, true).unwrap().is_hit());
    assert!(reader.move_next(2, true).unwrap().is_hit());
    assert_eq!(reader.current_timestamp(), Some(120));
    assert!(reader.move_next(3, true).unwrap().is_hit());
    assert_eq!(reader.current_timestamp(), Some(280));
}

#[test]
fn seek_then_loop_back_to_zone_start() {
    let mut reader = streaming_reader(6, 2);
    reader.update_working_zone(TimeRange::new(400, 800)).unwrap();

    assert!(reader.move_to(720).unwrap().is_hit());
    assert_eq!(reader.current_timestamp(), Some(720));
    let played = play(&mut reader, 3);
    assert_eq!(played, vec![760, 800, 400]);

    assert!(reader.move_to(400).unwrap().is_hit());
    assert_eq!(reader.current_timestamp(), Some(400));
    assert_eq!(play(&mut reader, 2), vec![440, 480]);
}

#[test]
fn seek_outside_working_zone_misses() {
    let mut reader = streaming_reader(6, 2);
    reader.update_working_zone(TimeRange::new(400, 800)).unwrap();
    assert!(reader.move_next(0, true).unwrap().is_hit());

    assert!(reader.move_to(100).unwrap().is_miss());
    assert_eq!(reader.current_timestamp(), Some(400));
}

#[test]
fn narrowing_keeps_buffered_frames() {
    let mut reader = streaming_reader(10, 3);
    reader.update_working_zone(TimeRange::new(0, 8000)).unwrap();
    play(&mut reader, 3);
    assert_eq!(reader.current_timestamp(), Some(80));

    reader.update_working_zone(TimeRange::new(40, 4000)).unwrap();
    assert_eq!(reader.current_timestamp(), Some(80));
    assert!(!reader.prebuffer().contains(0));
    assert_eq!(play(&mut reader, 2), vec![120, 160]);
}

#[test]
fn narrowing_right_after_start_resumes_on_next_frame() {
    let mut reader = streaming_reader(10, 3);
    reader.update_working_zone(TimeRange::new(0, 8000)).unwrap();
    assert_eq!(play(&mut reader, 2), vec![0, 40]);

    reader.update_working_zone(TimeRange::new(0, 4000)).unwrap();
    assert_eq!(reader.mode(), DecodingMode::PreBuffering);
    assert_eq!(play(&mut reader, 2), vec![80, 120]);
}

// ── Strategy switches ──────────────────────────────────────────

#[test]
fn zone_shorter_than_prebuffer_is_cached_whole() {
    let mut reader = streaming_reader(6, 2);
    let strategy = reader.update_working_zone(TimeRange::new(0, 120)).unwrap();
    assert_eq!(strategy, BufferingStrategy::Cache);
    assert!(!reader.is_prebuffering());
    assert!(reader.prebuffer().is_empty());

    let cached: Vec<Timestamp> = reader.cache().frames().map(|f| f.timestamp()).collect();
    assert_eq!(cached, vec![0, 40, 80, 120]);
    assert!(reader.container_ref().unwrap().contains(80));
    assert_eq!(play(&mut reader, 4), vec![0, 40, 80, 120]);
}

#[test]
fn short_zone_is_cached_and_long_zone_prebuffered() {
    let config = BufferConfig {
        total_capacity: 6,
        old_frames_capacity: 2,
        // 16x4 RGBA is 256 bytes a frame: 1 MB holds about 160 seconds.
        max_memory_mb: 1,
        pool_size: 6,
    };
    let long = TimeRange::new(0, 19_960);
    let mut reader = VideoReader::new(
        VideoInfo {
            frame_count: 50_000,
            ..info()
        },
        config,
    )
    .unwrap();

    assert_eq!(reader.update_working_zone(long).unwrap(), BufferingStrategy::Cache);
    assert_eq!(reader.mode(), DecodingMode::Caching);
    assert_eq!(reader.cache().len(), 500);

    let huge = TimeRange::new(0, 1_000_000);
    assert_eq!(reader.update_working_zone(huge).unwrap(), BufferingStrategy::PreBuffer);
    assert_eq!(reader.mode(), DecodingMode::PreBuffering);
    assert!(reader.cache().is_empty());
    assert_eq!(play(&mut reader, 3), vec![0, 40, 80]);

    assert_eq!(reader.update_working_zone(long).unwrap(), BufferingStrategy::Cache);
    assert!(!reader.is_prebuffering());
    assert!(reader.prebuffer().is_empty());
    assert!(reader.pool().released() > 0);
}

#[test]
fn container_view_follows_the_mode() {
    let mut reader = VideoReader::new(info(), BufferConfig::default()).unwrap();
    assert!(reader.container_ref().is_none());

    reader.update_working_zone(TimeRange::new(0, 400)).unwrap();
    let container = reader.container().unwrap();
    assert_eq!(container.len(), 11);
    assert!(container.move_to(200).is_hit());
    assert_eq!(container.current_timestamp(), Some(200));
    assert_eq!(container.drop_count(), 0);

    reader.close().unwrap();
    assert_eq!(reader.mode(), DecodingMode::Idle);
    assert!(reader.container_ref().is_none());
}

// ── Failures ───────────────────────────────────────────────────

#[test]
fn zone_without_frames_reports_decoder_error() {
    let mut reader = streaming_reader(6, 2);
    // Between two frames of the 40-unit grid.
    reader.update_working_zone(TimeRange::new(10, 30)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    while events.is_empty() && Instant::now() < deadline {
        events.extend(reader.poll_events());
        thread::sleep(Duration::from_millis(2));
    }
    assert!(matches!(events.as_slice(), [DecoderEvent::Error(_)]));

    let err = reader.move_next(0, true).unwrap_err();
    assert!(matches!(err, FrameZoneError::Decoder(_)));
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = BufferConfig {
        total_capacity: 4,
        old_frames_capacity: 4,
        ..Default::default()
    };
    assert!(matches!(
        VideoReader::new(info(), config),
        Err(FrameZoneError::InvalidParameter(_))
    ));
}
