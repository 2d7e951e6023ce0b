//! FrameZone playback driver
//!
//! Plays a synthetic stream through the video reader: first a short working
//! zone that is cached whole, then the full stream through the prebuffer.
//!
//! Usage: `framezone-play [config.json]`

use anyhow::{Context, Result};
use framezone_buffer::BufferingStrategy;
use framezone_core::{BufferConfig, FrameRate, PixelFormat, TimeRange, VideoInfo};
use framezone_media::{DecoderEvent, VideoReader};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("FrameZone starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => BufferConfig::load(&path)
            .with_context(|| format!("loading buffer configuration from {path}"))?,
        None => BufferConfig::default(),
    };
    info!(?config, "Buffer configuration");

    // 30 seconds of 640x360 RGBA.
    let info = VideoInfo {
        width: 640,
        height: 360,
        pixel_format: PixelFormat::Rgba8,
        frame_rate: FrameRate::FPS_25,
        timestamps_per_second: 1000,
        first_timestamp: 0,
        frame_count: 750,
    };

    let mut reader = VideoReader::new(info, config)?;
    play_cached(&mut reader)?;
    play_streamed(&mut reader)?;
    reader.close()?;

    info!(
        released = reader.pool().released(),
        reused = reader.pool().reused(),
        "Frame pool"
    );
    Ok(())
}

/// Two seconds, small enough to cache: play it, reverse it, play it again.
fn play_cached(reader: &mut VideoReader) -> Result<()> {
    let strategy = reader.update_working_zone(TimeRange::new(0, 2000))?;
    info!(?strategy, zone = ?reader.working_zone(), "Cached zone ready");

    let forward = play(reader, 10)?;
    reader.revert()?;
    reader.move_to(0)?;
    let backward = play(reader, 10)?;
    info!(forward, backward, "Cached playback done");
    Ok(())
}

/// The whole stream, streamed: play, seek, and loop back to the start.
fn play_streamed(reader: &mut VideoReader) -> Result<()> {
    let strategy = reader.update_working_zone(TimeRange::new(0, 30_000))?;
    if strategy != BufferingStrategy::PreBuffer {
        warn!(?strategy, "Full stream fits in memory, prebuffering not exercised");
    }

    play(reader, 50)?;
    info!(drops = reader.drop_count(), "Playback tick drops");

    let outcome = reader.move_to(15_000)?;
    info!(?outcome, at = ?reader.current_timestamp(), "Seek");
    play(reader, 25)?;

    let outcome = reader.move_to(0)?;
    info!(?outcome, at = ?reader.current_timestamp(), "Back to the zone start");
    play(reader, 25)?;

    for event in reader.poll_events() {
        match event {
            DecoderEvent::Error(message) => warn!(%message, "Decoder reported an error"),
        }
    }
    Ok(())
}

/// Advance one frame per tick at the stream's frame rate. Returns the sum of
/// the first pixel of every frame shown.
fn play(reader: &mut VideoReader, ticks: usize) -> Result<u64> {
    let frame_duration = Duration::from_secs_f64(1.0 / reader.info().frame_rate.to_fps_f64());
    let mut checksum = 0u64;
    let mut missed = 0;

    for _ in 0..ticks {
        let tick = Instant::now();
        if reader.move_next(0, false)?.is_miss() {
            missed += 1;
        }
        checksum += reader
            .with_current(|frame| frame.image().planes[0].data.first().copied().unwrap_or(0) as u64)
            .unwrap_or(0);
        if let Some(rest) = frame_duration.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    info!(
        ticks,
        missed,
        at = ?reader.current_timestamp(),
        mode = ?reader.mode(),
        "Played"
    );
    Ok(checksum)
}
