//! The prebuffer between a real producer thread and a consumer.
//!
//! Frames are released into a `FramePool` from framezone-media, as they
//! would be in the player.

use framezone_buffer::PreBuffer;
use framezone_core::{BufferConfig, Frame, PixelFormat, TimeRange, Timestamp};
use framezone_media::FramePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

fn frame(pool: &FramePool, timestamp: Timestamp) -> Frame {
    Frame::new(pool.acquire(4, 4, PixelFormat::Gray8), timestamp)
}

fn setup(total: usize, old: usize, zone: TimeRange) -> (Arc<PreBuffer>, Arc<FramePool>) {
    let pool = Arc::new(FramePool::new(total));
    let config = BufferConfig {
        total_capacity: total,
        old_frames_capacity: old,
        ..Default::default()
    };
    let prebuffer = PreBuffer::new(&config, zone, pool.clone()).unwrap();
    (Arc::new(prebuffer), pool)
}

/// Push `timestamps` from a separate thread, counting completed pushes.
fn spawn_producer(
    prebuffer: &Arc<PreBuffer>,
    pool: &Arc<FramePool>,
    timestamps: Vec<Timestamp>,
    delay: Duration,
) -> (JoinHandle<()>, Arc<AtomicUsize>) {
    let pushed = Arc::new(AtomicUsize::new(0));
    let handle = {
        let prebuffer = Arc::clone(prebuffer);
        let pool = Arc::clone(pool);
        let pushed = Arc::clone(&pushed);
        thread::spawn(move || {
            for t in timestamps {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                prebuffer.add(frame(&pool, t));
                pushed.fetch_add(1, Ordering::SeqCst);
            }
        })
    };
    (handle, pushed)
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

// ── Backpressure ───────────────────────────────────────────────

#[test]
fn blocked_producer_resumes_after_old_frame_eviction() {
    let (prebuffer, pool) = setup(5, 2, TimeRange::new(0, 100));
    let (producer, _) = spawn_producer(
        &prebuffer,
        &pool,
        vec![0, 10, 20, 30, 40, 50],
        Duration::ZERO,
    );

    assert!(wait_until(|| prebuffer.len() == 5));
    assert!(prebuffer.move_by(1).is_hit());
    assert_eq!(prebuffer.current_timestamp(), Some(0));

    // Index 1: nothing old enough to evict.
    assert!(prebuffer.move_by(1).is_hit());
    assert_eq!(prebuffer.current_timestamp(), Some(10));
    thread::sleep(Duration::from_millis(30));
    assert!(!prebuffer.contains(50));
    assert_eq!(prebuffer.len(), 5);

    // Index 3 evicts timestamp 0 and shifts back to 2.
    assert!(prebuffer.move_by(1).is_hit());
    assert!(prebuffer.move_by(1).is_hit());
    assert_eq!(prebuffer.current_timestamp(), Some(30));
    assert!(wait_until(|| prebuffer.contains(50)));
    assert_eq!(prebuffer.current_index(), Some(2));
    assert_eq!(prebuffer.sorted_timestamps(), vec![10, 20, 30, 40, 50]);
    assert_eq!(pool.released(), 1);

    prebuffer.clear();
    producer.join().unwrap();
}

#[test]
fn capacity_holds_under_concurrent_playback() {
    let (prebuffer, pool) = setup(8, 3, TimeRange::new(0, 10_000));
    let timestamps: Vec<Timestamp> = (0..200).map(|i| i * 40).collect();
    let (producer, pushed) = spawn_producer(&prebuffer, &pool, timestamps, Duration::ZERO);

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut step = 0;
    while pushed.load(Ordering::SeqCst) < 199 && Instant::now() < deadline {
        assert!(prebuffer.len() <= 8);
        let _ = prebuffer.move_by(1 + step % 3);
        assert!(prebuffer.current_index().map_or(true, |c| c <= 3));
        step += 1;
    }
    assert!(pushed.load(Ordering::SeqCst) >= 199);

    prebuffer.clear();
    producer.join().unwrap();
    assert_eq!(pushed.load(Ordering::SeqCst), 200);
}

#[test]
fn consumer_does_not_wait_for_blocked_producer() {
    let (prebuffer, pool) = setup(4, 1, TimeRange::new(0, 1000));
    let timestamps: Vec<Timestamp> = (0..10).map(|i| i * 10).collect();
    let (producer, _) = spawn_producer(&prebuffer, &pool, timestamps, Duration::ZERO);
    assert!(wait_until(|| prebuffer.len() == 4));

    let started = Instant::now();
    for _ in 0..1000 {
        let _ = prebuffer.move_to(500);
        let _ = prebuffer.contains(20);
        let _ = prebuffer.has_next(0);
    }
    assert!(started.elapsed() < Duration::from_secs(1));

    prebuffer.clear();
    // Cleared, the producer pushes the rest until full again.
    assert!(wait_until(|| prebuffer.len() == 4));
    prebuffer.clear();
    producer.join().unwrap();
}

#[test]
fn making_room_past_current_frame_keeps_playback_order() {
    let (prebuffer, pool) = setup(6, 2, TimeRange::new(0, 1000));
    let timestamps: Vec<Timestamp> = (0..7).map(|i| i * 10).collect();
    let (producer, _) = spawn_producer(&prebuffer, &pool, timestamps, Duration::ZERO);
    assert!(wait_until(|| prebuffer.len() == 6));

    assert!(prebuffer.move_by(1).is_hit());
    assert!(prebuffer.move_by(1).is_hit());
    assert_eq!(prebuffer.current_timestamp(), Some(10));

    // Down to 4 frames: 0 and the current 10 go.
    prebuffer.unblock_and_make_room();
    producer.join().unwrap();
    assert_eq!(prebuffer.sorted_timestamps(), vec![20, 30, 40, 50, 60]);
    assert_eq!(prebuffer.current_timestamp(), None);

    assert!(prebuffer.move_by(1).is_hit());
    assert_eq!(prebuffer.current_timestamp(), Some(20));
    assert!(prebuffer.move_by(1).is_hit());
    assert_eq!(prebuffer.current_timestamp(), Some(30));
}

// ── Drops ──────────────────────────────────────────────────────

#[test]
fn slow_producer_turns_into_drops() {
    let (prebuffer, pool) = setup(10, 9, TimeRange::new(0, 1000));
    let timestamps: Vec<Timestamp> = (0..9).map(|i| i * 10).collect();
    let (producer, _) = spawn_producer(&prebuffer, &pool, timestamps, Duration::from_millis(10));

    let mut seen = Vec::new();
    let mut misses = 0;
    for _ in 0..40 {
        if prebuffer.move_by(1).is_hit() {
            seen.extend(prebuffer.current_timestamp());
        } else {
            misses += 1;
        }
        thread::sleep(Duration::from_millis(2));
    }
    producer.join().unwrap();

    assert!(misses > 0);
    assert!(seen.windows(2).all(|w| w[1] > w[0]));
    // Nothing is ever forgotten here, so position plus pending drops is
    // exactly the number of frames requested.
    let position = prebuffer.current_index().map_or(-1, |c| c as i64);
    assert_eq!(position + prebuffer.drop_count() as i64, 39);
}

// ── Zone changes ───────────────────────────────────────────────

#[test]
fn working_zone_change_wakes_producer() {
    let (prebuffer, pool) = setup(3, 1, TimeRange::new(0, 100));
    let (producer, pushed) = spawn_producer(&prebuffer, &pool, vec![0, 10, 20, 500], Duration::ZERO);
    assert!(wait_until(|| prebuffer.len() == 3));
    assert_eq!(pushed.load(Ordering::SeqCst), 2);

    prebuffer.update_working_zone(TimeRange::new(500, 600));
    producer.join().unwrap();
    assert_eq!(prebuffer.sorted_timestamps(), vec![500]);
    assert!(prebuffer.contains(500));
    assert_eq!(pool.released(), 3);
}
