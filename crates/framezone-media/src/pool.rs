//! Pixel buffer recycling between the containers and the decoder.

use framezone_buffer::FrameReleaser;
use framezone_core::{Frame, FrameBuffer, PixelFormat};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A bounded stash of released pixel buffers.
///
/// Installed as the containers' releaser; the decoder draws from it
/// before allocating.
pub struct FramePool {
    buffers: Mutex<Vec<FrameBuffer>>,
    capacity: usize,
    released: AtomicUsize,
    reused: AtomicUsize,
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            released: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
        }
    }

    /// A buffer of the requested shape, recycled when one is available.
    /// Contents are unspecified.
    pub fn acquire(&self, width: u32, height: u32, format: PixelFormat) -> FrameBuffer {
        let mut buffers = self.buffers.lock();
        if let Some(pos) = buffers.iter().position(|b| b.matches(width, height, format)) {
            self.reused.fetch_add(1, Ordering::Relaxed);
            return buffers.swap_remove(pos);
        }
        drop(buffers);
        FrameBuffer::new(width, height, format)
    }

    /// Buffers currently waiting for reuse.
    pub fn available(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Frames handed back by the containers so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::Relaxed)
    }

    /// Acquisitions served from the pool.
    pub fn reused(&self) -> usize {
        self.reused.load(Ordering::Relaxed)
    }
}

impl FrameReleaser for FramePool {
    fn release(&self, frame: Frame) {
        self.released.fetch_add(1, Ordering::Relaxed);
        let mut buffers = self.buffers.lock();
        if buffers.len() < self.capacity {
            buffers.push(frame.into_image());
        }
    }
}
