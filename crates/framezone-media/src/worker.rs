//! The prebuffering thread: decodes the working zone into a `PreBuffer`.

use crate::decoder::VideoDecoder;
use crossbeam_channel::Sender;
use framezone_buffer::PreBuffer;
use framezone_core::{FrameZoneError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Reported by the prebuffering thread to whoever owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// Decoding failed; the thread has exited.
    Error(String),
}

/// Handle on a running prebuffering thread.
///
/// The thread loops "decode, push" and blocks inside [`PreBuffer::add`]
/// while the buffer is full. Stopping sets the cancel flag and makes room
/// in the buffer so the thread wakes up, sees the flag and exits.
pub struct PreBufferingThread {
    cancel: Arc<AtomicBool>,
    prebuffer: Arc<PreBuffer>,
    handle: Option<JoinHandle<VideoDecoder>>,
}

impl PreBufferingThread {
    /// Spawn the producer. The decoder is handed back by [`stop`](Self::stop).
    pub fn start(
        mut decoder: VideoDecoder,
        prebuffer: Arc<PreBuffer>,
        events: Sender<DecoderEvent>,
    ) -> Result<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let thread_cancel = Arc::clone(&cancel);
        let thread_buffer = Arc::clone(&prebuffer);

        let handle = thread::Builder::new()
            .name("prebuffering".into())
            .spawn(move || {
                debug!(from = decoder.position(), "Prebuffering started");
                while !thread_cancel.load(Ordering::Acquire) {
                    let zone = thread_buffer.working_zone();
                    match decoder.read_in_zone(zone) {
                        Ok(frame) => thread_buffer.add(frame),
                        Err(e) => {
                            warn!(error = %e, "Prebuffering stopped on decoder error");
                            if events.send(DecoderEvent::Error(e.to_string())).is_err() {
                                debug!("No listener for decoder events");
                            }
                            break;
                        }
                    }
                }
                debug!(at = decoder.position(), "Prebuffering exited");
                decoder
            })
            .map_err(|e| FrameZoneError::Worker(format!("cannot spawn prebuffering thread: {e}")))?;

        info!("Prebuffering thread started");
        Ok(Self {
            cancel,
            prebuffer,
            handle: Some(handle),
        })
    }

    /// Whether the thread is still decoding.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel, wake and join the thread, returning its decoder.
    ///
    /// On return the buffer has room for a push that does not block, even
    /// if the thread pushed one last frame on its way out.
    pub fn stop(mut self) -> Result<VideoDecoder> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<VideoDecoder> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| FrameZoneError::Worker("prebuffering thread already stopped".into()))?;

        self.cancel.store(true, Ordering::Release);
        self.prebuffer.unblock_and_make_room();
        let decoder = handle
            .join()
            .map_err(|_| FrameZoneError::Worker("prebuffering thread panicked".into()))?;
        self.prebuffer.unblock_and_make_room();

        info!("Prebuffering thread stopped");
        Ok(decoder)
    }
}

impl Drop for PreBufferingThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.shutdown() {
                warn!(error = %e, "Prebuffering thread did not shut down cleanly");
            }
        }
    }
}
