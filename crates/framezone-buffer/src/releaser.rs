//! Pluggable reclamation of frame memory.

use framezone_core::Frame;

/// Receives every frame a container evicts or clears.
///
/// Called with the container's lock held: implementations must not call
/// back into the container that released the frame.
pub trait FrameReleaser: Send + Sync {
    fn release(&self, frame: Frame);
}

/// Frees pixel memory immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct DropReleaser;

impl FrameReleaser for DropReleaser {
    fn release(&self, frame: Frame) {
        drop(frame);
    }
}
