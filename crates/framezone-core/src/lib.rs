//! FrameZone Core - Foundation types for frame buffering
//!
//! This crate provides the value types shared by the frame containers
//! and the decoder side:
//! - Timestamped frames and their pixel buffers
//! - Time ranges that may wrap around the end of a working zone
//! - Video stream description used for memory estimates
//! - Buffer configuration and the error type

pub mod config;
pub mod error;
pub mod frame;
pub mod info;
pub mod time;

pub use config::BufferConfig;
pub use error::{FrameZoneError, Result};
pub use frame::{Frame, FrameBuffer, FramePlane, PixelFormat};
pub use info::VideoInfo;
pub use time::{FrameRate, TimeRange, Timestamp};

/// Default memory budget and capacity constants.
pub mod memory_budget {
    /// Frames held by a prebuffer, ahead and behind the current one.
    pub const PREBUFFER_TOTAL_CAPACITY: usize = 25;

    /// Frames kept behind the current position for instant rewind.
    pub const PREBUFFER_OLD_FRAMES_CAPACITY: usize = 8;

    /// Memory a fully cached working zone may use, in megabytes.
    pub const CACHE_MAX_MEMORY_MB: usize = 512;

    /// Released pixel buffers kept around for reuse by the decoder.
    pub const FRAME_POOL_SIZE: usize = 8;

    /// Smallest total capacity that still leaves room for a
    /// non-blocking push after `unblock_and_make_room`.
    pub const MIN_TOTAL_CAPACITY: usize = 3;
}
