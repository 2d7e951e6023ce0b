//! FrameZone Media - The decoder side of frame buffering
//!
//! This crate handles:
//! - Synthetic decoding of test-pattern frames on a frame grid
//! - Recycling of pixel buffers released by the containers
//! - The prebuffering thread that feeds a `PreBuffer`
//! - `VideoReader`, which picks a container per working zone and
//!   coordinates navigation with the decoder

pub mod decoder;
pub mod pool;
pub mod reader;
pub mod worker;

pub use decoder::VideoDecoder;
pub use pool::FramePool;
pub use reader::{DecodingMode, VideoReader};
pub use worker::{DecoderEvent, PreBufferingThread};
