//! FrameZone Buffer - Frame containers for working-zone playback
//!
//! Two alternative strategies hold the decoded frames of a working zone:
//! - `PreBuffer`: bounded, filled asynchronously by a decoding thread,
//!   with backpressure on the producer and drops on the consumer
//! - `FrameCache`: every frame of a small zone, random access, no bound
//!
//! `choose_strategy` picks one from the zone's estimated memory footprint
//! and frame count.

pub mod cache;
pub mod container;
pub mod prebuffer;
pub mod releaser;
pub mod strategy;

mod ring;

pub use cache::FrameCache;
pub use container::{FrameContainer, MoveOutcome};
pub use prebuffer::PreBuffer;
pub use releaser::{DropReleaser, FrameReleaser};
pub use strategy::{choose_strategy, working_zone_fits_in_memory, BufferingStrategy};
