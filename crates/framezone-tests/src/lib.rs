//! Integration test crate for FrameZone.
//!
//! Holds cross-crate tests: the prebuffer driven by real producer threads,
//! and the video reader switching between its containers.

#[cfg(test)]
mod prebuffer;

#[cfg(test)]
mod reader;
