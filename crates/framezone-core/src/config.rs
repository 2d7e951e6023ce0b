//! Buffer configuration, loadable from JSON.

use crate::error::{FrameZoneError, Result};
use crate::memory_budget;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Capacities and budgets for the frame containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of frames resident in a prebuffer
    pub total_capacity: usize,
    /// Frames kept behind the current position
    pub old_frames_capacity: usize,
    /// Memory allowed for a fully cached working zone, in megabytes
    pub max_memory_mb: usize,
    /// Released buffers retained for reuse
    pub pool_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            total_capacity: memory_budget::PREBUFFER_TOTAL_CAPACITY,
            old_frames_capacity: memory_budget::PREBUFFER_OLD_FRAMES_CAPACITY,
            max_memory_mb: memory_budget::CACHE_MAX_MEMORY_MB,
            pool_size: memory_budget::FRAME_POOL_SIZE,
        }
    }
}

impl BufferConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check the capacity relationships the prebuffer relies on.
    pub fn validate(&self) -> Result<()> {
        if self.total_capacity < memory_budget::MIN_TOTAL_CAPACITY {
            return Err(FrameZoneError::InvalidParameter(format!(
                "total_capacity must be at least {}, got {}",
                memory_budget::MIN_TOTAL_CAPACITY,
                self.total_capacity
            )));
        }
        if self.old_frames_capacity >= self.total_capacity {
            return Err(FrameZoneError::InvalidParameter(format!(
                "old_frames_capacity ({}) must be below total_capacity ({})",
                self.old_frames_capacity, self.total_capacity
            )));
        }
        Ok(())
    }
}
