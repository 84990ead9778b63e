//! # World Configuration
//!
//! Tunables of the world core, loadable from a JSON file. Every field has a
//! default, so a partial file (or `{}`) is valid.
//!
//! ```rust
//! use paged_voxel_world::WorldConfig;
//!
//! let config = WorldConfig::from_json(r#"{ "vision_radius": 5 }"#).unwrap();
//! assert_eq!(config.vision_radius, 5);
//! assert_eq!(config.time_to_live, 3);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest block count a level file section can describe.
pub const MAX_SECTION_BLOCKS: usize = u16::MAX as usize;

/// Configuration of a [`Level`](crate::Level).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Directory for chunk cache files. Wiped when the level is created,
    /// reset or dropped, so it must not be shared between live levels.
    pub cache_dir: PathBuf,
    /// Radius, in grid cells, of the visible set around the viewer
    pub vision_radius: u32,
    /// Scheduler passes a chunk survives outside the visible set
    pub time_to_live: u32,
    /// Capacity for solid blocks
    pub max_solid_blocks: usize,
    /// Capacity for fluid blocks
    pub max_fluid_blocks: usize,
    /// Worker threads for bulk level operations
    pub worker_threads: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            cache_dir: std::env::temp_dir().join("paged-voxel-world-cache"),
            vision_radius: 3,
            time_to_live: 3,
            max_solid_blocks: MAX_SECTION_BLOCKS,
            max_fluid_blocks: MAX_SECTION_BLOCKS,
            worker_threads: 2,
        }
    }
}

impl WorldConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_str(text)?;
        Ok(config.clamped())
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Limits capacities to what a level file can hold and keeps at least
    /// one worker thread.
    pub fn clamped(mut self) -> Self {
        if self.max_solid_blocks > MAX_SECTION_BLOCKS || self.max_fluid_blocks > MAX_SECTION_BLOCKS {
            log::warn!("Block capacities above {} are clamped", MAX_SECTION_BLOCKS);
        }
        self.max_solid_blocks = self.max_solid_blocks.min(MAX_SECTION_BLOCKS);
        self.max_fluid_blocks = self.max_fluid_blocks.min(MAX_SECTION_BLOCKS);
        self.worker_threads = self.worker_threads.max(1);
        self
    }

    /// Same configuration with another cache directory.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        assert_eq!(WorldConfig::from_json("{}").unwrap(), WorldConfig::default());
    }

    #[test]
    fn capacities_are_clamped() {
        let config = WorldConfig::from_json(r#"{ "max_fluid_blocks": 100000, "worker_threads": 0 }"#).unwrap();
        assert_eq!(config.max_fluid_blocks, MAX_SECTION_BLOCKS);
        assert_eq!(config.worker_threads, 1);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            WorldConfig::from_json("{ vision_radius: }"),
            Err(ConfigError::Parse(_))
        ));
    }
}
