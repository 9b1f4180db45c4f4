//! Engine configuration
//!
//! Options are read-only once the engine context is built. They can be
//! constructed in code or loaded from a TOML document:
//!
//! ```toml
//! verbose_logging = true
//! type_cache_capacity = 800
//! member_cache_capacity = 450
//! max_conversion_depth = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted capacity for any metadata cache
pub const MIN_CACHE_CAPACITY: u64 = 100;

/// Smallest accepted conversion depth
pub const MIN_CONVERSION_DEPTH: usize = 8;

/// Default conversion depth
///
/// Cycles end through the cycle guard long before this; the limit only
/// bounds how many helper stacks one conversion may chain.
pub const DEFAULT_CONVERSION_DEPTH: usize = 16_384;

/// Errors that can occur while loading options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the options file
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse options: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Engine options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineOptions {
    /// Emit per-field diagnostics at debug level
    pub verbose_logging: bool,

    /// Capacity of the type-keyed caches (field lists, constructors, lookups)
    pub type_cache_capacity: u64,

    /// Capacity of the accessor cache
    pub member_cache_capacity: u64,

    /// Longest conversion context chain before a value is left untouched
    pub max_conversion_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            verbose_logging: false,
            type_cache_capacity: 600,
            member_cache_capacity: 450,
            max_conversion_depth: DEFAULT_CONVERSION_DEPTH,
        }
    }
}

impl EngineOptions {
    /// Parse options from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: EngineOptions = toml::from_str(content)?;
        Ok(options.normalized())
    }

    /// Load options from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Clamp every limit to its floor
    pub fn normalized(mut self) -> Self {
        self.type_cache_capacity = self.type_cache_capacity.max(MIN_CACHE_CAPACITY);
        self.member_cache_capacity = self.member_cache_capacity.max(MIN_CACHE_CAPACITY);
        self.max_conversion_depth = self.max_conversion_depth.max(MIN_CONVERSION_DEPTH);
        self
    }

    /// Capacity for the constructor and field-list caches
    ///
    /// Large type caches get a tenth of their size, small ones half.
    pub fn derived_capacity(&self) -> u64 {
        let ty = self.type_cache_capacity.max(MIN_CACHE_CAPACITY);
        let derived = if ty > 450 { ty / 10 } else { ty / 2 };
        derived.max(MIN_CACHE_CAPACITY)
    }
}
