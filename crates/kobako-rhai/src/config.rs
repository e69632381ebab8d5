//! Script resource limits.
//!
//! ```ron
//! (
//!     max_operations: 100000,
//!     max_string_size: 1000000,
//! )
//! ```
//!
//! Missing fields keep their defaults. `max_operations` must be non-zero.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error loading a Rhai configuration.
#[derive(Debug, Error)]
pub enum RhaiConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Limits applied to every script run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhaiConfig {
    /// Operations before the script is aborted.
    pub max_operations: u64,
    /// Expression nesting depth at global level.
    pub max_expr_depth: usize,
    /// Expression nesting depth inside functions.
    pub max_function_expr_depth: usize,
    /// Function call nesting depth.
    pub max_call_levels: usize,
    /// Modules a script may load.
    pub max_modules: usize,
    /// Longest string, in bytes.
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for RhaiConfig {
    fn default() -> Self {
        Self {
            max_operations: 100_000,
            max_expr_depth: 64,
            max_function_expr_depth: 64,
            max_call_levels: 64,
            max_modules: 10,
            max_string_size: 1_000_000,
            max_array_size: 10_000,
            max_map_size: 10_000,
        }
    }
}

impl RhaiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation budget.
    pub fn with_max_operations(mut self, ops: u64) -> Self {
        self.max_operations = ops;
        self
    }

    /// Set the string size limit.
    pub fn with_max_string_size(mut self, size: usize) -> Self {
        self.max_string_size = size;
        self
    }

    /// Set the call depth limit.
    pub fn with_max_call_levels(mut self, levels: usize) -> Self {
        self.max_call_levels = levels;
        self
    }

    /// Parse from RON text.
    pub fn from_ron(text: &str) -> Result<Self, RhaiConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RhaiConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    fn validate(&self) -> Result<(), RhaiConfigError> {
        if self.max_operations == 0 {
            return Err(RhaiConfigError::Invalid(
                "max_operations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
