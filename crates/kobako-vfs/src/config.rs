//! Engine configuration.
//!
//! Loaded from RON:
//!
//! ```ron
//! (
//!     default_permission: 6,
//!     max_name_len: 255,
//! )
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::permission::Permission;
use crate::store::DEFAULT_MAX_NAME_LEN;

/// Error loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Filesystem engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Mode given to the root and to every newly created node.
    pub default_permission: Permission,

    /// Longest accepted entry name, in bytes.
    pub max_name_len: usize,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            default_permission: Permission::default(),
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl VfsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the creation mode.
    pub fn with_default_permission(mut self, permission: Permission) -> Self {
        self.default_permission = permission;
        self
    }

    /// Set the name length limit.
    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    /// Parse from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_name_len == 0 {
            return Err(ConfigError::Invalid("max_name_len must be at least 1".into()));
        }
        Ok(())
    }
}
