//! # kobako-rhai
//!
//! Rhai scripting engine for kobako filesystems.
//!
//! [`RhaiEngine`] implements [`kobako_vfs::ExecutionEngine`], so it can be
//! attached to a [`kobako_vfs::FileSystem`] and run executable files:
//!
//! ```ignore
//! let mut fs = FileSystem::new().with_engine(Arc::new(RhaiEngine::new()));
//! fs.create_file_with_content("answer", "40 + 2")?;
//! fs.chmod("answer", "7")?;
//! assert_eq!(fs.exec("answer").await?.stdout, "42");
//! ```

pub mod config;
pub mod engine;

pub use config::{RhaiConfig, RhaiConfigError};
pub use engine::RhaiEngine;
