//! Configuration file handling for regkit
//!
//! This module contains data structures for:
//! - `regkit.yaml` - per-project installation target description

pub mod project;

// Re-export commonly used types
pub use project::ProjectConfig;
