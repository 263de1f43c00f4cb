//! regkit - component registry installer
//!
//! Resolves a requested component and its registry dependencies, renders
//! per-project template variables into their files and writes them into a
//! project without leaving truncated files behind.
//!
//! ```no_run
//! use std::collections::BTreeMap;
//!
//! use regkit::config::ProjectConfig;
//! use regkit::planner::Planner;
//! use regkit::store::DirectoryStore;
//! use regkit::template::NonInteractive;
//!
//! # fn main() -> regkit::error::Result<()> {
//! let store = DirectoryStore::new("/srv/registry");
//! let config = ProjectConfig::load(std::path::Path::new("."), None)?;
//!
//! let plan = Planner::new(&store, &config).plan("web_search_agent", &BTreeMap::new(), &mut NonInteractive)?;
//! let report = plan.execute();
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod config;
pub mod error;
pub mod manifest;
pub mod materializer;
pub mod planner;
pub mod progress;
pub mod resolver;
pub mod store;
pub mod template;
pub mod transaction;

pub use error::{RegkitError, Result};
pub use planner::{InstallPlan, InstallReport, Planner};
