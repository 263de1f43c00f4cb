//! File materialization
//!
//! Writes one planned [`FileOperation`] to disk under a [`ConflictPolicy`]:
//!
//! | policy             | destination missing | destination exists                |
//! |--------------------|---------------------|-----------------------------------|
//! | `overwrite`        | write               | write                             |
//! | `skip-if-exists`   | write               | skipped                           |
//! | `fail-on-conflict` | write               | conflict                          |
//! | `merge`            | write               | merged (static files are skipped) |
//!
//! Every write goes through [`atomic::stage`] and a rename, and is recorded
//! in the run's [`Transaction`].

pub mod atomic;
pub mod merge;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegkitError, Result};
use crate::manifest::FileKind;
use crate::planner::FileOperation;
use crate::transaction::Transaction;

/// What to do when a destination file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    #[default]
    Overwrite,
    SkipIfExists,
    FailOnConflict,
    Merge,
}

impl ConflictPolicy {
    pub const ALL: [ConflictPolicy; 4] = [
        ConflictPolicy::Overwrite,
        ConflictPolicy::SkipIfExists,
        ConflictPolicy::FailOnConflict,
        ConflictPolicy::Merge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::SkipIfExists => "skip-if-exists",
            ConflictPolicy::FailOnConflict => "fail-on-conflict",
            ConflictPolicy::Merge => "merge",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ConflictPolicy::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ConflictPolicy::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown conflict policy '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Result of materializing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializeOutcome {
    Written,
    Skipped,
    Conflict,
}

/// Writes planned files into the project
#[derive(Debug, Clone, Copy)]
pub struct FileMaterializer<'t> {
    transaction: &'t Transaction,
}

impl<'t> FileMaterializer<'t> {
    pub fn new(transaction: &'t Transaction) -> Self {
        Self { transaction }
    }

    /// Write one file under `policy`.
    ///
    /// A conflict is reported as [`MaterializeOutcome::Conflict`], not as an
    /// error; errors are filesystem failures ([`RegkitError::Write`]) or
    /// merge failures.
    pub fn materialize(&self, op: &FileOperation, policy: ConflictPolicy) -> Result<MaterializeOutcome> {
        let destination = op.destination.as_path();
        let exists = match fs::symlink_metadata(destination) {
            Ok(meta) if meta.is_dir() => {
                return Err(RegkitError::Write {
                    path: destination.display().to_string(),
                    reason: "destination is a directory".to_string(),
                });
            }
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                // A parent that is not a directory surfaces on write with a precise error
                debug!(path = %destination.display(), error = %e, "cannot stat destination");
                false
            }
        };

        let content = match (policy, exists) {
            (_, false) | (ConflictPolicy::Overwrite, true) => op.content.clone(),
            (ConflictPolicy::SkipIfExists, true) => {
                debug!(path = %destination.display(), "exists, skipping");
                return Ok(MaterializeOutcome::Skipped);
            }
            (ConflictPolicy::FailOnConflict, true) => {
                debug!(path = %destination.display(), "exists, conflict");
                return Ok(MaterializeOutcome::Conflict);
            }
            (ConflictPolicy::Merge, true) => {
                if op.kind == FileKind::Static {
                    return Ok(MaterializeOutcome::Skipped);
                }
                let existing = fs::read(destination).map_err(|e| RegkitError::Write {
                    path: destination.display().to_string(),
                    reason: e.to_string(),
                })?;
                match merge::merge_contents(destination, &existing, &op.content)? {
                    Some(merged) => merged,
                    None => {
                        debug!(path = %destination.display(), "already merged, skipping");
                        return Ok(MaterializeOutcome::Skipped);
                    }
                }
            }
        };

        self.write(destination, &content, exists)?;
        debug!(path = %destination.display(), component = %op.component, "written");
        Ok(MaterializeOutcome::Written)
    }

    fn write(&self, destination: &Path, content: &[u8], replaced: bool) -> Result<()> {
        let staged = atomic::stage(destination, content)?;
        debug!(temp = %staged.temp_path().display(), "staged");
        // A failed rename drops the staged file, which removes it
        let committed = staged.commit()?;
        self.transaction.track_committed(committed, replaced);
        Ok(())
    }
}
