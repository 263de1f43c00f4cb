//! Commit ledger for one install run
//!
//! Every file is staged as a temporary file next to its destination and then
//! renamed into place (see [`crate::materializer`]). A staged file that never
//! gets renamed is removed when its `tempfile::TempPath` drops, both on a
//! failed rename and on an early return, so nothing here tracks temp files.
//!
//! The transaction records the renames that did happen, split into files
//! that were created and files whose previous content was replaced.
//! Committed renames are never rolled back; the summary tells the caller
//! exactly what was written, so a re-run is safe.
//!
//! ## Usage
//!
//! ```ignore
//! let transaction = Transaction::new();
//! let materializer = FileMaterializer::new(&transaction);
//!
//! materializer.materialize(&operation, policy)?;
//!
//! let summary = transaction.finish();
//! ```

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What a finished transaction wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    /// Destinations that did not exist before this run
    pub created: Vec<PathBuf>,
    /// Destinations whose previous content was replaced
    pub replaced: Vec<PathBuf>,
}

impl TransactionSummary {
    pub fn len(&self) -> usize {
        self.created.len() + self.replaced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records committed files for one install run.
///
/// Shared by reference between worker threads.
#[derive(Debug, Default)]
pub struct Transaction {
    state: Mutex<TransactionSummary>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TransactionSummary> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a destination that was renamed into place
    pub fn track_committed(&self, destination: impl Into<PathBuf>, replaced: bool) {
        let mut state = self.lock();
        if replaced {
            state.replaced.push(destination.into());
        } else {
            state.created.push(destination.into());
        }
    }

    /// Close the transaction and return what it wrote
    pub fn finish(self) -> TransactionSummary {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
