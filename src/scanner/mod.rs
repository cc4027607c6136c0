//! Parallel filesystem scanner: a work-stealing traversal that builds the
//! shared entry tree, with hard-link dedup, symlink-loop protection, and a
//! single aggregation pass after the pool drains.

mod pool;
mod progress;
mod walker;

pub use pool::WorkStealingPool;
pub use progress::ProgressThrottle;
pub use walker::{ScanStats, Scanner};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a scan before traversal starts.
///
/// Failures on individual entries during traversal never surface here; they
/// increment the counters reported in [`ScanStats`].
#[derive(Error, Debug)]
pub enum ScanError {
    /// The requested scan root does not exist.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found
        path: PathBuf,
    },

    /// The scan root could not be inspected.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
