//! Error types for the planner.
//!
//! Load problems never surface as errors: a missing or unreadable snapshot
//! means an empty planner. Everything else is returned to the caller, which
//! decides whether to show it.

use thiserror::Error;

/// Failures talking to the persistence backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode task snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage rejected write for key '{0}'")]
    Injected(String),
}

/// Failures of task store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid task: {0}")]
    Validation(String),

    #[error("no task matches '{0}'")]
    NotFound(String),

    #[error("'{identifier}' matches {count} tasks, use a longer id")]
    Ambiguous { identifier: String, count: usize },

    /// The in-memory change was applied but could not be written out.
    #[error("saved in memory only: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}
