//! Error types for issue registry operations.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for the issue registry.
#[derive(Error, Debug)]
pub enum IssueError {
    /// An interactive operation was interrupted or answered ambiguously.
    #[error("Operation cancelled: {reason}")]
    Cancelled { reason: String },

    /// No issue with the given identifier exists.
    #[error("No issue file with id {id} found.")]
    NotFound { id: String },

    /// The store directory or one of its files could not be read or written.
    #[error("Issue store unavailable at {}: {source}", .path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record file does not parse into an issue.
    #[error("Malformed issue record {}: {reason}", .path.display())]
    MalformedRecord { path: PathBuf, reason: String },

    /// Every candidate identifier for a creation time was already in use.
    #[error("Failed to generate a unique issue id for '{date}' after {attempts} attempts")]
    IdExhausted { date: String, attempts: usize },

    /// An issue could not be rendered as a record.
    #[error("Failed to serialize issue record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IssueError {
    pub fn cancelled(reason: impl Into<String>) -> Self {
        IssueError::Cancelled {
            reason: reason.into(),
        }
    }

    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IssueError::StoreUnavailable {
            path: path.into(),
            source,
        }
    }

    /// True for errors that end only the current operation, not the process.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, IssueError::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, IssueError>;
