//! Error taxonomy for the data-access core.
//!
//! The library hands back structured errors so callers can tell a fatal
//! schema failure apart from a recoverable connection failure. The CLI wraps
//! them in `anyhow` for reporting.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Table creation failed. Fatal for the session.
    #[error("failed to create database schema: {source}")]
    Schema {
        #[source]
        source: rusqlite::Error,
    },

    /// The file at `path` could not be opened as a database.
    #[error("failed to open database {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// WAL content could not be merged into the main file.
    #[error("WAL checkpoint failed: {reason}")]
    Checkpoint { reason: String },

    #[error("{context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{reason}")]
    Validation { reason: String },

    #[error("recipe {id} not found")]
    NotFound { id: i64 },

    /// The connection was left closed (for example after a failed import
    /// whose recovery also failed).
    #[error("database unavailable")]
    Unavailable,

    #[error("an import or export is already in progress")]
    TransferInProgress,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode ingredients: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Attach a short description to a raw `rusqlite` failure.
pub(crate) trait QueryContext<T> {
    fn query_context(self, context: &'static str) -> Result<T>;
}

impl<T> QueryContext<T> for rusqlite::Result<T> {
    fn query_context(self, context: &'static str) -> Result<T> {
        self.map_err(|source| DbError::Query { context, source })
    }
}
