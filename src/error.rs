//! Error type shared by storage, ingestion and search.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::VertexId;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CliqueError>;

/// Errors surfaced by the graph store, ingestion, and search layers.
#[derive(Debug, Error)]
pub enum CliqueError {
    /// SQLite backend failure.
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// JSON decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A vertex id was never interned in the catalog.
    #[error("vertex {0} not found")]
    VertexNotFound(VertexId),
    /// Refused to create a store over an existing path.
    #[error("store already exists at {}", .0.display())]
    StoreExists(PathBuf),
    /// Store file does not exist.
    #[error("store not found: {}", .0.display())]
    MissingStore(PathBuf),
    /// Write attempted after the store was sealed for searching.
    #[error("store is sealed; writes are not allowed once search may begin")]
    Sealed,
    /// On-disk state does not match what the store expects.
    #[error("corruption detected: {0}")]
    Corruption(&'static str),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Malformed link input rejected at the ingestion boundary.
    #[error("invalid input at line {line}: {message}")]
    Input {
        /// One-based line (or record) number.
        line: u64,
        /// Description of the problem.
        message: String,
    },
}

impl CliqueError {
    pub(crate) fn input(line: u64, message: impl Into<String>) -> Self {
        CliqueError::Input {
            line,
            message: message.into(),
        }
    }
}
