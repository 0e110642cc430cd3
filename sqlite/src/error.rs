//! Error types for the database helpers.
//!
//! Provides a unified error type covering driver failures, SQL generation
//! failures, connection state, and configuration loading.

use sqlhelper_core::BuildError;
use thiserror::Error;

/// Errors that can occur while running a helper.
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite driver failure (open, prepare, bind, step).
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The helper inputs could not be turned into SQL.
    #[error("query build error: {0}")]
    Build(#[from] BuildError),

    /// The handle has no open connection.
    #[error("connection is not open")]
    NotConnected,

    /// A helper was called with an empty (or whitespace-only) query.
    #[error("{method}: empty query")]
    EmptyQuery { method: &'static str },

    /// A helper that reads one column was called with an empty key.
    #[error("{method}: empty key")]
    EmptyKey { method: &'static str },

    /// A required parameter was not supplied to a prepared statement.
    #[error("missing value for parameter {name}")]
    MissingParameter { name: String },

    /// Connection settings that cannot be used to open a database.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`DbError`].
pub type Result<T> = std::result::Result<T, DbError>;
