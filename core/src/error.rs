//! Error types for SQL generation.

use thiserror::Error;

/// Errors raised while turning helper inputs into SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Table name was empty after trimming.
    #[error("empty table name")]
    EmptyTable,

    /// Table or column name contains characters other than alphanumerics
    /// and underscores.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),

    /// Insert/update data (or a column list) was empty.
    #[error("empty data: at least one column is required")]
    EmptyData,

    /// Update had neither WHERE nor WHERE-NOT conditions.
    #[error("empty WHERE: refusing to build an unconditional update")]
    EmptyWhere,
}

/// Convenience alias for results with [`BuildError`].
pub type Result<T> = std::result::Result<T, BuildError>;
