//! Connection configuration.
//!
//! Defines the YAML-serializable settings used to open a [`SqlDb`]
//! connection. Every field has a default, so a partial file is enough.
//!
//! # Example YAML
//!
//! ```yaml
//! path: data/app.db
//! read_only: false
//! create_if_missing: true
//! busy_timeout_ms: 5000
//! foreign_keys: true
//! log_file: logs/db-errors.log
//! ```
//!
//! [`SqlDb`]: crate::SqlDb

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Path that opens a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Settings for opening a SQLite connection.
///
/// # Examples
///
/// ```
/// use sqlhelper_sqlite::ConnectionConfig;
///
/// let config = ConnectionConfig::new("app.db").read_only(true);
/// assert!(config.read_only);
/// assert!(config.foreign_keys);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Database file, or `:memory:`.
    pub path: PathBuf,
    /// Open without write access.
    pub read_only: bool,
    /// Create the file when it does not exist (ignored when read-only).
    pub create_if_missing: bool,
    /// How long a statement waits on a locked database.
    pub busy_timeout_ms: u64,
    /// Enforce foreign key constraints on this connection.
    pub foreign_keys: bool,
    /// Where a front end should send error logs; `None` means stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(IN_MEMORY_PATH),
            read_only: false,
            create_if_missing: true,
            busy_timeout_ms: 5000,
            foreign_keys: true,
            log_file: None,
        }
    }
}

impl ConnectionConfig {
    /// Default settings for the database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns `true` when the path names an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY_PATH
    }

    /// Driver open flags derived from the settings.
    pub fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if self.create_if_missing {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }
        flags
    }

    /// Checks that the settings can be used to open a database.
    ///
    /// # Errors
    ///
    /// Returns [`Config`](crate::DbError::Config) for an empty path, or for
    /// a read-only in-memory database (which could never hold any tables).
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(DbError::Config("database path is empty".to_string()));
        }
        if self.read_only && self.is_in_memory() {
            return Err(DbError::Config(
                "an in-memory database cannot be opened read-only".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::DbError::Io) if the file cannot be read,
    /// [`Yaml`](crate::DbError::Yaml) if parsing fails, or
    /// [`Config`](crate::DbError::Config) if the loaded settings are unusable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::DbError::Io) if the file cannot be written, or
    /// [`Yaml`](crate::DbError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
