//! The connection object and its query helpers.
//!
//! [`SqlDb`] owns an optional SQLite connection and exposes one helper per
//! common access pattern: run a statement, fetch one row, fetch all rows,
//! count, and build-then-execute inserts, selects and updates from
//! column-keyed inputs.
//!
//! Every failure is logged at `error` level with the helper name, the SQL
//! text and the driver message before it is returned.
//!
//! # Example
//!
//! ```
//! use sqlhelper_core::{Filter, Params};
//! use sqlhelper_sqlite::SqlDb;
//!
//! let db = SqlDb::open_in_memory().unwrap();
//! db.do_multi("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, role TEXT);").unwrap();
//!
//! db.prepare_and_insert("users", &Params::new().with("name", "ada").with("role", "admin")).unwrap();
//! db.prepare_and_insert("users", &Params::new().with("name", "grace").with("role", "dev")).unwrap();
//!
//! let admins = db.prepare_and_select("users", &Filter::new().eq("role", "admin"), &[], 0).unwrap();
//! assert_eq!(admins.len(), 1);
//!
//! let matching = db.do_count("users", &Filter::new().eq("name", "ra"), &["name"]).unwrap();
//! assert_eq!(matching, 1);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use rusqlite::Connection;
use sqlhelper_core::{Filter, Params, Row, Value, sql};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{DbError, Result};
use crate::fetch::{self, NamedValues};
use crate::prepared::Prepared;

/// Logs a helper failure and converts it into a [`DbError`].
fn fail(method: &'static str, sql: &str, err: impl Into<DbError>) -> DbError {
    let err = err.into();
    error!(method, sql, error = %err, "query helper failed");
    err
}

/// A database handle with SQL-building convenience helpers.
///
/// The handle starts disconnected ([`new`](Self::new)) or opened
/// ([`open`](Self::open), [`open_in_memory`](Self::open_in_memory)). Helpers
/// called while disconnected return [`DbError::NotConnected`].
#[derive(Debug, Default)]
pub struct SqlDb {
    conn: Option<Connection>,
    config: ConnectionConfig,
}

impl SqlDb {
    /// Creates a disconnected handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Database`] if the file cannot be opened or the
    /// connection settings cannot be applied.
    pub fn open(config: ConnectionConfig) -> Result<Self> {
        let mut db = Self::new();
        db.db_open(config)?;
        Ok(db)
    }

    /// Opens a private in-memory database with default settings.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(ConnectionConfig::default())
    }

    /// Opens the database file at `path` with default settings, replacing
    /// any open connection.
    pub fn connect(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.db_open(ConnectionConfig::new(path))
    }

    /// Opens a connection described by `config`, replacing any open one.
    pub fn db_open(&mut self, config: ConnectionConfig) -> Result<()> {
        let path = config.path.display().to_string();
        config.validate().map_err(|e| fail("db_open", &path, e))?;
        let conn = Connection::open_with_flags(&config.path, config.open_flags())
            .map_err(|e| fail("db_open", &path, e))?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| fail("db_open", &path, e))?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)
            .map_err(|e| fail("db_open", &path, e))?;

        if self.conn.is_some() {
            debug!(path = %path, "replacing open connection");
        }
        info!(path = %path, read_only = config.read_only, "database opened");
        self.conn = Some(conn);
        self.config = config;
        Ok(())
    }

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotConnected`] if nothing was open, or
    /// [`DbError::Database`] if SQLite refuses to close, in which case the
    /// connection stays open.
    pub fn db_close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Err(fail("db_close", "", DbError::NotConnected));
        };
        if let Err((conn, e)) = conn.close() {
            self.conn = Some(conn);
            return Err(fail("db_close", "", e));
        }
        info!(path = %self.config.path.display(), "database closed");
        Ok(())
    }

    /// Returns `true` while a connection is open.
    pub fn check_connection(&self) -> bool {
        self.conn.is_some()
    }

    /// Settings of the current (or last) connection.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The underlying driver connection, for anything the helpers do not
    /// cover.
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    fn conn(&self, method: &'static str, sql: &str) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| fail(method, sql, DbError::NotConnected))
    }

    /// Validates a raw query and the connection state, returning both.
    fn check_all<'q>(&self, method: &'static str, query: &'q str) -> Result<(&Connection, &'q str)> {
        let query = query.trim();
        if query.is_empty() {
            return Err(fail(method, query, DbError::EmptyQuery { method }));
        }
        Ok((self.conn(method, query)?, query))
    }

    fn fetch(&self, method: &'static str, query: &str, limit: Option<usize>) -> Result<Vec<Row>> {
        let (conn, query) = self.check_all(method, query)?;
        debug!(method, sql = query, "running query");
        let mut stmt = conn.prepare(query).map_err(|e| fail(method, query, e))?;
        fetch::fetch_rows(&mut stmt, &NamedValues::new(std::iter::empty()), limit)
            .map_err(|e| fail(method, query, e))
    }

    /// Runs a statement to completion, discarding any rows it returns, and
    /// returns the number of rows it changed (`0` for `SELECT` and `PRAGMA`).
    pub fn do_only(&self, query: &str) -> Result<usize> {
        let (conn, query) = self.check_all("do_only", query)?;
        debug!(sql = query, "do_only");
        let run = || -> rusqlite::Result<usize> {
            let before = conn.total_changes();
            {
                let mut stmt = conn.prepare(query)?;
                let mut rows = stmt.raw_query();
                while rows.next()?.is_some() {}
            }
            let changed = conn.total_changes().saturating_sub(before);
            Ok(usize::try_from(changed).unwrap_or(usize::MAX))
        };
        run().map_err(|e| fail("do_only", query, e))
    }

    /// Runs a query and returns its first row.
    pub fn do_one(&self, query: &str) -> Result<Option<Row>> {
        Ok(self.fetch("do_one", query, Some(1))?.into_iter().next())
    }

    /// Runs a query and returns every row.
    pub fn do_all(&self, query: &str) -> Result<Vec<Row>> {
        self.fetch("do_all", query, None)
    }

    /// Runs a query and indexes the rows by the textual value of column
    /// `key`. Later rows replace earlier ones with the same key; rows
    /// without the column are skipped.
    pub fn do_all_by_id(&self, query: &str, key: &str) -> Result<BTreeMap<String, Row>> {
        let key = Self::check_key("do_all_by_id", key)?;
        let mut out = BTreeMap::new();
        for row in self.fetch("do_all_by_id", query, None)? {
            match row.get(key).map(Value::to_string) {
                Some(id) => {
                    out.insert(id, row);
                }
                None => warn!(key, "row without key column skipped"),
            }
        }
        Ok(out)
    }

    /// Runs a query and groups the rows by the textual value of column
    /// `key`, preserving row order within each group.
    pub fn do_all_by_key(&self, query: &str, key: &str) -> Result<BTreeMap<String, Vec<Row>>> {
        let key = Self::check_key("do_all_by_key", key)?;
        let mut out: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        for row in self.fetch("do_all_by_key", query, None)? {
            match row.get(key).map(Value::to_string) {
                Some(group) => out.entry(group).or_default().push(row),
                None => warn!(key, "row without key column skipped"),
            }
        }
        Ok(out)
    }

    /// Runs a query and returns column `key` of its first row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::EmptyKey`] for an empty key.
    pub fn do_from_array(&self, query: &str, key: &str) -> Result<Option<Value>> {
        let key = Self::check_key("do_from_array", key)?;
        let row = self.fetch("do_from_array", query, Some(1))?.into_iter().next();
        Ok(row.and_then(|row| row.get(key).cloned()))
    }

    fn check_key<'a>(method: &'static str, key: &'a str) -> Result<&'a str> {
        let key = key.trim();
        if key.is_empty() {
            return Err(fail(method, "", DbError::EmptyKey { method }));
        }
        Ok(key)
    }

    /// Runs several `;`-separated statements in one call.
    pub fn do_multi(&self, query: &str) -> Result<()> {
        let (conn, query) = self.check_all("do_multi", query)?;
        debug!(sql = query, "do_multi");
        conn.execute_batch(query).map_err(|e| fail("do_multi", query, e))
    }

    /// Counts rows of `table` matching `filter`.
    ///
    /// Columns named in `like` match with `LIKE %value%`; list criteria
    /// match any element. An empty filter counts every row.
    pub fn do_count(&self, table: &str, filter: &Filter, like: &[&str]) -> Result<i64> {
        let bound = sql::count_sql(table, filter, like).map_err(|e| fail("do_count", table, e))?;
        let rows = self.prepare_named("do_count", &bound.sql)?.execute_bound(&bound)?;
        Ok(Self::count_of(rows))
    }

    /// Counts rows of `table` with a caller-written WHERE body (used
    /// verbatim; empty counts every row).
    pub fn do_count_where(&self, table: &str, where_sql: &str) -> Result<i64> {
        let query = sql::count_raw_sql(table, where_sql).map_err(|e| fail("do_count", table, e))?;
        let rows = self.fetch("do_count", &query, Some(1))?;
        Ok(Self::count_of(rows))
    }

    fn count_of(rows: Vec<Row>) -> i64 {
        rows.first()
            .and_then(|row| row.get("c"))
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// Rowid of the most recent successful insert on this connection.
    pub fn last_insert_id(&self) -> Result<i64> {
        Ok(self.conn("last_insert_id", "")?.last_insert_rowid())
    }

    /// Compiles `query` for repeated execution.
    pub fn prepare(&self, query: &str) -> Result<Prepared<'_>> {
        self.prepare_named("prepare", query)
    }

    fn prepare_named(&self, method: &'static str, query: &str) -> Result<Prepared<'_>> {
        let (conn, query) = self.check_all(method, query)?;
        debug!(method, sql = query, "preparing statement");
        let stmt = conn.prepare(query).map_err(|e| fail(method, query, e))?;
        Ok(Prepared::new(stmt, query))
    }

    /// Selects `columns` (all when empty) from `table` where every `filter`
    /// column equals its value (or any of its values). A `limit` of zero
    /// means no limit.
    pub fn prepare_and_select(
        &self,
        table: &str,
        filter: &Filter,
        columns: &[&str],
        limit: u32,
    ) -> Result<Vec<Row>> {
        let bound = sql::select_sql(table, filter, columns, limit)
            .map_err(|e| fail("prepare_and_select", table, e))?;
        self.prepare_named("prepare_and_select", &bound.sql)?
            .execute_bound(&bound)
    }

    /// Like [`prepare_and_select`](Self::prepare_and_select) with `LIMIT 1`,
    /// returning the single row.
    pub fn prepare_and_select_one(
        &self,
        table: &str,
        filter: &Filter,
        columns: &[&str],
    ) -> Result<Option<Row>> {
        Ok(self
            .prepare_and_select(table, filter, columns, 1)?
            .into_iter()
            .next())
    }

    /// Inserts one row built from `data`; returns the affected row count.
    pub fn prepare_and_insert(&self, table: &str, data: &Params) -> Result<usize> {
        let bound =
            sql::insert_sql(table, data).map_err(|e| fail("prepare_and_insert", table, e))?;
        self.prepare_named("prepare_and_insert", &bound.sql)?
            .execute_bound_only(&bound)
    }

    /// Updates `table` with `data` where every `where_eq` column matches and
    /// every `where_not` column differs; returns the affected row count.
    ///
    /// A positive `limit` caps the number of updated rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Build`] for empty data or when both condition
    /// maps are empty.
    pub fn prepare_and_update(
        &self,
        table: &str,
        data: &Params,
        where_eq: &Filter,
        where_not: &Filter,
        limit: u32,
    ) -> Result<usize> {
        let bound = sql::update_sql(table, data, where_eq, where_not, limit)
            .map_err(|e| fail("prepare_and_update", table, e))?;
        self.prepare_named("prepare_and_update", &bound.sql)?
            .execute_bound_only(&bound)
    }

    /// Prepares `INSERT INTO table (columns) VALUES (:columns)` for repeated
    /// execution with [`Prepared::execute_only`].
    pub fn prepare_insert(&self, table: &str, columns: &[&str]) -> Result<Prepared<'_>> {
        let query =
            sql::insert_template(table, columns).map_err(|e| fail("prepare_insert", table, e))?;
        self.prepare_named("prepare_insert", &query)
    }

    /// Prepares `UPDATE table SET column = :column ... WHERE where_sql`.
    /// Placeholders used in `where_sql` are bound alongside the columns.
    pub fn prepare_update(
        &self,
        table: &str,
        columns: &[&str],
        where_sql: &str,
    ) -> Result<Prepared<'_>> {
        let query = sql::update_template(table, columns, where_sql)
            .map_err(|e| fail("prepare_update", table, e))?;
        self.prepare_named("prepare_update", &query)
    }
}
