//! Prepared-statement execution with failure diagnostics.
//!
//! [`Prepared`] wraps a driver statement together with its SQL text. Every
//! execution failure is logged with the statement, its declared parameters
//! and the values that were bound, then returned to the caller.
//!
//! # Example
//!
//! ```
//! use sqlhelper_core::Params;
//! use sqlhelper_sqlite::SqlDb;
//!
//! let db = SqlDb::open_in_memory().unwrap();
//! db.do_multi("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);").unwrap();
//!
//! let mut insert = db.prepare_insert("t", &["name"]).unwrap();
//! for name in ["ada", "grace"] {
//!     insert.execute_only(&Params::new().with("name", name)).unwrap();
//! }
//!
//! let mut select = db.prepare("SELECT name FROM t WHERE id = :id").unwrap();
//! let row = select.execute_one(&Params::new().with("id", 2)).unwrap().unwrap();
//! assert_eq!(row.get("name").and_then(|v| v.as_str()), Some("grace"));
//! ```

use std::fmt::Write as _;

use rusqlite::Statement;
use sqlhelper_core::{BoundSql, Params, Row};
use tracing::{debug, error};

use crate::error::{DbError, Result};
use crate::fetch::{self, NamedValues};

const SEPARATOR: &str = "--------------------";

/// A compiled statement bound to a connection.
pub struct Prepared<'conn> {
    stmt: Statement<'conn>,
    sql: String,
}

impl<'conn> Prepared<'conn> {
    pub(crate) fn new(stmt: Statement<'conn>, sql: impl Into<String>) -> Self {
        Self {
            stmt,
            sql: sql.into(),
        }
    }

    /// The SQL text this statement was prepared from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names declared by the statement, in index order.
    /// Positional (`?`) parameters are reported as `?N`.
    pub fn parameter_names(&self) -> Vec<String> {
        (1..=self.stmt.parameter_count())
            .map(|i| {
                self.stmt
                    .parameter_name(i)
                    .map_or_else(|| format!("?{i}"), str::to_string)
            })
            .collect()
    }

    /// Executes the statement and returns the number of affected rows.
    ///
    /// Keys of `params` may be given with or without the leading `:`.
    ///
    /// # Errors
    ///
    /// Returns [`MissingParameter`](crate::DbError::MissingParameter) if a
    /// named placeholder has no value in `params`, or
    /// [`Database`](crate::DbError::Database) if binding or execution fails,
    /// including when the statement returns rows.
    pub fn execute_only(&mut self, params: &Params) -> Result<usize> {
        let values = NamedValues::new(params.iter());
        debug!(sql = %self.sql, params = params.len(), "execute_only");
        self.check_supplied("execute_only", &values, || params_debug(params))?;
        fetch::execute(&mut self.stmt, &values)
            .map_err(|e| self.report("execute_only", e, params_debug(params)))
    }

    /// Executes the statement and returns every result row.
    ///
    /// Statements that produce no rows (DML, DDL) yield an empty vector.
    pub fn execute(&mut self, params: &Params) -> Result<Vec<Row>> {
        let values = NamedValues::new(params.iter());
        debug!(sql = %self.sql, params = params.len(), "execute");
        self.check_supplied("execute", &values, || params_debug(params))?;
        fetch::fetch_rows(&mut self.stmt, &values, None)
            .map_err(|e| self.report("execute", e, params_debug(params)))
    }

    /// Executes the statement and returns the first row, if any.
    pub fn execute_one(&mut self, params: &Params) -> Result<Option<Row>> {
        let values = NamedValues::new(params.iter());
        debug!(sql = %self.sql, params = params.len(), "execute_one");
        self.check_supplied("execute_one", &values, || params_debug(params))?;
        fetch::fetch_rows(&mut self.stmt, &values, Some(1))
            .map(|rows| rows.into_iter().next())
            .map_err(|e| self.report("execute_one", e, params_debug(params)))
    }

    /// Executes with the values carried by a generated statement and returns
    /// every result row.
    pub fn execute_bound(&mut self, bound: &BoundSql) -> Result<Vec<Row>> {
        let values = NamedValues::new(bound.params.iter().map(|(n, v)| (n.as_str(), v)));
        debug!(sql = %self.sql, params = bound.params.len(), "execute_bound");
        self.check_supplied("execute_bound", &values, || format!("{:?}", bound.params))?;
        fetch::fetch_rows(&mut self.stmt, &values, None)
            .map_err(|e| self.report("execute_bound", e, format!("{:?}", bound.params)))
    }

    /// Executes a generated statement for its side effects.
    pub fn execute_bound_only(&mut self, bound: &BoundSql) -> Result<usize> {
        let values = NamedValues::new(bound.params.iter().map(|(n, v)| (n.as_str(), v)));
        debug!(sql = %self.sql, params = bound.params.len(), "execute_bound_only");
        self.check_supplied("execute_bound_only", &values, || format!("{:?}", bound.params))?;
        fetch::execute(&mut self.stmt, &values)
            .map_err(|e| self.report("execute_bound_only", e, format!("{:?}", bound.params)))
    }

    /// Fails when a named placeholder has no value, so a reused statement
    /// never runs with a binding left over from an earlier call.
    fn check_supplied(
        &self,
        method: &str,
        values: &NamedValues,
        bound: impl FnOnce() -> String,
    ) -> Result<()> {
        match values.first_missing(&self.stmt) {
            Some(name) => Err(self.report(method, DbError::MissingParameter { name }, bound())),
            None => Ok(()),
        }
    }

    fn report(&self, method: &str, err: impl Into<DbError>, bound: String) -> DbError {
        let err = err.into();
        let mut dump = String::new();
        let _ = writeln!(dump, "{SEPARATOR} driver message:\n{err}");
        let _ = writeln!(dump, "{SEPARATOR} statement:\n{}", self.sql);
        let _ = writeln!(
            dump,
            "{SEPARATOR} declared parameters:\n{:?}",
            self.parameter_names()
        );
        let _ = write!(dump, "{SEPARATOR} bound values:\n{bound}");
        error!(method, "prepared statement failed\n{dump}");
        err
    }
}

fn params_debug(params: &Params) -> String {
    format!("{:?}", params.iter().collect::<Vec<_>>())
}
