//! Driver-agnostic building blocks for the sqlhelper database helpers.
//!
//! This crate defines the data passed into and out of the helpers and the
//! SQL text generation behind them:
//!
//! - [`Value`]: one SQL value (`NULL`, integer, real, text, blob).
//! - [`Row`]: a result row keyed by column name, in result-set order.
//! - [`Params`]: column-keyed data for inserts and updates.
//! - [`Filter`] / [`Criterion`]: column-keyed match conditions, scalar or
//!   list, for WHERE generation.
//! - [`sql`]: builders producing [`BoundSql`](sql::BoundSql): SQL text with
//!   named placeholders plus the values to bind.
//!
//! Nothing here talks to a database; see `sqlhelper-sqlite` for execution.
//!
//! # Example
//!
//! ```
//! use sqlhelper_core::{Filter, Params, sql};
//!
//! let data = Params::new().with("name", "ada").with("active", true);
//! let insert = sql::insert_sql("users", &data).unwrap();
//! assert_eq!(
//!     insert.sql,
//!     "INSERT INTO `users` (`name`, `active`) VALUES (:name, :active)"
//! );
//!
//! let select = sql::select_sql("users", &Filter::new().eq("name", "ada"), &[], 1).unwrap();
//! assert_eq!(select.sql, "SELECT * FROM `users` WHERE `name` = :name LIMIT 1");
//! ```

mod error;
pub mod sql;
mod types;

pub use error::{BuildError, Result};
pub use sql::BoundSql;
pub use types::{Criterion, Filter, Params, Row, Value};
