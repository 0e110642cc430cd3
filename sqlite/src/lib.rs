//! SQLite convenience helpers built on `rusqlite`.
//!
//! [`SqlDb`] wraps one connection and turns column-keyed inputs into
//! parameterized statements, runs them, and returns rows keyed by column
//! name. [`Prepared`] wraps a compiled statement for repeated execution and
//! logs a full diagnostic when execution fails.
//!
//! # Architecture
//!
//! - **`connection`**: [`SqlDb`]: open/close plus the `do_*` and
//!   `prepare_and_*` helpers
//! - **`prepared`**: [`Prepared`]: statement execution with failure logging
//! - **`fetch`**: driver value/row conversion
//! - **`config`**: [`ConnectionConfig`], loadable from YAML
//!
//! SQL text comes from [`sqlhelper_core::sql`].
//!
//! # Quick start
//!
//! ```no_run
//! use sqlhelper_core::{Filter, Params};
//! use sqlhelper_sqlite::{ConnectionConfig, SqlDb};
//!
//! let db = SqlDb::open(ConnectionConfig::new("app.db")).unwrap();
//!
//! db.prepare_and_insert("users", &Params::new().with("name", "ada")).unwrap();
//! let id = db.last_insert_id().unwrap();
//!
//! db.prepare_and_update(
//!     "users",
//!     &Params::new().with("name", "Ada"),
//!     &Filter::new().eq("id", id),
//!     &Filter::new(),
//!     1,
//! )
//! .unwrap();
//!
//! for row in db.do_all("SELECT * FROM users").unwrap() {
//!     println!("{:?}", row.get("name"));
//! }
//! ```

mod config;
mod connection;
mod error;
mod fetch;
mod prepared;

pub use config::{ConnectionConfig, IN_MEMORY_PATH};
pub use connection::SqlDb;
pub use error::{DbError, Result};
pub use prepared::Prepared;
