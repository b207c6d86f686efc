//! SQLite driver.
//!
//! - [`SqliteDialect`]: type mapping and the subset of DDL SQLite accepts
//! - `catalog`: sqlite_master and pragma discovery queries
//!
//! A live executor is [`SqliteConnection`](crate::connection::SqliteConnection)
//! behind the `sqlite` feature; the dialect itself has no driver dependency.

mod catalog;
mod dialect;

pub use dialect::SqliteDialect;
