//! PostgreSQL database driver.
//!
//! This module provides PostgreSQL-specific implementations:
//!
//! - [`PostgresDialect`]: type mapping, DDL syntax and routine calls
//! - `catalog`: pg_catalog and information_schema discovery queries
//!
//! Registered as `pgsql`, with `postgres` and `postgresql` as aliases.

mod catalog;
mod dialect;

pub use dialect::PostgresDialect;
