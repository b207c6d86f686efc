//! Database driver implementations.
//!
//! Each driver provides a [`Dialect`](crate::core::Dialect) strategy for one
//! engine family:
//!
//! - [`mysql`]: MySQL and MariaDB
//! - [`postgres`]: PostgreSQL
//! - [`mssql`]: Microsoft SQL Server
//! - [`sqlite`]: SQLite
//! - [`ibm`]: IBM Db2
//! - [`oracle`]: Oracle
//! - [`sqlanywhere`]: SAP SQL Anywhere
//! - [`common`]: row readers and type helpers shared by all of them
//!
//! # Layout
//!
//! A driver is split into `dialect.rs` (the trait implementation: type
//! mapping, quoting, DDL statements, routine calls) and `catalog.rs` (the
//! engine's catalog queries). Catalog queries alias their columns to the
//! names read by [`common::rows`], so the row parsing is shared.
//!
//! # Adding New Databases
//!
//! 1. Create a module under `drivers/` with `dialect.rs` and `catalog.rs`
//! 2. Implement [`Dialect`](crate::core::Dialect), overriding the DDL
//!    defaults where the engine's syntax differs
//! 3. Register it, with any aliases, in
//!    [`DialectCatalog::with_builtins`](crate::core::DialectCatalog::with_builtins)

pub mod common;
pub mod ibm;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlanywhere;
pub mod sqlite;

pub use ibm::IbmDialect;
pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlanywhere::SqlAnywhereDialect;
pub use sqlite::SqliteDialect;
