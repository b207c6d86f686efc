//! Microsoft SQL Server driver.
//!
//! This module provides SQL Server-specific implementations:
//!
//! - [`MssqlDialect`]: type mapping, DDL syntax and routine calls
//! - `catalog`: sys.* and INFORMATION_SCHEMA discovery queries
//!
//! Registered as `sqlsrv`, with `mssql`, `sqlserver` and `dblib` as aliases.

mod catalog;
mod dialect;

pub use dialect::MssqlDialect;
