//! MySQL/MariaDB database driver.
//!
//! This module provides MySQL-specific implementations for:
//! - [`MysqlDialect`]: type mapping, DDL syntax and routine calls
//! - `catalog`: INFORMATION_SCHEMA discovery queries
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+
//!
//! Registered as `mysql`, with `mariadb` as an alias.

mod catalog;
mod dialect;

pub use dialect::MysqlDialect;
