//! Oracle driver.
//!
//! - [`OracleDialect`]: type mapping, DDL syntax and routine calls
//! - `catalog`: ALL_* dictionary view queries
//!
//! Registered as `oracle`, with `oci` as an alias. Identity columns are
//! emulated with a sequence and a BEFORE INSERT trigger, which works on
//! every release from 11g on.

mod catalog;
mod dialect;

pub use dialect::OracleDialect;
