//! IBM Db2 driver.
//!
//! - [`IbmDialect`]: type mapping, DDL syntax and routine calls
//! - `catalog`: SYSCAT discovery queries
//!
//! Registered as `ibm`, with `db2` as an alias. Targets Db2 for LUW 10.5+.

mod catalog;
mod dialect;

pub use dialect::IbmDialect;
