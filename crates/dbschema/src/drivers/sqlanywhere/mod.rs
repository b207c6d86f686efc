//! SAP SQL Anywhere driver.
//!
//! - [`SqlAnywhereDialect`]: type mapping, DDL syntax and routine calls
//! - `catalog`: SYS.SYSTAB / SYSTABCOL / SYSIDX / SYSFKEY discovery
//!
//! Registered as `sqlanywhere`, with `sap` as an alias. Schemas are the
//! users owning tables.

mod catalog;
mod dialect;

pub use dialect::SqlAnywhereDialect;
