//! Common utilities shared across database drivers.
//!
//! - [`rows`]: reading aliased catalog rows into columns and parameters
//! - [`types`]: native type fallbacks and default-value parsing

pub mod rows;
pub mod types;

pub use rows::{
    column_from_row, constraints_from_rows, indexes_from_rows, parameter_from_row,
    table_names_from_rows,
};
pub use types::{apply_native_type, is_zero_date, parse_default};
