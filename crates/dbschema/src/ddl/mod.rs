//! DDL side of the engine: the abstract schema description format, the
//! column definition pipeline, and the field-diffing algorithm.
//!
//! - [`descriptor`]: `TableDescriptor` / `FieldDescriptor` input records
//! - [`column_info`]: working settings for one column definition
//! - [`definition`]: shared rendering helpers used by the dialects
//! - [`fields`]: `build_table_fields`, the desired-vs-existing diff
//! - [`plan`]: the diff output and deferred FK/index commands

pub mod column_info;
pub mod definition;
pub mod descriptor;
pub mod fields;
pub mod plan;

pub use column_info::ColumnInfo;
pub use descriptor::{FieldDescriptor, FieldType, Picklist, RelatedDescriptor, TableDescriptor};
pub use fields::build_table_fields;
pub use plan::{ForeignKeyCommand, IndexCommand, TableFieldsPlan};
