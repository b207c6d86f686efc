//! Schema extras: user metadata stored outside the native catalog.
//!
//! The [`ExtrasStore`] trait is the boundary to wherever extras live (a
//! system table, a key-value store). Rows are keyed by table name, plus the
//! field or relationship name. All name matching is case-insensitive.
//!
//! - [`MemoryExtrasStore`]: in-process store, used by tests and the CLI.

mod memory;

pub use memory::MemoryExtrasStore;

use serde::{Deserialize, Serialize};

use crate::core::{DbFunction, SimpleType};
use crate::error::Result;

/// Table-level extras: display metadata for a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableExtras {
    pub table: String,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub plural: Option<String>,
    pub description: Option<String>,
    pub name_field: Option<String>,
}

/// Field-level extras, including virtual columns and virtual foreign keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldExtras {
    pub table: String,
    pub field: String,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub picklist: Option<Vec<String>>,
    pub validation: Option<serde_json::Value>,
    pub db_function: Option<DbFunction>,
    /// `Some(Virtual)` marks a column with no physical storage.
    pub extra_type: Option<SimpleType>,
    pub is_virtual_foreign_key: bool,
    pub is_foreign_ref_service: bool,
    pub ref_service: Option<String>,
    pub ref_table: Option<String>,
    pub ref_field: Option<String>,
    pub ref_on_update: Option<String>,
    pub ref_on_delete: Option<String>,
}

impl FieldExtras {
    pub fn is_virtual_column(&self) -> bool {
        self.extra_type == Some(SimpleType::Virtual)
    }
}

/// Relationship-level extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedExtras {
    pub table: String,
    pub relationship: String,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub always_fetch: bool,
    pub flatten: bool,
    pub flatten_drop_prefix: bool,
}

/// Persistence boundary for schema extras.
///
/// Empty name slices mean "all" for the table in question.
pub trait ExtrasStore: Send + Sync {
    /// Extras for the named tables.
    fn get_table_extras(&self, tables: &[String]) -> Result<Vec<TableExtras>>;

    /// Extras for fields of `table`.
    fn get_field_extras(&self, table: &str, fields: &[String]) -> Result<Vec<FieldExtras>>;

    /// Virtual foreign key extras on other tables that point at `table`.
    fn get_field_extras_referenced(&self, table: &str) -> Result<Vec<FieldExtras>>;

    /// Extras for relationships of `table`.
    fn get_related_extras(&self, table: &str, relations: &[String])
        -> Result<Vec<RelatedExtras>>;

    /// Upsert table extras.
    fn set_table_extras(&self, rows: Vec<TableExtras>) -> Result<()>;

    /// Upsert field extras.
    fn set_field_extras(&self, rows: Vec<FieldExtras>) -> Result<()>;

    /// Upsert relationship extras.
    fn set_related_extras(&self, rows: Vec<RelatedExtras>) -> Result<()>;

    /// Remove table extras, and with them all field and relationship extras
    /// of those tables.
    fn remove_table_extras(&self, tables: &[String]) -> Result<()>;

    /// Remove extras for fields of `table`.
    fn remove_field_extras(&self, table: &str, fields: &[String]) -> Result<()>;

    /// Remove extras for relationships of `table`.
    fn remove_related_extras(&self, table: &str, relations: &[String]) -> Result<()>;

    /// Store type name for logging/debugging.
    fn store_type(&self) -> &'static str;
}
