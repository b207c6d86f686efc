//! Output of the field-diffing algorithm.

use serde::Serialize;

use crate::ddl::FieldDescriptor;
use crate::extras::FieldExtras;

/// Deferred foreign key creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyCommand {
    pub name: String,
    pub table: String,
    pub column: String,
    pub ref_table: String,
    pub ref_field: String,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

/// Deferred index creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexCommand {
    pub name: String,
    pub table: String,
    pub column: String,
    pub unique: bool,
    /// Drop any existing index of the same name first (best effort).
    pub drop: bool,
}

/// Everything needed to bring one table in line with a field list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableFieldsPlan {
    /// New physical columns.
    pub columns: Vec<FieldDescriptor>,
    /// Existing physical columns whose settings change. Carries the full
    /// effective settings (existing overlaid with the descriptor).
    pub alter_columns: Vec<FieldDescriptor>,
    pub drop_columns: Vec<String>,
    pub references: Vec<ForeignKeyCommand>,
    pub indexes: Vec<IndexCommand>,
    pub extras: Vec<FieldExtras>,
    pub drop_extras: Vec<String>,
    /// Extra statements run after the table DDL (sequences, triggers).
    pub commands: Vec<String>,
}

impl TableFieldsPlan {
    /// No physical change of any kind.
    pub fn is_physically_empty(&self) -> bool {
        self.columns.is_empty()
            && self.alter_columns.is_empty()
            && self.drop_columns.is_empty()
            && self.references.is_empty()
            && self.indexes.is_empty()
            && self.commands.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.is_physically_empty() && self.extras.is_empty() && self.drop_extras.is_empty()
    }
}
