//! Normalized catalog rows returned by dialect discovery queries.
//!
//! Each dialect aliases its native catalog columns to the lowercase names
//! read here, so relation building and the orchestrator never see
//! engine-specific shapes.

use std::collections::BTreeMap;

use super::routine::ParameterSchema;
use super::table::TableSchema;
use super::value::{Row, Value};

/// One table or view found by name discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNameRow {
    pub schema: String,
    pub table: String,
    pub is_view: bool,
}

impl TableNameRow {
    /// Read `table_name` / `table_type` columns. Any type containing `VIEW`
    /// (or DB2's `V`) is a view.
    pub fn from_row(schema: &str, row: &Row) -> Option<Self> {
        let table = row.get_str("table_name")?;
        let kind = row.get_str("table_type").unwrap_or_default().to_ascii_uppercase();
        Some(Self {
            schema: schema.to_string(),
            table,
            is_view: kind.contains("VIEW") || kind == "V",
        })
    }
}

/// One column of one foreign key constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintRow {
    pub constraint_name: String,
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    pub referenced_table_schema: String,
    pub referenced_table_name: String,
    pub referenced_column_name: String,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

impl ConstraintRow {
    /// Read a row aliased to the normalized column names.
    ///
    /// Missing schema columns fall back to `schema`.
    pub fn from_row(schema: &str, row: &Row) -> Option<Self> {
        Some(Self {
            constraint_name: row.get_str("constraint_name").unwrap_or_default(),
            table_schema: row
                .get_str("table_schema")
                .unwrap_or_else(|| schema.to_string()),
            table_name: row.get_str("table_name")?,
            column_name: row.get_str("column_name")?,
            referenced_table_schema: row
                .get_str("referenced_table_schema")
                .unwrap_or_else(|| schema.to_string()),
            referenced_table_name: row.get_str("referenced_table_name")?,
            referenced_column_name: row.get_str("referenced_column_name")?,
            update_rule: row
                .get_str("update_rule")
                .map(|r| normalize_referential_action(&r)),
            delete_rule: row
                .get_str("delete_rule")
                .map(|r| normalize_referential_action(&r)),
        })
    }

    /// Whether this constraint's owning table is `table`.
    pub fn is_on(&self, table: &TableSchema) -> bool {
        self.table_name.eq_ignore_ascii_case(&table.table_name)
            && self.table_schema.eq_ignore_ascii_case(&table.schema_name)
    }

    /// Whether this constraint references `table`.
    pub fn references(&self, table: &TableSchema) -> bool {
        self.referenced_table_name
            .eq_ignore_ascii_case(&table.table_name)
            && self
                .referenced_table_schema
                .eq_ignore_ascii_case(&table.schema_name)
    }
}

/// Map catalog spellings of referential actions to SQL keywords.
///
/// Handles `NO_ACTION` (SQL Server) and DB2's single-letter codes.
pub fn normalize_referential_action(action: &str) -> String {
    match action.trim().to_ascii_uppercase().replace('_', " ").as_str() {
        "C" | "CASCADE" => "CASCADE".to_string(),
        "N" | "SET NULL" => "SET NULL".to_string(),
        "D" | "SET DEFAULT" => "SET DEFAULT".to_string(),
        "R" | "RESTRICT" => "RESTRICT".to_string(),
        "A" | "NO ACTION" | "" => "NO ACTION".to_string(),
        other => other.to_string(),
    }
}

/// One single-column index, used to flag unique and indexed columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub index_name: String,
    pub column_name: String,
    pub is_unique: bool,
    pub is_primary: bool,
}

/// Result of a dialect's table load: the table with columns and primary key,
/// and the schema's foreign key rows for relation building.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: TableSchema,
    pub constraints: Vec<ConstraintRow>,
}

/// Routine parameter discovered together with a flag marking the return slot.
#[derive(Debug, Clone)]
pub struct RoutineParameterRow {
    pub parameter: ParameterSchema,
    /// Position-0 entry describing a function's return value.
    pub is_return: bool,
}

/// Arguments to a routine call, keyed by lowercase parameter name without sigil.
pub type CallArgs = BTreeMap<String, Value>;

/// Where the OUT parameter values of a call come from.
#[derive(Debug, Clone, PartialEq)]
pub enum OutSource {
    /// No OUT parameters.
    None,
    /// A follow-up select reading session variables, one column per parameter.
    PostSelect(String),
    /// The last result set of the call itself holds one row of OUT values.
    LastResultSet,
    /// The first (only) row of the call's result holds OUT values.
    FirstRow,
}

/// Statements a dialect needs to invoke a routine.
#[derive(Debug, Clone, PartialEq)]
pub struct CallPlan {
    /// Statements run before the call (session variable setup).
    pub pre: Vec<(String, Vec<Value>)>,
    pub call: String,
    pub bindings: Vec<Value>,
    pub out: OutSource,
    /// OUT parameter names, in the column order of the OUT source.
    pub out_params: Vec<String>,
}

impl CallPlan {
    pub fn new(call: String, bindings: Vec<Value>) -> Self {
        Self {
            pre: Vec::new(),
            call,
            bindings,
            out: OutSource::None,
            out_params: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_row_from_aliased_row() {
        let row = Row::from_pairs([
            ("CONSTRAINT_NAME", Value::from("fk_child_parent")),
            ("TABLE_NAME", "child".into()),
            ("COLUMN_NAME", "parent_id".into()),
            ("REFERENCED_TABLE_NAME", "parent".into()),
            ("REFERENCED_COLUMN_NAME", "id".into()),
            ("DELETE_RULE", "NO_ACTION".into()),
        ]);
        let c = ConstraintRow::from_row("app", &row).unwrap();
        assert_eq!(c.table_schema, "app");
        assert_eq!(c.referenced_table_schema, "app");
        assert_eq!(c.delete_rule.as_deref(), Some("NO ACTION"));
        assert_eq!(c.update_rule, None);
    }

    #[test]
    fn test_constraint_row_requires_reference() {
        let row = Row::from_pairs([("table_name", "child"), ("column_name", "x")]);
        assert!(ConstraintRow::from_row("", &row).is_none());
    }

    #[test]
    fn test_referential_action_codes() {
        assert_eq!(normalize_referential_action("c"), "CASCADE");
        assert_eq!(normalize_referential_action("N"), "SET NULL");
        assert_eq!(normalize_referential_action("set_default"), "SET DEFAULT");
        assert_eq!(normalize_referential_action("A"), "NO ACTION");
    }

    #[test]
    fn test_table_name_row_view_detection() {
        let view = Row::from_pairs([("TABLE_NAME", "v_users"), ("TABLE_TYPE", "VIEW")]);
        assert!(TableNameRow::from_row("", &view).unwrap().is_view);
        let db2 = Row::from_pairs([("table_name", "T1"), ("table_type", "V")]);
        assert!(TableNameRow::from_row("APP", &db2).unwrap().is_view);
        let base = Row::from_pairs([("table_name", "users"), ("table_type", "BASE TABLE")]);
        assert!(!TableNameRow::from_row("", &base).unwrap().is_view);
    }
}
