//! SQLite SQL dialect (Strategy pattern).
//!
//! SQLite has a single schema, no stored routines and only a narrow
//! `ALTER TABLE`: columns can be added, renamed and (3.35+) dropped, but
//! not redefined, and foreign keys exist only inline in column definitions.

use super::catalog;
use crate::core::identifier::quote_literal;
use crate::core::{
    ColumnSchema, Connection, ConstraintRow, Dialect, IndexRow, SimpleType, TableNameRow,
    TableSchema, Value,
};
use crate::ddl::definition::{coerce_default, mark_identity, scaled, sized, standard_definition};
use crate::ddl::ColumnInfo;
use crate::drivers::common::apply_native_type;
use crate::error::Result;

const DEFAULT_STRING_LENGTH: u32 = 255;

/// SQLite dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn supports_schema_enumeration(&self) -> bool {
        false
    }

    fn supports_procedures(&self) -> bool {
        false
    }

    fn supports_functions(&self) -> bool {
        false
    }

    fn supports_alter_column(&self) -> bool {
        false
    }

    fn supports_drop_foreign_key(&self) -> bool {
        false
    }

    fn inline_foreign_keys(&self) -> bool {
        true
    }

    fn supports_inline_unique_on_add(&self) -> bool {
        false
    }

    fn translate_simple_column_types(&self, info: &mut ColumnInfo) {
        let Some(simple) = info.simple_type else {
            apply_native_type(info, DEFAULT_STRING_LENGTH);
            return;
        };
        match simple {
            SimpleType::Id => {
                info.col_type = "integer".into();
                mark_identity(info);
            }
            SimpleType::Reference
            | SimpleType::UserId
            | SimpleType::UserIdOnCreate
            | SimpleType::UserIdOnUpdate
            | SimpleType::Integer => info.col_type = "integer".into(),
            SimpleType::Bigint => info.col_type = "bigint".into(),
            SimpleType::Boolean => info.col_type = "boolean".into(),
            SimpleType::Float => info.col_type = "real".into(),
            SimpleType::Double => info.col_type = "double".into(),
            SimpleType::Decimal => {
                info.col_type = "decimal".into();
                scaled(info, 10, 0);
            }
            SimpleType::Money => {
                info.col_type = "decimal".into();
                scaled(info, 19, 4);
            }
            SimpleType::Text => info.col_type = "text".into(),
            SimpleType::Binary => info.col_type = "blob".into(),
            SimpleType::Date => info.col_type = "date".into(),
            SimpleType::Time => info.col_type = "time".into(),
            SimpleType::Datetime => info.col_type = "datetime".into(),
            SimpleType::Timestamp => info.col_type = "timestamp".into(),
            SimpleType::TimestampOnCreate | SimpleType::TimestampOnUpdate => {
                info.col_type = "timestamp".into();
                info.allow_null = false;
                info.default
                    .get_or_insert_with(|| Value::expression("CURRENT_TIMESTAMP"));
            }
            SimpleType::String | SimpleType::Virtual => {
                info.col_type = if info.fixed_length { "char" } else { "varchar" }.into();
                sized(info, DEFAULT_STRING_LENGTH);
            }
        }
    }

    fn validate_column_settings(&self, info: &mut ColumnInfo) -> Result<()> {
        coerce_default(info);
        Ok(())
    }

    /// `AUTOINCREMENT` must follow `PRIMARY KEY`.
    fn build_column_definition(&self, info: &ColumnInfo) -> Result<String> {
        let mut def = standard_definition(self, info)?;
        if info.auto_increment && info.is_primary_key && !info.is_alter {
            def.push_str(" AUTOINCREMENT");
        }
        Ok(def)
    }

    /// `sqlite_sequence` stores the last value handed out.
    fn reset_sequence_sql(&self, table: &TableSchema, value: Option<i64>) -> Result<Vec<String>> {
        let Some(column) = table.columns.iter().find(|c| c.auto_increment) else {
            return Ok(Vec::new());
        };
        let last = match value {
            Some(v) => (v - 1).to_string(),
            None => format!(
                "(SELECT COALESCE(MAX({}), 0) FROM {})",
                self.quote_column_name(&column.name),
                self.quote_table_name(&table.table_name)
            ),
        };
        Ok(vec![format!(
            "UPDATE sqlite_sequence SET seq = {} WHERE name = {}",
            last,
            quote_literal(&table.table_name)
        )])
    }

    /// Enforcement is connection-wide; `table` is ignored.
    fn check_integrity_sql(&self, check: bool, _table: Option<&TableSchema>) -> Vec<String> {
        vec![format!(
            "PRAGMA foreign_keys = {}",
            if check { "ON" } else { "OFF" }
        )]
    }

    fn default_schema(&self, _conn: &dyn Connection) -> Result<String> {
        Ok(String::new())
    }

    fn find_table_names(
        &self,
        conn: &dyn Connection,
        _schema: &str,
        include_views: bool,
    ) -> Result<Vec<TableNameRow>> {
        catalog::table_names(conn, include_views)
    }

    fn find_columns(&self, conn: &dyn Connection, table: &TableSchema) -> Result<Vec<ColumnSchema>> {
        catalog::columns(self, conn, table)
    }

    fn find_primary_key(&self, conn: &dyn Connection, table: &TableSchema) -> Result<Vec<String>> {
        catalog::primary_key(conn, table)
    }

    fn find_indexes(&self, conn: &dyn Connection, table: &TableSchema) -> Result<Vec<IndexRow>> {
        catalog::indexes(conn, table)
    }

    fn find_constraints(&self, conn: &dyn Connection, schema: &str) -> Result<Vec<ConstraintRow>> {
        catalog::constraints(conn, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RoutineKind, RoutineSchema};
    use crate::ddl::FieldDescriptor;

    fn definition(field: FieldDescriptor) -> String {
        SqliteDialect::new().column_definition(&field, None).unwrap()
    }

    #[test]
    fn test_sqlite_dialect_name() {
        assert_eq!(SqliteDialect::new().name(), "sqlite");
    }

    #[test]
    fn test_sqlite_id_definition() {
        assert_eq!(
            definition(FieldDescriptor::new("id", "id")),
            "integer NOT NULL PRIMARY KEY AUTOINCREMENT"
        );
    }

    #[test]
    fn test_sqlite_inline_reference() {
        let mut field = FieldDescriptor::new("customer_id", "reference");
        field.ref_table = Some("customers".into());
        field.ref_on_delete = Some("cascade".into());
        assert_eq!(
            definition(field),
            "integer NULL REFERENCES \"customers\" (\"id\") ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_sqlite_capabilities() {
        let dialect = SqliteDialect::new();
        assert!(!dialect.supports_alter_column());
        assert!(!dialect.supports_drop_foreign_key());
        assert!(!dialect.supports_schema_enumeration());
        assert!(dialect.supports_rename_column());
        assert!(dialect.inline_foreign_keys());
    }

    #[test]
    fn test_sqlite_routines_not_implemented() {
        let dialect = SqliteDialect::new();
        let conn = crate::connection::DryRunConnection::new("sqlite");
        let err = dialect
            .find_routines(&conn, "", RoutineKind::Procedure)
            .unwrap_err();
        assert!(err.to_string().contains("sqlite"));
        let routine = RoutineSchema::stub(RoutineKind::Function, "", "f", "");
        assert!(dialect.load_routine(&conn, &routine).is_err());
    }

    #[test]
    fn test_sqlite_reset_sequence() {
        let dialect = SqliteDialect::new();
        let mut table = TableSchema::stub("", "orders", "", false);
        let mut id = ColumnSchema::new("id");
        id.auto_increment = true;
        table.add_column(id);
        assert_eq!(
            dialect.reset_sequence_sql(&table, Some(50)).unwrap(),
            vec!["UPDATE sqlite_sequence SET seq = 49 WHERE name = 'orders'".to_string()]
        );
        assert_eq!(
            dialect.check_integrity_sql(false, None),
            vec!["PRAGMA foreign_keys = OFF".to_string()]
        );
    }
}
