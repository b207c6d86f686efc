//! SQL Anywhere SQL dialect (Strategy pattern).
//!
//! Identity columns use `DEFAULT AUTOINCREMENT`; `DEFAULT TIMESTAMP`
//! refreshes a column on every update without a trigger.

use super::catalog;
use crate::core::identifier::quote_literal;
use crate::core::{
    ColumnSchema, Connection, ConstraintRow, Dialect, IndexRow, RoutineKind,
    RoutineParameterRow, RoutineSchema, SimpleType, TableNameRow, TableSchema, Value,
};
use crate::ddl::definition::{coerce_default, mark_identity, scaled, sized};
use crate::ddl::ColumnInfo;
use crate::drivers::common::apply_native_type;
use crate::error::Result;

const DEFAULT_STRING_LENGTH: u32 = 255;

/// SQL Anywhere dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlAnywhereDialect;

impl SqlAnywhereDialect {
    /// Create a new SQL Anywhere dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqlAnywhereDialect {
    fn name(&self) -> &str {
        "sqlanywhere"
    }

    fn max_identifier_length(&self) -> usize {
        128
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
            SimpleType::Boolean => info.col_type = "bit".into(),
            SimpleType::Float => info.col_type = "real".into(),
            SimpleType::Double => info.col_type = "double".into(),
            SimpleType::Decimal => {
                info.col_type = "numeric".into();
                scaled(info, 10, 0);
            }
            SimpleType::Money => info.col_type = "money".into(),
            SimpleType::Text => {
                info.col_type = if info.supports_multibyte {
                    "long nvarchar"
                } else {
                    "long varchar"
                }
                .into();
            }
            SimpleType::Binary => info.col_type = "long binary".into(),
            SimpleType::Date => info.col_type = "date".into(),
            SimpleType::Time => info.col_type = "time".into(),
            SimpleType::Datetime => info.col_type = "datetime".into(),
            SimpleType::Timestamp => info.col_type = "timestamp".into(),
            SimpleType::TimestampOnCreate => {
                info.col_type = "timestamp".into();
                info.allow_null = false;
                info.default
                    .get_or_insert_with(|| Value::expression("CURRENT TIMESTAMP"));
            }
            SimpleType::TimestampOnUpdate => {
                info.col_type = "timestamp".into();
                info.allow_null = false;
                info.default = Some(Value::expression("TIMESTAMP"));
            }
            SimpleType::String | SimpleType::Virtual => {
                info.col_type = match (info.fixed_length, info.supports_multibyte) {
                    (true, true) => "nchar",
                    (true, false) => "char",
                    (false, true) => "nvarchar",
                    (false, false) => "varchar",
                }
                .into();
                sized(info, DEFAULT_STRING_LENGTH);
            }
        }
    }

    fn validate_column_settings(&self, info: &mut ColumnInfo) -> Result<()> {
        coerce_default(info);
        Ok(())
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("DEFAULT AUTOINCREMENT")
    }

    fn add_column_sql(&self, table: &str, column: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD {} {}",
            self.quote_table_name(table),
            self.quote_column_name(column),
            definition
        )
    }

    fn rename_column_sql(&self, table: &str, old: &str, new: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME {} TO {}",
            self.quote_table_name(table),
            self.quote_column_name(old),
            self.quote_column_name(new)
        )
    }

    fn drop_index_sql(&self, name: &str, table: &str) -> String {
        format!(
            "DROP INDEX {}.{}",
            self.quote_table_name(table),
            self.quote_column_name(name)
        )
    }

    /// `sa_reset_identity` takes the last value used.
    fn reset_sequence_sql(&self, table: &TableSchema, value: Option<i64>) -> Result<Vec<String>> {
        let Some(column) = table.columns.iter().find(|c| c.auto_increment) else {
            return Ok(Vec::new());
        };
        let name = quote_literal(&table.table_name);
        let owner = quote_literal(&table.schema_name);
        Ok(vec![match value {
            Some(v) => format!("CALL sa_reset_identity({}, {}, {})", name, owner, v - 1),
            None => format!(
                "BEGIN DECLARE n BIGINT; \
                 SELECT COALESCE(MAX({}), 0) INTO n FROM {}; \
                 CALL sa_reset_identity({}, {}, n); END",
                self.quote_column_name(&column.name),
                self.quote_table_name(&table.qualified_name()),
                name,
                owner
            ),
        }])
    }

    /// Disabling defers foreign key checks to commit; connection-wide.
    fn check_integrity_sql(&self, check: bool, _table: Option<&TableSchema>) -> Vec<String> {
        vec![format!(
            "SET TEMPORARY OPTION wait_for_commit = '{}'",
            if check { "Off" } else { "On" }
        )]
    }

    fn default_schema(&self, conn: &dyn Connection) -> Result<String> {
        catalog::default_schema(conn)
    }

    fn find_schema_names(&self, conn: &dyn Connection) -> Result<Vec<String>> {
        catalog::schema_names(conn)
    }

    fn find_table_names(
        &self,
        conn: &dyn Connection,
        schema: &str,
        include_views: bool,
    ) -> Result<Vec<TableNameRow>> {
        catalog::table_names(conn, schema, include_views)
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

    fn find_routines(
        &self,
        conn: &dyn Connection,
        schema: &str,
        kind: RoutineKind,
    ) -> Result<Vec<String>> {
        catalog::routines(conn, schema, kind)
    }

    fn find_routine_parameters(
        &self,
        conn: &dyn Connection,
        routine: &RoutineSchema,
    ) -> Result<Vec<RoutineParameterRow>> {
        catalog::routine_parameters(self, conn, routine)
    }
}
