//! IBM Db2 SQL dialect (Strategy pattern).
//!
//! Db2 declares nullable columns by omitting `NOT NULL`, keeps row change
//! timestamps as a generated column and needs a table REORG after some
//! column alterations.

use super::catalog;
use crate::core::{
    standard_call, CallArgs, CallPlan, ColumnSchema, Connection, ConstraintRow, Dialect,
    IndexRow, RoutineKind, RoutineParameterRow, RoutineSchema, SimpleType, TableNameRow,
    TableSchema, Value,
};
use crate::ddl::definition::{
    check_key_flags, coerce_default, default_clause, key_clause, mark_identity, scaled, sized,
};
use crate::ddl::ColumnInfo;
use crate::drivers::common::apply_native_type;
use crate::error::Result;

const DEFAULT_STRING_LENGTH: u32 = 255;
const IDENTITY: &str = " GENERATED BY DEFAULT AS IDENTITY (START WITH 1, INCREMENT BY 1)";
const ROW_CHANGE: &str = " GENERATED ALWAYS FOR EACH ROW ON UPDATE AS ROW CHANGE TIMESTAMP";

/// IBM Db2 dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct IbmDialect;

impl IbmDialect {
    /// Create a new Db2 dialect instance.
    pub fn new() -> Self {
        Self
    }

    fn reorg_sql(&self, table: &str) -> String {
        format!(
            "CALL SYSPROC.ADMIN_CMD('REORG TABLE {}')",
            self.quote_table_name(table).replace('\'', "''")
        )
    }
}

impl Dialect for IbmDialect {
    fn name(&self) -> &str {
        "ibm"
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
                info.type_extras = IDENTITY.into();
                mark_identity(info);
            }
            SimpleType::Reference
            | SimpleType::UserId
            | SimpleType::UserIdOnCreate
            | SimpleType::UserIdOnUpdate
            | SimpleType::Integer => info.col_type = "integer".into(),
            SimpleType::Bigint => info.col_type = "bigint".into(),
            SimpleType::Boolean => info.col_type = "smallint".into(),
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
            SimpleType::Text => info.col_type = "clob".into(),
            SimpleType::Binary => info.col_type = "blob".into(),
            SimpleType::Date => info.col_type = "date".into(),
            SimpleType::Time => info.col_type = "time".into(),
            SimpleType::Datetime | SimpleType::Timestamp => info.col_type = "timestamp".into(),
            SimpleType::TimestampOnCreate => {
                info.col_type = "timestamp".into();
                info.allow_null = false;
                info.default
                    .get_or_insert_with(|| Value::expression("CURRENT TIMESTAMP"));
            }
            SimpleType::TimestampOnUpdate => {
                info.col_type = "timestamp".into();
                info.allow_null = false;
                info.default = None;
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

    /// `TYPE [NOT NULL] [DEFAULT x] [row change] [UNIQUE|PRIMARY KEY]`.
    fn build_column_definition(&self, info: &ColumnInfo) -> Result<String> {
        check_key_flags(info)?;
        let mut def = self.get_column_type(info);
        if !info.allow_null {
            def.push_str(" NOT NULL");
        }
        def.push_str(&default_clause(self, info));
        if info.simple_type == Some(SimpleType::TimestampOnUpdate) {
            def.push_str(ROW_CHANGE);
        }
        def.push_str(key_clause(info));
        Ok(def)
    }

    fn alter_column_sql(&self, table: &str, column: &str, info: &ColumnInfo) -> Result<Vec<String>> {
        check_key_flags(info)?;
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.quote_table_name(table),
            self.quote_column_name(column)
        );
        let data_type = if info.type_extras == IDENTITY {
            info.col_type.clone()
        } else {
            self.get_column_type(info)
        };
        let mut statements = vec![
            format!("{} SET DATA TYPE {}", prefix, data_type),
            if info.allow_null {
                format!("{} DROP NOT NULL", prefix)
            } else {
                format!("{} SET NOT NULL", prefix)
            },
            match &info.default {
                Some(value) => format!("{} SET DEFAULT {}", prefix, self.quote_value(value)),
                None => format!("{} DROP DEFAULT", prefix),
            },
        ];
        if info.is_primary_key && !info.was_primary_key {
            statements.push(format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                self.quote_table_name(table),
                self.quote_column_name(column)
            ));
        }
        statements.push(self.reorg_sql(table));
        Ok(statements)
    }

    fn drop_foreign_key_sql(&self, name: &str, table: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_table_name(table),
            self.quote_column_name(name)
        )
    }

    fn drop_primary_key_sql(&self, _name: &str, table: &str) -> String {
        format!("ALTER TABLE {} DROP PRIMARY KEY", self.quote_table_name(table))
    }

    /// Without a value, a compound statement restarts past the current
    /// maximum.
    fn reset_sequence_sql(&self, table: &TableSchema, value: Option<i64>) -> Result<Vec<String>> {
        let Some(column) = table.columns.iter().find(|c| c.auto_increment) else {
            return Ok(Vec::new());
        };
        let quoted_table = self.quote_table_name(&table.qualified_name());
        let quoted_column = self.quote_column_name(&column.name);
        let restart = format!(
            "ALTER TABLE {} ALTER COLUMN {} RESTART WITH",
            quoted_table, quoted_column
        );
        Ok(vec![match value {
            Some(v) => format!("{} {}", restart, v),
            None => format!(
                "BEGIN DECLARE n BIGINT; \
                 SET n = (SELECT COALESCE(MAX({}), 0) + 1 FROM {}); \
                 EXECUTE IMMEDIATE '{} ' || VARCHAR(n); END",
                quoted_column,
                quoted_table,
                restart.replace('\'', "''")
            ),
        }])
    }

    /// Db2 checks integrity per table; without one nothing is emitted.
    fn check_integrity_sql(&self, check: bool, table: Option<&TableSchema>) -> Vec<String> {
        let Some(t) = table else {
            return Vec::new();
        };
        vec![format!(
            "SET INTEGRITY FOR {} {}",
            self.quote_table_name(&t.qualified_name()),
            if check { "IMMEDIATE CHECKED" } else { "OFF" }
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

    /// Scalar functions need a one-row table to select from.
    fn build_call(&self, routine: &RoutineSchema, args: &CallArgs) -> Result<CallPlan> {
        let mut plan = standard_call(self, routine, args)?;
        if routine.kind == RoutineKind::Function {
            plan.call.push_str(" FROM SYSIBM.SYSDUMMY1");
        }
        Ok(plan)
    }
}
