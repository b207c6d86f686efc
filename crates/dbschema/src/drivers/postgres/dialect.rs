//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific type mapping, DDL syntax and routine
//! invocation. Catalog discovery lives in [`super::catalog`].
//!
//! PostgreSQL has no `ON UPDATE` column clause: `timestamp_on_update`
//! columns get the same creation default as `timestamp_on_create`, and
//! keeping them current on update requires a trigger.

use super::catalog;
use crate::core::identifier::{quote_literal, split_qualified};
use crate::core::{
    argument_value, standard_call, CallArgs, CallPlan, ColumnSchema, Connection, ConstraintRow,
    Dialect, IndexRow, OutSource, ParamType, RoutineKind, RoutineParameterRow, RoutineSchema,
    SimpleType, TableNameRow, TableSchema, Value,
};
use crate::ddl::definition::{check_key_flags, coerce_default, mark_identity, scaled, sized};
use crate::ddl::ColumnInfo;
use crate::drivers::common::apply_native_type;
use crate::error::Result;

const DEFAULT_STRING_LENGTH: u32 = 255;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// Type usable in `ALTER COLUMN ... TYPE`: serial pseudo-types are
    /// only valid at creation.
    fn alter_type(&self, info: &ColumnInfo) -> String {
        match info.type_lower().as_str() {
            "serial" => "integer".to_string(),
            "bigserial" => "bigint".to_string(),
            _ => self.get_column_type(info),
        }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "pgsql"
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Bytes(b) => format!(
                "'\\x{}'::bytea",
                b.iter().map(|x| format!("{:02x}", x)).collect::<String>()
            ),
            Value::Text(s) => quote_literal(s),
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Expression(e) => e.expression.clone(),
        }
    }

    fn translate_simple_column_types(&self, info: &mut ColumnInfo) {
        let Some(simple) = info.simple_type else {
            apply_native_type(info, DEFAULT_STRING_LENGTH);
            return;
        };
        match simple {
            SimpleType::Id => {
                info.col_type = "serial".into();
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
            SimpleType::Double => info.col_type = "double precision".into(),
            SimpleType::Decimal => {
                info.col_type = "numeric".into();
                scaled(info, 10, 0);
            }
            SimpleType::Money => {
                info.col_type = "numeric".into();
                scaled(info, 19, 4);
            }
            SimpleType::Text => info.col_type = "text".into(),
            SimpleType::Binary => info.col_type = "bytea".into(),
            SimpleType::Date => info.col_type = "date".into(),
            SimpleType::Time => info.col_type = "time".into(),
            SimpleType::Datetime | SimpleType::Timestamp => info.col_type = "timestamp".into(),
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

    /// One statement per changed aspect: PostgreSQL has no single
    /// "redefine column" form.
    fn alter_column_sql(&self, table: &str, column: &str, info: &ColumnInfo) -> Result<Vec<String>> {
        check_key_flags(info)?;
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.quote_table_name(table),
            self.quote_column_name(column)
        );
        let mut statements = vec![format!("{} TYPE {}", prefix, self.alter_type(info))];
        statements.push(if info.allow_null {
            format!("{} DROP NOT NULL", prefix)
        } else {
            format!("{} SET NOT NULL", prefix)
        });
        statements.push(match &info.default {
            Some(value) => format!("{} SET DEFAULT {}", prefix, self.quote_value(value)),
            None => format!("{} DROP DEFAULT", prefix),
        });
        if info.is_primary_key && !info.was_primary_key {
            statements.push(format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                self.quote_table_name(table),
                self.quote_column_name(column)
            ));
        }
        Ok(statements)
    }

    /// Indexes live in their table's schema.
    fn drop_index_sql(&self, name: &str, table: &str) -> String {
        let (schema, _) = split_qualified(table);
        if schema.is_empty() || name.contains('.') {
            format!("DROP INDEX {}", self.quote_table_name(name))
        } else {
            format!("DROP INDEX {}", self.quote_table_name(&format!("{}.{}", schema, name)))
        }
    }

    fn reset_sequence_sql(&self, table: &TableSchema, value: Option<i64>) -> Result<Vec<String>> {
        let Some(column) = table.columns.iter().find(|c| c.auto_increment) else {
            return Ok(Vec::new());
        };
        let quoted_table = self.quote_table_name(&table.qualified_name());
        let sequence = format!(
            "pg_get_serial_sequence({}, {})",
            quote_literal(&quoted_table),
            quote_literal(&column.name)
        );
        let next = match value {
            Some(v) => v.to_string(),
            None => format!(
                "COALESCE((SELECT MAX({}) FROM {}), 0) + 1",
                self.quote_column_name(&column.name),
                quoted_table
            ),
        };
        Ok(vec![format!("SELECT setval({}, {}, false)", sequence, next)])
    }

    fn check_integrity_sql(&self, check: bool, table: Option<&TableSchema>) -> Vec<String> {
        match table {
            Some(t) => vec![format!(
                "ALTER TABLE {} {} TRIGGER ALL",
                self.quote_table_name(&t.qualified_name()),
                if check { "ENABLE" } else { "DISABLE" }
            )],
            None => vec![format!(
                "SET session_replication_role = {}",
                if check { "DEFAULT" } else { "replica" }
            )],
        }
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

    /// Serial columns own a sequence named `{table}_{column}_seq`.
    fn sequence_name(&self, table: &TableSchema, column: &ColumnSchema) -> Option<String> {
        let name = format!("{}_{}_seq", table.table_name, column.name);
        if table.schema_name.is_empty() {
            Some(name)
        } else {
            Some(format!("{}.{}", table.schema_name, name))
        }
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

    /// Routines with OUT parameters return them as a single row: procedures
    /// through `CALL` (OUT slots passed as NULL), functions through
    /// `SELECT * FROM f(...)`.
    fn build_call(&self, routine: &RoutineSchema, args: &CallArgs) -> Result<CallPlan> {
        if !routine.has_output_parameters() {
            return standard_call(self, routine, args);
        }

        let mut placeholders = Vec::new();
        let mut bindings = Vec::new();
        let mut out_params = Vec::new();
        for param in &routine.parameters {
            if param.param_type.is_output() {
                out_params.push(param.name.to_ascii_lowercase());
            }
            let value = match param.param_type {
                ParamType::Out if routine.kind == RoutineKind::Function => continue,
                ParamType::Out => Value::Null,
                ParamType::In | ParamType::Inout => argument_value(param, args),
            };
            bindings.push(value);
            placeholders.push(self.param_placeholder(bindings.len()));
        }

        let name = self.quote_table_name(&routine.qualified_name());
        let call = match routine.kind {
            RoutineKind::Procedure => format!("CALL {}({})", name, placeholders.join(", ")),
            RoutineKind::Function => {
                format!("SELECT * FROM {}({})", name, placeholders.join(", "))
            }
        };
        let mut plan = CallPlan::new(call, bindings);
        plan.out = OutSource::FirstRow;
        plan.out_params = out_params;
        Ok(plan)
    }
}
