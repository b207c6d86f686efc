//! SQL Server SQL dialect (Strategy pattern).
//!
//! Provides SQL Server-specific identifier quoting, type mapping, DDL syntax
//! and routine invocation. Catalog discovery lives in [`super::catalog`].

use super::catalog;
use crate::core::identifier::{quote_bracket, quote_literal};
use crate::core::routine::strip_sigil;
use crate::core::{
    argument_value, CallArgs, CallPlan, ColumnSchema, Connection, ConstraintRow, Dialect,
    IndexRow, OutSource, ParamType, ParameterSchema, RoutineKind, RoutineParameterRow,
    RoutineSchema, SimpleType, TableNameRow, TableSchema, Value,
};
use crate::ddl::definition::{
    check_key_flags, coerce_default, mark_identity, null_clause, scaled, sized,
};
use crate::ddl::ColumnInfo;
use crate::drivers::common::apply_native_type;
use crate::error::Result;

const DEFAULT_STRING_LENGTH: u32 = 255;
const IDENTITY: &str = " IDENTITY(1,1)";

/// Microsoft SQL Server dialect implementation.
///
/// Compatible with SQL Server 2012+ and Azure SQL.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new SQL Server dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// Type for `ALTER COLUMN`: the identity property cannot be altered.
    fn alter_type(&self, info: &ColumnInfo) -> String {
        if info.type_extras == IDENTITY {
            info.col_type.clone()
        } else {
            self.get_column_type(info)
        }
    }

    /// Drop whatever default constraint the column has; its name is
    /// engine-generated unless it was created here.
    fn drop_default_sql(&self, table: &str, column: &str) -> String {
        let object = quote_literal(&self.quote_table_name(table));
        format!(
            "DECLARE @df sysname = (SELECT name FROM sys.default_constraints \
             WHERE parent_object_id = OBJECT_ID(N{}) \
             AND parent_column_id = COLUMNPROPERTY(OBJECT_ID(N{}), {}, 'ColumnId')); \
             IF @df IS NOT NULL EXEC('ALTER TABLE {} DROP CONSTRAINT ' + QUOTENAME(@df))",
            object,
            object,
            quote_literal(column),
            self.quote_table_name(table).replace('\'', "''")
        )
    }
}

/// Variable type for a `DECLARE` holding a parameter value.
fn declared_type(param: &ParameterSchema) -> String {
    let base = if param.db_type.is_empty() {
        "sql_variant".to_string()
    } else {
        param.db_type.clone()
    };
    if base.contains('(') {
        return base;
    }
    match base.to_ascii_lowercase().as_str() {
        "varchar" | "nvarchar" | "char" | "nchar" | "varbinary" | "binary" => match param.length {
            Some(len) => format!("{}({})", base, len),
            None => format!("{}(max)", base),
        },
        "decimal" | "numeric" => match (param.precision, param.scale) {
            (Some(p), s) => format!("{}({},{})", base, p, s.unwrap_or(0)),
            (None, _) => base,
        },
        _ => base,
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "sqlsrv"
    }

    fn max_identifier_length(&self) -> usize {
        128
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("@P{}", index)
    }

    fn quote_simple_table_name(&self, name: &str) -> String {
        quote_bracket(name)
    }

    fn quote_simple_column_name(&self, name: &str) -> String {
        quote_bracket(name)
    }

    fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Bytes(b) => format!(
                "0x{}",
                b.iter().map(|x| format!("{:02X}", x)).collect::<String>()
            ),
            Value::Text(s) => format!("N{}", quote_literal(s)),
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Expression(e) => e.expression.clone(),
        }
    }

    /// `timestamp` is SQL Server's row version, not a date.
    fn extract_type(&self, db_type: &str) -> SimpleType {
        match db_type.trim().to_ascii_lowercase().as_str() {
            "timestamp" | "rowversion" => SimpleType::Binary,
            _ => ColumnSchema::extract_type(db_type),
        }
    }

    fn translate_simple_column_types(&self, info: &mut ColumnInfo) {
        let Some(simple) = info.simple_type else {
            apply_native_type(info, DEFAULT_STRING_LENGTH);
            return;
        };
        match simple {
            SimpleType::Id => {
                info.col_type = "int".into();
                info.type_extras = IDENTITY.into();
                mark_identity(info);
            }
            SimpleType::Reference
            | SimpleType::UserId
            | SimpleType::UserIdOnCreate
            | SimpleType::UserIdOnUpdate
            | SimpleType::Integer => info.col_type = "int".into(),
            SimpleType::Bigint => info.col_type = "bigint".into(),
            SimpleType::Boolean => info.col_type = "bit".into(),
            SimpleType::Float => info.col_type = "real".into(),
            SimpleType::Double => info.col_type = "float".into(),
            SimpleType::Decimal => {
                info.col_type = "decimal".into();
                scaled(info, 10, 0);
            }
            SimpleType::Money => {
                info.col_type = "decimal".into();
                scaled(info, 19, 4);
            }
            SimpleType::Text => {
                info.col_type = if info.supports_multibyte { "nvarchar" } else { "varchar" }.into();
                info.type_extras = "(max)".into();
            }
            SimpleType::Binary => match info.length {
                Some(_) => {
                    info.col_type = if info.fixed_length { "binary" } else { "varbinary" }.into();
                    sized(info, DEFAULT_STRING_LENGTH);
                }
                None => {
                    info.col_type = "varbinary".into();
                    info.type_extras = "(max)".into();
                }
            },
            SimpleType::Date => info.col_type = "date".into(),
            SimpleType::Time => info.col_type = "time".into(),
            SimpleType::Datetime => info.col_type = "datetime2".into(),
            SimpleType::Timestamp => info.col_type = "datetimeoffset".into(),
            SimpleType::TimestampOnCreate | SimpleType::TimestampOnUpdate => {
                info.col_type = "datetimeoffset".into();
                info.allow_null = false;
                info.default
                    .get_or_insert_with(|| Value::expression("SYSDATETIMEOFFSET()"));
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

    fn add_column_sql(&self, table: &str, column: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD {} {}",
            self.quote_table_name(table),
            self.quote_column_name(column),
            definition
        )
    }

    /// `ALTER COLUMN` takes only type and nullability; defaults and keys
    /// are separate constraints.
    fn alter_column_sql(&self, table: &str, column: &str, info: &ColumnInfo) -> Result<Vec<String>> {
        check_key_flags(info)?;
        let quoted_table = self.quote_table_name(table);
        let quoted_column = self.quote_column_name(column);
        let mut statements = vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} {}{}",
            quoted_table,
            quoted_column,
            self.alter_type(info),
            null_clause(info)
        )];
        statements.push(self.drop_default_sql(table, column));
        if let Some(value) = &info.default {
            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {}",
                quoted_table,
                self.quote_column_name(&self.make_constraint_name("df", table, Some(column))),
                self.quote_value(value),
                quoted_column
            ));
        }
        if info.is_primary_key && !info.was_primary_key {
            statements.push(format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                quoted_table, quoted_column
            ));
        }
        Ok(statements)
    }

    fn rename_column_sql(&self, table: &str, old: &str, new: &str) -> String {
        format!(
            "EXEC sp_rename {}, {}, 'COLUMN'",
            quote_literal(&format!("{}.{}", table, old)),
            quote_literal(new)
        )
    }

    fn drop_index_sql(&self, name: &str, table: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_column_name(name),
            self.quote_table_name(table)
        )
    }

    /// Without a value, `RESEED` moves the identity to the current maximum.
    /// With one, the next row receives `value`.
    fn reset_sequence_sql(&self, table: &TableSchema, value: Option<i64>) -> Result<Vec<String>> {
        if !table.columns.iter().any(|c| c.auto_increment) {
            return Ok(Vec::new());
        }
        let name = quote_literal(&table.qualified_name());
        Ok(vec![match value {
            Some(v) => format!("DBCC CHECKIDENT ({}, RESEED, {})", name, v - 1),
            None => format!("DBCC CHECKIDENT ({}, RESEED)", name),
        }])
    }

    fn check_integrity_sql(&self, check: bool, table: Option<&TableSchema>) -> Vec<String> {
        let action = if check {
            "WITH CHECK CHECK CONSTRAINT ALL"
        } else {
            "NOCHECK CONSTRAINT ALL"
        };
        match table {
            Some(t) => vec![format!(
                "ALTER TABLE {} {}",
                self.quote_table_name(&t.qualified_name()),
                action
            )],
            None => vec![format!("EXEC sp_MSforeachtable 'ALTER TABLE ? {}'", action)],
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

    /// Procedures run as one `EXEC` batch. OUT and INOUT parameters are
    /// declared as local variables, passed with `OUTPUT` and read back by a
    /// trailing SELECT, whose row is the batch's last result set.
    fn build_call(&self, routine: &RoutineSchema, args: &CallArgs) -> Result<CallPlan> {
        let name = self.quote_table_name(&routine.qualified_name());
        let mut declares = Vec::new();
        let mut arguments = Vec::new();
        let mut bindings = Vec::new();
        let mut out_params = Vec::new();

        for param in &routine.parameters {
            let bare = strip_sigil(&param.name);
            let variable = format!("@{}", bare);
            if routine.kind == RoutineKind::Function {
                bindings.push(argument_value(param, args));
                arguments.push(self.param_placeholder(bindings.len()));
                continue;
            }
            match param.param_type {
                ParamType::In => {
                    bindings.push(argument_value(param, args));
                    arguments.push(format!(
                        "{} = {}",
                        variable,
                        self.param_placeholder(bindings.len())
                    ));
                }
                ParamType::Inout => {
                    bindings.push(argument_value(param, args));
                    declares.push(format!(
                        "DECLARE {} {} = {};",
                        variable,
                        declared_type(param),
                        self.param_placeholder(bindings.len())
                    ));
                    arguments.push(format!("{} = {} OUTPUT", variable, variable));
                    out_params.push(bare.to_ascii_lowercase());
                }
                ParamType::Out => {
                    declares.push(format!("DECLARE {} {};", variable, declared_type(param)));
                    arguments.push(format!("{} = {} OUTPUT", variable, variable));
                    out_params.push(bare.to_ascii_lowercase());
                }
            }
        }

        if routine.kind == RoutineKind::Function {
            let call = format!(
                "SELECT {}({}) AS {}",
                name,
                arguments.join(", "),
                self.quote_column_name("value")
            );
            return Ok(CallPlan::new(call, bindings));
        }

        let mut call = String::from("SET NOCOUNT ON; ");
        for declare in &declares {
            call.push_str(declare);
            call.push(' ');
        }
        call.push_str("EXEC ");
        call.push_str(&name);
        if !arguments.is_empty() {
            call.push(' ');
            call.push_str(&arguments.join(", "));
        }
        call.push(';');
        if !out_params.is_empty() {
            let select = out_params
                .iter()
                .map(|p| format!("@{} AS {}", p, self.quote_column_name(p)))
                .collect::<Vec<_>>()
                .join(", ");
            call.push_str(&format!(" SELECT {};", select));
        }

        let mut plan = CallPlan::new(call, bindings);
        if !out_params.is_empty() {
            plan.out = OutSource::LastResultSet;
            plan.out_params = out_params;
        }
        Ok(plan)
    }
}
