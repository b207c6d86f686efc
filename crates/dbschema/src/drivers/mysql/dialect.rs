//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific identifier quoting, type mapping, DDL syntax and
//! routine invocation. Catalog discovery lives in [`super::catalog`].

use super::catalog;
use crate::core::identifier::quote_backtick;
use crate::core::routine::strip_sigil;
use crate::core::{
    argument_value, standard_call, CallArgs, CallPlan, ColumnSchema, Connection, ConstraintRow,
    Dialect, IndexRow, OutSource, ParamType, RoutineKind, RoutineParameterRow, RoutineSchema,
    SimpleType, TableNameRow, TableSchema, Value,
};
use crate::ddl::definition::{coerce_default, mark_identity, scaled, sized};
use crate::ddl::ColumnInfo;
use crate::drivers::common::{apply_native_type, is_zero_date};
use crate::error::Result;

const DEFAULT_STRING_LENGTH: u32 = 255;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_simple_table_name(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn quote_simple_column_name(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn translate_simple_column_types(&self, info: &mut ColumnInfo) {
        let Some(simple) = info.simple_type else {
            apply_native_type(info, DEFAULT_STRING_LENGTH);
            return;
        };
        match simple {
            SimpleType::Id => {
                info.col_type = "int".into();
                info.type_extras = "(11)".into();
                mark_identity(info);
            }
            SimpleType::Reference
            | SimpleType::UserId
            | SimpleType::UserIdOnCreate
            | SimpleType::UserIdOnUpdate => {
                info.col_type = "int".into();
                info.type_extras = "(11)".into();
            }
            SimpleType::Integer => {
                info.col_type = "int".into();
                info.type_extras = format!("({})", info.length.unwrap_or(11));
            }
            SimpleType::Bigint => {
                info.col_type = "bigint".into();
                info.type_extras = "(20)".into();
            }
            SimpleType::Boolean => {
                info.col_type = "tinyint".into();
                info.type_extras = "(1)".into();
            }
            SimpleType::Float => info.col_type = "float".into(),
            SimpleType::Double => info.col_type = "double".into(),
            SimpleType::Decimal => {
                info.col_type = "decimal".into();
                scaled(info, 10, 0);
            }
            SimpleType::Money => {
                info.col_type = "decimal".into();
                scaled(info, 19, 4);
            }
            SimpleType::Text => {
                info.col_type = match info.length.unwrap_or(0) {
                    0..=65_535 => "text",
                    65_536..=16_777_215 => "mediumtext",
                    _ => "longtext",
                }
                .into();
            }
            SimpleType::Binary => match info.length {
                Some(_) => {
                    info.col_type = if info.fixed_length { "binary" } else { "varbinary" }.into();
                    sized(info, DEFAULT_STRING_LENGTH);
                }
                None => info.col_type = "blob".into(),
            },
            SimpleType::Date => info.col_type = "date".into(),
            SimpleType::Time => info.col_type = "time".into(),
            SimpleType::Datetime => info.col_type = "datetime".into(),
            SimpleType::Timestamp => info.col_type = "timestamp".into(),
            SimpleType::TimestampOnCreate => {
                info.col_type = "timestamp".into();
                info.allow_null = false;
                info.default
                    .get_or_insert_with(|| Value::expression("CURRENT_TIMESTAMP"));
            }
            SimpleType::TimestampOnUpdate => {
                info.col_type = "timestamp".into();
                info.allow_null = false;
                info.default
                    .get_or_insert_with(|| Value::expression("CURRENT_TIMESTAMP"));
                info.on_update = Some("CURRENT_TIMESTAMP".into());
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
        // Strict mode rejects zero dates; treat them as "no default".
        if info.default.as_ref().map(is_zero_date).unwrap_or(false) {
            info.default = None;
        }
        coerce_default(info);
        Ok(())
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn alter_column_sql(&self, table: &str, column: &str, info: &ColumnInfo) -> Result<Vec<String>> {
        let quoted = self.quote_column_name(column);
        Ok(vec![format!(
            "ALTER TABLE {} CHANGE COLUMN {} {} {}",
            self.quote_table_name(table),
            quoted,
            quoted,
            self.build_column_definition(info)?
        )])
    }

    fn drop_foreign_key_sql(&self, name: &str, table: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_table_name(table),
            self.quote_column_name(name)
        )
    }

    fn drop_index_sql(&self, name: &str, table: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_column_name(name),
            self.quote_table_name(table)
        )
    }

    fn drop_primary_key_sql(&self, _name: &str, table: &str) -> String {
        format!("ALTER TABLE {} DROP PRIMARY KEY", self.quote_table_name(table))
    }

    fn reset_sequence_sql(&self, table: &TableSchema, value: Option<i64>) -> Result<Vec<String>> {
        if !table.columns.iter().any(|c| c.auto_increment) {
            return Ok(Vec::new());
        }
        // InnoDB raises a value below max(id) + 1 to max(id) + 1.
        Ok(vec![format!(
            "ALTER TABLE {} AUTO_INCREMENT = {}",
            self.quote_table_name(&table.qualified_name()),
            value.unwrap_or(1)
        )])
    }

    fn check_integrity_sql(&self, check: bool, _table: Option<&TableSchema>) -> Vec<String> {
        vec![format!("SET FOREIGN_KEY_CHECKS = {}", i32::from(check))]
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

    /// OUT and INOUT procedure parameters cannot be bound through prepared
    /// statements, so they go through `@name` session variables that are
    /// read back with a follow-up SELECT.
    fn build_call(&self, routine: &RoutineSchema, args: &CallArgs) -> Result<CallPlan> {
        if routine.kind == RoutineKind::Function || !routine.has_output_parameters() {
            return standard_call(self, routine, args);
        }

        let mut pre = Vec::new();
        let mut arguments = Vec::new();
        let mut bindings = Vec::new();
        let mut out_params = Vec::new();
        for param in &routine.parameters {
            let bare = strip_sigil(&param.name).to_ascii_lowercase();
            let variable = format!("@{}", bare);
            match param.param_type {
                ParamType::In => {
                    bindings.push(argument_value(param, args));
                    arguments.push("?".to_string());
                }
                ParamType::Inout => {
                    pre.push((
                        format!("SET {} = ?", variable),
                        vec![argument_value(param, args)],
                    ));
                    arguments.push(variable);
                    out_params.push(bare);
                }
                ParamType::Out => {
                    arguments.push(variable);
                    out_params.push(bare);
                }
            }
        }

        let select = out_params
            .iter()
            .map(|p| format!("@{} AS {}", p, self.quote_column_name(p)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut plan = CallPlan::new(
            format!(
                "CALL {}({})",
                self.quote_table_name(&routine.qualified_name()),
                arguments.join(", ")
            ),
            bindings,
        );
        plan.pre = pre;
        plan.out = OutSource::PostSelect(format!("SELECT {}", select));
        plan.out_params = out_params;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParameterSchema;
    use crate::ddl::FieldDescriptor;

    fn definition(field: FieldDescriptor) -> String {
        MysqlDialect::new().column_definition(&field, None).unwrap()
    }

    #[test]
    fn test_mysql_dialect_name() {
        assert_eq!(MysqlDialect::new().name(), "mysql");
    }

    #[test]
    fn test_mysql_quote_ident() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_column_name("users"), "`users`");
        assert_eq!(dialect.quote_table_name("app.users"), "`app`.`users`");
        assert_eq!(dialect.quote_column_name("my`table"), "`my``table`");
    }

    #[test]
    fn test_mysql_id_and_string_definitions() {
        assert_eq!(
            definition(FieldDescriptor::new("id", "id")),
            "int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY"
        );
        let mut name = FieldDescriptor::new("name", "string");
        name.length = Some(100);
        assert_eq!(definition(name), "varchar(100) NULL");
        assert_eq!(definition(FieldDescriptor::new("s", "string")), "varchar(255) NULL");
    }

    #[test]
    fn test_mysql_type_map() {
        assert_eq!(definition(FieldDescriptor::new("b", "boolean")), "tinyint(1) NULL");
        assert_eq!(definition(FieldDescriptor::new("m", "money")), "decimal(19,4) NULL");
        assert_eq!(definition(FieldDescriptor::new("r", "reference")), "int(11) NULL");
        assert_eq!(definition(FieldDescriptor::new("t", "text")), "text NULL");
        assert_eq!(definition(FieldDescriptor::new("bin", "binary")), "blob NULL");
    }

    #[test]
    fn test_mysql_timestamps() {
        assert_eq!(
            definition(FieldDescriptor::new("created", "timestamp_on_create")),
            "timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP"
        );
        assert_eq!(
            definition(FieldDescriptor::new("updated", "timestamp_on_update")),
            "timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_mysql_zero_date_default_dropped() {
        let mut field = FieldDescriptor::new("due", "datetime");
        field.default = Some(Value::Text("0000-00-00 00:00:00".into()));
        assert_eq!(definition(field), "datetime NULL");
    }

    #[test]
    fn test_mysql_native_type_passthrough() {
        let mut field = FieldDescriptor::new("code", "varchar");
        field.length = Some(8);
        field.allow_null = Some(false);
        assert_eq!(definition(field), "varchar(8) NOT NULL");
    }

    #[test]
    fn test_mysql_alter_and_drop_syntax() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect.drop_foreign_key_sql("fk_a", "orders"),
            "ALTER TABLE `orders` DROP FOREIGN KEY `fk_a`"
        );
        assert_eq!(dialect.drop_index_sql("ndx_a", "orders"), "DROP INDEX `ndx_a` ON `orders`");
        let info = dialect
            .column_info(&FieldDescriptor::new("qty", "integer"), None)
            .unwrap();
        assert_eq!(
            dialect.alter_column_sql("orders", "qty", &info).unwrap(),
            vec!["ALTER TABLE `orders` CHANGE COLUMN `qty` `qty` int(11) NULL".to_string()]
        );
        assert_eq!(
            dialect.check_integrity_sql(false, None),
            vec!["SET FOREIGN_KEY_CHECKS = 0".to_string()]
        );
    }

    fn param(name: &str, position: u32, param_type: ParamType) -> ParameterSchema {
        ParameterSchema {
            name: name.into(),
            position,
            param_type,
            value_type: SimpleType::Integer,
            ..Default::default()
        }
    }

    #[test]
    fn test_mysql_out_params_use_session_variables() {
        let mut routine = RoutineSchema::stub(RoutineKind::Procedure, "app", "totals", "app");
        routine.add_parameter(param("customer", 1, ParamType::In));
        routine.add_parameter(param("running", 2, ParamType::Inout));
        routine.add_parameter(param("total", 3, ParamType::Out));

        let args = CallArgs::from([
            ("customer".to_string(), Value::Int(7)),
            ("running".to_string(), Value::Int(1)),
        ]);
        let plan = MysqlDialect::new().build_call(&routine, &args).unwrap();
        assert_eq!(plan.call, "CALL `app`.`totals`(?, @running, @total)");
        assert_eq!(plan.bindings, vec![Value::Int(7)]);
        assert_eq!(plan.pre, vec![("SET @running = ?".to_string(), vec![Value::Int(1)])]);
        assert_eq!(
            plan.out,
            OutSource::PostSelect("SELECT @running AS `running`, @total AS `total`".into())
        );
        assert_eq!(plan.out_params, vec!["running".to_string(), "total".to_string()]);
    }

    #[test]
    fn test_mysql_function_call() {
        let mut routine = RoutineSchema::stub(RoutineKind::Function, "app", "tax", "app");
        routine.add_parameter(param("amount", 1, ParamType::In));
        let plan = MysqlDialect::new()
            .build_call(&routine, &CallArgs::new())
            .unwrap();
        assert_eq!(plan.call, "SELECT `app`.`tax`(?) AS `value`");
        assert_eq!(plan.bindings, vec![Value::Null]);
    }
}
