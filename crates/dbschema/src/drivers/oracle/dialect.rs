//! Oracle SQL dialect (Strategy pattern).

use super::catalog;
use crate::core::identifier::{quote_literal, split_qualified};
use crate::core::{
    standard_call, CallArgs, CallPlan, ColumnSchema, Connection, ConstraintRow, Dialect,
    IndexRow, RoutineKind, RoutineParameterRow, RoutineSchema, SimpleType, TableNameRow,
    TableSchema, Value,
};
use crate::ddl::definition::{
    check_key_flags, coerce_default, default_clause, key_clause, mark_identity, null_clause,
    scaled, sized,
};
use crate::ddl::ColumnInfo;
use crate::drivers::common::apply_native_type;
use crate::error::Result;

const DEFAULT_STRING_LENGTH: u32 = 255;

/// Oracle dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Create a new Oracle dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// `seq_orders` / `trg_orders`, qualified with the table's schema.
    fn companion_name(&self, prefix: &str, table: &str) -> String {
        let (schema, name) = split_qualified(table);
        let object = self.make_constraint_name(prefix, name, None);
        if schema.is_empty() {
            object
        } else {
            format!("{}.{}", schema, object)
        }
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn max_identifier_length(&self) -> usize {
        30
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!(":{}", index)
    }

    fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Bytes(b) => format!(
                "HEXTORAW('{}')",
                b.iter().map(|x| format!("{:02X}", x)).collect::<String>()
            ),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Expression(e) => e.expression.clone(),
        }
    }

    /// Integers and flags are all `NUMBER`; the precision tells them apart.
    fn extract_type(&self, db_type: &str) -> SimpleType {
        let upper = db_type.trim().to_ascii_uppercase();
        if upper == "DATE" {
            return SimpleType::Datetime;
        }
        if upper.starts_with("NUMBER(") {
            let limits = ColumnSchema::extract_limit(&upper);
            if limits.scale.unwrap_or(0) == 0 {
                match limits.size {
                    Some(1) => return SimpleType::Boolean,
                    Some(p) if p <= 10 => return SimpleType::Integer,
                    Some(p) if p <= 19 => return SimpleType::Bigint,
                    _ => {}
                }
            }
            return SimpleType::Decimal;
        }
        ColumnSchema::extract_type(db_type)
    }

    fn translate_simple_column_types(&self, info: &mut ColumnInfo) {
        let Some(simple) = info.simple_type else {
            apply_native_type(info, DEFAULT_STRING_LENGTH);
            return;
        };
        match simple {
            SimpleType::Id => {
                info.col_type = "NUMBER".into();
                info.type_extras = "(10)".into();
                mark_identity(info);
            }
            SimpleType::Reference
            | SimpleType::UserId
            | SimpleType::UserIdOnCreate
            | SimpleType::UserIdOnUpdate
            | SimpleType::Integer => {
                info.col_type = "NUMBER".into();
                info.type_extras = "(10)".into();
            }
            SimpleType::Bigint => {
                info.col_type = "NUMBER".into();
                info.type_extras = "(19)".into();
            }
            SimpleType::Boolean => {
                info.col_type = "NUMBER".into();
                info.type_extras = "(1)".into();
            }
            SimpleType::Float => info.col_type = "BINARY_FLOAT".into(),
            SimpleType::Double => info.col_type = "BINARY_DOUBLE".into(),
            SimpleType::Decimal => {
                info.col_type = "NUMBER".into();
                scaled(info, 10, 0);
            }
            SimpleType::Money => {
                info.col_type = "NUMBER".into();
                scaled(info, 19, 4);
            }
            SimpleType::Text => {
                info.col_type = if info.supports_multibyte { "NCLOB" } else { "CLOB" }.into();
            }
            SimpleType::Binary => info.col_type = "BLOB".into(),
            SimpleType::Date => info.col_type = "DATE".into(),
            SimpleType::Time | SimpleType::Datetime | SimpleType::Timestamp => {
                info.col_type = "TIMESTAMP".into();
            }
            SimpleType::TimestampOnCreate | SimpleType::TimestampOnUpdate => {
                info.col_type = "TIMESTAMP".into();
                info.allow_null = false;
                info.default
                    .get_or_insert_with(|| Value::expression("CURRENT_TIMESTAMP"));
            }
            SimpleType::String | SimpleType::Virtual => {
                info.col_type = match (info.fixed_length, info.supports_multibyte) {
                    (true, true) => "NCHAR",
                    (true, false) => "CHAR",
                    (false, true) => "NVARCHAR2",
                    (false, false) => "VARCHAR2",
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

    /// Oracle wants `DEFAULT` ahead of the null constraint.
    fn build_column_definition(&self, info: &ColumnInfo) -> Result<String> {
        check_key_flags(info)?;
        let mut def = self.get_column_type(info);
        def.push_str(&default_clause(self, info));
        def.push_str(null_clause(info));
        def.push_str(key_clause(info));
        Ok(def)
    }

    /// Sequence plus a BEFORE INSERT trigger filling the key.
    fn primary_key_commands(&self, table: &str, column: &str) -> Vec<String> {
        let sequence = self.quote_table_name(&self.companion_name("seq", table));
        let trigger = self.quote_table_name(&self.companion_name("trg", table));
        let quoted_column = self.quote_column_name(column);
        vec![
            format!("CREATE SEQUENCE {} START WITH 1 INCREMENT BY 1", sequence),
            format!(
                "CREATE OR REPLACE TRIGGER {} BEFORE INSERT ON {} FOR EACH ROW \
                 WHEN (NEW.{} IS NULL) BEGIN SELECT {}.NEXTVAL INTO :NEW.{} FROM DUAL; END;",
                trigger,
                self.quote_table_name(table),
                quoted_column,
                sequence,
                quoted_column
            ),
        ]
    }

    fn add_column_sql(&self, table: &str, column: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD {} {}",
            self.quote_table_name(table),
            self.quote_column_name(column),
            definition
        )
    }

    fn alter_column_sql(&self, table: &str, column: &str, info: &ColumnInfo) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY {} {}",
            self.quote_table_name(table),
            self.quote_column_name(column),
            self.build_column_definition(info)?
        )])
    }

    fn sequence_name(&self, table: &TableSchema, column: &ColumnSchema) -> Option<String> {
        if !column.auto_increment {
            return None;
        }
        Some(self.companion_name("seq", &table.qualified_name()))
    }

    /// Without a value, a PL/SQL block restarts past the current maximum.
    fn reset_sequence_sql(&self, table: &TableSchema, value: Option<i64>) -> Result<Vec<String>> {
        let Some(column) = table.columns.iter().find(|c| c.auto_increment) else {
            return Ok(Vec::new());
        };
        let Some(sequence) = self.sequence_name(table, column) else {
            return Ok(Vec::new());
        };
        let quoted_sequence = self.quote_table_name(&sequence);
        Ok(vec![match value {
            Some(v) => format!("ALTER SEQUENCE {} RESTART START WITH {}", quoted_sequence, v),
            None => format!(
                "DECLARE n NUMBER; BEGIN \
                 SELECT NVL(MAX({}), 0) + 1 INTO n FROM {}; \
                 EXECUTE IMMEDIATE 'ALTER SEQUENCE {} RESTART START WITH ' || n; END;",
                self.quote_column_name(&column.name),
                self.quote_table_name(&table.qualified_name()),
                quoted_sequence
            ),
        }])
    }

    /// Enables or disables every foreign key, of one table or of the
    /// current user.
    fn check_integrity_sql(&self, check: bool, table: Option<&TableSchema>) -> Vec<String> {
        let action = if check { "ENABLE" } else { "DISABLE" };
        let source = match table {
            Some(t) => format!(
                "SELECT owner, table_name, constraint_name FROM all_constraints \
                 WHERE constraint_type = 'R' AND owner = {} AND table_name = {}",
                quote_literal(&t.schema_name),
                quote_literal(&t.table_name)
            ),
            None => "SELECT USER AS owner, table_name, constraint_name FROM user_constraints \
                     WHERE constraint_type = 'R'"
                .to_string(),
        };
        vec![format!(
            "BEGIN FOR c IN ({}) LOOP \
             EXECUTE IMMEDIATE 'ALTER TABLE \"' || c.owner || '\".\"' || c.table_name || \
             '\" {} CONSTRAINT \"' || c.constraint_name || '\"'; END LOOP; END;",
            source, action
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

    fn build_call(&self, routine: &RoutineSchema, args: &CallArgs) -> Result<CallPlan> {
        let mut plan = standard_call(self, routine, args)?;
        if routine.kind == RoutineKind::Function {
            plan.call.push_str(" FROM DUAL");
        }
        Ok(plan)
    }
}
