//! Core traits: the connection boundary and the per-engine dialect strategy.
//!
//! # Design Pattern
//!
//! [`Dialect`] is a **Strategy**: one implementation per engine, selected
//! through the [`DialectCatalog`](super::DialectCatalog). Default method
//! bodies carry the shared ANSI behaviour (**Template Method**); engines
//! override only their quirks.

use super::column::ColumnSchema;
use super::discovery::{
    CallArgs, CallPlan, ConstraintRow, IndexRow, LoadedTable, RoutineParameterRow, TableNameRow,
};
use super::identifier::{quote_double, quote_literal, quote_qualified};
use super::routine::{strip_sigil, ParameterSchema, RoutineKind, RoutineSchema};
use super::table::{PrimaryKey, TableSchema};
use super::types::{ParamType, SimpleType};
use super::value::{Row, Value};
use crate::ddl::{definition, ColumnInfo, FieldDescriptor, ForeignKeyCommand};
use crate::error::{Result, SchemaError};

/// Synchronous query executor supplied by the caller.
///
/// Implementations wrap a native driver. All calls block until the engine
/// answers; timeouts are the implementation's concern.
pub trait Connection: Send + Sync {
    /// Driver identifier (e.g. "mysql", "sqlite").
    fn driver_name(&self) -> &str;

    /// Run a query and return all rows.
    fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>>;

    /// Run a query and return the first row, if any.
    fn select_one(&self, sql: &str, bindings: &[Value]) -> Result<Option<Row>> {
        Ok(self.select(sql, bindings)?.into_iter().next())
    }

    /// Run a query that may produce several result sets.
    ///
    /// Drivers without multi-set support return the single set.
    fn select_sets(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Vec<Row>>> {
        Ok(vec![self.select(sql, bindings)?])
    }

    /// Execute a statement. Returns whether the engine reported success.
    fn statement(&self, sql: &str, bindings: &[Value]) -> Result<bool>;

    /// Start a native transaction.
    fn begin_transaction(&self) -> Result<()> {
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        Ok(())
    }
}

/// Engine-specific catalog discovery, type mapping and DDL syntax.
pub trait Dialect: Send + Sync {
    /// Dialect identifier (e.g. "mysql", "pgsql").
    fn name(&self) -> &str;

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    /// Whether the engine has more than one schema to enumerate.
    fn supports_schema_enumeration(&self) -> bool {
        true
    }

    fn supports_procedures(&self) -> bool {
        true
    }

    fn supports_functions(&self) -> bool {
        true
    }

    fn supports_alter_column(&self) -> bool {
        true
    }

    fn supports_drop_column(&self) -> bool {
        true
    }

    fn supports_rename_column(&self) -> bool {
        true
    }

    fn supports_drop_foreign_key(&self) -> bool {
        true
    }

    /// Foreign keys are declared inline in the column definition instead of
    /// through `ALTER TABLE ... ADD CONSTRAINT`.
    fn inline_foreign_keys(&self) -> bool {
        false
    }

    /// `ALTER TABLE ... ADD COLUMN` accepts an inline `UNIQUE`.
    fn supports_inline_unique_on_add(&self) -> bool {
        true
    }

    /// Longest identifier the engine accepts, used for constraint names.
    fn max_identifier_length(&self) -> usize {
        64
    }

    /// Parameter placeholder for the 1-based `index`.
    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    // ------------------------------------------------------------------
    // Quoting
    // ------------------------------------------------------------------

    fn quote_simple_table_name(&self, name: &str) -> String {
        quote_double(name)
    }

    fn quote_simple_column_name(&self, name: &str) -> String {
        quote_double(name)
    }

    /// Quote a possibly schema-qualified table name.
    fn quote_table_name(&self, name: &str) -> String {
        quote_qualified(name, |p| self.quote_simple_table_name(p))
    }

    /// Quote a possibly table-qualified column name; `*` is left bare.
    fn quote_column_name(&self, name: &str) -> String {
        quote_qualified(name, |p| self.quote_simple_column_name(p))
    }

    /// Render a value as a SQL literal (for DEFAULT clauses).
    fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Bytes(b) => format!(
                "X'{}'",
                b.iter().map(|x| format!("{:02X}", x)).collect::<String>()
            ),
            Value::Expression(e) => e.expression.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Type mapping
    // ------------------------------------------------------------------

    /// Native type string to simple type.
    fn extract_type(&self, db_type: &str) -> SimpleType {
        ColumnSchema::extract_type(db_type)
    }

    /// Map the abstract type onto a native type name and extras.
    fn translate_simple_column_types(&self, info: &mut ColumnInfo);

    /// Fill length/precision defaults and coerce the default value.
    fn validate_column_settings(&self, info: &mut ColumnInfo) -> Result<()> {
        definition::coerce_default(info);
        Ok(())
    }

    /// Type portion of a column definition.
    fn get_column_type(&self, info: &ColumnInfo) -> String {
        info.full_type()
    }

    /// Keyword appended for auto-increment columns, if the engine has one.
    fn auto_increment_keyword(&self) -> Option<&'static str> {
        None
    }

    /// Assemble `TYPE [NOT] NULL [DEFAULT x] [auto] [UNIQUE|PRIMARY KEY]`.
    fn build_column_definition(&self, info: &ColumnInfo) -> Result<String> {
        definition::standard_definition(self, info)
    }

    /// Full pipeline: descriptor to column definition.
    ///
    /// `old` is the existing column when altering.
    fn column_definition(
        &self,
        field: &FieldDescriptor,
        old: Option<&ColumnSchema>,
    ) -> Result<String> {
        let info = self.column_info(field, old)?;
        self.build_column_definition(&info)
    }

    /// Translate and validate a descriptor into render-ready settings.
    fn column_info(&self, field: &FieldDescriptor, old: Option<&ColumnSchema>) -> Result<ColumnInfo> {
        let mut info = ColumnInfo::from_field(field)?;
        info.is_alter = old.is_some();
        info.was_primary_key = old.map(|c| c.is_primary_key).unwrap_or(false);
        if info.db_type.is_none() {
            self.translate_simple_column_types(&mut info);
            self.validate_column_settings(&mut info)?;
        } else {
            definition::coerce_default(&mut info);
        }
        Ok(info)
    }

    /// Whether a unique or plain index must be created separately.
    ///
    /// `inline_possible` is true when the column definition is part of a
    /// CREATE TABLE or ADD COLUMN and could carry an inline `UNIQUE`.
    fn requires_create_index(&self, unique: bool, inline_possible: bool) -> bool {
        !(unique && inline_possible)
    }

    /// Extra statements needed after creating an `id` column.
    fn primary_key_commands(&self, _table: &str, _column: &str) -> Vec<String> {
        Vec::new()
    }

    /// Constraint or index name, hashed when it would exceed the identifier limit.
    fn make_constraint_name(&self, prefix: &str, table: &str, column: Option<&str>) -> String {
        definition::constraint_name(prefix, table, column, self.max_identifier_length())
    }

    // ------------------------------------------------------------------
    // Statement builders
    // ------------------------------------------------------------------

    /// CREATE TABLE from already rendered `name definition` entries.
    fn create_table_sql(&self, table: &str, columns: &[String], options: Option<&str>) -> String {
        let mut sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.quote_table_name(table),
            columns.join(",\n    ")
        );
        if let Some(opts) = options {
            sql.push(' ');
            sql.push_str(opts);
        }
        sql
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote_table_name(table))
    }

    fn add_column_sql(&self, table: &str, column: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.quote_table_name(table),
            self.quote_column_name(column),
            definition
        )
    }

    /// Statements altering an existing column to `info`.
    fn alter_column_sql(&self, table: &str, column: &str, info: &ColumnInfo) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            self.quote_table_name(table),
            self.quote_column_name(column),
            self.build_column_definition(info)?
        )])
    }

    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_table_name(table),
            self.quote_column_name(column)
        )
    }

    fn rename_column_sql(&self, table: &str, old: &str, new: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_table_name(table),
            self.quote_column_name(old),
            self.quote_column_name(new)
        )
    }

    fn add_foreign_key_sql(&self, fk: &ForeignKeyCommand) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}){}",
            self.quote_table_name(&fk.table),
            self.quote_column_name(&fk.name),
            self.quote_column_name(&fk.column),
            self.quote_table_name(&fk.ref_table),
            self.quote_column_name(&fk.ref_field),
            definition::referential_clause(fk.on_delete.as_deref(), fk.on_update.as_deref())
        )
    }

    fn drop_foreign_key_sql(&self, name: &str, table: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_table_name(table),
            self.quote_column_name(name)
        )
    }

    fn create_index_sql(&self, name: &str, table: &str, columns: &[String], unique: bool) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote_table_name(name),
            self.quote_table_name(table),
            columns
                .iter()
                .map(|c| self.quote_column_name(c))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }

    fn drop_index_sql(&self, name: &str, _table: &str) -> String {
        format!("DROP INDEX {}", self.quote_table_name(name))
    }

    fn add_primary_key_sql(&self, name: &str, table: &str, columns: &[String]) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_table_name(table),
            self.quote_column_name(name),
            columns
                .iter()
                .map(|c| self.quote_column_name(c))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }

    fn drop_primary_key_sql(&self, name: &str, table: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_table_name(table),
            self.quote_column_name(name)
        )
    }

    /// Statements reseeding the auto-increment of `table` to `value`
    /// (or to max + 1 when `None`).
    fn reset_sequence_sql(&self, _table: &TableSchema, _value: Option<i64>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Statements enabling (`check`) or disabling constraint checking.
    fn check_integrity_sql(&self, _check: bool, _table: Option<&TableSchema>) -> Vec<String> {
        Vec::new()
    }

    // ------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------

    /// Schema used for unqualified names.
    fn default_schema(&self, conn: &dyn Connection) -> Result<String>;

    /// All user schemas.
    fn find_schema_names(&self, _conn: &dyn Connection) -> Result<Vec<String>> {
        Err(SchemaError::not_implemented(self.name(), "Schema enumeration"))
    }

    /// Tables (and optionally views) of one schema.
    fn find_table_names(
        &self,
        conn: &dyn Connection,
        schema: &str,
        include_views: bool,
    ) -> Result<Vec<TableNameRow>>;

    /// Columns of a table, in ordinal order. Empty when the table is absent.
    fn find_columns(&self, conn: &dyn Connection, table: &TableSchema) -> Result<Vec<ColumnSchema>>;

    /// Primary key column names, in key order.
    fn find_primary_key(&self, _conn: &dyn Connection, table: &TableSchema) -> Result<Vec<String>> {
        Ok(table
            .columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect())
    }

    /// Single-column indexes, used to flag unique and indexed columns.
    fn find_indexes(&self, _conn: &dyn Connection, _table: &TableSchema) -> Result<Vec<IndexRow>> {
        Ok(Vec::new())
    }

    /// Foreign key rows touching `schema`.
    fn find_constraints(&self, conn: &dyn Connection, schema: &str) -> Result<Vec<ConstraintRow>>;

    /// Name of the sequence behind an auto-increment column, if any.
    fn sequence_name(&self, _table: &TableSchema, _column: &ColumnSchema) -> Option<String> {
        None
    }

    /// Load columns, key and constraint rows for a table stub.
    ///
    /// Returns `None` when no columns are found (the table does not exist).
    fn load_table(&self, conn: &dyn Connection, stub: &TableSchema) -> Result<Option<LoadedTable>> {
        let columns = self.find_columns(conn, stub)?;
        if columns.is_empty() {
            return Ok(None);
        }

        let mut table = stub.clone();
        table.columns.clear();
        table.relations.clear();
        table.foreign_keys.clear();

        let indexes = self.find_indexes(conn, stub)?;
        for mut column in columns {
            if column.quoted_name.is_empty() {
                column.quoted_name = self.quote_column_name(&column.name);
            }
            for idx in indexes
                .iter()
                .filter(|i| i.column_name.eq_ignore_ascii_case(&column.name))
            {
                if idx.is_primary {
                    column.is_primary_key = true;
                } else if idx.is_unique {
                    column.is_unique = true;
                } else {
                    column.is_index = true;
                }
            }
            table.add_column(column);
        }

        let pk = self.find_primary_key(conn, &table)?;
        for col in table.columns.iter_mut() {
            if pk.iter().any(|p| p.eq_ignore_ascii_case(&col.name)) {
                col.is_primary_key = true;
            }
        }
        table.primary_key = PrimaryKey::from_columns(pk);
        let sequence = match &table.primary_key {
            PrimaryKey::Single(name) => table
                .column(name)
                .filter(|c| c.auto_increment)
                .and_then(|col| self.sequence_name(&table, col)),
            _ => None,
        };
        table.sequence_name = sequence;

        let constraints = self.find_constraints(conn, &stub.schema_name)?;
        Ok(Some(LoadedTable { table, constraints }))
    }

    /// Routine stubs of one kind in one schema.
    fn find_routines(
        &self,
        _conn: &dyn Connection,
        _schema: &str,
        kind: RoutineKind,
    ) -> Result<Vec<String>> {
        Err(SchemaError::not_implemented(
            self.name(),
            format!("{} discovery", kind.as_str()),
        ))
    }

    /// Parameters of a routine (position 0 is a function's return slot).
    fn find_routine_parameters(
        &self,
        _conn: &dyn Connection,
        routine: &RoutineSchema,
    ) -> Result<Vec<RoutineParameterRow>> {
        Err(SchemaError::not_implemented(
            self.name(),
            format!("{} parameter discovery", routine.kind.as_str()),
        ))
    }

    /// Fill parameters and return type of a routine stub.
    fn load_routine(&self, conn: &dyn Connection, stub: &RoutineSchema) -> Result<RoutineSchema> {
        let mut routine = stub.clone();
        routine.parameters.clear();
        for row in self.find_routine_parameters(conn, stub)? {
            if row.is_return {
                routine.return_type = Some(row.parameter.value_type);
            } else {
                routine.add_parameter(row.parameter);
            }
        }
        routine.discovery_completed = true;
        Ok(routine)
    }

    /// Statements invoking a routine. Defaults to [`standard_call`].
    fn build_call(&self, routine: &RoutineSchema, args: &CallArgs) -> Result<CallPlan> {
        standard_call(self, routine, args)
    }
}

/// `CALL name(?, ...)` for procedures, `SELECT name(?, ...) AS value` for
/// functions. Procedures with OUT parameters are rejected.
pub fn standard_call<D: Dialect + ?Sized>(
    dialect: &D,
    routine: &RoutineSchema,
    args: &CallArgs,
) -> Result<CallPlan> {
    if routine.kind == RoutineKind::Procedure && routine.has_output_parameters() {
        return Err(SchemaError::not_implemented(
            dialect.name(),
            "OUT parameters on procedure calls",
        ));
    }
    let (placeholders, bindings) = bind_inputs(dialect, routine, args, |_| false);
    let call = match routine.kind {
        RoutineKind::Procedure => format!(
            "CALL {}({})",
            dialect.quote_table_name(&routine.qualified_name()),
            placeholders.join(", ")
        ),
        RoutineKind::Function => format!(
            "SELECT {}({}) AS {}",
            dialect.quote_table_name(&routine.qualified_name()),
            placeholders.join(", "),
            dialect.quote_column_name("value")
        ),
    };
    Ok(CallPlan::new(call, bindings))
}

/// Value bound to a routine parameter: the caller's argument, else the
/// parameter default, else NULL.
pub fn argument_value(param: &ParameterSchema, args: &CallArgs) -> Value {
    args.get(&strip_sigil(&param.name).to_ascii_lowercase())
        .cloned()
        .or_else(|| param.default_value.clone())
        .unwrap_or(Value::Null)
}

/// Placeholders and bindings for the input parameters of a routine.
///
/// `skip` excludes parameters the dialect handles differently (for example
/// OUT parameters bound to session variables).
pub fn bind_inputs<D: Dialect + ?Sized>(
    dialect: &D,
    routine: &RoutineSchema,
    args: &CallArgs,
    skip: impl Fn(&ParameterSchema) -> bool,
) -> (Vec<String>, Vec<Value>) {
    let mut placeholders = Vec::new();
    let mut bindings = Vec::new();
    for param in &routine.parameters {
        if skip(param) || param.param_type == ParamType::Out {
            continue;
        }
        bindings.push(argument_value(param, args));
        placeholders.push(dialect.param_placeholder(bindings.len()));
    }
    (placeholders, bindings)
}
