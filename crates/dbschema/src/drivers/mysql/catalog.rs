//! MySQL catalog queries against INFORMATION_SCHEMA.
//!
//! Name columns are CAST to CHAR because some server collations return
//! INFORMATION_SCHEMA strings as VARBINARY.

use tracing::debug;

use super::MysqlDialect;
use crate::core::{
    ColumnSchema, Connection, ConstraintRow, IndexRow, RoutineKind, RoutineParameterRow,
    RoutineSchema, SimpleType, TableNameRow, TableSchema, Value,
};
use crate::drivers::common::{
    column_from_row, constraints_from_rows, indexes_from_rows, parameter_from_row,
    parse_default, table_names_from_rows,
};
use crate::error::Result;

/// Databases owned by the server itself.
const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// `?` bound to a schema name, falling back to the connection's database.
const SCHEMA_PARAM: &str = "COALESCE(NULLIF(?, ''), DATABASE())";

pub(super) fn default_schema(conn: &dyn Connection) -> Result<String> {
    let row = conn.select_one("SELECT DATABASE() AS schema_name", &[])?;
    Ok(row.and_then(|r| r.get_str("schema_name")).unwrap_or_default())
}

pub(super) fn schema_names(conn: &dyn Connection) -> Result<Vec<String>> {
    let rows = conn.select(
        "SELECT CAST(SCHEMA_NAME AS CHAR(255)) AS schema_name \
         FROM INFORMATION_SCHEMA.SCHEMATA ORDER BY SCHEMA_NAME",
        &[],
    )?;
    Ok(rows
        .iter()
        .filter_map(|r| r.get_str("schema_name"))
        .filter(|s| !SYSTEM_SCHEMAS.iter().any(|sys| sys.eq_ignore_ascii_case(s)))
        .collect())
}

pub(super) fn table_names(
    conn: &dyn Connection,
    schema: &str,
    include_views: bool,
) -> Result<Vec<TableNameRow>> {
    let mut sql = format!(
        "SELECT CAST(TABLE_NAME AS CHAR(255)) AS table_name, \
         CAST(TABLE_TYPE AS CHAR(64)) AS table_type \
         FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = {}",
        SCHEMA_PARAM
    );
    if !include_views {
        sql.push_str(" AND TABLE_TYPE = 'BASE TABLE'");
    }
    sql.push_str(" ORDER BY TABLE_NAME");
    let rows = conn.select(&sql, &[Value::from(schema)])?;
    Ok(table_names_from_rows(schema, &rows))
}

pub(super) fn columns(
    dialect: &MysqlDialect,
    conn: &dyn Connection,
    table: &TableSchema,
) -> Result<Vec<ColumnSchema>> {
    let sql = format!(
        r#"
        SELECT
            CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
            CAST(COLUMN_TYPE AS CHAR(255)) AS db_type,
            IF(IS_NULLABLE = 'YES', 1, 0) AS allow_null,
            COLUMN_DEFAULT AS default_value,
            IF(EXTRA LIKE '%auto_increment%', 1, 0) AS auto_increment,
            IF(COLUMN_KEY = 'PRI', 1, 0) AS is_primary_key,
            CAST(EXTRA AS CHAR(255)) AS extra,
            CAST(COLUMN_COMMENT AS CHAR(1024)) AS column_comment
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = {} AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#,
        SCHEMA_PARAM
    );
    let rows = conn.select(
        &sql,
        &[
            Value::from(table.schema_name.as_str()),
            Value::from(table.table_name.as_str()),
        ],
    )?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let Some(mut column) = column_from_row(dialect, row) else {
            continue;
        };
        if !column.auto_increment {
            column.default_value = row
                .get_str("default_value")
                .and_then(|raw| literal_default(column.column_type, &raw));
        }
        let extra = row.get_str("extra").unwrap_or_default();
        promote_timestamp(&mut column, &extra);
        columns.push(column);
    }
    debug!(
        "Loaded {} columns for {}",
        columns.len(),
        table.qualified_name()
    );
    Ok(columns)
}

/// MySQL reports string defaults unquoted (MariaDB quotes them).
fn literal_default(simple: SimpleType, raw: &str) -> Option<Value> {
    let textual = matches!(simple, SimpleType::String | SimpleType::Text);
    if textual && !raw.starts_with('\'') {
        return Some(Value::Text(raw.to_string()));
    }
    parse_default(Some(raw))
}

/// `DEFAULT CURRENT_TIMESTAMP [ON UPDATE CURRENT_TIMESTAMP]` columns read
/// back as the auto-timestamp types they were created from.
fn promote_timestamp(column: &mut ColumnSchema, extra: &str) {
    if !matches!(
        column.column_type,
        SimpleType::Timestamp | SimpleType::Datetime
    ) {
        return;
    }
    let current = match &column.default_value {
        Some(Value::Expression(e)) => e
            .expression
            .to_ascii_uppercase()
            .starts_with("CURRENT_TIMESTAMP"),
        _ => false,
    };
    if current {
        column.column_type = if extra.to_ascii_lowercase().contains("on update") {
            SimpleType::TimestampOnUpdate
        } else {
            SimpleType::TimestampOnCreate
        };
    }
}

pub(super) fn indexes(conn: &dyn Connection, table: &TableSchema) -> Result<Vec<IndexRow>> {
    let sql = format!(
        r#"
        SELECT
            CAST(INDEX_NAME AS CHAR(255)) AS index_name,
            CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
            IF(NON_UNIQUE = 0, 1, 0) AS is_unique,
            IF(INDEX_NAME = 'PRIMARY', 1, 0) AS is_primary
        FROM INFORMATION_SCHEMA.STATISTICS
        WHERE TABLE_SCHEMA = {} AND TABLE_NAME = ?
        ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#,
        SCHEMA_PARAM
    );
    let rows = conn.select(
        &sql,
        &[
            Value::from(table.schema_name.as_str()),
            Value::from(table.table_name.as_str()),
        ],
    )?;
    Ok(indexes_from_rows(&rows))
}

pub(super) fn constraints(conn: &dyn Connection, schema: &str) -> Result<Vec<ConstraintRow>> {
    let sql = format!(
        r#"
        SELECT
            CAST(kcu.CONSTRAINT_NAME AS CHAR(255)) AS constraint_name,
            CAST(kcu.TABLE_SCHEMA AS CHAR(255)) AS table_schema,
            CAST(kcu.TABLE_NAME AS CHAR(255)) AS table_name,
            CAST(kcu.COLUMN_NAME AS CHAR(255)) AS column_name,
            CAST(kcu.REFERENCED_TABLE_SCHEMA AS CHAR(255)) AS referenced_table_schema,
            CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS referenced_table_name,
            CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS referenced_column_name,
            CAST(rc.UPDATE_RULE AS CHAR(64)) AS update_rule,
            CAST(rc.DELETE_RULE AS CHAR(64)) AS delete_rule
        FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
        JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
            ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
            AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
            AND rc.TABLE_NAME = kcu.TABLE_NAME
        WHERE kcu.REFERENCED_TABLE_NAME IS NOT NULL
          AND (kcu.TABLE_SCHEMA = {p} OR kcu.REFERENCED_TABLE_SCHEMA = {p})
        ORDER BY kcu.TABLE_NAME, kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#,
        p = SCHEMA_PARAM
    );
    let rows = conn.select(&sql, &[Value::from(schema), Value::from(schema)])?;
    Ok(constraints_from_rows(schema, &rows))
}

pub(super) fn routines(
    conn: &dyn Connection,
    schema: &str,
    kind: RoutineKind,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT CAST(ROUTINE_NAME AS CHAR(255)) AS routine_name \
         FROM INFORMATION_SCHEMA.ROUTINES \
         WHERE ROUTINE_SCHEMA = {} AND ROUTINE_TYPE = ? ORDER BY ROUTINE_NAME",
        SCHEMA_PARAM
    );
    let rows = conn.select(&sql, &[Value::from(schema), Value::from(kind.catalog_name())])?;
    Ok(rows.iter().filter_map(|r| r.get_str("routine_name")).collect())
}

pub(super) fn routine_parameters(
    dialect: &MysqlDialect,
    conn: &dyn Connection,
    routine: &RoutineSchema,
) -> Result<Vec<RoutineParameterRow>> {
    let sql = format!(
        r#"
        SELECT
            CAST(PARAMETER_NAME AS CHAR(255)) AS parameter_name,
            ORDINAL_POSITION AS ordinal_position,
            CAST(PARAMETER_MODE AS CHAR(16)) AS parameter_mode,
            CAST(DTD_IDENTIFIER AS CHAR(255)) AS db_type,
            CHARACTER_MAXIMUM_LENGTH AS max_length,
            NUMERIC_PRECISION AS num_precision,
            NUMERIC_SCALE AS num_scale
        FROM INFORMATION_SCHEMA.PARAMETERS
        WHERE SPECIFIC_SCHEMA = {} AND SPECIFIC_NAME = ? AND ROUTINE_TYPE = ?
        ORDER BY ORDINAL_POSITION
        "#,
        SCHEMA_PARAM
    );
    let rows = conn.select(
        &sql,
        &[
            Value::from(routine.schema_name.as_str()),
            Value::from(routine.routine_name.as_str()),
            Value::from(routine.kind.catalog_name()),
        ],
    )?;
    Ok(rows
        .iter()
        .filter_map(|r| parameter_from_row(dialect, r))
        .collect())
}
