//! Oracle catalog queries against the ALL_* dictionary views.

use tracing::debug;

use super::OracleDialect;
use crate::core::{
    ColumnSchema, Connection, ConstraintRow, IndexRow, RoutineKind, RoutineParameterRow,
    RoutineSchema, TableNameRow, TableSchema, Value,
};
use crate::drivers::common::{
    column_from_row, constraints_from_rows, indexes_from_rows, parameter_from_row,
    table_names_from_rows,
};
use crate::error::Result;

/// NUMBER columns carry their precision in the type string so the dialect
/// can tell integers and flags from decimals.
const COLUMNS_QUERY: &str = r#"
    SELECT
        c.COLUMN_NAME AS column_name,
        CASE WHEN c.DATA_TYPE = 'NUMBER' AND c.DATA_PRECISION IS NOT NULL
            THEN 'NUMBER(' || c.DATA_PRECISION || ',' || NVL(c.DATA_SCALE, 0) || ')'
            ELSE c.DATA_TYPE END AS db_type,
        CASE WHEN c.CHAR_LENGTH > 0 THEN c.CHAR_LENGTH END AS max_length,
        c.DATA_PRECISION AS num_precision,
        c.DATA_SCALE AS num_scale,
        c.NULLABLE AS allow_null,
        c.DATA_DEFAULT AS default_value,
        c.IDENTITY_COLUMN AS auto_increment,
        cc.COMMENTS AS column_comment
    FROM ALL_TAB_COLUMNS c
    LEFT JOIN ALL_COL_COMMENTS cc
        ON cc.OWNER = c.OWNER AND cc.TABLE_NAME = c.TABLE_NAME AND cc.COLUMN_NAME = c.COLUMN_NAME
    WHERE c.OWNER = :1 AND c.TABLE_NAME = :2
    ORDER BY c.COLUMN_ID
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT cc.COLUMN_NAME AS column_name
    FROM ALL_CONSTRAINTS c
    JOIN ALL_CONS_COLUMNS cc ON cc.OWNER = c.OWNER AND cc.CONSTRAINT_NAME = c.CONSTRAINT_NAME
    WHERE c.OWNER = :1 AND c.TABLE_NAME = :2 AND c.CONSTRAINT_TYPE = 'P'
    ORDER BY cc.POSITION
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        i.INDEX_NAME AS index_name,
        ic.COLUMN_NAME AS column_name,
        CASE WHEN i.UNIQUENESS = 'UNIQUE' THEN 1 ELSE 0 END AS is_unique,
        CASE WHEN EXISTS (
            SELECT 1 FROM ALL_CONSTRAINTS p
            WHERE p.OWNER = i.TABLE_OWNER AND p.TABLE_NAME = i.TABLE_NAME
              AND p.INDEX_NAME = i.INDEX_NAME AND p.CONSTRAINT_TYPE = 'P'
        ) THEN 1 ELSE 0 END AS is_primary
    FROM ALL_INDEXES i
    JOIN ALL_IND_COLUMNS ic ON ic.INDEX_OWNER = i.OWNER AND ic.INDEX_NAME = i.INDEX_NAME
    WHERE i.TABLE_OWNER = :1 AND i.TABLE_NAME = :2
    ORDER BY i.INDEX_NAME, ic.COLUMN_POSITION
"#;

/// Oracle has no ON UPDATE action for foreign keys.
const CONSTRAINTS_QUERY: &str = r#"
    SELECT
        c.CONSTRAINT_NAME AS constraint_name,
        c.OWNER AS table_schema,
        c.TABLE_NAME AS table_name,
        cc.COLUMN_NAME AS column_name,
        r.OWNER AS referenced_table_schema,
        r.TABLE_NAME AS referenced_table_name,
        rc.COLUMN_NAME AS referenced_column_name,
        'NO ACTION' AS update_rule,
        c.DELETE_RULE AS delete_rule
    FROM ALL_CONSTRAINTS c
    JOIN ALL_CONS_COLUMNS cc ON cc.OWNER = c.OWNER AND cc.CONSTRAINT_NAME = c.CONSTRAINT_NAME
    JOIN ALL_CONSTRAINTS r ON r.OWNER = c.R_OWNER AND r.CONSTRAINT_NAME = c.R_CONSTRAINT_NAME
    JOIN ALL_CONS_COLUMNS rc
        ON rc.OWNER = r.OWNER AND rc.CONSTRAINT_NAME = r.CONSTRAINT_NAME AND rc.POSITION = cc.POSITION
    WHERE c.CONSTRAINT_TYPE = 'R' AND (c.OWNER = :1 OR r.OWNER = :2)
    ORDER BY c.TABLE_NAME, c.CONSTRAINT_NAME, cc.POSITION
"#;

/// Position 0 is a function's return value; packaged routines are not
/// standalone and are skipped.
const PARAMETERS_QUERY: &str = r#"
    SELECT
        ARGUMENT_NAME AS parameter_name,
        POSITION AS ordinal_position,
        IN_OUT AS parameter_mode,
        DATA_TYPE AS db_type,
        DATA_LENGTH AS max_length,
        DATA_PRECISION AS num_precision,
        DATA_SCALE AS num_scale
    FROM ALL_ARGUMENTS
    WHERE OWNER = :1 AND OBJECT_NAME = :2 AND PACKAGE_NAME IS NULL AND DATA_LEVEL = 0
    ORDER BY POSITION
"#;

fn table_bindings(table: &TableSchema) -> [Value; 2] {
    [
        Value::from(table.schema_name.as_str()),
        Value::from(table.table_name.as_str()),
    ]
}

pub(super) fn default_schema(conn: &dyn Connection) -> Result<String> {
    let row = conn.select_one(
        "SELECT SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA') AS schema_name FROM DUAL",
        &[],
    )?;
    Ok(row.and_then(|r| r.get_str("schema_name")).unwrap_or_default())
}

pub(super) fn schema_names(conn: &dyn Connection) -> Result<Vec<String>> {
    let rows = conn.select(
        "SELECT USERNAME AS schema_name FROM ALL_USERS \
         WHERE ORACLE_MAINTAINED = 'N' ORDER BY USERNAME",
        &[],
    )?;
    Ok(rows.iter().filter_map(|r| r.get_str("schema_name")).collect())
}

pub(super) fn table_names(
    conn: &dyn Connection,
    schema: &str,
    include_views: bool,
) -> Result<Vec<TableNameRow>> {
    let mut sql = String::from(
        "SELECT TABLE_NAME AS table_name, 'TABLE' AS table_type FROM ALL_TABLES WHERE OWNER = :1",
    );
    let mut bindings = vec![Value::from(schema)];
    if include_views {
        sql.push_str(
            " UNION ALL SELECT VIEW_NAME AS table_name, 'VIEW' AS table_type \
             FROM ALL_VIEWS WHERE OWNER = :2",
        );
        bindings.push(Value::from(schema));
    }
    sql.push_str(" ORDER BY 1");
    let rows = conn.select(&sql, &bindings)?;
    Ok(table_names_from_rows(schema, &rows))
}

pub(super) fn columns(
    dialect: &OracleDialect,
    conn: &dyn Connection,
    table: &TableSchema,
) -> Result<Vec<ColumnSchema>> {
    let rows = conn.select(COLUMNS_QUERY, &table_bindings(table))?;
    let columns: Vec<ColumnSchema> = rows
        .iter()
        .filter_map(|r| column_from_row(dialect, r))
        .collect();
    debug!(
        "Loaded {} columns for {}",
        columns.len(),
        table.qualified_name()
    );
    Ok(columns)
}

pub(super) fn primary_key(conn: &dyn Connection, table: &TableSchema) -> Result<Vec<String>> {
    let rows = conn.select(PRIMARY_KEY_QUERY, &table_bindings(table))?;
    Ok(rows.iter().filter_map(|r| r.get_str("column_name")).collect())
}

pub(super) fn indexes(conn: &dyn Connection, table: &TableSchema) -> Result<Vec<IndexRow>> {
    let rows = conn.select(INDEXES_QUERY, &table_bindings(table))?;
    Ok(indexes_from_rows(&rows))
}

pub(super) fn constraints(conn: &dyn Connection, schema: &str) -> Result<Vec<ConstraintRow>> {
    let rows = conn.select(
        CONSTRAINTS_QUERY,
        &[Value::from(schema), Value::from(schema)],
    )?;
    Ok(constraints_from_rows(schema, &rows))
}

pub(super) fn routines(
    conn: &dyn Connection,
    schema: &str,
    kind: RoutineKind,
) -> Result<Vec<String>> {
    let rows = conn.select(
        "SELECT OBJECT_NAME AS routine_name FROM ALL_OBJECTS \
         WHERE OWNER = :1 AND OBJECT_TYPE = :2 ORDER BY OBJECT_NAME",
        &[Value::from(schema), Value::from(kind.catalog_name())],
    )?;
    Ok(rows.iter().filter_map(|r| r.get_str("routine_name")).collect())
}

pub(super) fn routine_parameters(
    dialect: &OracleDialect,
    conn: &dyn Connection,
    routine: &RoutineSchema,
) -> Result<Vec<RoutineParameterRow>> {
    let rows = conn.select(
        PARAMETERS_QUERY,
        &[
            Value::from(routine.schema_name.as_str()),
            Value::from(routine.routine_name.as_str()),
        ],
    )?;
    Ok(rows
        .iter()
        .filter_map(|r| parameter_from_row(dialect, r))
        .collect())
}
