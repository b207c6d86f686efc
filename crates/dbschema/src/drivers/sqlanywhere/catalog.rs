//! SQL Anywhere catalog queries against the SYS views.

use tracing::debug;

use super::SqlAnywhereDialect;
use crate::core::{
    ColumnSchema, Connection, ConstraintRow, IndexRow, RoutineKind, RoutineParameterRow,
    RoutineSchema, TableNameRow, TableSchema, Value,
};
use crate::drivers::common::{
    column_from_row, constraints_from_rows, indexes_from_rows, parameter_from_row,
    table_names_from_rows,
};
use crate::error::Result;

/// Owners shipped with every database.
const SYSTEM_OWNERS: &str =
    "'SYS', 'dbo', 'rs_systabgroup', 'diagnostics', 'SA_DEBUG', 'SYS_SPATIAL_ADMIN_ROLE'";

/// Index category 1 is the primary key.
const COLUMNS_QUERY: &str = r#"
    SELECT
        c.column_name AS column_name,
        d.domain_name AS db_type,
        CASE WHEN d.domain_name IN ('char', 'varchar', 'nchar', 'nvarchar', 'binary', 'varbinary')
            THEN c.width END AS max_length,
        CASE WHEN d.domain_name IN ('numeric', 'decimal') THEN c.width END AS num_precision,
        CASE WHEN d.domain_name IN ('numeric', 'decimal') THEN c.scale END AS num_scale,
        CASE WHEN c.nulls = 'Y' THEN 1 ELSE 0 END AS allow_null,
        c."default" AS default_value,
        CASE WHEN c."default" = 'autoincrement' THEN 1 ELSE 0 END AS auto_increment,
        CASE WHEN EXISTS (
            SELECT 1 FROM SYS.SYSIDX i
            JOIN SYS.SYSIDXCOL ic ON ic.table_id = i.table_id AND ic.index_id = i.index_id
            WHERE i.table_id = t.table_id AND i.index_category = 1 AND ic.column_id = c.column_id
        ) THEN 1 ELSE 0 END AS is_primary_key,
        r.remarks AS column_comment
    FROM SYS.SYSTABCOL c
    JOIN SYS.SYSTAB t ON t.table_id = c.table_id
    JOIN SYS.SYSUSER u ON u.user_id = t.creator
    JOIN SYS.SYSDOMAIN d ON d.domain_id = c.domain_id
    LEFT JOIN SYS.SYSREMARK r ON r.object_id = c.object_id
    WHERE u.user_name = ? AND t.table_name = ?
    ORDER BY c.column_id
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT c.column_name AS column_name
    FROM SYS.SYSIDX i
    JOIN SYS.SYSIDXCOL ic ON ic.table_id = i.table_id AND ic.index_id = i.index_id
    JOIN SYS.SYSTABCOL c ON c.table_id = ic.table_id AND c.column_id = ic.column_id
    JOIN SYS.SYSTAB t ON t.table_id = i.table_id
    JOIN SYS.SYSUSER u ON u.user_id = t.creator
    WHERE u.user_name = ? AND t.table_name = ? AND i.index_category = 1
    ORDER BY ic.sequence
"#;

/// Foreign key indexes (category 2) are left out.
const INDEXES_QUERY: &str = r#"
    SELECT
        i.index_name AS index_name,
        c.column_name AS column_name,
        CASE WHEN i.index_category = 1 OR i."unique" IN (1, 2) THEN 1 ELSE 0 END AS is_unique,
        CASE WHEN i.index_category = 1 THEN 1 ELSE 0 END AS is_primary
    FROM SYS.SYSIDX i
    JOIN SYS.SYSIDXCOL ic ON ic.table_id = i.table_id AND ic.index_id = i.index_id
    JOIN SYS.SYSTABCOL c ON c.table_id = ic.table_id AND c.column_id = ic.column_id
    JOIN SYS.SYSTAB t ON t.table_id = i.table_id
    JOIN SYS.SYSUSER u ON u.user_id = t.creator
    WHERE u.user_name = ? AND t.table_name = ? AND i.index_category IN (1, 3)
    ORDER BY i.index_name, ic.sequence
"#;

/// Referential actions live on system triggers: event `C` for update,
/// `D` for delete, with single-letter action codes.
const CONSTRAINTS_QUERY: &str = r#"
    SELECT
        ix.index_name AS constraint_name,
        fu.user_name AS table_schema,
        ft.table_name AS table_name,
        fc.column_name AS column_name,
        pu.user_name AS referenced_table_schema,
        pt.table_name AS referenced_table_name,
        pc.column_name AS referenced_column_name,
        ut.referential_action AS update_rule,
        dt.referential_action AS delete_rule
    FROM SYS.SYSFKEY fk
    JOIN SYS.SYSIDX ix ON ix.table_id = fk.foreign_table_id AND ix.index_id = fk.foreign_index_id
    JOIN SYS.SYSIDXCOL ic ON ic.table_id = fk.foreign_table_id AND ic.index_id = fk.foreign_index_id
    JOIN SYS.SYSTAB ft ON ft.table_id = fk.foreign_table_id
    JOIN SYS.SYSUSER fu ON fu.user_id = ft.creator
    JOIN SYS.SYSTABCOL fc ON fc.table_id = ic.table_id AND fc.column_id = ic.column_id
    JOIN SYS.SYSTAB pt ON pt.table_id = fk.primary_table_id
    JOIN SYS.SYSUSER pu ON pu.user_id = pt.creator
    JOIN SYS.SYSTABCOL pc ON pc.table_id = fk.primary_table_id AND pc.column_id = ic.primary_column_id
    LEFT JOIN SYS.SYSTRIGGER ut
        ON ut.foreign_table_id = fk.foreign_table_id AND ut.foreign_key_id = fk.foreign_index_id
        AND ut.event = 'C'
    LEFT JOIN SYS.SYSTRIGGER dt
        ON dt.foreign_table_id = fk.foreign_table_id AND dt.foreign_key_id = fk.foreign_index_id
        AND dt.event = 'D'
    WHERE fu.user_name = ? OR pu.user_name = ?
    ORDER BY ft.table_name, ix.index_name, ic.sequence
"#;

/// parm_type 0 is an ordinary parameter, 4 a function's return value.
const PARAMETERS_QUERY: &str = r#"
    SELECT
        pp.parm_name AS parameter_name,
        CASE WHEN pp.parm_type = 4 THEN 0 ELSE pp.parm_id END AS ordinal_position,
        CASE
            WHEN pp.parm_type = 4 THEN 'RETURN'
            WHEN pp.parm_mode_in = 'Y' AND pp.parm_mode_out = 'Y' THEN 'INOUT'
            WHEN pp.parm_mode_out = 'Y' THEN 'OUT'
            ELSE 'IN'
        END AS parameter_mode,
        d.domain_name AS db_type,
        pp.width AS max_length,
        pp.scale AS num_scale,
        pp."default" AS default_value
    FROM SYS.SYSPROCPARM pp
    JOIN SYS.SYSPROCEDURE p ON p.proc_id = pp.proc_id
    JOIN SYS.SYSUSER u ON u.user_id = p.creator
    JOIN SYS.SYSDOMAIN d ON d.domain_id = pp.domain_id
    WHERE u.user_name = ? AND p.proc_name = ? AND pp.parm_type IN (0, 4)
    ORDER BY pp.parm_id
"#;

fn table_bindings(table: &TableSchema) -> [Value; 2] {
    [
        Value::from(table.schema_name.as_str()),
        Value::from(table.table_name.as_str()),
    ]
}

pub(super) fn default_schema(conn: &dyn Connection) -> Result<String> {
    let row = conn.select_one("SELECT CURRENT USER AS schema_name", &[])?;
    Ok(row.and_then(|r| r.get_str("schema_name")).unwrap_or_default())
}

pub(super) fn schema_names(conn: &dyn Connection) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT u.user_name AS schema_name FROM SYS.SYSTAB t \
         JOIN SYS.SYSUSER u ON u.user_id = t.creator \
         WHERE u.user_name NOT IN ({}) ORDER BY u.user_name",
        SYSTEM_OWNERS
    );
    let rows = conn.select(&sql, &[])?;
    Ok(rows.iter().filter_map(|r| r.get_str("schema_name")).collect())
}

/// Table type 21 is a view.
pub(super) fn table_names(
    conn: &dyn Connection,
    schema: &str,
    include_views: bool,
) -> Result<Vec<TableNameRow>> {
    let types = if include_views { "1, 21" } else { "1" };
    let sql = format!(
        "SELECT t.table_name AS table_name, \
         CASE WHEN t.table_type = 21 THEN 'VIEW' ELSE 'BASE' END AS table_type \
         FROM SYS.SYSTAB t JOIN SYS.SYSUSER u ON u.user_id = t.creator \
         WHERE u.user_name = ? AND t.table_type IN ({}) ORDER BY t.table_name",
        types
    );
    let rows = conn.select(&sql, &[Value::from(schema)])?;
    Ok(table_names_from_rows(schema, &rows))
}

pub(super) fn columns(
    dialect: &SqlAnywhereDialect,
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

/// Functions are the procedures carrying a return-value parameter.
pub(super) fn routines(
    conn: &dyn Connection,
    schema: &str,
    kind: RoutineKind,
) -> Result<Vec<String>> {
    let presence = match kind {
        RoutineKind::Function => "EXISTS",
        RoutineKind::Procedure => "NOT EXISTS",
    };
    let sql = format!(
        "SELECT p.proc_name AS routine_name FROM SYS.SYSPROCEDURE p \
         JOIN SYS.SYSUSER u ON u.user_id = p.creator \
         WHERE u.user_name = ? AND {} (SELECT 1 FROM SYS.SYSPROCPARM pp \
         WHERE pp.proc_id = p.proc_id AND pp.parm_type = 4) \
         ORDER BY p.proc_name",
        presence
    );
    let rows = conn.select(&sql, &[Value::from(schema)])?;
    Ok(rows.iter().filter_map(|r| r.get_str("routine_name")).collect())
}

pub(super) fn routine_parameters(
    dialect: &SqlAnywhereDialect,
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
