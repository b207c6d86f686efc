//! SQLite catalog queries over sqlite_master and the table-valued pragmas.
//!
//! The pragma functions (`pragma_table_info(...)` and friends) need
//! SQLite 3.16 or later.

use tracing::debug;

use super::SqliteDialect;
use crate::core::{ColumnSchema, Connection, ConstraintRow, IndexRow, TableNameRow, TableSchema, Value};
use crate::drivers::common::{
    column_from_row, constraints_from_rows, indexes_from_rows, table_names_from_rows,
};
use crate::error::Result;

/// A lone `INTEGER PRIMARY KEY` aliases the rowid and numbers itself.
const COLUMNS_QUERY: &str = r#"
    SELECT
        c.name AS column_name,
        c.type AS db_type,
        c."notnull" = 0 AS allow_null,
        c.dflt_value AS default_value,
        c.pk > 0 AS is_primary_key,
        (lower(c.type) = 'integer' AND c.pk = 1
            AND (SELECT COUNT(*) FROM pragma_table_info(?1) k WHERE k.pk > 0) = 1) AS auto_increment
    FROM pragma_table_info(?1) c
    ORDER BY c.cid
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT name AS column_name
    FROM pragma_table_info(?1)
    WHERE pk > 0
    ORDER BY pk
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        il.name AS index_name,
        ii.name AS column_name,
        il."unique" AS is_unique,
        il.origin = 'pk' AS is_primary
    FROM pragma_index_list(?1) il
    JOIN pragma_index_info(il.name) ii
    ORDER BY il.name, ii.seqno
"#;

/// Every foreign key of every table. A reference without a target column
/// points at the parent's primary key.
const CONSTRAINTS_QUERY: &str = r#"
    SELECT
        'fk_' || m.name || '_' || f."from" AS constraint_name,
        m.name AS table_name,
        f."from" AS column_name,
        f."table" AS referenced_table_name,
        COALESCE(f."to", (
            SELECT p.name FROM pragma_table_info(f."table") p WHERE p.pk = 1
        )) AS referenced_column_name,
        f.on_update AS update_rule,
        f.on_delete AS delete_rule
    FROM sqlite_master m
    JOIN pragma_foreign_key_list(m.name) f
    WHERE m.type = 'table'
    ORDER BY m.name, f.id, f.seq
"#;

pub(super) fn table_names(conn: &dyn Connection, include_views: bool) -> Result<Vec<TableNameRow>> {
    let types = if include_views {
        "'table', 'view'"
    } else {
        "'table'"
    };
    let sql = format!(
        "SELECT name AS table_name, type AS table_type FROM sqlite_master \
         WHERE type IN ({}) AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
        types
    );
    let rows = conn.select(&sql, &[])?;
    Ok(table_names_from_rows("", &rows))
}

pub(super) fn columns(
    dialect: &SqliteDialect,
    conn: &dyn Connection,
    table: &TableSchema,
) -> Result<Vec<ColumnSchema>> {
    let rows = conn.select(COLUMNS_QUERY, &[Value::from(table.table_name.as_str())])?;
    let columns: Vec<ColumnSchema> = rows
        .iter()
        .filter_map(|r| column_from_row(dialect, r))
        .collect();
    debug!("Loaded {} columns for {}", columns.len(), table.table_name);
    Ok(columns)
}

pub(super) fn primary_key(conn: &dyn Connection, table: &TableSchema) -> Result<Vec<String>> {
    let rows = conn.select(PRIMARY_KEY_QUERY, &[Value::from(table.table_name.as_str())])?;
    Ok(rows.iter().filter_map(|r| r.get_str("column_name")).collect())
}

pub(super) fn indexes(conn: &dyn Connection, table: &TableSchema) -> Result<Vec<IndexRow>> {
    let rows = conn.select(INDEXES_QUERY, &[Value::from(table.table_name.as_str())])?;
    Ok(indexes_from_rows(&rows))
}

pub(super) fn constraints(conn: &dyn Connection, schema: &str) -> Result<Vec<ConstraintRow>> {
    let rows = conn.select(CONSTRAINTS_QUERY, &[])?;
    Ok(constraints_from_rows(schema, &rows))
}
