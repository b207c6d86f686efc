//! Db2 catalog queries against the SYSCAT views.

use tracing::debug;

use super::IbmDialect;
use crate::core::{
    ColumnSchema, Connection, ConstraintRow, IndexRow, RoutineKind, RoutineParameterRow,
    RoutineSchema, TableNameRow, TableSchema, Value,
};
use crate::drivers::common::{
    column_from_row, constraints_from_rows, indexes_from_rows, parameter_from_row,
    table_names_from_rows,
};
use crate::error::Result;

/// LENGTH is bytes for strings and precision for decimals; it means nothing
/// useful for the other types.
const COLUMNS_QUERY: &str = r#"
    SELECT
        COLNAME AS column_name,
        TYPENAME AS db_type,
        CASE WHEN TYPENAME IN ('CHARACTER', 'VARCHAR', 'GRAPHIC', 'VARGRAPHIC', 'BINARY', 'VARBINARY')
            THEN LENGTH END AS max_length,
        CASE WHEN TYPENAME IN ('DECIMAL', 'NUMERIC') THEN LENGTH END AS num_precision,
        CASE WHEN TYPENAME IN ('DECIMAL', 'NUMERIC') THEN SCALE END AS num_scale,
        CASE WHEN NULLS = 'Y' THEN 1 ELSE 0 END AS allow_null,
        DEFAULT AS default_value,
        CASE WHEN IDENTITY = 'Y' THEN 1 ELSE 0 END AS auto_increment,
        CASE WHEN KEYSEQ IS NOT NULL THEN 1 ELSE 0 END AS is_primary_key,
        REMARKS AS column_comment
    FROM SYSCAT.COLUMNS
    WHERE TABSCHEMA = ? AND TABNAME = ?
    ORDER BY COLNO
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT COLNAME AS column_name
    FROM SYSCAT.COLUMNS
    WHERE TABSCHEMA = ? AND TABNAME = ? AND KEYSEQ > 0
    ORDER BY KEYSEQ
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        i.INDNAME AS index_name,
        c.COLNAME AS column_name,
        CASE WHEN i.UNIQUERULE IN ('U', 'P') THEN 1 ELSE 0 END AS is_unique,
        CASE WHEN i.UNIQUERULE = 'P' THEN 1 ELSE 0 END AS is_primary
    FROM SYSCAT.INDEXES i
    JOIN SYSCAT.INDEXCOLUSE c ON c.INDSCHEMA = i.INDSCHEMA AND c.INDNAME = i.INDNAME
    WHERE i.TABSCHEMA = ? AND i.TABNAME = ?
    ORDER BY i.INDNAME, c.COLSEQ
"#;

/// Rules are single-letter codes (`A`, `C`, `N`, `R`).
const CONSTRAINTS_QUERY: &str = r#"
    SELECT
        r.CONSTNAME AS constraint_name,
        r.TABSCHEMA AS table_schema,
        r.TABNAME AS table_name,
        fk.COLNAME AS column_name,
        r.REFTABSCHEMA AS referenced_table_schema,
        r.REFTABNAME AS referenced_table_name,
        pk.COLNAME AS referenced_column_name,
        r.UPDATERULE AS update_rule,
        r.DELETERULE AS delete_rule
    FROM SYSCAT.REFERENCES r
    JOIN SYSCAT.KEYCOLUSE fk
        ON fk.CONSTNAME = r.CONSTNAME AND fk.TABSCHEMA = r.TABSCHEMA AND fk.TABNAME = r.TABNAME
    JOIN SYSCAT.KEYCOLUSE pk
        ON pk.CONSTNAME = r.REFKEYNAME AND pk.TABSCHEMA = r.REFTABSCHEMA
        AND pk.TABNAME = r.REFTABNAME AND pk.COLSEQ = fk.COLSEQ
    WHERE r.TABSCHEMA = ? OR r.REFTABSCHEMA = ?
    ORDER BY r.TABNAME, r.CONSTNAME, fk.COLSEQ
"#;

/// ROWTYPE is `P` (in), `O` (out), `B` (inout) or `C` (function result).
const PARAMETERS_QUERY: &str = r#"
    SELECT
        p.PARMNAME AS parameter_name,
        p.ORDINAL AS ordinal_position,
        CASE p.ROWTYPE WHEN 'C' THEN 'RETURN' ELSE p.ROWTYPE END AS parameter_mode,
        p.TYPENAME AS db_type,
        p.LENGTH AS max_length,
        p.SCALE AS num_scale
    FROM SYSCAT.ROUTINEPARMS p
    JOIN SYSCAT.ROUTINES r
        ON r.ROUTINESCHEMA = p.ROUTINESCHEMA AND r.SPECIFICNAME = p.SPECIFICNAME
    WHERE r.ROUTINESCHEMA = ? AND r.ROUTINENAME = ? AND r.ROUTINETYPE = ?
    ORDER BY p.ORDINAL
"#;

fn table_bindings(table: &TableSchema) -> [Value; 2] {
    [
        Value::from(table.schema_name.as_str()),
        Value::from(table.table_name.as_str()),
    ]
}

fn routine_type(kind: RoutineKind) -> &'static str {
    match kind {
        RoutineKind::Procedure => "P",
        RoutineKind::Function => "F",
    }
}

pub(super) fn default_schema(conn: &dyn Connection) -> Result<String> {
    let row = conn.select_one(
        "SELECT CURRENT SCHEMA AS schema_name FROM SYSIBM.SYSDUMMY1",
        &[],
    )?;
    Ok(row
        .and_then(|r| r.get_str("schema_name"))
        .map(|s| s.trim_end().to_string())
        .unwrap_or_default())
}

pub(super) fn schema_names(conn: &dyn Connection) -> Result<Vec<String>> {
    let rows = conn.select(
        "SELECT RTRIM(SCHEMANAME) AS schema_name FROM SYSCAT.SCHEMATA \
         WHERE SCHEMANAME NOT LIKE 'SYS%' AND SCHEMANAME NOT IN ('NULLID', 'SQLJ') \
         ORDER BY SCHEMANAME",
        &[],
    )?;
    Ok(rows.iter().filter_map(|r| r.get_str("schema_name")).collect())
}

pub(super) fn table_names(
    conn: &dyn Connection,
    schema: &str,
    include_views: bool,
) -> Result<Vec<TableNameRow>> {
    let types = if include_views { "'T', 'V'" } else { "'T'" };
    let sql = format!(
        "SELECT TABNAME AS table_name, TYPE AS table_type FROM SYSCAT.TABLES \
         WHERE TABSCHEMA = ? AND TYPE IN ({}) ORDER BY TABNAME",
        types
    );
    let rows = conn.select(&sql, &[Value::from(schema)])?;
    Ok(table_names_from_rows(schema, &rows))
}

pub(super) fn columns(
    dialect: &IbmDialect,
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
        "SELECT ROUTINENAME AS routine_name FROM SYSCAT.ROUTINES \
         WHERE ROUTINESCHEMA = ? AND ROUTINETYPE = ? ORDER BY ROUTINENAME",
        &[Value::from(schema), Value::from(routine_type(kind))],
    )?;
    Ok(rows.iter().filter_map(|r| r.get_str("routine_name")).collect())
}

pub(super) fn routine_parameters(
    dialect: &IbmDialect,
    conn: &dyn Connection,
    routine: &RoutineSchema,
) -> Result<Vec<RoutineParameterRow>> {
    let rows = conn.select(
        PARAMETERS_QUERY,
        &[
            Value::from(routine.schema_name.as_str()),
            Value::from(routine.routine_name.as_str()),
            Value::from(routine_type(routine.kind)),
        ],
    )?;
    Ok(rows
        .iter()
        .filter_map(|r| parameter_from_row(dialect, r))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DryRunConnection;
    use crate::core::{ParamType, Row, SimpleType};

    #[test]
    fn test_table_names_view_code() {
        let conn = DryRunConnection::new("ibm");
        conn.respond(
            "SYSCAT.TABLES",
            vec![
                Row::from_pairs([("table_name", "ORDERS"), ("table_type", "T")]),
                Row::from_pairs([("table_name", "ORDER_V"), ("table_type", "V")]),
            ],
        );
        let names = table_names(&conn, "APP", true).unwrap();
        assert!(!names[0].is_view);
        assert!(names[1].is_view);
    }

    #[test]
    fn test_columns_identity_and_lengths() {
        let conn = DryRunConnection::new("ibm");
        conn.respond(
            "SYSCAT.COLUMNS",
            vec![
                Row::from_pairs([
                    ("column_name", Value::from("ID")),
                    ("db_type", "INTEGER".into()),
                    ("allow_null", 0.into()),
                    ("auto_increment", 1.into()),
                    ("is_primary_key", 1.into()),
                ]),
                Row::from_pairs([
                    ("column_name", Value::from("PRICE")),
                    ("db_type", "DECIMAL".into()),
                    ("num_precision", 12.into()),
                    ("num_scale", 2.into()),
                    ("allow_null", 1.into()),
                    ("default_value", "0.00".into()),
                ]),
            ],
        );
        let table = TableSchema::stub("APP", "ORDERS", "APP", false);
        let cols = columns(&IbmDialect::new(), &conn, &table).unwrap();
        assert!(cols[0].auto_increment && cols[0].is_primary_key);
        assert_eq!(cols[1].column_type, SimpleType::Decimal);
        assert_eq!((cols[1].precision, cols[1].scale), (Some(12), Some(2)));
    }

    #[test]
    fn test_parameter_row_types() {
        let conn = DryRunConnection::new("ibm");
        conn.respond(
            "SYSCAT.ROUTINEPARMS",
            vec![
                Row::from_pairs([
                    ("parameter_name", Value::from("CUST")),
                    ("ordinal_position", 1.into()),
                    ("parameter_mode", "P".into()),
                    ("db_type", "INTEGER".into()),
                ]),
                Row::from_pairs([
                    ("parameter_name", Value::from("TOTAL")),
                    ("ordinal_position", 2.into()),
                    ("parameter_mode", "O".into()),
                    ("db_type", "DECIMAL".into()),
                ]),
            ],
        );
        let routine = RoutineSchema::stub(RoutineKind::Procedure, "APP", "TOTALS", "APP");
        let params = routine_parameters(&IbmDialect::new(), &conn, &routine).unwrap();
        assert_eq!(params[0].parameter.param_type, ParamType::In);
        assert_eq!(params[1].parameter.param_type, ParamType::Out);
        assert_eq!(
            conn.queries().len(),
            1,
            "parameters come from a single catalog query"
        );
    }
}
