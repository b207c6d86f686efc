//! SQL Server catalog queries against sys.* and INFORMATION_SCHEMA.

use tracing::debug;

use super::MssqlDialect;
use crate::core::{
    ColumnSchema, Connection, ConstraintRow, IndexRow, RoutineKind, RoutineParameterRow,
    RoutineSchema, TableNameRow, TableSchema, Value,
};
use crate::drivers::common::{
    column_from_row, constraints_from_rows, indexes_from_rows, parameter_from_row,
    table_names_from_rows,
};
use crate::error::Result;

const COLUMNS_QUERY: &str = r#"
    SELECT
        COLUMN_NAME AS column_name,
        DATA_TYPE AS db_type,
        CHARACTER_MAXIMUM_LENGTH AS max_length,
        NUMERIC_PRECISION AS num_precision,
        NUMERIC_SCALE AS num_scale,
        CASE WHEN IS_NULLABLE = 'YES' THEN 1 ELSE 0 END AS allow_null,
        COLUMN_DEFAULT AS default_value,
        ISNULL(COLUMNPROPERTY(OBJECT_ID(QUOTENAME(TABLE_SCHEMA) + '.' + QUOTENAME(TABLE_NAME)), COLUMN_NAME, 'IsIdentity'), 0) AS auto_increment
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
    ORDER BY ORDINAL_POSITION
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT c.COLUMN_NAME AS column_name
    FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE c
        ON c.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
        AND c.TABLE_SCHEMA = tc.TABLE_SCHEMA
        AND c.TABLE_NAME = tc.TABLE_NAME
    WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
      AND tc.TABLE_SCHEMA = @P1
      AND tc.TABLE_NAME = @P2
    ORDER BY c.ORDINAL_POSITION
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        i.name AS index_name,
        c.name AS column_name,
        i.is_unique AS is_unique,
        i.is_primary_key AS is_primary
    FROM sys.indexes i
    JOIN sys.index_columns ic
        ON ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 0
    JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    JOIN sys.tables tb ON i.object_id = tb.object_id
    JOIN sys.schemas s ON tb.schema_id = s.schema_id
    WHERE s.name = @P1
      AND tb.name = @P2
      AND i.type > 0
    ORDER BY i.name, ic.key_ordinal
"#;

/// Actions come back as `NO_ACTION`, `SET_NULL`, ...; the row reader
/// normalizes them.
const CONSTRAINTS_QUERY: &str = r#"
    SELECT
        fk.name AS constraint_name,
        ps.name AS table_schema,
        pt.name AS table_name,
        pc.name AS column_name,
        rs.name AS referenced_table_schema,
        rt.name AS referenced_table_name,
        rc.name AS referenced_column_name,
        fk.update_referential_action_desc AS update_rule,
        fk.delete_referential_action_desc AS delete_rule
    FROM sys.foreign_keys fk
    JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
    JOIN sys.tables pt ON fk.parent_object_id = pt.object_id
    JOIN sys.schemas ps ON pt.schema_id = ps.schema_id
    JOIN sys.columns pc ON fkc.parent_object_id = pc.object_id AND fkc.parent_column_id = pc.column_id
    JOIN sys.tables rt ON fk.referenced_object_id = rt.object_id
    JOIN sys.schemas rs ON rt.schema_id = rs.schema_id
    JOIN sys.columns rc ON fkc.referenced_object_id = rc.object_id AND fkc.referenced_column_id = rc.column_id
    WHERE ps.name = @P1 OR rs.name = @P1
    ORDER BY pt.name, fk.name, fkc.constraint_column_id
"#;

const PARAMETERS_QUERY: &str = r#"
    SELECT
        PARAMETER_NAME AS parameter_name,
        ORDINAL_POSITION AS ordinal_position,
        CASE WHEN IS_RESULT = 'YES' THEN 'RETURN' ELSE PARAMETER_MODE END AS parameter_mode,
        DATA_TYPE AS db_type,
        CHARACTER_MAXIMUM_LENGTH AS max_length,
        NUMERIC_PRECISION AS num_precision,
        NUMERIC_SCALE AS num_scale
    FROM INFORMATION_SCHEMA.PARAMETERS
    WHERE SPECIFIC_SCHEMA = @P1 AND SPECIFIC_NAME = @P2
    ORDER BY ORDINAL_POSITION
"#;

fn table_bindings(table: &TableSchema) -> [Value; 2] {
    [
        Value::from(table.schema_name.as_str()),
        Value::from(table.table_name.as_str()),
    ]
}

pub(super) fn default_schema(conn: &dyn Connection) -> Result<String> {
    let row = conn.select_one("SELECT SCHEMA_NAME() AS schema_name", &[])?;
    Ok(row
        .and_then(|r| r.get_str("schema_name"))
        .unwrap_or_else(|| "dbo".to_string()))
}

pub(super) fn schema_names(conn: &dyn Connection) -> Result<Vec<String>> {
    let rows = conn.select(
        "SELECT name AS schema_name FROM sys.schemas \
         WHERE name NOT IN ('INFORMATION_SCHEMA', 'sys', 'guest') AND name NOT LIKE 'db[_]%' \
         ORDER BY name",
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
        "SELECT TABLE_NAME AS table_name, TABLE_TYPE AS table_type \
         FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = @P1",
    );
    if !include_views {
        sql.push_str(" AND TABLE_TYPE = 'BASE TABLE'");
    }
    sql.push_str(" ORDER BY TABLE_NAME");
    let rows = conn.select(&sql, &[Value::from(schema)])?;
    Ok(table_names_from_rows(schema, &rows))
}

pub(super) fn columns(
    dialect: &MssqlDialect,
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
    let rows = conn.select(CONSTRAINTS_QUERY, &[Value::from(schema)])?;
    Ok(constraints_from_rows(schema, &rows))
}

pub(super) fn routines(
    conn: &dyn Connection,
    schema: &str,
    kind: RoutineKind,
) -> Result<Vec<String>> {
    let rows = conn.select(
        "SELECT ROUTINE_NAME AS routine_name FROM INFORMATION_SCHEMA.ROUTINES \
         WHERE ROUTINE_SCHEMA = @P1 AND ROUTINE_TYPE = @P2 ORDER BY ROUTINE_NAME",
        &[Value::from(schema), Value::from(kind.catalog_name())],
    )?;
    Ok(rows.iter().filter_map(|r| r.get_str("routine_name")).collect())
}

pub(super) fn routine_parameters(
    dialect: &MssqlDialect,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DryRunConnection;
    use crate::core::{ParamType, Row, SimpleType};

    #[test]
    fn test_columns_identity_and_wrapped_defaults() {
        let conn = DryRunConnection::new("sqlsrv");
        conn.respond(
            "INFORMATION_SCHEMA.COLUMNS",
            vec![
                Row::from_pairs([
                    ("column_name", Value::from("id")),
                    ("db_type", "int".into()),
                    ("num_precision", 10.into()),
                    ("allow_null", 0.into()),
                    ("auto_increment", 1.into()),
                ]),
                Row::from_pairs([
                    ("column_name", Value::from("qty")),
                    ("db_type", "int".into()),
                    ("allow_null", 1.into()),
                    ("default_value", "((0))".into()),
                    ("auto_increment", 0.into()),
                ]),
                Row::from_pairs([
                    ("column_name", Value::from("title")),
                    ("db_type", "nvarchar".into()),
                    ("max_length", 120.into()),
                    ("default_value", "(N'untitled')".into()),
                ]),
                Row::from_pairs([
                    ("column_name", Value::from("version")),
                    ("db_type", "timestamp".into()),
                ]),
            ],
        );
        let table = TableSchema::stub("dbo", "items", "dbo", false);
        let cols = columns(&MssqlDialect::new(), &conn, &table).unwrap();
        assert_eq!(cols[0].quoted_name, "[id]");
        assert!(cols[0].auto_increment);
        assert!(!cols[0].allow_null);
        assert_eq!(cols[1].default_value, Some(Value::Int(0)));
        assert_eq!(cols[2].size, Some(120));
        assert_eq!(cols[2].default_value, Some(Value::Text("untitled".into())));
        assert_eq!(cols[3].column_type, SimpleType::Binary);
    }

    #[test]
    fn test_constraints_normalize_action_desc() {
        let conn = DryRunConnection::new("sqlsrv");
        conn.respond(
            "sys.foreign_keys",
            vec![Row::from_pairs([
                ("constraint_name", "fk_orders_customer"),
                ("table_schema", "dbo"),
                ("table_name", "orders"),
                ("column_name", "customer_id"),
                ("referenced_table_schema", "dbo"),
                ("referenced_table_name", "customers"),
                ("referenced_column_name", "id"),
                ("update_rule", "NO_ACTION"),
                ("delete_rule", "SET_NULL"),
            ])],
        );
        let rows = constraints(&conn, "dbo").unwrap();
        assert_eq!(rows[0].update_rule.as_deref(), Some("NO ACTION"));
        assert_eq!(rows[0].delete_rule.as_deref(), Some("SET NULL"));
    }

    #[test]
    fn test_parameters_keep_sigil_and_return_slot() {
        let conn = DryRunConnection::new("sqlsrv");
        conn.respond(
            "INFORMATION_SCHEMA.PARAMETERS",
            vec![
                Row::from_pairs([
                    ("parameter_name", Value::from("")),
                    ("ordinal_position", 0.into()),
                    ("parameter_mode", "RETURN".into()),
                    ("db_type", "money".into()),
                ]),
                Row::from_pairs([
                    ("parameter_name", Value::from("@total")),
                    ("ordinal_position", 1.into()),
                    ("parameter_mode", "INOUT".into()),
                    ("db_type", "int".into()),
                ]),
            ],
        );
        let routine = RoutineSchema::stub(RoutineKind::Function, "dbo", "calc", "dbo");
        let params = routine_parameters(&MssqlDialect::new(), &conn, &routine).unwrap();
        assert!(params[0].is_return);
        assert_eq!(params[0].parameter.value_type, SimpleType::Money);
        assert_eq!(params[1].parameter.name, "@total");
        assert_eq!(params[1].parameter.param_type, ParamType::Inout);
    }
}
