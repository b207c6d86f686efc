//! PostgreSQL catalog queries against pg_catalog and information_schema.

use tracing::debug;

use super::PostgresDialect;
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
        a.attname AS column_name,
        pg_catalog.format_type(a.atttypid, a.atttypmod) AS db_type,
        NOT a.attnotnull AS allow_null,
        pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS default_value,
        (a.attidentity IN ('a', 'd')
            OR COALESCE(pg_catalog.pg_get_expr(d.adbin, d.adrelid), '') LIKE 'nextval(%') AS auto_increment,
        pg_catalog.col_description(a.attrelid, a.attnum) AS column_comment
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
    WHERE n.nspname = $1
      AND c.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT a.attname AS column_name
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
    WHERE n.nspname = $1
      AND t.relname = $2
      AND c.contype = 'p'
      AND a.attnum = ANY(c.conkey)
    ORDER BY array_position(c.conkey, a.attnum)
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        i.relname AS index_name,
        a.attname AS column_name,
        ix.indisunique AS is_unique,
        ix.indisprimary AS is_primary
    FROM pg_catalog.pg_index ix
    JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
    JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
    WHERE n.nspname = $1
      AND t.relname = $2
    ORDER BY i.relname
"#;

/// One row per column pair of every foreign key touching the schema, on
/// either side. Action codes are single letters, normalized by the row reader.
const CONSTRAINTS_QUERY: &str = r#"
    SELECT
        c.conname AS constraint_name,
        n.nspname AS table_schema,
        t.relname AS table_name,
        a.attname AS column_name,
        rn.nspname AS referenced_table_schema,
        rt.relname AS referenced_table_name,
        ra.attname AS referenced_column_name,
        c.confupdtype::text AS update_rule,
        c.confdeltype::text AS delete_rule
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
    JOIN pg_catalog.pg_namespace rn ON rn.oid = rt.relnamespace
    CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    JOIN pg_catalog.pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.refnum
    WHERE c.contype = 'f'
      AND (n.nspname = $1 OR rn.nspname = $1)
    ORDER BY t.relname, c.conname, k.ord
"#;

const PARAMETERS_QUERY: &str = r#"
    SELECT
        p.parameter_name,
        p.ordinal_position,
        p.parameter_mode,
        p.data_type AS db_type,
        p.character_maximum_length AS max_length,
        p.numeric_precision AS num_precision,
        p.numeric_scale AS num_scale,
        p.parameter_default AS default_value
    FROM information_schema.routines r
    JOIN information_schema.parameters p
        ON p.specific_schema = r.specific_schema
        AND p.specific_name = r.specific_name
    WHERE r.routine_schema = $1
      AND r.routine_name = $2
      AND r.routine_type = $3
    ORDER BY p.ordinal_position
"#;

const RETURN_TYPE_QUERY: &str = r#"
    SELECT 0 AS ordinal_position, data_type AS db_type
    FROM information_schema.routines
    WHERE routine_schema = $1
      AND routine_name = $2
      AND routine_type = 'FUNCTION'
      AND data_type <> 'void'
"#;

fn table_bindings(table: &TableSchema) -> [Value; 2] {
    [
        Value::from(table.schema_name.as_str()),
        Value::from(table.table_name.as_str()),
    ]
}

pub(super) fn default_schema(conn: &dyn Connection) -> Result<String> {
    let row = conn.select_one("SELECT current_schema() AS schema_name", &[])?;
    Ok(row
        .and_then(|r| r.get_str("schema_name"))
        .unwrap_or_else(|| "public".to_string()))
}

pub(super) fn schema_names(conn: &dyn Connection) -> Result<Vec<String>> {
    let rows = conn.select(
        "SELECT nspname AS schema_name FROM pg_catalog.pg_namespace \
         WHERE nspname <> 'information_schema' AND nspname NOT LIKE 'pg\\_%' \
         ORDER BY nspname",
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
        "SELECT table_name, table_type FROM information_schema.tables WHERE table_schema = $1",
    );
    if !include_views {
        sql.push_str(" AND table_type = 'BASE TABLE'");
    }
    sql.push_str(" ORDER BY table_name");
    let rows = conn.select(&sql, &[Value::from(schema)])?;
    Ok(table_names_from_rows(schema, &rows))
}

pub(super) fn columns(
    dialect: &PostgresDialect,
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
        "SELECT DISTINCT routine_name FROM information_schema.routines \
         WHERE routine_schema = $1 AND routine_type = $2 ORDER BY routine_name",
        &[Value::from(schema), Value::from(kind.catalog_name())],
    )?;
    Ok(rows.iter().filter_map(|r| r.get_str("routine_name")).collect())
}

pub(super) fn routine_parameters(
    dialect: &PostgresDialect,
    conn: &dyn Connection,
    routine: &RoutineSchema,
) -> Result<Vec<RoutineParameterRow>> {
    let schema = Value::from(routine.schema_name.as_str());
    let name = Value::from(routine.routine_name.as_str());
    let rows = conn.select(
        PARAMETERS_QUERY,
        &[
            schema.clone(),
            name.clone(),
            Value::from(routine.kind.catalog_name()),
        ],
    )?;
    let mut params: Vec<RoutineParameterRow> = rows
        .iter()
        .filter_map(|r| parameter_from_row(dialect, r))
        .collect();

    if routine.kind == RoutineKind::Function {
        if let Some(row) = conn.select_one(RETURN_TYPE_QUERY, &[schema, name])? {
            params.extend(parameter_from_row(dialect, &row));
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DryRunConnection;
    use crate::core::{Row, SimpleType};

    #[test]
    fn test_columns_serial_and_cast_defaults() {
        let conn = DryRunConnection::new("pgsql");
        conn.respond(
            "pg_catalog.format_type",
            vec![
                Row::from_pairs([
                    ("column_name", Value::from("id")),
                    ("db_type", "integer".into()),
                    ("allow_null", false.into()),
                    ("default_value", "nextval('users_id_seq'::regclass)".into()),
                    ("auto_increment", true.into()),
                ]),
                Row::from_pairs([
                    ("column_name", Value::from("name")),
                    ("db_type", "character varying(80)".into()),
                    ("allow_null", true.into()),
                    ("default_value", "'anon'::character varying".into()),
                    ("auto_increment", false.into()),
                ]),
            ],
        );
        let table = TableSchema::stub("public", "users", "public", false);
        let cols = columns(&PostgresDialect::new(), &conn, &table).unwrap();
        assert!(cols[0].auto_increment);
        assert_eq!(cols[0].default_value, None);
        assert_eq!(cols[0].quoted_name, "\"id\"");
        assert_eq!(cols[1].column_type, SimpleType::String);
        assert_eq!(cols[1].size, Some(80));
        assert_eq!(cols[1].default_value, Some(Value::Text("anon".into())));
    }

    #[test]
    fn test_constraint_action_codes() {
        let conn = DryRunConnection::new("pgsql");
        conn.respond(
            "pg_catalog.pg_constraint c",
            vec![Row::from_pairs([
                ("constraint_name", "orders_user_id_fkey"),
                ("table_schema", "public"),
                ("table_name", "orders"),
                ("column_name", "user_id"),
                ("referenced_table_schema", "public"),
                ("referenced_table_name", "users"),
                ("referenced_column_name", "id"),
                ("update_rule", "a"),
                ("delete_rule", "c"),
            ])],
        );
        let rows = constraints(&conn, "public").unwrap();
        assert_eq!(rows[0].update_rule.as_deref(), Some("NO ACTION"));
        assert_eq!(rows[0].delete_rule.as_deref(), Some("CASCADE"));
    }

    #[test]
    fn test_function_return_type_row() {
        let conn = DryRunConnection::new("pgsql");
        conn.respond(
            "information_schema.parameters",
            vec![Row::from_pairs([
                ("parameter_name", Value::from("amount")),
                ("ordinal_position", 1.into()),
                ("parameter_mode", "IN".into()),
                ("db_type", "numeric".into()),
            ])],
        );
        conn.respond(
            "data_type <> 'void'",
            vec![Row::from_pairs([
                ("ordinal_position", Value::Int(0)),
                ("db_type", "numeric".into()),
            ])],
        );
        let routine = RoutineSchema::stub(RoutineKind::Function, "public", "tax", "public");
        let params = routine_parameters(&PostgresDialect::new(), &conn, &routine).unwrap();
        assert_eq!(params.len(), 2);
        assert!(params[1].is_return);
        assert_eq!(params[1].parameter.value_type, SimpleType::Decimal);
    }
}
