//! Reading aliased catalog rows.
//!
//! Dialect queries alias their native catalog columns to the names read
//! here, so one parser serves every engine.

use std::collections::HashMap;

use super::types::parse_default;
use crate::core::{
    ColumnSchema, ConstraintRow, Dialect, IndexRow, ParamType, ParameterSchema, Row,
    RoutineParameterRow, TableNameRow,
};

/// Build a column from a row aliased to `column_name` and `db_type`, plus the
/// optional `allow_null`, `default_value`, `auto_increment`,
/// `is_primary_key`, `max_length`, `num_precision`, `num_scale` and
/// `column_comment`.
pub fn column_from_row<D: Dialect + ?Sized>(dialect: &D, row: &Row) -> Option<ColumnSchema> {
    let name = row.get_str("column_name")?;
    let db_type = row.get_str("db_type")?;

    let mut column = ColumnSchema::new(name);
    column.quoted_name = dialect.quote_column_name(&column.name);
    column.apply_db_type(&db_type);
    column.column_type = dialect.extract_type(&db_type);
    column.binding = ColumnSchema::determine_binding_type(column.column_type);

    if column.size.is_none() {
        column.size = positive(row, "max_length");
    }
    if column.precision.is_none() {
        column.precision = positive(row, "num_precision");
        column.scale = column.scale.or_else(|| unsigned(row, "num_scale"));
    }
    column.allow_null = row.get_bool("allow_null").unwrap_or(true);
    column.auto_increment = row.get_bool("auto_increment").unwrap_or(false);
    column.is_primary_key = row.get_bool("is_primary_key").unwrap_or(false);
    if !column.auto_increment {
        column.default_value = parse_default(row.get_str("default_value").as_deref());
    }
    column.comment = row.get_str("column_comment").filter(|c| !c.trim().is_empty());
    Some(column)
}

/// Tables and views from rows aliased to `table_name` / `table_type`.
pub fn table_names_from_rows(schema: &str, rows: &[Row]) -> Vec<TableNameRow> {
    rows.iter()
        .filter_map(|row| TableNameRow::from_row(schema, row))
        .collect()
}

/// Foreign key rows; incomplete rows are skipped.
pub fn constraints_from_rows(schema: &str, rows: &[Row]) -> Vec<ConstraintRow> {
    rows.iter()
        .filter_map(|row| ConstraintRow::from_row(schema, row))
        .collect()
}

/// Routine parameter from a row aliased to `parameter_name`,
/// `ordinal_position`, `parameter_mode` and `db_type`, plus optional
/// `max_length`, `num_precision`, `num_scale` and `default_value`.
///
/// Position 0, or a `RETURN` mode, marks a function's return slot.
pub fn parameter_from_row<D: Dialect + ?Sized>(
    dialect: &D,
    row: &Row,
) -> Option<RoutineParameterRow> {
    let db_type = row.get_str("db_type")?;
    let position = row.get_i64("ordinal_position").unwrap_or(0);
    let mode = row.get_str("parameter_mode").unwrap_or_default();
    let is_return = position == 0 || mode.eq_ignore_ascii_case("RETURN");

    let parameter = ParameterSchema {
        name: row.get_str("parameter_name").unwrap_or_default(),
        position: u32::try_from(position).unwrap_or(0),
        param_type: ParamType::from_catalog(&mode),
        value_type: dialect.extract_type(&db_type),
        db_type,
        default_value: parse_default(row.get_str("default_value").as_deref()),
        length: positive(row, "max_length"),
        precision: positive(row, "num_precision"),
        scale: unsigned(row, "num_scale"),
        allow_null: true,
    };
    if !is_return && parameter.name.is_empty() {
        return None;
    }
    Some(RoutineParameterRow {
        parameter,
        is_return,
    })
}

/// Single-column indexes from rows aliased to `index_name`, `column_name`
/// and the optional `is_unique` / `is_primary` flags.
///
/// Multi-column indexes do not flag any column and are dropped.
pub fn indexes_from_rows(rows: &[Row]) -> Vec<IndexRow> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        if let Some(name) = row.get_str("index_name") {
            *counts.entry(name).or_default() += 1;
        }
    }
    rows.iter()
        .filter_map(|row| {
            let index_name = row.get_str("index_name")?;
            if counts.get(&index_name).copied().unwrap_or(0) != 1 {
                return None;
            }
            Some(IndexRow {
                column_name: row.get_str("column_name")?,
                is_unique: row.get_bool("is_unique").unwrap_or(false),
                is_primary: row.get_bool("is_primary").unwrap_or(false),
                index_name,
            })
        })
        .collect()
}

fn positive(row: &Row, name: &str) -> Option<u32> {
    row.get_i64(name)
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

fn unsigned(row: &Row, name: &str) -> Option<u32> {
    row.get_i64(name).and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SimpleType, Value};
    use crate::drivers::MysqlDialect;

    #[test]
    fn test_column_from_row() {
        let row = Row::from_pairs([
            ("COLUMN_NAME", Value::from("price")),
            ("DB_TYPE", "decimal(10,2)".into()),
            ("ALLOW_NULL", "NO".into()),
            ("DEFAULT_VALUE", "0.00".into()),
            ("COLUMN_COMMENT", "".into()),
        ]);
        let col = column_from_row(&MysqlDialect::new(), &row).unwrap();
        assert_eq!(col.quoted_name, "`price`");
        assert_eq!(col.column_type, SimpleType::Decimal);
        assert_eq!((col.precision, col.scale), (Some(10), Some(2)));
        assert!(!col.allow_null);
        assert_eq!(col.default_value, Some(Value::Float(0.0)));
        assert_eq!(col.comment, None);
    }

    #[test]
    fn test_auto_increment_drops_default() {
        let row = Row::from_pairs([
            ("column_name", Value::from("id")),
            ("db_type", "int(11)".into()),
            ("auto_increment", 1.into()),
            ("default_value", "nextval('x')".into()),
        ]);
        let col = column_from_row(&MysqlDialect::new(), &row).unwrap();
        assert!(col.auto_increment);
        assert_eq!(col.default_value, None);
        assert_eq!(col.size, Some(11));
    }

    #[test]
    fn test_parameter_from_row() {
        let dialect = MysqlDialect::new();
        let ret = Row::from_pairs([
            ("ordinal_position", Value::Int(0)),
            ("db_type", "int".into()),
        ]);
        let ret = parameter_from_row(&dialect, &ret).unwrap();
        assert!(ret.is_return);
        assert_eq!(ret.parameter.value_type, SimpleType::Integer);

        let out = Row::from_pairs([
            ("parameter_name", Value::from("total")),
            ("ordinal_position", 2.into()),
            ("parameter_mode", "OUT".into()),
            ("db_type", "varchar".into()),
            ("max_length", 50.into()),
        ]);
        let out = parameter_from_row(&dialect, &out).unwrap();
        assert!(!out.is_return);
        assert_eq!(out.parameter.param_type, ParamType::Out);
        assert_eq!(out.parameter.length, Some(50));
    }

    #[test]
    fn test_indexes_keep_single_column_only() {
        let rows = vec![
            Row::from_pairs([
                ("index_name", Value::from("u_email")),
                ("column_name", "email".into()),
                ("is_unique", 1.into()),
            ]),
            Row::from_pairs([("index_name", "ix_name"), ("column_name", "first")]),
            Row::from_pairs([("index_name", "ix_name"), ("column_name", "last")]),
        ];
        let idx = indexes_from_rows(&rows);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx[0].column_name, "email");
        assert!(idx[0].is_unique);
    }
}
