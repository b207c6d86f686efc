//! Shared pieces of column definition rendering.

use sha2::{Digest, Sha256};

use crate::core::{Dialect, SimpleType, Value};
use crate::ddl::ColumnInfo;
use crate::error::{Result, SchemaError};

/// Reject the unique + primary combination.
pub fn check_key_flags(info: &ColumnInfo) -> Result<()> {
    if info.is_unique && info.is_primary_key {
        return Err(SchemaError::invalid(
            "Unique and Primary designations not allowed simultaneously.",
        ));
    }
    Ok(())
}

/// ` NULL` or ` NOT NULL`.
pub fn null_clause(info: &ColumnInfo) -> &'static str {
    if info.allow_null {
        " NULL"
    } else {
        " NOT NULL"
    }
}

/// ` DEFAULT x`, or empty.
pub fn default_clause<D: Dialect + ?Sized>(dialect: &D, info: &ColumnInfo) -> String {
    match &info.default {
        Some(v) => format!(" DEFAULT {}", dialect.quote_value(v)),
        None => String::new(),
    }
}

/// ` UNIQUE` or ` PRIMARY KEY`, or empty.
///
/// UNIQUE is never emitted when altering (a separate index is created), and
/// PRIMARY KEY is skipped when the existing column already is the key.
pub fn key_clause(info: &ColumnInfo) -> &'static str {
    if info.is_unique && !info.is_alter {
        " UNIQUE"
    } else if info.is_primary_key && !(info.is_alter && info.was_primary_key) {
        " PRIMARY KEY"
    } else {
        ""
    }
}

/// ` ON DELETE x ON UPDATE y`, each part only when given.
pub fn referential_clause(on_delete: Option<&str>, on_update: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(d) = on_delete.filter(|s| !s.trim().is_empty()) {
        out.push_str(" ON DELETE ");
        out.push_str(&d.trim().to_ascii_uppercase());
    }
    if let Some(u) = on_update.filter(|s| !s.trim().is_empty()) {
        out.push_str(" ON UPDATE ");
        out.push_str(&u.trim().to_ascii_uppercase());
    }
    out
}

/// Inline ` REFERENCES t (f) ...` for engines declaring FKs in the column.
pub fn inline_reference<D: Dialect + ?Sized>(dialect: &D, info: &ColumnInfo) -> String {
    match (&info.ref_table, info.is_foreign_key) {
        (Some(table), true) => format!(
            " REFERENCES {} ({}){}",
            dialect.quote_table_name(table),
            dialect.quote_column_name(info.ref_field.as_deref().unwrap_or("id")),
            referential_clause(info.ref_on_delete.as_deref(), info.ref_on_update.as_deref())
        ),
        _ => String::new(),
    }
}

/// `TYPE [NOT] NULL [DEFAULT x] [ON UPDATE x] [auto] [UNIQUE|PRIMARY KEY]`.
pub fn standard_definition<D: Dialect + ?Sized>(dialect: &D, info: &ColumnInfo) -> Result<String> {
    check_key_flags(info)?;

    let mut def = dialect.get_column_type(info);
    def.push_str(null_clause(info));
    def.push_str(&default_clause(dialect, info));
    if let Some(on_update) = &info.on_update {
        def.push_str(" ON UPDATE ");
        def.push_str(on_update);
    }
    if info.auto_increment {
        if let Some(keyword) = dialect.auto_increment_keyword() {
            def.push(' ');
            def.push_str(keyword);
        }
    }
    def.push_str(key_clause(info));
    if dialect.inline_foreign_keys() {
        def.push_str(&inline_reference(dialect, info));
    }
    Ok(def)
}

/// Coerce the default value to the column's simple type.
///
/// Text defaults for numeric and boolean columns are parsed; empty text
/// defaults on non-string columns are dropped. Expressions pass through.
pub fn coerce_default(info: &mut ColumnInfo) {
    let Some(default) = info.default.take() else {
        return;
    };
    let simple = info.simple_type.unwrap_or(SimpleType::String);
    info.default = match default {
        Value::Expression(_) | Value::Null => Some(default),
        Value::Text(ref s) if s.trim().is_empty() && !is_textual(simple) => None,
        other => Some(match simple {
            SimpleType::Boolean => other.as_bool().map(Value::Bool).unwrap_or(other),
            t if t.is_integer() => other.as_i64().map(Value::Int).unwrap_or(other),
            SimpleType::Float | SimpleType::Double => {
                other.as_f64().map(Value::Float).unwrap_or(other)
            }
            _ => other,
        }),
    };
}

fn is_textual(t: SimpleType) -> bool {
    matches!(t, SimpleType::String | SimpleType::Text)
}

/// `{prefix}_{table}_{column}` with dots flattened, hashed past `max_len`.
pub fn constraint_name(prefix: &str, table: &str, column: Option<&str>, max_len: usize) -> String {
    let mut name = format!("{}_{}", prefix, table.replace('.', "_"));
    if let Some(col) = column.filter(|c| !c.is_empty()) {
        name.push('_');
        name.push_str(col);
    }
    if name.len() > max_len {
        let digest = Sha256::digest(name.as_bytes());
        let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
        name = format!("{}_{}", prefix, hex);
    }
    name
}

/// Length-bearing type: `name(len)`, with `len` defaulting to `default_len`.
pub fn sized(info: &mut ColumnInfo, default_len: u32) {
    let len = info.length.unwrap_or(default_len);
    info.length = Some(len);
    info.type_extras = format!("({})", len);
}

/// Precision/scale type: `name(p,s)` with defaults.
pub fn scaled(info: &mut ColumnInfo, default_precision: u32, default_scale: u32) {
    let precision = info.precision.or(info.length).unwrap_or(default_precision);
    let scale = info.scale.unwrap_or(default_scale);
    info.precision = Some(precision);
    info.scale = Some(scale);
    info.type_extras = format!("({},{})", precision, scale);
}

/// Mark an `id` column: auto-increment, not null, primary key.
pub fn mark_identity(info: &mut ColumnInfo) {
    info.auto_increment = true;
    info.allow_null = false;
    info.is_primary_key = true;
    info.is_unique = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::FieldDescriptor;

    fn info(name: &str, ty: &str) -> ColumnInfo {
        ColumnInfo::from_field(&FieldDescriptor::new(name, ty)).unwrap()
    }

    #[test]
    fn test_constraint_name_plain_and_hashed() {
        assert_eq!(
            constraint_name("fk", "sales.orders", Some("customer_id"), 64),
            "fk_sales_orders_customer_id"
        );
        let long = constraint_name("undx", &"t".repeat(70), Some("c"), 64);
        assert!(long.starts_with("undx_"));
        assert_eq!(long.len(), "undx_".len() + 8);
        assert_eq!(long, constraint_name("undx", &"t".repeat(70), Some("c"), 64));
    }

    #[test]
    fn test_referential_clause() {
        assert_eq!(
            referential_clause(Some("cascade"), Some("no action")),
            " ON DELETE CASCADE ON UPDATE NO ACTION"
        );
        assert_eq!(referential_clause(None, Some(" ")), "");
    }

    #[test]
    fn test_key_clause_alter_rules() {
        let mut i = info("email", "string");
        i.is_unique = true;
        assert_eq!(key_clause(&i), " UNIQUE");
        i.is_alter = true;
        assert_eq!(key_clause(&i), "");

        let mut pk = info("id", "integer");
        pk.is_primary_key = true;
        pk.is_alter = true;
        pk.was_primary_key = true;
        assert_eq!(key_clause(&pk), "");
        pk.was_primary_key = false;
        assert_eq!(key_clause(&pk), " PRIMARY KEY");
    }

    #[test]
    fn test_coerce_default() {
        let mut i = info("qty", "integer");
        i.default = Some(Value::Text("5".into()));
        coerce_default(&mut i);
        assert_eq!(i.default, Some(Value::Int(5)));

        let mut b = info("active", "boolean");
        b.default = Some(Value::Text("true".into()));
        coerce_default(&mut b);
        assert_eq!(b.default, Some(Value::Bool(true)));

        let mut d = info("due", "date");
        d.default = Some(Value::Text("".into()));
        coerce_default(&mut d);
        assert_eq!(d.default, None);

        let mut s = info("note", "string");
        s.default = Some(Value::Text("".into()));
        coerce_default(&mut s);
        assert_eq!(s.default, Some(Value::Text("".into())));
    }

    #[test]
    fn test_check_key_flags() {
        let mut i = info("x", "integer");
        i.is_unique = true;
        i.is_primary_key = true;
        assert!(check_key_flags(&i)
            .unwrap_err()
            .to_string()
            .contains("not allowed simultaneously"));
    }
}
