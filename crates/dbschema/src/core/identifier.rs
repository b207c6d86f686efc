//! Identifier validation and quoting helpers shared by the dialects.
//!
//! SQL identifiers (table names, column names, schema names) cannot be passed as
//! parameters in prepared statements, so generated DDL embeds them directly.
//! Every dialect funnels its identifiers through one of the quoting styles
//! below, which escape the closing quote character by doubling it.
//!
//! Validation is separate from quoting: descriptors supplied by callers are
//! validated once when the DDL plan is built, while names coming back from a
//! native catalog are trusted and only quoted.

use crate::error::{Result, SchemaError};

/// Maximum identifier length accepted from schema descriptors.
/// - PostgreSQL: 63 bytes
/// - MySQL: 64 characters
/// - SQL Server: 128 characters
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate a caller-supplied identifier.
///
/// Rejects empty names, names containing null bytes and names longer than
/// [`MAX_IDENTIFIER_LENGTH`].
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SchemaError::invalid("Identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(SchemaError::invalid(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SchemaError::invalid(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// ANSI double-quote style: `"users"`.
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// MySQL backtick style: `` `users` ``.
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// SQL Server bracket style: `[users]`.
pub fn quote_bracket(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quote a possibly schema-qualified name part by part.
///
/// `sales.orders` becomes `"sales"."orders"` with [`quote_double`]. A `*`
/// part is left as is so `t.*` survives quoting.
pub fn quote_qualified(name: &str, quote: impl Fn(&str) -> String) -> String {
    name.split('.')
        .map(|part| if part == "*" { part.to_string() } else { quote(part) })
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a string literal with single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Split `schema.table` into its parts. Unqualified names yield an empty schema.
pub fn split_qualified(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("my_table").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("  ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        let result = validate_identifier(&long_name);
        assert!(result.unwrap_err().to_string().contains("maximum length"));
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
    }

    // =========================================================================
    // Quoting tests
    // =========================================================================

    #[test]
    fn test_quote_styles_escape_their_delimiter() {
        assert_eq!(quote_double("table\"name"), "\"table\"\"name\"");
        assert_eq!(quote_backtick("table`name"), "`table``name`");
        assert_eq!(quote_bracket("table]name"), "[table]]name]");
    }

    #[test]
    fn test_quote_injection_safely_quoted() {
        assert_eq!(
            quote_backtick("Robert`); DROP TABLE Students;--"),
            "`Robert``); DROP TABLE Students;--`"
        );
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(quote_qualified("dbo.users", quote_bracket), "[dbo].[users]");
        assert_eq!(quote_qualified("t.*", quote_double), "\"t\".*");
        assert_eq!(quote_qualified("users", quote_backtick), "`users`");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("sales.orders"), ("sales", "orders"));
        assert_eq!(split_qualified("orders"), ("", "orders"));
    }
}
