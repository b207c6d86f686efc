//! Configuration validation.

use chrono::format::{Item, StrftimeItems};

use super::SchemaConfig;
use crate::core::DialectCatalog;
use crate::error::{Result, SchemaError};

/// Validate the configuration against the built-in dialects.
pub fn validate(config: &SchemaConfig) -> Result<()> {
    if config.dialect.trim().is_empty() {
        return Err(SchemaError::Config("dialect is required".into()));
    }
    let catalog = DialectCatalog::with_builtins();
    if !catalog.has_dialect(&config.dialect) {
        return Err(SchemaError::Config(format!(
            "dialect '{}' is not supported. Supported dialects: {}",
            config.dialect,
            catalog.dialect_names().join(", ")
        )));
    }

    if config.schemas.iter().any(|s| s.trim().is_empty()) {
        return Err(SchemaError::Config(
            "schemas must not contain empty names".into(),
        ));
    }

    for (key, fmt) in [
        ("formats.date", &config.formats.date),
        ("formats.time", &config.formats.time),
        ("formats.datetime", &config.formats.datetime),
        ("formats.timestamp", &config.formats.timestamp),
    ] {
        validate_format(key, fmt)?;
    }

    Ok(())
}

fn validate_format(key: &str, fmt: &str) -> Result<()> {
    if fmt.trim().is_empty() {
        return Err(SchemaError::Config(format!("{} must not be empty", key)));
    }
    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(SchemaError::Config(format!(
            "{} is not a valid format string: '{}'",
            key, fmt
        )));
    }
    Ok(())
}
