//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::core::SimpleType;

/// Root configuration structure, injected into [`Schema`](crate::schema::Schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Dialect name or alias ("mysql", "pgsql", "sqlsrv", "sqlite", ...).
    pub dialect: String,

    /// Override of the dialect's default schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,

    /// Restrict discovery to these schemas (default: all schemas).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,

    /// Use the external cache beneath the in-process maps (default: true).
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Prefix for every external cache key.
    #[serde(default)]
    pub cache_prefix: String,

    /// Whether listings include views when the caller has no preference
    /// (default: true).
    #[serde(default = "default_true")]
    pub include_views: bool,

    /// Output formats for temporal values.
    #[serde(default)]
    pub formats: DateTimeFormats,
}

impl SchemaConfig {
    /// Minimal configuration for a dialect, everything else defaulted.
    pub fn for_dialect(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            default_schema: None,
            schemas: Vec::new(),
            cache_enabled: true,
            cache_prefix: String::new(),
            include_views: true,
            formats: DateTimeFormats::default(),
        }
    }
}

/// `chrono` strftime strings used by `format_value` for temporal types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeFormats {
    #[serde(default = "default_date_format")]
    pub date: String,

    #[serde(default = "default_time_format")]
    pub time: String,

    #[serde(default = "default_datetime_format")]
    pub datetime: String,

    #[serde(default = "default_datetime_format")]
    pub timestamp: String,
}

impl Default for DateTimeFormats {
    fn default() -> Self {
        Self {
            date: default_date_format(),
            time: default_time_format(),
            datetime: default_datetime_format(),
            timestamp: default_datetime_format(),
        }
    }
}

impl DateTimeFormats {
    /// Format string for a temporal simple type, if it has one.
    pub fn for_type(&self, simple: SimpleType) -> Option<&str> {
        match simple {
            SimpleType::Date => Some(&self.date),
            SimpleType::Time => Some(&self.time),
            SimpleType::Datetime => Some(&self.datetime),
            SimpleType::Timestamp
            | SimpleType::TimestampOnCreate
            | SimpleType::TimestampOnUpdate => Some(&self.timestamp),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_time_format() -> String {
    "%H:%M:%S".to_string()
}

fn default_datetime_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}
