//! Error types for schema introspection and DDL generation.

use thiserror::Error;

/// Main error type for schema operations.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The dialect does not provide this capability.
    #[error("{capability} is not implemented for the {dialect} dialect")]
    NotImplemented { dialect: String, capability: String },

    /// A schema descriptor is malformed (missing name, missing type, bad combination).
    #[error("{0}")]
    InvalidSchema(String),

    /// Attempt to create something that already exists without merge permission.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// A table, column, relationship or routine could not be found.
    #[error("{0} not found")]
    NotFound(String),

    /// Error raised by the underlying database connection.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: Option<String>,
    },

    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema cache backend failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Extras store failure
    #[error("Extras store error: {0}")]
    Extras(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite driver error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl SchemaError {
    /// Create a NotImplemented error for a dialect capability.
    pub fn not_implemented(dialect: impl Into<String>, capability: impl Into<String>) -> Self {
        SchemaError::NotImplemented {
            dialect: dialect.into(),
            capability: capability.into(),
        }
    }

    /// Create an InvalidSchema error.
    pub fn invalid(message: impl Into<String>) -> Self {
        SchemaError::InvalidSchema(message.into())
    }

    /// Create a Database error with an optional driver error code.
    pub fn database(message: impl Into<String>, code: Option<String>) -> Self {
        SchemaError::Database {
            message: message.into(),
            code,
        }
    }

    /// Short machine-readable code, used in per-table batch error records.
    pub fn code(&self) -> String {
        match self {
            SchemaError::NotImplemented { .. } => "not_implemented".to_string(),
            SchemaError::InvalidSchema(_) => "invalid_schema".to_string(),
            SchemaError::AlreadyExists(_) => "already_exists".to_string(),
            SchemaError::NotFound(_) => "not_found".to_string(),
            SchemaError::Database { code: Some(c), .. } => c.clone(),
            SchemaError::Database { code: None, .. } => "database".to_string(),
            SchemaError::Config(_) => "config".to_string(),
            SchemaError::Cache(_) => "cache".to_string(),
            SchemaError::Extras(_) => "extras".to_string(),
            SchemaError::Io(_) => "io".to_string(),
            SchemaError::Yaml(_) => "yaml".to_string(),
            SchemaError::Json(_) => "json".to_string(),
            #[cfg(feature = "sqlite")]
            SchemaError::Sqlite(_) => "sqlite".to_string(),
        }
    }

    /// Process exit code for command-line front ends.
    pub fn exit_code(&self) -> u8 {
        match self {
            SchemaError::Config(_) | SchemaError::Yaml(_) | SchemaError::Json(_) => 1,
            SchemaError::InvalidSchema(_) => 2,
            SchemaError::NotFound(_) | SchemaError::AlreadyExists(_) => 3,
            SchemaError::NotImplemented { .. } => 4,
            SchemaError::Database { .. } => 5,
            #[cfg(feature = "sqlite")]
            SchemaError::Sqlite(_) => 5,
            SchemaError::Cache(_) | SchemaError::Extras(_) => 6,
            SchemaError::Io(_) => 7,
        }
    }

    /// Whether a driver error only signals that no further result sets exist.
    ///
    /// Some drivers report the end of a multi-set procedure result as an error
    /// ("General error" or "does not support multiple rowsets"). Those are not
    /// failures of the call itself.
    pub fn is_benign_result_set_end(&self) -> bool {
        match self {
            SchemaError::Database { message, .. } => {
                message.contains("General error")
                    || message.contains("does not support multiple rowsets")
            }
            _ => false,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
