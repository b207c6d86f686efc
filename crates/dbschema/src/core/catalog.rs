//! Dialect catalog for explicit dependency injection.
//!
//! The [`DialectCatalog`] maps dialect names and their aliases to shared
//! [`Dialect`] instances. It is constructed explicitly and handed to
//! [`Schema::from_config`](crate::schema::Schema::from_config); there is no
//! global registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SchemaError};

use super::traits::Dialect;

/// Registry of dialects by canonical name, plus aliases.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = DialectCatalog::with_builtins();
/// let mysql = catalog.require_dialect("mariadb")?;
/// assert_eq!(mysql.name(), "mysql");
/// ```
#[derive(Default)]
pub struct DialectCatalog {
    /// Registered dialects by canonical name.
    dialects: HashMap<String, Arc<dyn Dialect>>,

    /// Alias to canonical name.
    aliases: HashMap<String, String>,
}

impl DialectCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with every built-in dialect registered.
    pub fn with_builtins() -> Self {
        use crate::drivers::{
            IbmDialect, MssqlDialect, MysqlDialect, OracleDialect, PostgresDialect,
            SqlAnywhereDialect, SqliteDialect,
        };

        let mut catalog = Self::new();

        catalog.register_dialect("mysql", MysqlDialect::new());
        catalog.register_alias("mariadb", "mysql");

        catalog.register_dialect("pgsql", PostgresDialect::new());
        catalog.register_alias("postgres", "pgsql");
        catalog.register_alias("postgresql", "pgsql");

        catalog.register_dialect("sqlsrv", MssqlDialect::new());
        catalog.register_alias("mssql", "sqlsrv");
        catalog.register_alias("sqlserver", "sqlsrv");
        catalog.register_alias("dblib", "sqlsrv");

        catalog.register_dialect("sqlite", SqliteDialect::new());

        catalog.register_dialect("ibm", IbmDialect::new());
        catalog.register_alias("db2", "ibm");

        catalog.register_dialect("oracle", OracleDialect::new());
        catalog.register_alias("oci", "oracle");

        catalog.register_dialect("sqlanywhere", SqlAnywhereDialect::new());
        catalog.register_alias("sap", "sqlanywhere");

        catalog
    }

    /// Register a dialect under its canonical name.
    pub fn register_dialect(&mut self, name: impl Into<String>, dialect: impl Dialect + 'static) {
        self.dialects
            .insert(name.into().to_ascii_lowercase(), Arc::new(dialect));
    }

    /// Make `alias` resolve to the dialect registered as `canonical`.
    pub fn register_alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(
            alias.into().to_ascii_lowercase(),
            canonical.into().to_ascii_lowercase(),
        );
    }

    /// Canonical name for a dialect name or alias.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        let lower = name.trim().to_ascii_lowercase();
        if let Some((key, _)) = self.dialects.get_key_value(&lower) {
            return Some(key.as_str());
        }
        self.aliases
            .get(&lower)
            .filter(|c| self.dialects.contains_key(*c))
            .map(String::as_str)
    }

    /// Get a dialect by name or alias (case-insensitive).
    pub fn get_dialect(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        let canonical = self.canonical_name(name)?;
        self.dialects.get(canonical).cloned()
    }

    /// Get a dialect by name, returning an error if not found.
    pub fn require_dialect(&self, name: &str) -> Result<Arc<dyn Dialect>> {
        self.get_dialect(name).ok_or_else(|| {
            SchemaError::Config(format!(
                "Unknown database dialect: '{}'. Supported dialects: {}",
                name,
                self.dialect_names().join(", ")
            ))
        })
    }

    /// Check if a dialect name or alias is registered.
    pub fn has_dialect(&self, name: &str) -> bool {
        self.canonical_name(name).is_some()
    }

    /// Canonical names of all registered dialects, sorted.
    pub fn dialect_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for DialectCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectCatalog")
            .field("dialects", &self.dialect_names())
            .field("aliases", &self.aliases.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnSchema, ConstraintRow, Connection, TableNameRow, TableSchema};
    use crate::ddl::ColumnInfo;

    // Mock dialect for testing
    struct MockDialect {
        name: &'static str,
    }

    impl Dialect for MockDialect {
        fn name(&self) -> &str {
            self.name
        }

        fn translate_simple_column_types(&self, _info: &mut ColumnInfo) {}

        fn default_schema(&self, _conn: &dyn Connection) -> Result<String> {
            Ok(String::new())
        }

        fn find_table_names(
            &self,
            _conn: &dyn Connection,
            _schema: &str,
            _include_views: bool,
        ) -> Result<Vec<TableNameRow>> {
            Ok(Vec::new())
        }

        fn find_columns(
            &self,
            _conn: &dyn Connection,
            _table: &TableSchema,
        ) -> Result<Vec<ColumnSchema>> {
            Ok(Vec::new())
        }

        fn find_constraints(
            &self,
            _conn: &dyn Connection,
            _schema: &str,
        ) -> Result<Vec<ConstraintRow>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_catalog_dialect_registration() {
        let mut catalog = DialectCatalog::new();
        assert!(!catalog.has_dialect("test"));

        catalog.register_dialect("test", MockDialect { name: "test" });
        assert!(catalog.has_dialect("TEST"));

        let dialect = catalog.get_dialect("test").unwrap();
        assert_eq!(dialect.name(), "test");
    }

    #[test]
    fn test_catalog_aliases() {
        let mut catalog = DialectCatalog::new();
        catalog.register_dialect("test", MockDialect { name: "test" });
        catalog.register_alias("t", "test");
        catalog.register_alias("dangling", "missing");

        assert_eq!(catalog.canonical_name("T"), Some("test"));
        assert!(catalog.get_dialect("t").is_some());
        assert!(!catalog.has_dialect("dangling"));
    }

    #[test]
    fn test_catalog_require_dialect() {
        let mut catalog = DialectCatalog::new();
        catalog.register_dialect("test", MockDialect { name: "test" });

        assert!(catalog.require_dialect("test").is_ok());
        let err = catalog.require_dialect("nonexistent").err().unwrap();
        assert!(err.to_string().contains("Supported dialects: test"));
    }

    #[test]
    fn test_builtins_resolve_aliases() {
        let catalog = DialectCatalog::with_builtins();
        for (alias, canonical) in [
            ("mariadb", "mysql"),
            ("postgres", "pgsql"),
            ("postgresql", "pgsql"),
            ("mssql", "sqlsrv"),
            ("dblib", "sqlsrv"),
            ("sqlite", "sqlite"),
            ("db2", "ibm"),
            ("oci", "oracle"),
            ("sap", "sqlanywhere"),
        ] {
            let dialect = catalog.require_dialect(alias).unwrap();
            assert_eq!(dialect.name(), canonical, "alias {}", alias);
        }
        assert_eq!(catalog.dialect_names().len(), 7);
        assert!(!catalog.has_dialect("mongodb"));
    }
}
