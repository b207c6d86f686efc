//! # dbschema
//!
//! Cross-RDBMS schema introspection and DDL generation.
//!
//! This library discovers tables, columns, keys, relations and stored
//! routines through each engine's native catalog, normalizes them into one
//! metadata model, and turns abstract table descriptions back into
//! engine-specific DDL:
//!
//! - **Discovery** of tables, views, procedures and functions, cached at two
//!   levels (in-process and an injected [`Cache`])
//! - **Relation inference**: belongs_to, has_many and many_many (through
//!   junction tables) from foreign keys, plus virtual relations from extras
//! - **DDL diffing**: desired fields against existing metadata, with
//!   foreign keys deferred until every table in a batch exists
//! - **Routine calls** with OUT parameter retrieval per engine
//! - **Dialects**: MySQL/MariaDB, PostgreSQL, SQL Server, SQLite, Db2,
//!   Oracle and SQL Anywhere
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dbschema::{DialectCatalog, DryRunConnection, Schema, SchemaConfig, TableDescriptor};
//!
//! fn main() -> dbschema::Result<()> {
//!     let config = SchemaConfig::for_dialect("mysql");
//!     let conn = Arc::new(DryRunConnection::new("mysql"));
//!     let schema = Schema::from_config(config, &DialectCatalog::with_builtins(), conn.clone())?;
//!
//!     let desc: TableDescriptor = serde_json::from_str(
//!         r#"{"name": "t1", "field": [{"name": "id", "type": "id"}]}"#,
//!     )?;
//!     schema.create_table(&desc)?;
//!     for sql in conn.statements() {
//!         println!("{};", sql);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod core;
pub mod ddl;
pub mod drivers;
pub mod error;
pub mod extras;
pub mod schema;

// Re-exports for convenient access
pub use crate::cache::{Cache, MemoryCache, NullCache};
pub use crate::config::{DateTimeFormats, SchemaConfig};
pub use crate::connection::DryRunConnection;
#[cfg(feature = "sqlite")]
pub use crate::connection::SqliteConnection;
pub use crate::core::{
    CallArgs, ColumnSchema, Connection, Dialect, DialectCatalog, ParameterSchema, RelationSchema,
    RelationType, RoutineKind, RoutineSchema, Row, SimpleType, TableSchema, Value,
};
pub use crate::ddl::{FieldDescriptor, TableDescriptor};
pub use crate::error::{Result, SchemaError};
pub use crate::extras::{ExtrasStore, MemoryExtrasStore};
pub use crate::schema::{CallOutput, ProcedureResult, Schema, UpdateResult};
