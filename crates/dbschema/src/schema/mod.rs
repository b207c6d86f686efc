//! The schema orchestrator.
//!
//! [`Schema`] sits between callers and one [`Dialect`]: it discovers table,
//! procedure and function metadata through the dialect, builds the relation
//! graph, overlays stored extras and caches the result at two levels (an
//! in-process map, then the injected [`Cache`]). Mutations go through
//! [`build_table_fields`](crate::ddl::build_table_fields) and the dialect's
//! statement builders; see [`update`] and [`routines`].
//!
//! # Discovery states
//!
//! Each table moves from unknown, to name-known (a stub in the name map), to
//! fully discovered (columns, constraints and extras merged). Only
//! [`Schema::refresh`] or a `refresh = true` lookup moves it back.

mod extras;
mod format;
mod relations;
mod routines;
mod update;

pub use extras::{
    apply_table_extras, merge_field_extras, merge_referenced_extras, merge_related_extras,
};
pub use format::{format_date_time, format_value};
pub use relations::{build_table_relations, promote_key_types};
pub use routines::{CallOutput, ProcedureResult};
pub use update::{UpdateError, UpdateResult};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{Cache, MemoryCache, NullCache};
use crate::config::SchemaConfig;
use crate::core::identifier::split_qualified;
use crate::core::{
    Connection, Dialect, DialectCatalog, RoutineKind, RoutineSchema, SimpleType, TableSchema,
    Value,
};
use crate::error::{Result, SchemaError};
use crate::extras::{ExtrasStore, FieldExtras};

const SCHEMA_NAMES_KEY: &str = "schema_names";
const TABLE_NAMES_KEY: &str = "table_names";

/// In-process discovery state, keyed by lowercase public name.
#[derive(Default)]
struct SchemaState {
    default_schema: Option<String>,
    schema_names: Option<Vec<String>>,
    table_names: Option<BTreeMap<String, TableSchema>>,
    tables: HashMap<String, Arc<TableSchema>>,
    routine_names: HashMap<RoutineKind, BTreeMap<String, RoutineSchema>>,
    routines: HashMap<(RoutineKind, String), Arc<RoutineSchema>>,
}

/// Metadata access and DDL for one database.
///
/// Discovered tables and routines are shared as `Arc`s; they stay valid after
/// a [`refresh`](Self::refresh) but are no longer returned by lookups.
pub struct Schema {
    dialect: Arc<dyn Dialect>,
    conn: Arc<dyn Connection>,
    cache: Arc<dyn Cache>,
    extras: Option<Arc<dyn ExtrasStore>>,
    config: SchemaConfig,
    cache_prefix: String,
    state: RwLock<SchemaState>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("dialect", &self.dialect.name())
            .field("driver", &self.conn.driver_name())
            .field("cache", &self.cache.cache_type())
            .field(
                "extras",
                &self.extras.as_ref().map(|e| e.store_type()),
            )
            .finish()
    }
}

impl Schema {
    /// Create a schema over `conn` with the cache selected by `config`.
    pub fn new(dialect: Arc<dyn Dialect>, conn: Arc<dyn Connection>, config: SchemaConfig) -> Self {
        let cache: Arc<dyn Cache> = if config.cache_enabled {
            Arc::new(MemoryCache::new())
        } else {
            Arc::new(NullCache::new())
        };
        let cache_prefix = config.effective_cache_prefix();
        Self {
            dialect,
            conn,
            cache,
            extras: None,
            config,
            cache_prefix,
            state: RwLock::new(SchemaState::default()),
        }
    }

    /// Create a schema whose dialect is resolved from `config.dialect`.
    pub fn from_config(
        config: SchemaConfig,
        catalog: &DialectCatalog,
        conn: Arc<dyn Connection>,
    ) -> Result<Self> {
        let dialect = catalog.require_dialect(&config.dialect)?;
        Ok(Self::new(dialect, conn, config))
    }

    /// Replace the second-level cache.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// Attach an extras store.
    pub fn with_extras(mut self, store: Arc<dyn ExtrasStore>) -> Self {
        self.extras = Some(store);
        self
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    pub fn extras_store(&self) -> Option<&dyn ExtrasStore> {
        self.extras.as_deref()
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Cache plumbing
    // ------------------------------------------------------------------

    fn cache_key(&self, key: &str) -> String {
        format!("{}{}", self.cache_prefix, key)
    }

    fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(&self.cache_key(key))?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn cache_put<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_value(value)
            .map_err(SchemaError::from)
            .and_then(|v| self.cache.put(&self.cache_key(key), v, true));
        if let Err(e) = result {
            warn!("Failed to cache {}: {}", key, e);
        }
    }

    /// Clear every in-process map and flush the external cache.
    ///
    /// Must follow any DDL issued outside this `Schema`.
    pub fn refresh(&self) -> Result<()> {
        *self.state.write() = SchemaState::default();
        self.cache.flush()?;
        debug!("Schema caches cleared ({})", self.cache.cache_type());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Schema names
    // ------------------------------------------------------------------

    /// Schema used for unqualified names: the configured override, or the
    /// dialect's answer.
    pub fn default_schema(&self) -> Result<String> {
        if let Some(schema) = self.state.read().default_schema.clone() {
            return Ok(schema);
        }
        let schema = match &self.config.default_schema {
            Some(s) => s.clone(),
            None => self.dialect.default_schema(self.conn.as_ref())?,
        };
        self.state.write().default_schema = Some(schema.clone());
        Ok(schema)
    }

    /// Schemas searched for tables and routines.
    ///
    /// Configured schemas win; engines without schema enumeration, or an
    /// empty enumeration, yield the default schema alone.
    pub fn get_schema_names(&self, refresh: bool) -> Result<Vec<String>> {
        if !refresh {
            if let Some(names) = self.state.read().schema_names.clone() {
                return Ok(names);
            }
            if let Some(names) = self.cache_get::<Vec<String>>(SCHEMA_NAMES_KEY) {
                self.state.write().schema_names = Some(names.clone());
                return Ok(names);
            }
        }

        let default = self.default_schema()?;
        let mut names = if !self.config.schemas.is_empty() {
            self.config.schemas.clone()
        } else if self.dialect.supports_schema_enumeration() {
            self.dialect.find_schema_names(self.conn.as_ref())?
        } else {
            Vec::new()
        };
        if names.is_empty() {
            names.push(default);
        }

        self.cache_put(SCHEMA_NAMES_KEY, &names);
        self.state.write().schema_names = Some(names.clone());
        Ok(names)
    }

    // ------------------------------------------------------------------
    // Table names
    // ------------------------------------------------------------------

    /// Table stubs keyed by lowercase public name, sorted.
    ///
    /// `schema` restricts the result to one schema; `None` returns every
    /// discovered schema. Table-level extras are merged onto the stubs.
    pub fn get_table_names(
        &self,
        schema: Option<&str>,
        include_views: bool,
        refresh: bool,
    ) -> Result<BTreeMap<String, TableSchema>> {
        let all = self.all_table_names(refresh)?;
        let default = self.default_schema()?;
        Ok(all
            .into_iter()
            .filter(|(_, t)| include_views || !t.is_view)
            .filter(|(_, t)| match schema {
                None => true,
                Some("") => t.schema_name.eq_ignore_ascii_case(&default),
                Some(s) => t.schema_name.eq_ignore_ascii_case(s),
            })
            .collect())
    }

    fn all_table_names(&self, refresh: bool) -> Result<BTreeMap<String, TableSchema>> {
        if !refresh {
            if let Some(names) = self.state.read().table_names.clone() {
                return Ok(names);
            }
            if let Some(stubs) = self.cache_get::<Vec<TableSchema>>(TABLE_NAMES_KEY) {
                let names = index_by_name(stubs);
                self.state.write().table_names = Some(names.clone());
                return Ok(names);
            }
        }

        let default = self.default_schema()?;
        let schemas = self.get_schema_names(refresh)?;
        let mut stubs = Vec::new();
        for schema in &schemas {
            for row in self.dialect.find_table_names(self.conn.as_ref(), schema, true)? {
                let mut stub = TableSchema::stub(&row.schema, &row.table, &default, row.is_view);
                stub.quoted_name = self.dialect.quote_table_name(&stub.name);
                stubs.push(stub);
            }
        }

        if let Some(store) = &self.extras {
            let names: Vec<String> = stubs.iter().map(|t| t.name.clone()).collect();
            let extras = store.get_table_extras(&names)?;
            if !extras.is_empty() {
                stubs = stubs
                    .iter()
                    .map(|t| apply_table_extras(t, &extras))
                    .collect();
            }
        }
        debug!(
            "Discovered {} tables across {} schema(s)",
            stubs.len(),
            schemas.len()
        );

        self.cache_put(TABLE_NAMES_KEY, &stubs);
        let names = index_by_name(stubs);
        self.state.write().table_names = Some(names.clone());
        Ok(names)
    }

    /// Stub for `name`, ignoring case. `default_schema.table` also resolves.
    fn find_stub(&self, name: &str) -> Result<Option<TableSchema>> {
        let names = self.all_table_names(false)?;
        if let Some(stub) = names.get(&name.to_lowercase()) {
            return Ok(Some(stub.clone()));
        }
        let (schema, table) = split_qualified(name);
        if !schema.is_empty() && schema.eq_ignore_ascii_case(&self.default_schema()?) {
            return Ok(names.get(&table.to_lowercase()).cloned());
        }
        Ok(None)
    }

    /// Whether a table or view exists, ignoring case.
    pub fn does_table_exist(&self, name: &str) -> Result<bool> {
        Ok(self.table_exists_name(name)?.is_some())
    }

    /// The public name of an existing table, in its discovered case.
    pub fn table_exists_name(&self, name: &str) -> Result<Option<String>> {
        Ok(self.find_stub(name)?.map(|t| t.name))
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// Fully discovered table, or `None` when it does not exist.
    pub fn get_table(&self, name: &str, refresh: bool) -> Result<Option<Arc<TableSchema>>> {
        if name.trim().is_empty() {
            return Err(SchemaError::invalid("Table name can not be empty."));
        }
        let key = name.to_lowercase();

        if !refresh {
            if let Some(table) = self.state.read().tables.get(&key) {
                return Ok(Some(table.clone()));
            }
            if let Some(table) = self.cache_get::<TableSchema>(&table_key(&key)) {
                let table = Arc::new(table);
                self.state.write().tables.insert(key, table.clone());
                return Ok(Some(table));
            }
        }

        let Some(stub) = self.find_stub(name)? else {
            debug!("Table '{}' not found", name);
            return Ok(None);
        };
        let Some(loaded) = self.dialect.load_table(self.conn.as_ref(), &stub)? else {
            debug!("Table '{}' has no columns", stub.name);
            return Ok(None);
        };

        let mut table = loaded.table;
        build_table_relations(&mut table, &loaded.constraints, &self.default_schema()?);
        let mut table = self.merge_extras(table)?;
        table.discovery_completed = true;
        debug!(
            "Loaded table '{}' ({} columns, {} relations)",
            table.name,
            table.columns.len(),
            table.relations.len()
        );

        // Cache under the public name so every spelling shares one entry.
        let public_key = table.name.to_lowercase();
        self.cache_put(&table_key(&public_key), &table);
        let table = Arc::new(table);
        let mut state = self.state.write();
        state.tables.insert(public_key.clone(), table.clone());
        if public_key != key {
            state.tables.insert(key, table.clone());
        }
        Ok(Some(table))
    }

    fn merge_extras(&self, table: TableSchema) -> Result<TableSchema> {
        let Some(store) = &self.extras else {
            return Ok(table);
        };
        let fields = store.get_field_extras(&table.name, &[])?;
        let table = merge_field_extras(&table, &fields, |n| self.dialect.quote_column_name(n));

        let referenced = store.get_field_extras_referenced(&table.name)?;
        let table = merge_referenced_extras(&table, &referenced, |junction| {
            store
                .get_field_extras(junction, &[])
                .unwrap_or_else(|e| {
                    warn!("Failed to read extras for junction '{}': {}", junction, e);
                    Vec::<FieldExtras>::new()
                })
        });

        let related = store.get_related_extras(&table.name, &[])?;
        Ok(merge_related_extras(&table, &related))
    }

    /// Every table (and optionally view) of `schema` that still resolves.
    pub fn get_tables(
        &self,
        schema: Option<&str>,
        include_views: bool,
        refresh: bool,
    ) -> Result<BTreeMap<String, Arc<TableSchema>>> {
        let mut out = BTreeMap::new();
        for (key, stub) in self.get_table_names(schema, include_views, refresh)? {
            if let Some(table) = self.get_table(&stub.name, refresh)? {
                out.insert(key, table);
            }
        }
        Ok(out)
    }

    /// Drop one table from the in-process and external caches, along with
    /// the name list.
    fn invalidate_table(&self, name: &str) {
        let key = name.to_lowercase();
        {
            let mut state = self.state.write();
            state.tables.remove(&key);
            state.table_names = None;
        }
        for k in [table_key(&key), TABLE_NAMES_KEY.to_string()] {
            if let Err(e) = self.cache.remove(&self.cache_key(&k)) {
                debug!("Failed to evict cache entry {}: {}", k, e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Value formatting
    // ------------------------------------------------------------------

    /// Coerce a read-back value by simple type, using the configured
    /// date/time formats.
    pub fn format_value(&self, value: Value, simple: SimpleType) -> Value {
        format_value(&self.config.formats, value, simple)
    }

    /// Re-render a date/time string in the configured format for `simple`.
    pub fn format_date_time(&self, simple: SimpleType, value: &str) -> String {
        match self.get_date_time_format(simple) {
            Some(format) => format_date_time(format, value),
            None => value.to_string(),
        }
    }

    /// Configured output format for a temporal type.
    pub fn get_date_time_format(&self, simple: SimpleType) -> Option<&str> {
        self.config.formats.for_type(simple)
    }
}

fn table_key(lower_name: &str) -> String {
    format!("table:{}", lower_name)
}

fn index_by_name(stubs: Vec<TableSchema>) -> BTreeMap<String, TableSchema> {
    stubs
        .into_iter()
        .map(|t| (t.name.to_lowercase(), t))
        .collect()
}
