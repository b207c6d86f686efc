//! Schema mutation: batch create/alter and the single-object wrappers.
//!
//! Each table of a batch is planned with [`build_table_fields`] and its
//! column DDL executed immediately. Foreign keys, indexes and extras are
//! deferred until every table of the batch exists, so a table may reference
//! one that appears later in the list.
//!
//! No transaction is opened here. A failure part-way through leaves the
//! statements already executed in place; callers needing atomicity wrap the
//! call in their own transaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Schema;
use crate::core::identifier::validate_identifier;
use crate::core::{RelationType, TableSchema};
use crate::ddl::{
    build_table_fields, FieldDescriptor, ForeignKeyCommand, IndexCommand, TableDescriptor,
    TableFieldsPlan,
};
use crate::error::{Result, SchemaError};
use crate::extras::{FieldExtras, RelatedExtras, TableExtras};

/// Outcome of one table in [`Schema::update_schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateResult {
    Updated { name: String },
    Failed { error: UpdateError },
}

impl UpdateResult {
    pub fn is_error(&self) -> bool {
        matches!(self, UpdateResult::Failed { .. })
    }
}

/// Error record of a failed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateError {
    pub message: String,
    pub code: String,
}

impl From<&SchemaError> for UpdateError {
    fn from(err: &SchemaError) -> Self {
        Self {
            message: err.to_string(),
            code: err.code(),
        }
    }
}

/// Cross-table work collected during a batch.
#[derive(Default)]
struct Deferred {
    references: Vec<ForeignKeyCommand>,
    indexes: Vec<IndexCommand>,
    tables: Vec<TableExtras>,
    fields: Vec<FieldExtras>,
    drop_fields: Vec<(String, Vec<String>)>,
    related: Vec<RelatedExtras>,
}

impl Deferred {
    fn absorb(&mut self, table: &str, plan: TableFieldsPlan) {
        self.references.extend(plan.references);
        self.indexes.extend(plan.indexes);
        self.fields.extend(plan.extras);
        if !plan.drop_extras.is_empty() {
            self.drop_fields.push((table.to_string(), plan.drop_extras));
        }
    }

    fn has_extras(&self) -> bool {
        !(self.tables.is_empty()
            && self.fields.is_empty()
            && self.drop_fields.is_empty()
            && self.related.is_empty())
    }
}

impl Schema {
    fn execute(&self, sql: &str) -> Result<()> {
        debug!("Executing: {}", sql);
        self.conn.statement(sql, &[])?;
        Ok(())
    }

    /// Create or alter each table of `tables`.
    ///
    /// Missing tables are created; existing ones are altered when
    /// `allow_merge` is set and rejected otherwise. `allow_delete` drops
    /// existing fields absent from a descriptor. With `rollback`, or a
    /// single table, the first failure aborts the batch; otherwise failures
    /// are reported per table and the rest of the batch proceeds.
    pub fn update_schema(
        &self,
        tables: &[TableDescriptor],
        allow_merge: bool,
        allow_delete: bool,
        rollback: bool,
    ) -> Result<Vec<UpdateResult>> {
        let abort_on_error = rollback || tables.len() == 1;
        let mut deferred = Deferred::default();
        let mut results = Vec::with_capacity(tables.len());

        for desc in tables {
            match self.apply_table(desc, allow_merge, allow_delete, &mut deferred) {
                Ok(()) => results.push(UpdateResult::Updated {
                    name: desc.name.clone(),
                }),
                Err(e) if abort_on_error => {
                    self.refresh()?;
                    return Err(e);
                }
                Err(e) => {
                    warn!("Schema update of '{}' failed: {}", desc.name, e);
                    results.push(UpdateResult::Failed {
                        error: UpdateError::from(&e),
                    });
                }
            }
        }

        let outcome = self.apply_deferred(deferred);
        self.refresh()?;
        outcome?;

        info!(
            "Schema update finished: {} of {} table(s) applied",
            results.iter().filter(|r| !r.is_error()).count(),
            results.len()
        );
        Ok(results)
    }

    fn apply_table(
        &self,
        desc: &TableDescriptor,
        allow_merge: bool,
        allow_delete: bool,
        deferred: &mut Deferred,
    ) -> Result<()> {
        if desc.name.trim().is_empty() {
            return Err(SchemaError::invalid(
                "Table schema received does not have a valid name.",
            ));
        }
        validate_identifier(&desc.name)?;

        match self.get_table(&desc.name, false)? {
            None => self.create_from_descriptor(desc, deferred)?,
            Some(_) if !allow_merge => {
                return Err(SchemaError::AlreadyExists(format!("Table '{}'", desc.name)));
            }
            Some(old) => {
                let plan = build_table_fields(
                    self.dialect(),
                    &old.name,
                    &desc.field,
                    Some(old.as_ref()),
                    true,
                    allow_delete,
                )?;
                self.alter_from_plan(&old.name, &old, &plan)?;
                deferred.absorb(&old.name, plan);
            }
        }

        if let Some(extras) = desc.table_extras() {
            deferred.tables.push(extras);
        }
        deferred
            .related
            .extend(desc.related.iter().map(|r| r.to_extras(&desc.name)));
        self.invalidate_table(&desc.name);
        Ok(())
    }

    fn create_from_descriptor(&self, desc: &TableDescriptor, deferred: &mut Deferred) -> Result<()> {
        if desc.field.is_empty() {
            return Err(SchemaError::invalid(format!(
                "No valid fields exist in the received schema for table '{}'.",
                desc.name
            )));
        }
        let plan = build_table_fields(self.dialect(), &desc.name, &desc.field, None, true, false)?;

        let mut definitions = Vec::with_capacity(plan.columns.len());
        for field in &plan.columns {
            definitions.push(format!(
                "{} {}",
                self.dialect.quote_column_name(&field.name),
                self.dialect.column_definition(field, None)?
            ));
        }
        // A table made only of virtual fields has nothing physical to create.
        if !definitions.is_empty() {
            self.execute(&self.dialect.create_table_sql(&desc.name, &definitions, None))?;
        }
        for command in &plan.commands {
            self.execute(command)?;
        }
        info!("Created table '{}'", desc.name);
        deferred.absorb(&desc.name, plan);
        Ok(())
    }

    fn alter_from_plan(
        &self,
        table: &str,
        old: &TableSchema,
        plan: &TableFieldsPlan,
    ) -> Result<()> {
        if !plan.drop_columns.is_empty() && !self.dialect.supports_drop_column() {
            return Err(SchemaError::not_implemented(self.dialect.name(), "Dropping columns"));
        }
        if !plan.alter_columns.is_empty() && !self.dialect.supports_alter_column() {
            return Err(SchemaError::not_implemented(self.dialect.name(), "Altering columns"));
        }

        // Render everything first so a bad column fails before any drop runs.
        let mut statements = Vec::new();
        for column in &plan.drop_columns {
            self.push_drop_column(&mut statements, table, old, column);
        }
        for field in &plan.columns {
            let definition = self.dialect.column_definition(field, None)?;
            statements.push(self.dialect.add_column_sql(table, &field.name, &definition));
        }
        for field in &plan.alter_columns {
            let info = self.dialect.column_info(field, old.column(&field.name))?;
            statements.extend(self.dialect.alter_column_sql(table, &field.name, &info)?);
        }
        statements.extend(plan.commands.iter().cloned());

        for sql in &statements {
            self.execute(sql)?;
        }
        if !plan.is_physically_empty() {
            info!("Altered table '{}'", table);
        }
        Ok(())
    }

    /// Queue the drop of `column`, preceded by the drop of its foreign key
    /// constraint where the engine drops constraints on their own.
    fn push_drop_column(
        &self,
        statements: &mut Vec<String>,
        table: &str,
        old: &TableSchema,
        column: &str,
    ) {
        if self.dialect.supports_drop_foreign_key() {
            let constraint = old
                .foreign_keys
                .get(&column.to_ascii_lowercase())
                .map(|fk| fk.constraint_name.as_str())
                .filter(|name| !name.is_empty());
            if let Some(name) = constraint {
                let sql = self.dialect.drop_foreign_key_sql(name, table);
                // Composite constraints cover several dropped columns.
                if !statements.contains(&sql) {
                    statements.push(sql);
                }
            }
        }
        statements.push(self.dialect.drop_column_sql(table, column));
    }

    fn apply_deferred(&self, deferred: Deferred) -> Result<()> {
        for fk in &deferred.references {
            self.execute(&self.dialect.add_foreign_key_sql(fk))?;
        }
        for index in &deferred.indexes {
            if index.drop {
                let sql = self.dialect.drop_index_sql(&index.name, &index.table);
                if let Err(e) = self.execute(&sql) {
                    debug!("Ignoring failed drop of index {}: {}", index.name, e);
                }
            }
            let sql = self.dialect.create_index_sql(
                &index.name,
                &index.table,
                std::slice::from_ref(&index.column),
                index.unique,
            );
            self.execute(&sql)?;
        }

        if !deferred.has_extras() {
            return Ok(());
        }
        let Some(store) = &self.extras else {
            debug!("No extras store configured, schema extras not persisted");
            return Ok(());
        };
        if !deferred.tables.is_empty() {
            store.set_table_extras(deferred.tables)?;
        }
        if !deferred.fields.is_empty() {
            store.set_field_extras(deferred.fields)?;
        }
        for (table, fields) in &deferred.drop_fields {
            store.remove_field_extras(table, fields)?;
        }
        if !deferred.related.is_empty() {
            store.set_related_extras(deferred.related)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Single-object wrappers
    // ------------------------------------------------------------------

    /// Create one table; fails if it already exists.
    pub fn create_table(&self, desc: &TableDescriptor) -> Result<UpdateResult> {
        self.single(desc, false, false)
    }

    /// Alter one existing table.
    pub fn update_table(&self, desc: &TableDescriptor, allow_delete: bool) -> Result<UpdateResult> {
        if !self.does_table_exist(&desc.name)? {
            return Err(SchemaError::NotFound(format!("Table '{}'", desc.name)));
        }
        self.single(desc, true, allow_delete)
    }

    /// Add or alter fields of an existing table.
    pub fn update_fields(
        &self,
        table: &str,
        fields: Vec<FieldDescriptor>,
        allow_delete: bool,
    ) -> Result<UpdateResult> {
        self.update_table(&TableDescriptor::new(table, fields), allow_delete)
    }

    fn single(
        &self,
        desc: &TableDescriptor,
        allow_merge: bool,
        allow_delete: bool,
    ) -> Result<UpdateResult> {
        self.update_schema(std::slice::from_ref(desc), allow_merge, allow_delete, true)?
            .into_iter()
            .next()
            .ok_or_else(|| SchemaError::invalid("Schema update produced no result"))
    }

    fn require_table(&self, name: &str) -> Result<Arc<TableSchema>> {
        self.get_table(name, false)?
            .ok_or_else(|| SchemaError::NotFound(format!("Table '{}'", name)))
    }

    /// Drop a table and its extras.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let table = self.require_table(name)?;
        self.execute(&self.dialect.drop_table_sql(&table.name))?;
        if let Some(store) = &self.extras {
            store.remove_table_extras(std::slice::from_ref(&table.name))?;
        }
        info!("Dropped table '{}'", table.name);
        self.refresh()
    }

    /// Drop a column, or the extras of a virtual column.
    pub fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        let schema = self.require_table(table)?;
        let col = schema.column(column).ok_or_else(|| {
            SchemaError::NotFound(format!("Field '{}' in table '{}'", column, schema.name))
        })?;
        if !col.is_virtual {
            if !self.dialect.supports_drop_column() {
                return Err(SchemaError::not_implemented(self.dialect.name(), "Dropping columns"));
            }
            let mut statements = Vec::new();
            self.push_drop_column(&mut statements, &schema.name, &schema, &col.name);
            for sql in &statements {
                self.execute(sql)?;
            }
        }
        if let Some(store) = &self.extras {
            store.remove_field_extras(&schema.name, std::slice::from_ref(&col.name))?;
        }
        self.refresh()
    }

    /// Rename a column, carrying its extras over.
    pub fn rename_column(&self, table: &str, old: &str, new: &str) -> Result<()> {
        if !self.dialect.supports_rename_column() {
            return Err(SchemaError::not_implemented(self.dialect.name(), "Renaming columns"));
        }
        validate_identifier(new)?;
        let schema = self.require_table(table)?;
        let col = schema.column(old).ok_or_else(|| {
            SchemaError::NotFound(format!("Field '{}' in table '{}'", old, schema.name))
        })?;
        if schema.column(new).is_some() {
            return Err(SchemaError::AlreadyExists(format!(
                "Field '{}' in table '{}'",
                new, schema.name
            )));
        }
        self.execute(&self.dialect.rename_column_sql(&schema.name, &col.name, new))?;

        if let Some(store) = &self.extras {
            let names = [col.name.clone()];
            let mut rows = store.get_field_extras(&schema.name, &names)?;
            if !rows.is_empty() {
                store.remove_field_extras(&schema.name, &names)?;
                for row in rows.iter_mut() {
                    row.field = new.to_string();
                }
                store.set_field_extras(rows)?;
            }
        }
        self.refresh()
    }

    /// Remove a virtual relationship.
    ///
    /// Belongs-to and has-many relations lose the virtual foreign key that
    /// declares them; many-to-many relations are derived from their junction
    /// and cannot be removed directly. Physical relations follow their
    /// foreign key constraint.
    pub fn drop_relationship(&self, table: &str, relationship: &str) -> Result<()> {
        let schema = self.require_table(table)?;
        let rel = schema.relation(relationship).ok_or_else(|| {
            SchemaError::NotFound(format!(
                "Relationship '{}' in table '{}'",
                relationship, schema.name
            ))
        })?;
        if !rel.is_virtual {
            return Err(SchemaError::invalid(format!(
                "Relationship '{}' is backed by a foreign key constraint; drop the constraint instead.",
                rel.name
            )));
        }
        let store = self
            .extras
            .as_ref()
            .ok_or_else(|| SchemaError::Extras("No extras store configured".to_string()))?;

        let (owner, field) = match rel.relation_type {
            RelationType::BelongsTo => (schema.name.clone(), rel.field.clone()),
            RelationType::HasMany => (rel.ref_table.clone(), rel.ref_field.clone()),
            RelationType::ManyMany => {
                return Err(SchemaError::invalid(format!(
                    "Relationship '{}' is derived from junction '{}'; remove the junction's virtual foreign keys instead.",
                    rel.name,
                    rel.junction_table.as_deref().unwrap_or_default()
                )));
            }
        };

        let mut rows = store.get_field_extras(&owner, std::slice::from_ref(&field))?;
        for row in rows.iter_mut() {
            row.is_virtual_foreign_key = false;
            row.is_foreign_ref_service = false;
            row.ref_service = None;
            row.ref_table = None;
            row.ref_field = None;
            row.ref_on_update = None;
            row.ref_on_delete = None;
        }
        if !rows.is_empty() {
            store.set_field_extras(rows)?;
        }
        store.remove_related_extras(&schema.name, std::slice::from_ref(&rel.name))?;
        info!("Dropped virtual relationship '{}' of '{}'", rel.name, schema.name);
        self.refresh()
    }

    /// Reseed the auto-increment of a table to `value`, or past its
    /// current maximum when `None`.
    pub fn reset_sequence(&self, table: &str, value: Option<i64>) -> Result<()> {
        let schema = self.require_table(table)?;
        for sql in self.dialect.reset_sequence_sql(&schema, value)? {
            self.execute(&sql)?;
        }
        Ok(())
    }

    /// Enable (`check`) or disable constraint checking, for one table or all.
    pub fn check_integrity(&self, check: bool, table: Option<&str>) -> Result<()> {
        let schema = match table {
            Some(name) => Some(self.require_table(name)?),
            None => None,
        };
        for sql in self.dialect.check_integrity_sql(check, schema.as_deref()) {
            self.execute(&sql)?;
        }
        Ok(())
    }
}
