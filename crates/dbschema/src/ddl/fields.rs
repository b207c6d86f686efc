//! Desired-vs-existing field diffing.
//!
//! [`build_table_fields`] compares a list of (possibly partial) field
//! descriptors against the table's discovered schema and produces the
//! smallest set of physical operations plus the extras records to persist.
//! Foreign keys and indexes are returned as commands rather than executed
//! inline, because in a multi-table batch the referenced table may not
//! exist yet.

use std::collections::HashSet;

use tracing::debug;

use crate::core::identifier::validate_identifier;
use crate::core::{ColumnSchema, Dialect, SimpleType, TableSchema};
use crate::ddl::{FieldDescriptor, ForeignKeyCommand, IndexCommand, TableFieldsPlan};
use crate::error::{Result, SchemaError};

/// Diff `fields` against `old` (None when creating `table_name`).
///
/// With `allow_update` false an existing field is an error; with
/// `allow_delete` true existing fields absent from `fields` are dropped.
pub fn build_table_fields<D: Dialect + ?Sized>(
    dialect: &D,
    table_name: &str,
    fields: &[FieldDescriptor],
    old: Option<&TableSchema>,
    allow_update: bool,
    allow_delete: bool,
) -> Result<TableFieldsPlan> {
    let mut plan = TableFieldsPlan::default();

    if allow_delete {
        if let Some(old) = old {
            let wanted: HashSet<String> =
                fields.iter().map(|f| f.name.to_ascii_lowercase()).collect();
            for column in &old.columns {
                if wanted.contains(&column.name.to_ascii_lowercase()) {
                    continue;
                }
                if column.is_virtual {
                    plan.drop_extras.push(column.name.clone());
                } else {
                    plan.drop_columns.push(column.name.clone());
                }
            }
        }
    }

    for field in fields {
        validate_identifier(&field.name)?;
        let existing = old.and_then(|t| t.column(&field.name));
        if existing.is_some() && !allow_update {
            return Err(SchemaError::AlreadyExists(format!(
                "Field '{}' in table '{}'",
                field.name, table_name
            )));
        }

        if field.is_virtual() {
            if let Some(col) = existing.filter(|c| !c.is_virtual) {
                return Err(SchemaError::invalid(format!(
                    "Field '{}' already exists as a physical column of '{}' and cannot be virtual.",
                    col.name, table_name
                )));
            }
            let changed = match existing {
                Some(col) => field.extras_differs(&published(col)),
                None => true,
            };
            if changed {
                let effective = match existing {
                    Some(col) => field.overlay_on(&col.to_field()),
                    None => field.clone(),
                };
                plan.extras.push(effective.to_extras(table_name));
            }
            continue;
        }

        // A physical field replacing a virtual one is a new column.
        let physical_old = existing.filter(|c| !c.is_virtual);
        match physical_old {
            Some(col) => plan_alter(dialect, &mut plan, table_name, field, col)?,
            None => plan_create(dialect, &mut plan, table_name, field, old.is_none())?,
        }
    }

    debug!(
        table = table_name,
        add = plan.columns.len(),
        alter = plan.alter_columns.len(),
        drop = plan.drop_columns.len(),
        "built field plan"
    );
    Ok(plan)
}

fn plan_create<D: Dialect + ?Sized>(
    dialect: &D,
    plan: &mut TableFieldsPlan,
    table_name: &str,
    field: &FieldDescriptor,
    creating_table: bool,
) -> Result<()> {
    let mut queued = field.clone();
    let inline_possible = creating_table || dialect.supports_inline_unique_on_add();

    if field.simple_type() == Some(SimpleType::Id) {
        plan.commands
            .extend(dialect.primary_key_commands(table_name, &field.name));
    }

    if let Some(fk) = reference_command(dialect, table_name, field)? {
        plan.references.push(fk);
    }

    if field.is_unique == Some(true) && dialect.requires_create_index(true, inline_possible) {
        queued.is_unique = None;
        plan.indexes.push(index_command(dialect, table_name, &field.name, true, false));
    } else if field.is_index == Some(true) && field.is_unique != Some(true) {
        plan.indexes.push(index_command(dialect, table_name, &field.name, false, false));
    }

    // Rejected here, before any statement of the plan runs.
    dialect.column_definition(&queued, None)?;

    if field.has_extras() {
        plan.extras.push(field.to_extras(table_name));
    }
    plan.columns.push(queued);
    Ok(())
}

fn plan_alter<D: Dialect + ?Sized>(
    dialect: &D,
    plan: &mut TableFieldsPlan,
    table_name: &str,
    field: &FieldDescriptor,
    old: &ColumnSchema,
) -> Result<()> {
    let old_field = old.to_field();
    let mut effective = field.overlay_on(&old_field);
    let resized = field.length().is_some() || field.precision.is_some() || field.scale.is_some();
    if field.db_type.is_none() && resized {
        effective.db_type = None;
    }

    if field.physical_differs(&old_field) {
        dialect.column_info(&effective, Some(old))?;
        if !old.is_foreign_key {
            if let Some(fk) = reference_command(dialect, table_name, &effective)? {
                plan.references.push(fk);
            }
        }
        if field.is_unique == Some(true) && !old.is_unique {
            plan.indexes.push(index_command(dialect, table_name, &field.name, true, true));
        } else if field.is_index == Some(true) && !old.is_index && !old.is_unique {
            plan.indexes.push(index_command(dialect, table_name, &field.name, false, true));
        }
        plan.alter_columns.push(effective.clone());
    }

    if field.extras_differs(&published(old)) {
        plan.extras.push(effective.to_extras(table_name));
    }
    Ok(())
}

/// The descriptor as introspection publishes it, with the generated label
/// standing in for a missing one.
fn published(column: &ColumnSchema) -> FieldDescriptor {
    let mut field = column.to_field();
    field.label = Some(column.display_label());
    field
}

/// Foreign key command for a physical reference field, if it declares one.
fn reference_command<D: Dialect + ?Sized>(
    dialect: &D,
    table_name: &str,
    field: &FieldDescriptor,
) -> Result<Option<ForeignKeyCommand>> {
    let is_reference = field.simple_type() == Some(SimpleType::Reference)
        || field.is_foreign_key.unwrap_or(false);
    if !is_reference || field.virtual_foreign_key() {
        return Ok(None);
    }
    let Some(ref_table) = field.ref_table() else {
        return Err(SchemaError::invalid(format!(
            "Invalid schema detected - no table element for reference type of {}.",
            field.name
        )));
    };
    if dialect.inline_foreign_keys() {
        return Ok(None);
    }
    Ok(Some(ForeignKeyCommand {
        name: dialect.make_constraint_name("fk", table_name, Some(&field.name)),
        table: table_name.to_string(),
        column: field.name.clone(),
        ref_table: ref_table.to_string(),
        ref_field: field.ref_field().unwrap_or("id").to_string(),
        on_update: field.ref_on_update.clone(),
        on_delete: field.ref_on_delete.clone(),
    }))
}

fn index_command<D: Dialect + ?Sized>(
    dialect: &D,
    table_name: &str,
    column: &str,
    unique: bool,
    drop: bool,
) -> IndexCommand {
    let prefix = if unique { "undx" } else { "ndx" };
    IndexCommand {
        name: dialect.make_constraint_name(prefix, table_name, Some(column)),
        table: table_name.to_string(),
        column: column.to_string(),
        unique,
        drop,
    }
}
