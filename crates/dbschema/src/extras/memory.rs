//! In-process extras store.

use parking_lot::RwLock;

use super::{ExtrasStore, FieldExtras, RelatedExtras, TableExtras};
use crate::error::Result;

/// Extras kept in memory for the lifetime of the store.
#[derive(Default)]
pub struct MemoryExtrasStore {
    tables: RwLock<Vec<TableExtras>>,
    fields: RwLock<Vec<FieldExtras>>,
    related: RwLock<Vec<RelatedExtras>>,
}

impl MemoryExtrasStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored rows across all three kinds.
    pub fn len(&self) -> usize {
        self.tables.read().len() + self.fields.read().len() + self.related.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn selected(names: &[String], name: &str) -> bool {
    names.is_empty() || names.iter().any(|n| eq(n, name))
}

impl ExtrasStore for MemoryExtrasStore {
    fn get_table_extras(&self, tables: &[String]) -> Result<Vec<TableExtras>> {
        Ok(self
            .tables
            .read()
            .iter()
            .filter(|t| selected(tables, &t.table))
            .cloned()
            .collect())
    }

    fn get_field_extras(&self, table: &str, fields: &[String]) -> Result<Vec<FieldExtras>> {
        Ok(self
            .fields
            .read()
            .iter()
            .filter(|f| eq(&f.table, table) && selected(fields, &f.field))
            .cloned()
            .collect())
    }

    fn get_field_extras_referenced(&self, table: &str) -> Result<Vec<FieldExtras>> {
        Ok(self
            .fields
            .read()
            .iter()
            .filter(|f| {
                f.is_virtual_foreign_key
                    && !f.is_foreign_ref_service
                    && f.ref_table.as_deref().map(|t| eq(t, table)).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    fn get_related_extras(
        &self,
        table: &str,
        relations: &[String],
    ) -> Result<Vec<RelatedExtras>> {
        Ok(self
            .related
            .read()
            .iter()
            .filter(|r| eq(&r.table, table) && selected(relations, &r.relationship))
            .cloned()
            .collect())
    }

    fn set_table_extras(&self, rows: Vec<TableExtras>) -> Result<()> {
        let mut tables = self.tables.write();
        for row in rows {
            tables.retain(|t| !eq(&t.table, &row.table));
            tables.push(row);
        }
        Ok(())
    }

    fn set_field_extras(&self, rows: Vec<FieldExtras>) -> Result<()> {
        let mut fields = self.fields.write();
        for row in rows {
            fields.retain(|f| !(eq(&f.table, &row.table) && eq(&f.field, &row.field)));
            fields.push(row);
        }
        Ok(())
    }

    fn set_related_extras(&self, rows: Vec<RelatedExtras>) -> Result<()> {
        let mut related = self.related.write();
        for row in rows {
            related.retain(|r| {
                !(eq(&r.table, &row.table) && eq(&r.relationship, &row.relationship))
            });
            related.push(row);
        }
        Ok(())
    }

    fn remove_table_extras(&self, tables: &[String]) -> Result<()> {
        if tables.is_empty() {
            return Ok(());
        }
        self.tables.write().retain(|t| !selected(tables, &t.table));
        self.fields.write().retain(|f| !selected(tables, &f.table));
        self.related.write().retain(|r| !selected(tables, &r.table));
        Ok(())
    }

    fn remove_field_extras(&self, table: &str, fields: &[String]) -> Result<()> {
        self.fields
            .write()
            .retain(|f| !(eq(&f.table, table) && selected(fields, &f.field)));
        Ok(())
    }

    fn remove_related_extras(&self, table: &str, relations: &[String]) -> Result<()> {
        self.related
            .write()
            .retain(|r| !(eq(&r.table, table) && selected(relations, &r.relationship)));
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
