//! Relationship metadata.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::naming::labelize;
use super::types::RelationType;
use crate::error::{Result, SchemaError};
use crate::extras::RelatedExtras;

/// One inferred or declared relationship from a table to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSchema {
    pub name: String,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub always_fetch: bool,
    pub flatten: bool,
    pub flatten_drop_prefix: bool,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub is_virtual: bool,
    /// Column on this table.
    pub field: String,
    pub ref_service: Option<String>,
    pub ref_table: String,
    pub ref_field: String,
    pub ref_on_update: Option<String>,
    pub ref_on_delete: Option<String>,
    pub junction_service: Option<String>,
    pub junction_table: Option<String>,
    pub junction_field: Option<String>,
    pub junction_ref_field: Option<String>,
}

impl RelationSchema {
    fn base(
        relation_type: RelationType,
        field: &str,
        ref_table: &str,
        ref_field: &str,
    ) -> Self {
        Self {
            name: String::new(),
            alias: None,
            label: None,
            description: None,
            always_fetch: false,
            flatten: false,
            flatten_drop_prefix: false,
            relation_type,
            is_virtual: false,
            field: field.to_string(),
            ref_service: None,
            ref_table: ref_table.to_string(),
            ref_field: ref_field.to_string(),
            ref_on_update: None,
            ref_on_delete: None,
            junction_service: None,
            junction_table: None,
            junction_field: None,
            junction_ref_field: None,
        }
    }

    /// This table's `field` points at `ref_table.ref_field`.
    pub fn belongs_to(field: &str, ref_table: &str, ref_field: &str) -> Self {
        let mut rel = Self::base(RelationType::BelongsTo, field, ref_table, ref_field);
        rel.name = rel.derive_name();
        rel
    }

    /// `ref_table.ref_field` points at this table's `field`.
    pub fn has_many(field: &str, ref_table: &str, ref_field: &str) -> Self {
        let mut rel = Self::base(RelationType::HasMany, field, ref_table, ref_field);
        rel.name = rel.derive_name();
        rel
    }

    /// This table and `ref_table` are joined through `junction_table`.
    pub fn many_many(
        field: &str,
        ref_table: &str,
        ref_field: &str,
        junction_table: &str,
        junction_field: &str,
        junction_ref_field: &str,
    ) -> Self {
        let mut rel = Self::base(RelationType::ManyMany, field, ref_table, ref_field);
        rel.junction_table = Some(junction_table.to_string());
        rel.junction_field = Some(junction_field.to_string());
        rel.junction_ref_field = Some(junction_ref_field.to_string());
        rel.name = rel.derive_name();
        rel
    }

    /// Mark as virtual and re-derive the name (service prefixes may change it).
    pub fn into_virtual(mut self, ref_service: Option<String>) -> Self {
        self.is_virtual = true;
        self.ref_service = ref_service;
        self.name = self.derive_name();
        self
    }

    /// Default relation name.
    ///
    /// - belongs_to: `{ref_table}_by_{field}`
    /// - has_many: `{ref_table}_by_{ref_field}`
    /// - many_many: `{ref_table}_by_{junction_table}`
    ///
    /// A foreign service prefixes the table with `{service}.`.
    pub fn derive_name(&self) -> String {
        let table = match &self.ref_service {
            Some(service) if !service.is_empty() => format!("{}.{}", service, self.ref_table),
            _ => self.ref_table.clone(),
        };
        match self.relation_type {
            RelationType::BelongsTo => format!("{}_by_{}", table, self.field),
            RelationType::HasMany => format!("{}_by_{}", table, self.ref_field),
            RelationType::ManyMany => {
                let junction = match (&self.junction_service, &self.junction_table) {
                    (Some(s), Some(j)) if !s.is_empty() => format!("{}.{}", s, j),
                    (_, Some(j)) => j.clone(),
                    _ => String::new(),
                };
                format!("{}_by_{}", table, junction)
            }
        }
    }

    /// Check the junction invariant for the relation type.
    pub fn validate(&self) -> Result<()> {
        let junction_set = [
            &self.junction_table,
            &self.junction_field,
            &self.junction_ref_field,
        ]
        .iter()
        .map(|v| v.as_deref().map(|s| !s.is_empty()).unwrap_or(false))
        .collect::<Vec<_>>();
        match self.relation_type {
            RelationType::ManyMany if junction_set.iter().all(|s| *s) => Ok(()),
            RelationType::ManyMany => Err(SchemaError::invalid(format!(
                "Relationship '{}' is many_many but its junction is incomplete",
                self.name
            ))),
            _ if junction_set.iter().any(|s| *s) => Err(SchemaError::invalid(format!(
                "Relationship '{}' is {} but carries junction settings",
                self.name, self.relation_type
            ))),
            _ => Ok(()),
        }
    }

    /// Overlay relationship extras, returning the merged relation.
    pub fn merge_extras(&self, extras: &RelatedExtras) -> RelationSchema {
        let mut out = self.clone();
        if extras.alias.is_some() {
            out.alias = extras.alias.clone();
        }
        if extras.label.is_some() {
            out.label = extras.label.clone();
        }
        if extras.description.is_some() {
            out.description = extras.description.clone();
        }
        out.always_fetch = extras.always_fetch;
        out.flatten = extras.flatten;
        out.flatten_drop_prefix = extras.flatten_drop_prefix;
        out
    }

    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "alias": self.alias,
            "label": self.label.clone().unwrap_or_else(|| labelize(self.display_name())),
            "description": self.description,
            "always_fetch": self.always_fetch,
            "flatten": self.flatten,
            "flatten_drop_prefix": self.flatten_drop_prefix,
            "type": self.relation_type,
            "is_virtual": self.is_virtual,
            "field": self.field,
            "ref_service": self.ref_service,
            "ref_table": self.ref_table,
            "ref_field": self.ref_field,
            "ref_on_update": self.ref_on_update,
            "ref_on_delete": self.ref_on_delete,
            "junction_service": self.junction_service,
            "junction_table": self.junction_table,
            "junction_field": self.junction_field,
            "junction_ref_field": self.junction_ref_field,
        })
    }
}
