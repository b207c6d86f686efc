//! Table metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::column::ColumnSchema;
use super::naming::{labelize, pluralize};
use super::relation::RelationSchema;
use crate::extras::TableExtras;

/// Primary key of a table: absent, a single column, or an ordered list.
///
/// A composite key always has at least two columns; use
/// [`PrimaryKey::from_columns`] to normalize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    #[default]
    None,
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    pub fn from_columns(mut columns: Vec<String>) -> Self {
        match columns.len() {
            0 => PrimaryKey::None,
            1 => PrimaryKey::Single(columns.remove(0)),
            _ => PrimaryKey::Composite(columns),
        }
    }

    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::None => Vec::new(),
            PrimaryKey::Single(c) => vec![c.as_str()],
            PrimaryKey::Composite(cs) => cs.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PrimaryKey::None)
    }
}

/// Target of a physical foreign key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Empty when the catalog does not name its constraints.
    #[serde(default)]
    pub constraint_name: String,
    pub ref_table: String,
    pub ref_field: String,
}

/// One table or view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema_name: String,
    pub table_name: String,
    /// Public name: `table`, or `schema.table` outside the default schema.
    pub name: String,
    pub quoted_name: String,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub plural: Option<String>,
    pub description: Option<String>,
    pub is_view: bool,
    pub name_field: Option<String>,
    pub primary_key: PrimaryKey,
    pub sequence_name: Option<String>,
    /// Column name (lowercase) to referenced table and column.
    pub foreign_keys: BTreeMap<String, ForeignKeyRef>,
    /// Discovery order.
    pub columns: Vec<ColumnSchema>,
    pub relations: Vec<RelationSchema>,
    /// Set once columns, constraints and extras have been merged.
    pub discovery_completed: bool,
}

impl TableSchema {
    /// A name-only stub, as produced by table name discovery.
    pub fn stub(schema_name: &str, table_name: &str, default_schema: &str, is_view: bool) -> Self {
        let name = if schema_name.is_empty() || schema_name.eq_ignore_ascii_case(default_schema) {
            table_name.to_string()
        } else {
            format!("{}.{}", schema_name, table_name)
        };
        Self {
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            name,
            is_view,
            ..Default::default()
        }
    }

    /// Fully qualified `schema.table` (or just `table` without a schema).
    pub fn qualified_name(&self) -> String {
        if self.schema_name.is_empty() {
            self.table_name.clone()
        } else {
            format!("{}.{}", self.schema_name, self.table_name)
        }
    }

    /// Look up a column, ignoring case.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Add a column, replacing any existing column of the same name.
    pub fn add_column(&mut self, column: ColumnSchema) {
        match self
            .columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(&column.name))
        {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Look up a relation by name, ignoring case.
    pub fn relation(&self, name: &str) -> Option<&RelationSchema> {
        self.relations
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn relation_names(&self) -> Vec<&str> {
        self.relations.iter().map(|r| r.name.as_str()).collect()
    }

    /// Add a relation, replacing any existing relation of the same name.
    pub fn add_relation(&mut self, relation: RelationSchema) {
        match self
            .relations
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(&relation.name))
        {
            Some(existing) => *existing = relation,
            None => self.relations.push(relation),
        }
    }

    pub fn primary_key_columns(&self) -> Vec<&ColumnSchema> {
        self.primary_key
            .columns()
            .into_iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    /// Some relation must be fetched with every record.
    pub fn fetch_requires_relations(&self) -> bool {
        self.relations.iter().any(|r| r.always_fetch)
    }

    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| labelize(self.display_name()))
    }

    pub fn display_plural(&self) -> String {
        self.plural
            .clone()
            .unwrap_or_else(|| pluralize(&self.display_label()))
    }

    /// Overlay table-level extras, returning the merged table.
    pub fn merge_extras(&self, extras: &TableExtras) -> TableSchema {
        let mut out = self.clone();
        if extras.alias.is_some() {
            out.alias = extras.alias.clone();
        }
        if extras.label.is_some() {
            out.label = extras.label.clone();
        }
        if extras.plural.is_some() {
            out.plural = extras.plural.clone();
        }
        if extras.description.is_some() {
            out.description = extras.description.clone();
        }
        if extras.name_field.is_some() {
            out.name_field = extras.name_field.clone();
        }
        out
    }

    /// JSON introspection form.
    pub fn to_array(&self, include_fields: bool, include_related: bool) -> serde_json::Value {
        let mut out = json!({
            "name": self.name,
            "alias": self.alias,
            "label": self.display_label(),
            "plural": self.display_plural(),
            "description": self.description,
            "is_view": self.is_view,
            "primary_key": self.primary_key,
            "name_field": self.name_field,
        });
        if include_fields {
            out["field"] = serde_json::Value::Array(
                self.columns.iter().map(ColumnSchema::to_array).collect(),
            );
        }
        if include_related {
            out["related"] = serde_json::Value::Array(
                self.relations.iter().map(RelationSchema::to_array).collect(),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_names() {
        let t = TableSchema::stub("public", "users", "public", false);
        assert_eq!(t.name, "users");
        assert_eq!(t.qualified_name(), "public.users");

        let other = TableSchema::stub("sales", "orders", "public", false);
        assert_eq!(other.name, "sales.orders");

        let sqlite = TableSchema::stub("", "items", "", true);
        assert_eq!(sqlite.name, "items");
        assert_eq!(sqlite.qualified_name(), "items");
        assert!(sqlite.is_view);
    }

    #[test]
    fn test_primary_key_normalization() {
        assert_eq!(PrimaryKey::from_columns(vec![]), PrimaryKey::None);
        assert_eq!(
            PrimaryKey::from_columns(vec!["id".into()]),
            PrimaryKey::Single("id".into())
        );
        let composite = PrimaryKey::from_columns(vec!["a".into(), "b".into()]);
        assert_eq!(composite.columns(), vec!["a", "b"]);
        assert_eq!(serde_json::to_value(&composite).unwrap(), json!(["a", "b"]));
        assert_eq!(serde_json::to_value(PrimaryKey::None).unwrap(), json!(null));
    }

    #[test]
    fn test_column_lookup_and_replace() {
        let mut t = TableSchema::stub("", "users", "", false);
        t.add_column(ColumnSchema::new("Email"));
        t.add_column(ColumnSchema::new("name"));
        let mut replacement = ColumnSchema::new("email");
        replacement.allow_null = false;
        t.add_column(replacement);

        assert_eq!(t.column_names(), vec!["email", "name"]);
        assert!(!t.column("EMAIL").unwrap().allow_null);
    }

    #[test]
    fn test_labels_and_extras() {
        let t = TableSchema::stub("", "order_item", "", false);
        assert_eq!(t.display_label(), "Order Item");
        assert_eq!(t.display_plural(), "Order Items");

        let merged = t.merge_extras(&TableExtras {
            table: "order_item".into(),
            label: Some("Line".into()),
            ..Default::default()
        });
        assert_eq!(merged.display_plural(), "Lines");
        assert!(t.label.is_none());
    }

    #[test]
    fn test_fetch_requires_relations() {
        let mut t = TableSchema::stub("", "users", "", false);
        assert!(!t.fetch_requires_relations());
        let mut rel = RelationSchema::has_many("id", "orders", "user_id");
        rel.always_fetch = true;
        t.add_relation(rel);
        assert!(t.fetch_requires_relations());
        assert_eq!(t.to_array(false, true)["related"][0]["name"], "orders_by_user_id");
    }
}
