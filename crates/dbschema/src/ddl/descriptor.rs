//! Abstract schema description format.
//!
//! These are the records accepted by `create_table`, `update_schema` and
//! `update_fields`, and produced (in mirror form) by `to_array`. Every field
//! setting is optional: a partial descriptor only asserts the keys it
//! carries, which is what makes re-applying a discovered schema a no-op.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{DbFunction, SimpleType, Value};
use crate::error::{Result, SchemaError};
use crate::extras::{FieldExtras, RelatedExtras, TableExtras};

/// Allowed values for a field, as a list or a comma-delimited string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Picklist {
    List(Vec<String>),
    Delimited(String),
}

impl Picklist {
    /// Normalized values: trimmed, empty entries dropped.
    pub fn values(&self) -> Vec<String> {
        match self {
            Picklist::List(items) => items
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Picklist::Delimited(s) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}

/// Type named by a field descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Simple(SimpleType),
    /// A native type string passed through verbatim (`jsonb`, `varchar(50)`).
    Native(String),
}

/// One field of a table descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    /// Older spelling of `length`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_null: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_length: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_multibyte: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary_key: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_unique: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_index: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_foreign_key: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_virtual_foreign_key: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_foreign_ref_service: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_service: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_table: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_field: Option<String>,

    /// Older spelling of `ref_field`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_fields: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_on_update: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_on_delete: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picklist: Option<Picklist>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_function: Option<DbFunction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Keys this format does not know about. Kept so they round-trip.
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FieldDescriptor {
    /// Create a descriptor with a name and type.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: Some(field_type.into()),
            ..Default::default()
        }
    }

    /// Resolve the `type` key. Unknown type names are treated as native types.
    pub fn resolved_type(&self) -> Option<FieldType> {
        let raw = self.field_type.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.parse::<SimpleType>() {
            Ok(t) => FieldType::Simple(t),
            Err(_) => FieldType::Native(raw.to_string()),
        })
    }

    /// The simple type, if the `type` key names one.
    pub fn simple_type(&self) -> Option<SimpleType> {
        match self.resolved_type()? {
            FieldType::Simple(t) => Some(t),
            FieldType::Native(_) => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.simple_type() == Some(SimpleType::Virtual)
    }

    /// `length`, falling back to `size`.
    pub fn length(&self) -> Option<u32> {
        self.length.or(self.size)
    }

    /// `ref_field`, falling back to `ref_fields`.
    pub fn ref_field(&self) -> Option<&str> {
        self.ref_field
            .as_deref()
            .or(self.ref_fields.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn ref_table(&self) -> Option<&str> {
        self.ref_table.as_deref().filter(|s| !s.is_empty())
    }

    pub fn virtual_foreign_key(&self) -> bool {
        self.is_virtual_foreign_key.unwrap_or(false)
    }

    /// Whether this field declares a foreign key, physical or virtual.
    pub fn declares_reference(&self) -> bool {
        self.simple_type() == Some(SimpleType::Reference)
            || self.is_foreign_key.unwrap_or(false)
            || self.virtual_foreign_key()
    }

    /// Overlay the keys present on `self` onto `base`.
    ///
    /// Used when altering: a partial descriptor inherits everything it does
    /// not mention from the existing column.
    pub fn overlay_on(&self, base: &FieldDescriptor) -> FieldDescriptor {
        let mut out = base.clone();
        out.name = self.name.clone();
        macro_rules! take {
            ($($f:ident),*) => {
                $( if self.$f.is_some() { out.$f = self.$f.clone(); } )*
            };
        }
        take!(
            field_type, db_type, precision, scale, allow_null, default, auto_increment,
            fixed_length, supports_multibyte, is_primary_key, is_unique, is_index,
            is_foreign_key, is_virtual_foreign_key, is_foreign_ref_service, ref_service,
            ref_table, ref_on_update, ref_on_delete, picklist, validation, db_function,
            label, description, alias, comment
        );
        if let Some(length) = self.length() {
            out.length = Some(length);
            out.size = None;
        }
        if let Some(rf) = self.ref_field() {
            out.ref_field = Some(rf.to_string());
            out.ref_fields = None;
        }
        // A new type or db_type invalidates the inherited native type.
        if self.field_type.is_some() && self.db_type.is_none() {
            out.db_type = None;
        }
        for (k, v) in &self.extra {
            out.extra.insert(k.clone(), v.clone());
        }
        out
    }

    /// Whether any physical (DDL-relevant) setting present on `self`
    /// differs from `old`.
    pub fn physical_differs(&self, old: &FieldDescriptor) -> bool {
        if let Some(new_type) = self.resolved_type() {
            let same = match (&new_type, old.resolved_type()) {
                (FieldType::Simple(a), Some(FieldType::Simple(b))) => *a == b,
                (FieldType::Native(a), _) => old
                    .db_type
                    .as_deref()
                    .map(|b| a.eq_ignore_ascii_case(b))
                    .unwrap_or(false),
                _ => false,
            };
            if !same {
                return true;
            }
        }
        if let Some(db_type) = &self.db_type {
            let same = old
                .db_type
                .as_deref()
                .map(|b| db_type.eq_ignore_ascii_case(b))
                .unwrap_or(false);
            if !same {
                return true;
            }
        }
        if differs_opt(self.length(), old.length())
            || differs_opt(self.precision, old.precision)
            || differs_opt(self.scale, old.scale)
            || differs_flag(self.allow_null, old.allow_null, true)
            || differs_flag(self.auto_increment, old.auto_increment, false)
            || differs_flag(self.fixed_length, old.fixed_length, false)
            || differs_flag(self.supports_multibyte, old.supports_multibyte, false)
            || differs_flag(self.is_primary_key, old.is_primary_key, false)
            || differs_flag(self.is_unique, old.is_unique, false)
            || differs_flag(self.is_index, old.is_index, false)
        {
            return true;
        }
        if let Some(default) = &self.default {
            if !values_equivalent(default, old.default.as_ref().unwrap_or(&Value::Null)) {
                return true;
            }
        }
        if !self.virtual_foreign_key() {
            if differs_flag(self.is_foreign_key, old.is_foreign_key, false) {
                return true;
            }
            if self.references_differ(old) {
                return true;
            }
        }
        false
    }

    /// Whether any extras-only setting present on `self` differs from `old`.
    pub fn extras_differs(&self, old: &FieldDescriptor) -> bool {
        if differs_str(&self.label, &old.label)
            || differs_str(&self.description, &old.description)
            || differs_str(&self.alias, &old.alias)
            || differs_flag(
                self.is_virtual_foreign_key,
                old.is_virtual_foreign_key,
                false,
            )
            || differs_flag(
                self.is_foreign_ref_service,
                old.is_foreign_ref_service,
                false,
            )
            || differs_str(&self.ref_service, &old.ref_service)
        {
            return true;
        }
        if let Some(p) = &self.picklist {
            let old_values = old.picklist.as_ref().map(Picklist::values).unwrap_or_default();
            if p.values() != old_values {
                return true;
            }
        }
        if self.validation.is_some() && self.validation != old.validation {
            return true;
        }
        if self.db_function.is_some() && self.db_function != old.db_function {
            return true;
        }
        self.virtual_foreign_key() && self.references_differ(old)
    }

    fn references_differ(&self, old: &FieldDescriptor) -> bool {
        let ci = |a: Option<&str>, b: Option<&str>| match (a, b) {
            (Some(a), Some(b)) => !a.eq_ignore_ascii_case(b),
            (Some(_), None) => true,
            (None, _) => false,
        };
        ci(self.ref_table(), old.ref_table())
            || ci(self.ref_field(), old.ref_field())
            || ci(self.ref_on_update.as_deref(), old.ref_on_update.as_deref())
            || ci(self.ref_on_delete.as_deref(), old.ref_on_delete.as_deref())
    }

    /// Whether the descriptor carries any extras-only setting.
    pub fn has_extras(&self) -> bool {
        self.label.is_some()
            || self.description.is_some()
            || self.alias.is_some()
            || self.picklist.is_some()
            || self.validation.is_some()
            || self.db_function.is_some()
            || self.virtual_foreign_key()
            || self.is_foreign_ref_service.unwrap_or(false)
    }

    /// Extras record for this field of `table`.
    pub fn to_extras(&self, table: &str) -> FieldExtras {
        let is_virtual_fk = self.virtual_foreign_key();
        FieldExtras {
            table: table.to_string(),
            field: self.name.clone(),
            alias: self.alias.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            picklist: self.picklist.as_ref().map(Picklist::values),
            validation: self.validation.clone(),
            db_function: self.db_function.clone(),
            extra_type: if self.is_virtual() {
                Some(SimpleType::Virtual)
            } else {
                None
            },
            is_virtual_foreign_key: is_virtual_fk,
            is_foreign_ref_service: self.is_foreign_ref_service.unwrap_or(false),
            ref_service: if is_virtual_fk { self.ref_service.clone() } else { None },
            ref_table: if is_virtual_fk { self.ref_table.clone() } else { None },
            ref_field: if is_virtual_fk {
                self.ref_field().map(str::to_string)
            } else {
                None
            },
            ref_on_update: if is_virtual_fk { self.ref_on_update.clone() } else { None },
            ref_on_delete: if is_virtual_fk { self.ref_on_delete.clone() } else { None },
        }
    }
}

fn differs_opt<T: PartialEq>(new: Option<T>, old: Option<T>) -> bool {
    match new {
        Some(n) => old.map(|o| o != n).unwrap_or(true),
        None => false,
    }
}

fn differs_flag(new: Option<bool>, old: Option<bool>, default: bool) -> bool {
    match new {
        Some(n) => n != old.unwrap_or(default),
        None => false,
    }
}

fn differs_str(new: &Option<String>, old: &Option<String>) -> bool {
    match new {
        Some(n) => old.as_deref() != Some(n.as_str()),
        None => false,
    }
}

/// Compare defaults loosely: `'0'`, `0` and `0.0` are the same default.
fn values_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Expression(x), Value::Expression(y)) => {
            x.expression.eq_ignore_ascii_case(&y.expression)
        }
        (Value::Expression(_), _) | (_, Value::Expression(_)) => false,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.to_text() == b.to_text(),
        },
    }
}

/// Relationship settings supplied with a table descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub always_fetch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten_drop_prefix: Option<bool>,
}

impl RelatedDescriptor {
    pub fn to_extras(&self, table: &str) -> RelatedExtras {
        RelatedExtras {
            table: table.to_string(),
            relationship: self.name.clone(),
            alias: self.alias.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            always_fetch: self.always_fetch.unwrap_or(false),
            flatten: self.flatten.unwrap_or(false),
            flatten_drop_prefix: self.flatten_drop_prefix.unwrap_or(false),
        }
    }
}

/// One table of a schema description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_field: Option<String>,
    #[serde(alias = "fields")]
    pub field: Vec<FieldDescriptor>,
    pub related: Vec<RelatedDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, field: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            field,
            ..Default::default()
        }
    }

    /// Table-level extras, if the descriptor carries any.
    pub fn table_extras(&self) -> Option<TableExtras> {
        if self.alias.is_none()
            && self.label.is_none()
            && self.plural.is_none()
            && self.description.is_none()
            && self.name_field.is_none()
        {
            return None;
        }
        Some(TableExtras {
            table: self.name.clone(),
            alias: self.alias.clone(),
            label: self.label.clone(),
            plural: self.plural.clone(),
            description: self.description.clone(),
            name_field: self.name_field.clone(),
        })
    }

    /// Parse a schema document: a single table, a list of tables, or a
    /// `{"table": [...]}` wrapper.
    pub fn list_from_json(doc: serde_json::Value) -> Result<Vec<TableDescriptor>> {
        match doc {
            serde_json::Value::Array(_) => Ok(serde_json::from_value(doc)?),
            serde_json::Value::Object(ref map) if map.contains_key("table") => {
                let tables = map.get("table").cloned().unwrap_or_default();
                Ok(serde_json::from_value(tables)?)
            }
            serde_json::Value::Object(_) => Ok(vec![serde_json::from_value(doc)?]),
            _ => Err(SchemaError::invalid(
                "Schema document must be a table, a list of tables or {\"table\": [...]}",
            )),
        }
    }
}
