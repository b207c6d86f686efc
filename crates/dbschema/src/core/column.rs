//! Column metadata.
//!
//! A [`ColumnSchema`] is built by a dialect from one native catalog row,
//! then optionally overlaid with user extras through [`ColumnSchema::merge_extras`].
//! Once placed in a [`TableSchema`](super::TableSchema) it is only replaced,
//! never mutated.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::naming::labelize;
use super::types::{BindingType, DbFunction, SimpleType};
use super::value::Value;
use crate::ddl::{FieldDescriptor, Picklist};
use crate::extras::FieldExtras;

/// Size, precision and scale parsed from a native type string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeLimits {
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

/// One column of a table, physical or virtual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Quoted name as emitted in SQL.
    pub quoted_name: String,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Native type string as reported by the catalog.
    pub db_type: String,
    #[serde(rename = "type")]
    pub column_type: SimpleType,
    pub binding: BindingType,
    pub default_value: Option<Value>,
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub allow_null: bool,
    pub auto_increment: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub is_index: bool,
    pub is_foreign_key: bool,
    pub is_virtual_foreign_key: bool,
    pub is_foreign_ref_service: bool,
    pub is_virtual: bool,
    pub is_aggregate: bool,
    pub ref_service: Option<String>,
    pub ref_table: Option<String>,
    pub ref_field: Option<String>,
    pub ref_on_update: Option<String>,
    pub ref_on_delete: Option<String>,
    pub supports_multibyte: bool,
    pub fixed_length: bool,
    pub picklist: Vec<String>,
    pub validation: Option<serde_json::Value>,
    pub db_function: Option<DbFunction>,
    pub comment: Option<String>,
}

impl ColumnSchema {
    /// Create a nullable string column with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allow_null: true,
            ..Default::default()
        }
    }

    /// Record the native type and derive simple type, limits and binding from it.
    pub fn apply_db_type(&mut self, db_type: &str) {
        self.db_type = db_type.trim().to_string();
        self.column_type = Self::extract_type(&self.db_type);
        let limits = Self::extract_limit(&self.db_type);
        match self.column_type {
            SimpleType::Decimal | SimpleType::Money | SimpleType::Float | SimpleType::Double => {
                self.precision = limits.precision.or(limits.size);
                self.scale = limits.scale;
            }
            _ => {
                self.size = limits.size;
            }
        }
        let lower = self.db_type.to_ascii_lowercase();
        self.fixed_length = lower.starts_with("char")
            || lower.starts_with("nchar")
            || lower.starts_with("binary")
            || lower.starts_with("character(");
        self.supports_multibyte = lower.starts_with("nchar")
            || lower.starts_with("nvarchar")
            || lower.starts_with("ntext")
            || lower.starts_with("nclob")
            || lower.starts_with("long nvarchar");
        self.binding = Self::determine_binding_type(self.column_type);
    }

    /// Map a native type string to a simple type.
    ///
    /// Unknown types map to `string`.
    pub fn extract_type(db_type: &str) -> SimpleType {
        let lower = db_type.trim().to_ascii_lowercase();
        if lower.starts_with("tinyint(1)") || lower == "bit" || lower == "bit(1)" {
            return SimpleType::Boolean;
        }
        let base = normalize_base_type(&lower);
        match base.as_str() {
            "bool" | "boolean" => SimpleType::Boolean,
            "int" | "integer" | "int4" | "int2" | "smallint" | "tinyint" | "mediumint"
            | "serial" | "smallserial" | "serial4" => SimpleType::Integer,
            "bigint" | "int8" | "bigserial" | "serial8" => SimpleType::Bigint,
            "float" | "real" | "float4" | "binary_float" => SimpleType::Float,
            "double" | "double precision" | "float8" | "binary_double" => SimpleType::Double,
            "decimal" | "numeric" | "number" | "dec" => SimpleType::Decimal,
            "money" | "smallmoney" => SimpleType::Money,
            "text" | "tinytext" | "mediumtext" | "longtext" | "ntext" | "clob" | "nclob"
            | "dbclob" | "long varchar" | "long nvarchar" | "xml" | "json" | "jsonb" => {
                SimpleType::Text
            }
            "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" | "bytea"
            | "image" | "long binary" | "raw" | "long raw" => SimpleType::Binary,
            "date" => SimpleType::Date,
            "time" | "time without time zone" | "time with time zone" | "timetz" => {
                SimpleType::Time
            }
            "datetime" | "datetime2" | "smalldatetime" => SimpleType::Datetime,
            "timestamp" | "timestamp without time zone" | "timestamp with time zone"
            | "timestamptz" | "datetimeoffset" => SimpleType::Timestamp,
            _ => SimpleType::String,
        }
    }

    /// Parse `(n)` / `(p,s)` limits out of a native type string.
    pub fn extract_limit(db_type: &str) -> TypeLimits {
        let Some(open) = db_type.find('(') else {
            return TypeLimits::default();
        };
        let Some(close) = db_type[open..].find(')') else {
            return TypeLimits::default();
        };
        let inner = &db_type[open + 1..open + close];
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let first = parts.first().and_then(|p| p.parse::<u32>().ok());
        let second = parts.get(1).and_then(|p| p.parse::<u32>().ok());
        match second {
            Some(scale) => TypeLimits {
                size: first,
                precision: first,
                scale: Some(scale),
            },
            None => TypeLimits {
                size: first,
                precision: None,
                scale: None,
            },
        }
    }

    /// Host binding hint for a simple type.
    pub fn determine_binding_type(simple: SimpleType) -> BindingType {
        match simple {
            SimpleType::Boolean => BindingType::Bool,
            t if t.is_integer() => BindingType::Int,
            SimpleType::Float | SimpleType::Double => BindingType::Float,
            SimpleType::Binary => BindingType::Binary,
            _ => BindingType::String,
        }
    }

    /// Alias when set, otherwise the column name.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Explicit label, or one derived from the display name.
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| labelize(self.display_name()))
    }

    /// A value must be supplied on insert.
    pub fn is_required(&self) -> bool {
        !self.allow_null
            && self.default_value.is_none()
            && !self.auto_increment
            && !self.is_virtual
            && !matches!(
                self.column_type,
                SimpleType::TimestampOnCreate
                    | SimpleType::TimestampOnUpdate
                    | SimpleType::UserIdOnCreate
                    | SimpleType::UserIdOnUpdate
            )
    }

    /// Overlay extras, returning the merged column.
    ///
    /// Catalog-derived physical attributes are kept; the overlay only
    /// contributes display metadata, picklist, validation, computed-column
    /// details and virtual foreign key declarations.
    pub fn merge_extras(&self, extras: &FieldExtras) -> ColumnSchema {
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
        if let Some(picklist) = &extras.picklist {
            out.picklist = picklist.clone();
        }
        if extras.validation.is_some() {
            out.validation = extras.validation.clone();
        }
        if let Some(f) = &extras.db_function {
            out.is_aggregate = f.aggregate;
            out.db_function = Some(f.clone());
        }
        if extras.is_virtual_foreign_key {
            out.is_virtual_foreign_key = true;
            out.is_foreign_ref_service = extras.is_foreign_ref_service;
            out.ref_service = extras.ref_service.clone();
            out.ref_table = extras.ref_table.clone();
            out.ref_field = extras.ref_field.clone();
            out.ref_on_update = extras.ref_on_update.clone();
            out.ref_on_delete = extras.ref_on_delete.clone();
        }
        out
    }

    /// Build a virtual column from extras alone.
    pub fn from_virtual_extras(extras: &FieldExtras, quoted_name: String) -> ColumnSchema {
        let mut column = ColumnSchema::new(&extras.field);
        column.quoted_name = quoted_name;
        column.is_virtual = true;
        column.column_type = extras
            .db_function
            .as_ref()
            .and_then(|f| f.return_type)
            .unwrap_or(SimpleType::String);
        column.binding = Self::determine_binding_type(column.column_type);
        column.merge_extras(extras)
    }

    /// The descriptor form of this column: the input format that would
    /// recreate it.
    pub fn to_field(&self) -> FieldDescriptor {
        let field_type = if self.is_virtual {
            SimpleType::Virtual
        } else {
            self.column_type
        };
        FieldDescriptor {
            name: self.name.clone(),
            field_type: Some(field_type.as_str().to_string()),
            db_type: if self.db_type.is_empty() {
                None
            } else {
                Some(self.db_type.clone())
            },
            length: self.size,
            precision: self.precision,
            scale: self.scale,
            allow_null: Some(self.allow_null),
            default: self.default_value.clone(),
            auto_increment: Some(self.auto_increment),
            fixed_length: Some(self.fixed_length),
            supports_multibyte: Some(self.supports_multibyte),
            is_primary_key: Some(self.is_primary_key),
            is_unique: Some(self.is_unique),
            is_index: Some(self.is_index),
            is_foreign_key: Some(self.is_foreign_key),
            is_virtual_foreign_key: Some(self.is_virtual_foreign_key),
            is_foreign_ref_service: Some(self.is_foreign_ref_service),
            ref_service: self.ref_service.clone(),
            ref_table: self.ref_table.clone(),
            ref_field: self.ref_field.clone(),
            ref_on_update: self.ref_on_update.clone(),
            ref_on_delete: self.ref_on_delete.clone(),
            picklist: if self.picklist.is_empty() {
                None
            } else {
                Some(Picklist::List(self.picklist.clone()))
            },
            validation: self.validation.clone(),
            db_function: self.db_function.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            alias: self.alias.clone(),
            ..Default::default()
        }
    }

    /// JSON introspection form, mirroring the descriptor input format.
    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "alias": self.alias,
            "label": self.display_label(),
            "description": self.description,
            "type": if self.is_virtual { SimpleType::Virtual } else { self.column_type },
            "db_type": self.db_type,
            "length": self.size,
            "precision": self.precision,
            "scale": self.scale,
            "default": self.default_value,
            "required": self.is_required(),
            "allow_null": self.allow_null,
            "fixed_length": self.fixed_length,
            "supports_multibyte": self.supports_multibyte,
            "auto_increment": self.auto_increment,
            "is_primary_key": self.is_primary_key,
            "is_unique": self.is_unique,
            "is_index": self.is_index,
            "is_foreign_key": self.is_foreign_key,
            "is_virtual_foreign_key": self.is_virtual_foreign_key,
            "is_foreign_ref_service": self.is_foreign_ref_service,
            "ref_service": self.ref_service,
            "ref_table": self.ref_table,
            "ref_field": self.ref_field,
            "ref_on_update": self.ref_on_update,
            "ref_on_delete": self.ref_on_delete,
            "picklist": if self.picklist.is_empty() { None } else { Some(&self.picklist) },
            "validation": self.validation,
            "db_function": self.db_function,
            "is_virtual": self.is_virtual,
            "is_aggregate": self.is_aggregate,
        })
    }
}

/// Lowercased base type with parenthesized limits and modifiers removed.
///
/// `int(11) unsigned` becomes `int`, `character varying(255)` becomes
/// `character varying`, `timestamp(6) with time zone` keeps its zone suffix.
fn normalize_base_type(lower: &str) -> String {
    let mut out = String::with_capacity(lower.len());
    let mut depth = 0usize;
    for ch in lower.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    let words: Vec<&str> = out
        .split_whitespace()
        .filter(|w| !matches!(*w, "unsigned" | "signed" | "zerofill" | "identity"))
        .collect();
    words.join(" ")
}
