//! Working column description passed through the type-mapping pipeline.
//!
//! A [`FieldDescriptor`] is turned into a [`ColumnInfo`], translated to a
//! native type by the dialect, validated (length/precision defaults, default
//! coercion) and finally rendered into a column definition.

use crate::core::{SimpleType, Value};
use crate::ddl::{FieldDescriptor, FieldType};
use crate::error::{Result, SchemaError};

/// Column settings being rendered into DDL.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    /// Abstract type, when the descriptor named one.
    pub simple_type: Option<SimpleType>,
    /// Native type name, filled by type translation.
    pub col_type: String,
    /// Suffix appended to the type: `(100)`, `(19,4)`, ` IDENTITY(1,1)`.
    pub type_extras: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub allow_null: bool,
    pub default: Option<Value>,
    /// Expression for engines with an `ON UPDATE` column clause.
    pub on_update: Option<String>,
    pub auto_increment: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub is_foreign_key: bool,
    pub fixed_length: bool,
    pub supports_multibyte: bool,
    /// Verbatim native type supplied by the caller.
    pub db_type: Option<String>,
    pub ref_table: Option<String>,
    pub ref_field: Option<String>,
    pub ref_on_update: Option<String>,
    pub ref_on_delete: Option<String>,
    /// Rendering for an ALTER of an existing column.
    pub is_alter: bool,
    /// The existing column is already the primary key.
    pub was_primary_key: bool,
}

impl ColumnInfo {
    /// Build from a descriptor. Requires a name and a type or db_type.
    pub fn from_field(field: &FieldDescriptor) -> Result<Self> {
        if field.name.trim().is_empty() {
            return Err(SchemaError::invalid(
                "Invalid schema detected - no name element.",
            ));
        }
        let db_type = field
            .db_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let (simple_type, col_type) = match field.resolved_type() {
            Some(FieldType::Simple(t)) => (Some(t), t.as_str().to_string()),
            Some(FieldType::Native(n)) => (None, n),
            None => match &db_type {
                Some(d) => (None, d.clone()),
                None => {
                    return Err(SchemaError::invalid(format!(
                        "Invalid schema detected - no type element for field '{}'.",
                        field.name
                    )))
                }
            },
        };
        let is_reference = simple_type == Some(SimpleType::Reference)
            || field.is_foreign_key.unwrap_or(false);

        Ok(Self {
            name: field.name.clone(),
            simple_type,
            col_type,
            type_extras: String::new(),
            length: field.length(),
            precision: field.precision,
            scale: field.scale,
            allow_null: field.allow_null.unwrap_or(true),
            default: field.default.clone(),
            on_update: None,
            auto_increment: field.auto_increment.unwrap_or(false),
            is_primary_key: field.is_primary_key.unwrap_or(false),
            is_unique: field.is_unique.unwrap_or(false),
            is_foreign_key: is_reference && !field.virtual_foreign_key(),
            fixed_length: field.fixed_length.unwrap_or(false),
            supports_multibyte: field.supports_multibyte.unwrap_or(false),
            db_type,
            ref_table: field.ref_table().map(str::to_string),
            ref_field: field.ref_field().map(str::to_string),
            ref_on_update: field.ref_on_update.clone(),
            ref_on_delete: field.ref_on_delete.clone(),
            is_alter: false,
            was_primary_key: false,
        })
    }

    /// Lowercased native type name, for dialect checks.
    pub fn type_lower(&self) -> String {
        self.col_type.to_ascii_lowercase()
    }

    /// Type with extras, or the verbatim db_type.
    pub fn full_type(&self) -> String {
        match &self.db_type {
            Some(d) => d.clone(),
            None => format!("{}{}", self.col_type, self.type_extras),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field_requires_name_and_type() {
        let nameless = FieldDescriptor::new("", "string");
        assert!(ColumnInfo::from_field(&nameless)
            .unwrap_err()
            .to_string()
            .contains("no name element"));

        let typeless = FieldDescriptor {
            name: "x".into(),
            ..Default::default()
        };
        assert!(ColumnInfo::from_field(&typeless)
            .unwrap_err()
            .to_string()
            .contains("no type element"));
    }

    #[test]
    fn test_from_field_defaults() {
        let info = ColumnInfo::from_field(&FieldDescriptor::new("name", "string")).unwrap();
        assert!(info.allow_null);
        assert_eq!(info.simple_type, Some(SimpleType::String));
        assert_eq!(info.col_type, "string");
    }

    #[test]
    fn test_db_type_only_is_verbatim() {
        let field = FieldDescriptor {
            name: "geo".into(),
            db_type: Some("geometry".into()),
            ..Default::default()
        };
        let info = ColumnInfo::from_field(&field).unwrap();
        assert_eq!(info.simple_type, None);
        assert_eq!(info.full_type(), "geometry");
    }

    #[test]
    fn test_virtual_fk_is_not_physical_fk() {
        let mut field = FieldDescriptor::new("owner_id", "reference");
        field.is_virtual_foreign_key = Some(true);
        assert!(!ColumnInfo::from_field(&field).unwrap().is_foreign_key);
        field.is_virtual_foreign_key = None;
        assert!(ColumnInfo::from_field(&field).unwrap().is_foreign_key);
    }
}
