//! Closed enumerations shared by the metadata model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Database-agnostic column type tag.
///
/// `pk` is accepted as an alias of `id` when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleType {
    #[serde(alias = "pk")]
    Id,
    Reference,
    #[default]
    String,
    Text,
    Integer,
    Bigint,
    Float,
    Double,
    Decimal,
    Datetime,
    Timestamp,
    Time,
    Date,
    Binary,
    Boolean,
    Money,
    Virtual,
    UserId,
    UserIdOnCreate,
    UserIdOnUpdate,
    TimestampOnCreate,
    TimestampOnUpdate,
}

impl SimpleType {
    /// All simple types in declaration order.
    pub const ALL: [SimpleType; 22] = [
        SimpleType::Id,
        SimpleType::Reference,
        SimpleType::String,
        SimpleType::Text,
        SimpleType::Integer,
        SimpleType::Bigint,
        SimpleType::Float,
        SimpleType::Double,
        SimpleType::Decimal,
        SimpleType::Datetime,
        SimpleType::Timestamp,
        SimpleType::Time,
        SimpleType::Date,
        SimpleType::Binary,
        SimpleType::Boolean,
        SimpleType::Money,
        SimpleType::Virtual,
        SimpleType::UserId,
        SimpleType::UserIdOnCreate,
        SimpleType::UserIdOnUpdate,
        SimpleType::TimestampOnCreate,
        SimpleType::TimestampOnUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleType::Id => "id",
            SimpleType::Reference => "reference",
            SimpleType::String => "string",
            SimpleType::Text => "text",
            SimpleType::Integer => "integer",
            SimpleType::Bigint => "bigint",
            SimpleType::Float => "float",
            SimpleType::Double => "double",
            SimpleType::Decimal => "decimal",
            SimpleType::Datetime => "datetime",
            SimpleType::Timestamp => "timestamp",
            SimpleType::Time => "time",
            SimpleType::Date => "date",
            SimpleType::Binary => "binary",
            SimpleType::Boolean => "boolean",
            SimpleType::Money => "money",
            SimpleType::Virtual => "virtual",
            SimpleType::UserId => "user_id",
            SimpleType::UserIdOnCreate => "user_id_on_create",
            SimpleType::UserIdOnUpdate => "user_id_on_update",
            SimpleType::TimestampOnCreate => "timestamp_on_create",
            SimpleType::TimestampOnUpdate => "timestamp_on_update",
        }
    }

    /// Integer-backed types (including key and user id types).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SimpleType::Id
                | SimpleType::Reference
                | SimpleType::Integer
                | SimpleType::Bigint
                | SimpleType::UserId
                | SimpleType::UserIdOnCreate
                | SimpleType::UserIdOnUpdate
        )
    }

    /// Date and time types, including the auto-timestamp variants.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            SimpleType::Datetime
                | SimpleType::Timestamp
                | SimpleType::Time
                | SimpleType::Date
                | SimpleType::TimestampOnCreate
                | SimpleType::TimestampOnUpdate
        )
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimpleType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "pk" {
            return Ok(SimpleType::Id);
        }
        SimpleType::ALL
            .iter()
            .find(|t| t.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("Unknown simple type '{}'", s))
    }
}

/// Kind of relationship between two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    BelongsTo,
    HasMany,
    ManyMany,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::BelongsTo => "belongs_to",
            RelationType::HasMany => "has_many",
            RelationType::ManyMany => "many_many",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a routine parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamType {
    #[default]
    In,
    Out,
    #[serde(alias = "IN/OUT", alias = "IN_OUT")]
    Inout,
}

impl ParamType {
    /// Parse the mode strings used by the various catalogs
    /// (`IN`, `OUT`, `INOUT`, `IN/OUT`, DB2's `P`/`O`/`B`).
    pub fn from_catalog(mode: &str) -> Self {
        match mode.trim().to_ascii_uppercase().as_str() {
            "OUT" | "O" => ParamType::Out,
            "INOUT" | "IN/OUT" | "IN_OUT" | "B" => ParamType::Inout,
            _ => ParamType::In,
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self, ParamType::Out | ParamType::Inout)
    }

    pub fn is_input(&self) -> bool {
        matches!(self, ParamType::In | ParamType::Inout)
    }
}

/// Host binding hint for a column, used when binding values to statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingType {
    Int,
    Bool,
    Float,
    #[default]
    String,
    Binary,
}

/// Computed-column descriptor attached to a field through extras.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DbFunction {
    /// SQL expression, with `{field}` style column references left to the caller.
    pub function: String,

    /// Simple type of the computed value.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub return_type: Option<SimpleType>,

    /// Aggregate functions need GROUP BY handling upstream.
    #[serde(default)]
    pub aggregate: bool,
}
