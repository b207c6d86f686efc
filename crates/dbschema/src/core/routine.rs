//! Stored procedure and function metadata.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::types::{ParamType, SimpleType};
use super::value::Value;

/// Procedure or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "procedure",
            RoutineKind::Function => "function",
        }
    }

    /// The catalog spelling used by `information_schema.routines`.
    pub fn catalog_name(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
        }
    }
}

/// One routine parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub name: String,
    pub position: u32,
    pub param_type: ParamType,
    #[serde(rename = "type")]
    pub value_type: SimpleType,
    pub db_type: String,
    pub default_value: Option<Value>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub allow_null: bool,
}

impl ParameterSchema {
    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "position": self.position,
            "param_type": self.param_type,
            "type": self.value_type,
            "db_type": self.db_type,
            "default": self.default_value,
            "length": self.length,
            "precision": self.precision,
            "scale": self.scale,
            "allow_null": self.allow_null,
        })
    }
}

/// A stored procedure or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineSchema {
    pub kind: RoutineKind,
    pub schema_name: String,
    /// Public name: `routine`, or `schema.routine` outside the default schema.
    pub name: String,
    pub routine_name: String,
    pub quoted_name: String,
    pub return_type: Option<SimpleType>,
    /// Ordered by position.
    pub parameters: Vec<ParameterSchema>,
    pub discovery_completed: bool,
}

/// Procedure metadata.
pub type ProcedureSchema = RoutineSchema;

/// Function metadata.
pub type FunctionSchema = RoutineSchema;

impl RoutineSchema {
    /// A name-only stub, as produced by routine name discovery.
    pub fn stub(kind: RoutineKind, schema_name: &str, routine_name: &str, default_schema: &str) -> Self {
        let name = if schema_name.is_empty() || schema_name.eq_ignore_ascii_case(default_schema) {
            routine_name.to_string()
        } else {
            format!("{}.{}", schema_name, routine_name)
        };
        Self {
            kind,
            schema_name: schema_name.to_string(),
            name,
            routine_name: routine_name.to_string(),
            quoted_name: String::new(),
            return_type: None,
            parameters: Vec::new(),
            discovery_completed: false,
        }
    }

    pub fn qualified_name(&self) -> String {
        if self.schema_name.is_empty() {
            self.routine_name.clone()
        } else {
            format!("{}.{}", self.schema_name, self.routine_name)
        }
    }

    /// Insert or replace a parameter, keeping the list ordered by position.
    pub fn add_parameter(&mut self, param: ParameterSchema) {
        self.parameters
            .retain(|p| !p.name.eq_ignore_ascii_case(&param.name));
        self.parameters.push(param);
        self.parameters.sort_by_key(|p| p.position);
    }

    /// Look up a parameter, ignoring case and any `@`/`:` sigil.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
        let wanted = strip_sigil(name);
        self.parameters
            .iter()
            .find(|p| strip_sigil(&p.name).eq_ignore_ascii_case(wanted))
    }

    pub fn has_output_parameters(&self) -> bool {
        self.parameters.iter().any(|p| p.param_type.is_output())
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "type": self.kind.as_str(),
            "return_type": self.return_type,
            "params": self.parameters.iter().map(ParameterSchema::to_array).collect::<Vec<_>>(),
        })
    }
}

/// Parameter name without a leading `@` or `:`.
pub fn strip_sigil(name: &str) -> &str {
    name.trim_start_matches(['@', ':'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, position: u32, param_type: ParamType) -> ParameterSchema {
        ParameterSchema {
            name: name.into(),
            position,
            param_type,
            ..Default::default()
        }
    }

    #[test]
    fn test_parameters_sorted_by_position() {
        let mut r = RoutineSchema::stub(RoutineKind::Procedure, "dbo", "get_totals", "dbo");
        r.add_parameter(param("@total", 2, ParamType::Out));
        r.add_parameter(param("@customer", 1, ParamType::In));
        assert_eq!(r.parameters[0].name, "@customer");
        assert!(r.has_output_parameters());
        assert_eq!(r.parameter("TOTAL").unwrap().position, 2);
        assert_eq!(r.name, "get_totals");
    }

    #[test]
    fn test_stub_outside_default_schema() {
        let r = RoutineSchema::stub(RoutineKind::Function, "billing", "tax", "public");
        assert_eq!(r.name, "billing.tax");
        assert_eq!(r.qualified_name(), "billing.tax");
        assert_eq!(r.to_array()["type"], "function");
    }
}
