//! Stored procedure and function discovery and invocation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::format::format_value;
use super::Schema;
use crate::core::identifier::split_qualified;
use crate::core::routine::strip_sigil;
use crate::core::{CallArgs, OutSource, RoutineKind, RoutineSchema, Row, Value};
use crate::error::{Result, SchemaError};

/// Rows returned by a routine call.
///
/// A single result set is flattened to `Rows`; several sets are kept apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProcedureResult {
    Rows(Vec<Row>),
    Sets(Vec<Vec<Row>>),
}

impl ProcedureResult {
    fn from_sets(mut sets: Vec<Vec<Row>>) -> Self {
        match sets.len() {
            0 => ProcedureResult::Rows(Vec::new()),
            1 => ProcedureResult::Rows(sets.pop().unwrap_or_default()),
            _ => ProcedureResult::Sets(sets),
        }
    }

    /// Rows of the first (or only) result set.
    pub fn rows(&self) -> &[Row] {
        match self {
            ProcedureResult::Rows(rows) => rows,
            ProcedureResult::Sets(sets) => sets.first().map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    pub fn set_count(&self) -> usize {
        match self {
            ProcedureResult::Rows(_) => 1,
            ProcedureResult::Sets(sets) => sets.len(),
        }
    }
}

/// Everything a routine call produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallOutput {
    pub result: ProcedureResult,
    /// OUT and INOUT parameter values, keyed by bare lowercase name.
    pub out_params: BTreeMap<String, Value>,
    /// Scalar return of a function, formatted by its return type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

fn names_key(kind: RoutineKind) -> String {
    format!("{}_names", kind.as_str())
}

fn routine_key(kind: RoutineKind, lower_name: &str) -> String {
    format!("{}:{}", kind.as_str(), lower_name)
}

impl Schema {
    fn require_routines(&self, kind: RoutineKind) -> Result<()> {
        let supported = match kind {
            RoutineKind::Procedure => self.dialect.supports_procedures(),
            RoutineKind::Function => self.dialect.supports_functions(),
        };
        if supported {
            Ok(())
        } else {
            Err(SchemaError::not_implemented(
                self.dialect.name(),
                format!("Stored {}s", kind.as_str()),
            ))
        }
    }

    /// Procedure stubs keyed by lowercase public name.
    pub fn get_procedure_names(&self, refresh: bool) -> Result<BTreeMap<String, RoutineSchema>> {
        self.routine_names(RoutineKind::Procedure, refresh)
    }

    /// Function stubs keyed by lowercase public name.
    pub fn get_function_names(&self, refresh: bool) -> Result<BTreeMap<String, RoutineSchema>> {
        self.routine_names(RoutineKind::Function, refresh)
    }

    /// A procedure with its parameters, or `None` when it does not exist.
    pub fn get_procedure(&self, name: &str, refresh: bool) -> Result<Option<Arc<RoutineSchema>>> {
        self.routine(RoutineKind::Procedure, name, refresh)
    }

    /// A function with its parameters and return type.
    pub fn get_function(&self, name: &str, refresh: bool) -> Result<Option<Arc<RoutineSchema>>> {
        self.routine(RoutineKind::Function, name, refresh)
    }

    fn routine_names(
        &self,
        kind: RoutineKind,
        refresh: bool,
    ) -> Result<BTreeMap<String, RoutineSchema>> {
        self.require_routines(kind)?;
        if !refresh {
            if let Some(names) = self.state.read().routine_names.get(&kind).cloned() {
                return Ok(names);
            }
            if let Some(stubs) = self.cache_get::<Vec<RoutineSchema>>(&names_key(kind)) {
                let names = index_routines(stubs);
                self.state
                    .write()
                    .routine_names
                    .insert(kind, names.clone());
                return Ok(names);
            }
        }

        let default = self.default_schema()?;
        let mut stubs = Vec::new();
        for schema in self.get_schema_names(refresh)? {
            for name in self
                .dialect
                .find_routines(self.conn.as_ref(), &schema, kind)?
            {
                let mut stub = RoutineSchema::stub(kind, &schema, &name, &default);
                stub.quoted_name = self.dialect.quote_table_name(&stub.qualified_name());
                stubs.push(stub);
            }
        }
        debug!("Discovered {} {}(s)", stubs.len(), kind.as_str());

        self.cache_put(&names_key(kind), &stubs);
        let names = index_routines(stubs);
        self.state
            .write()
            .routine_names
            .insert(kind, names.clone());
        Ok(names)
    }

    fn routine(
        &self,
        kind: RoutineKind,
        name: &str,
        refresh: bool,
    ) -> Result<Option<Arc<RoutineSchema>>> {
        if name.trim().is_empty() {
            return Err(SchemaError::invalid(format!(
                "{} name can not be empty.",
                kind.as_str()
            )));
        }
        self.require_routines(kind)?;
        let key = name.to_lowercase();

        if !refresh {
            if let Some(r) = self.state.read().routines.get(&(kind, key.clone())) {
                return Ok(Some(r.clone()));
            }
            if let Some(r) = self.cache_get::<RoutineSchema>(&routine_key(kind, &key)) {
                let r = Arc::new(r);
                self.state.write().routines.insert((kind, key), r.clone());
                return Ok(Some(r));
            }
        }

        let names = self.routine_names(kind, false)?;
        let default = self.default_schema()?;
        let (schema, bare) = split_qualified(name);
        let stub = match names.get(&key) {
            Some(stub) => stub.clone(),
            None if !schema.is_empty() && schema.eq_ignore_ascii_case(&default) => {
                match names.get(&bare.to_lowercase()) {
                    Some(stub) => stub.clone(),
                    None => return Ok(None),
                }
            }
            None => return Ok(None),
        };

        let routine = Arc::new(self.dialect.load_routine(self.conn.as_ref(), &stub)?);
        debug!(
            "Loaded {} '{}' ({} parameters)",
            kind.as_str(),
            routine.name,
            routine.parameters.len()
        );
        self.cache_put(&routine_key(kind, &routine.name.to_lowercase()), routine.as_ref());
        self.state.write().routines.insert((kind, key), routine.clone());
        Ok(Some(routine))
    }

    /// Invoke a stored procedure.
    ///
    /// `args` are keyed by parameter name; case and a leading `@` or `:`
    /// are ignored.
    pub fn call_procedure(&self, name: &str, args: &CallArgs) -> Result<CallOutput> {
        self.call_routine(RoutineKind::Procedure, name, args)
    }

    /// Invoke a stored function.
    pub fn call_function(&self, name: &str, args: &CallArgs) -> Result<CallOutput> {
        self.call_routine(RoutineKind::Function, name, args)
    }

    fn call_routine(&self, kind: RoutineKind, name: &str, args: &CallArgs) -> Result<CallOutput> {
        let routine = self.routine(kind, name, false)?.ok_or_else(|| {
            SchemaError::NotFound(format!("{} '{}'", kind.catalog_name().to_lowercase(), name))
        })?;
        let args: CallArgs = args
            .iter()
            .map(|(k, v)| (strip_sigil(k).to_ascii_lowercase(), v.clone()))
            .collect();

        let plan = self.dialect.build_call(&routine, &args)?;
        for (sql, bindings) in &plan.pre {
            debug!("Executing: {}", sql);
            self.conn.statement(sql, bindings)?;
        }
        debug!("Calling {} '{}': {}", kind.as_str(), routine.name, plan.call);
        let mut sets = match self.conn.select_sets(&plan.call, &plan.bindings) {
            Ok(sets) => sets,
            Err(e) if e.is_benign_result_set_end() => {
                debug!("No result sets from '{}': {}", routine.name, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let out_row = match &plan.out {
            OutSource::None => None,
            OutSource::PostSelect(sql) => self.conn.select_one(sql, &[])?,
            OutSource::LastResultSet => sets.pop().and_then(|set| set.into_iter().next()),
            OutSource::FirstRow => sets.first().and_then(|set| set.first()).cloned(),
        };

        let mut out_params = BTreeMap::new();
        if let Some(row) = &out_row {
            for name in &plan.out_params {
                let bare = strip_sigil(name).to_ascii_lowercase();
                let Some(value) = row.get(&bare).or_else(|| row.get(name)).cloned() else {
                    continue;
                };
                let value = match routine.parameter(&bare) {
                    Some(param) => format_value(&self.config.formats, value, param.value_type),
                    None => value,
                };
                out_params.insert(bare, value);
            }
        }

        let result = ProcedureResult::from_sets(sets);
        let value = match kind {
            RoutineKind::Function => result.rows().first().and_then(Row::first).map(|v| {
                match routine.return_type {
                    Some(t) => format_value(&self.config.formats, v.clone(), t),
                    None => v.clone(),
                }
            }),
            RoutineKind::Procedure => None,
        };
        Ok(CallOutput {
            result,
            out_params,
            value,
        })
    }
}

fn index_routines(stubs: Vec<RoutineSchema>) -> BTreeMap<String, RoutineSchema> {
    stubs
        .into_iter()
        .map(|r| (r.name.to_lowercase(), r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: i64) -> Row {
        Row::from_pairs([("n", n)])
    }

    #[test]
    fn test_result_set_normalisation() {
        assert_eq!(ProcedureResult::from_sets(vec![]), ProcedureResult::Rows(vec![]));
        let single = ProcedureResult::from_sets(vec![vec![row(1)]]);
        assert_eq!(single.set_count(), 1);
        assert_eq!(single.rows()[0].get_i64("n"), Some(1));

        let multi = ProcedureResult::from_sets(vec![vec![row(1)], vec![row(2), row(3)]]);
        assert_eq!(multi.set_count(), 2);
        assert_eq!(multi.rows().len(), 1);
    }

    #[test]
    fn test_call_output_serialises_flat() {
        let out = CallOutput {
            result: ProcedureResult::Rows(vec![row(5)]),
            out_params: BTreeMap::from([("total".to_string(), Value::Int(9))]),
            value: None,
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["result"][0]["n"], 5);
        assert_eq!(json["out_params"]["total"], 9);
        assert!(json.get("value").is_none());
    }
}
