//! Core abstractions for database-agnostic schema introspection.
//!
//! - [`value`]: bound values, expressions and result rows
//! - [`types`]: closed enumerations (simple types, relation kinds, parameter modes)
//! - [`column`], [`table`], [`relation`], [`routine`]: the normalized metadata model
//! - [`discovery`]: raw catalog rows exchanged between dialects and the orchestrator
//! - [`traits`]: the [`Connection`] boundary and the per-engine [`Dialect`] strategy
//! - [`catalog`]: dialect registry for dependency injection
//! - [`identifier`], [`naming`]: quoting, validation, labels and plurals
//!
//! # Design Patterns
//!
//! - **Strategy**: one `Dialect` per engine, selected through `DialectCatalog`
//! - **Template Method**: default trait methods carry the shared ANSI behaviour

pub mod catalog;
pub mod column;
pub mod discovery;
pub mod identifier;
pub mod naming;
pub mod relation;
pub mod routine;
pub mod table;
pub mod traits;
pub mod types;
pub mod value;

// Re-export commonly used types for convenience
pub use catalog::DialectCatalog;
pub use column::{ColumnSchema, TypeLimits};
pub use discovery::{
    CallArgs, CallPlan, ConstraintRow, IndexRow, LoadedTable, OutSource, RoutineParameterRow,
    TableNameRow,
};
pub use relation::RelationSchema;
pub use routine::{FunctionSchema, ParameterSchema, ProcedureSchema, RoutineKind, RoutineSchema};
pub use table::{ForeignKeyRef, PrimaryKey, TableSchema};
pub use traits::{argument_value, bind_inputs, standard_call, Connection, Dialect};
pub use types::{BindingType, DbFunction, ParamType, RelationType, SimpleType};
pub use value::{Expression, Row, Value};
