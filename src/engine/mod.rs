// SPDX-License-Identifier: MIT

//! Domain-neutral building blocks for the logic graph engine
//!
//! - `Value` - runtime value model shared by every node
//! - `JsonPath` - selectors applied to provider data
//! - `CompiledSchema` - JSON Schema hydrated once per graph
//! - `time` - timestamp parsing and calendar units
//! - `error` - raised error types

pub mod error;
pub mod path;
pub mod schema;
pub mod time;
pub mod value;

pub use error::{
    CompileError, DataSyncError, ErrorCategory, ErrorDetail, EvaluationError, GraphError,
};
pub use path::JsonPath;
pub use schema::CompiledSchema;
pub use value::{Value, ValueKind};
