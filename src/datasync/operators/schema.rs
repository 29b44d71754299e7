// SPDX-License-Identifier: MIT

use super::{arg, check_arity, Arity, ExecutionContext, Operation, OperatorValidationError};
use crate::datasync::graph::Node;
use crate::engine::value::Value;

/// Index of the schema operand; the compiler hydrates the constant found here
pub const SCHEMA_INPUT_POSITION: usize = 1;

/// `(data, schema)`: true when the data validates against the schema
///
/// The schema must be a constant input holding a JSON string or object, which
/// the compiler turns into a `Value::Schema` before evaluation. An uncompiled
/// schema operand evaluates to `false`.
pub struct MatchesSchema;

impl Operation for MatchesSchema {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn validate(&self, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
        check_arity(self.arity(), inputs)?;
        match inputs[SCHEMA_INPUT_POSITION].constant_value() {
            Some(Value::String(_)) | Some(Value::Object(_)) | Some(Value::Schema(_)) => Ok(()),
            Some(other) => Err(OperatorValidationError::new(format!(
                "schema input must be a JSON string or object constant, found {}",
                other.kind()
            ))),
            None => Err(OperatorValidationError::new(
                "schema input must be a constant node",
            )),
        }
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        match arg(args, SCHEMA_INPUT_POSITION).as_schema() {
            Some(schema) => Value::Bool(schema.is_valid(&arg(args, 0).to_json())),
            None => Value::Bool(false),
        }
    }
}
