// SPDX-License-Identifier: MIT

//! Array predicates. A non-array operand yields `false`, or `0.0` for `AVG`.

use super::{arg, Arity, ExecutionContext, Operation};
use crate::engine::value::{Value, ValueKind};

fn contains_element(args: &[&Value]) -> Option<bool> {
    let items = arg(args, 0).as_array()?;
    let needle = arg(args, 1);
    Some(items.iter().any(|item| item.loosely_equals(needle)))
}

/// `len(array) > limit`
pub struct LengthGt;

impl Operation for LengthGt {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        match (arg(args, 0).as_array(), arg(args, 1).as_f64()) {
            (Some(items), Some(limit)) => Value::Bool(items.len() as f64 > limit),
            _ => Value::Bool(false),
        }
    }
}

pub struct ContainsElement;

impl Operation for ContainsElement {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(contains_element(args).unwrap_or(false))
    }
}

pub struct NotContainsElement;

impl Operation for NotContainsElement {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(contains_element(args).map(|found| !found).unwrap_or(false))
    }
}

/// Mean of the numeric elements; non-numeric elements are skipped
pub struct Avg;

impl Operation for Avg {
    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn return_type(&self) -> ValueKind {
        ValueKind::Number
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        let numbers: Vec<f64> = arg(args, 0)
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default();

        if numbers.is_empty() {
            return Value::Number(0.0);
        }
        Value::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
    }
}
