// SPDX-License-Identifier: MIT

//! Numeric comparisons. Non-numeric operands yield `false`.

use super::{
    check_arity, check_not_all_constant, numbers, Arity, ExecutionContext, Operation,
    OperatorValidationError,
};
use crate::datasync::graph::Node;
use crate::engine::value::Value;

fn compare<F>(args: &[&Value], cmp: F) -> Value
where
    F: Fn(f64, f64) -> bool,
{
    Value::Bool(numbers::<2>(args).map(|[a, b]| cmp(a, b)).unwrap_or(false))
}

fn in_range(args: &[&Value]) -> Option<bool> {
    numbers::<3>(args).map(|[value, lower, upper]| lower <= value && value <= upper)
}

fn validate_range(arity: Arity, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
    check_arity(arity, inputs)?;
    check_not_all_constant(inputs)
}

pub struct LessThan;

impl Operation for LessThan {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        compare(args, |a, b| a < b)
    }
}

pub struct LessThanOrEqual;

impl Operation for LessThanOrEqual {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        compare(args, |a, b| a <= b)
    }
}

pub struct GreaterThan;

impl Operation for GreaterThan {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        compare(args, |a, b| a > b)
    }
}

pub struct GreaterThanOrEqual;

impl Operation for GreaterThanOrEqual {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        compare(args, |a, b| a >= b)
    }
}

pub struct NumberEquals;

impl Operation for NumberEquals {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        compare(args, |a, b| (a - b).abs() < f64::EPSILON)
    }
}

/// `value` within `[lower, upper]`, bounds inclusive
pub struct Between;

impl Operation for Between {
    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn validate(&self, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
        validate_range(self.arity(), inputs)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(in_range(args).unwrap_or(false))
    }
}

/// `value` outside `[lower, upper]`
pub struct NotBetween;

impl Operation for NotBetween {
    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn validate(&self, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
        validate_range(self.arity(), inputs)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(in_range(args).map(|inside| !inside).unwrap_or(false))
    }
}
