// SPDX-License-Identifier: MIT

//! String predicates. Non-string operands yield `false`.

use super::{
    arg, check_arity, check_not_all_constant, Arity, ExecutionContext, Operation,
    OperatorValidationError,
};
use crate::datasync::graph::Node;
use crate::engine::value::Value;

fn strings<F>(args: &[&Value], f: F) -> Value
where
    F: Fn(&str, &str) -> bool,
{
    match (arg(args, 0).as_str(), arg(args, 1).as_str()) {
        (Some(a), Some(b)) => Value::Bool(f(a, b)),
        _ => Value::Bool(false),
    }
}

/// Length in characters, not bytes
fn char_len(value: &Value) -> Option<f64> {
    value.as_str().map(|s| s.chars().count() as f64)
}

pub struct EqualsCaseSensitive;

impl Operation for EqualsCaseSensitive {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        strings(args, |a, b| a == b)
    }
}

pub struct EqualsIgnoreCase;

impl Operation for EqualsIgnoreCase {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        strings(args, |a, b| a.to_lowercase() == b.to_lowercase())
    }
}

pub struct Contains;

impl Operation for Contains {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        strings(args, |haystack, needle| haystack.contains(needle))
    }
}

pub struct NotContains;

impl Operation for NotContains {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        strings(args, |haystack, needle| !haystack.contains(needle))
    }
}

pub struct StartsWith;

impl Operation for StartsWith {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        strings(args, |s, prefix| s.starts_with(prefix))
    }
}

pub struct EndsWith;

impl Operation for EndsWith {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        strings(args, |s, suffix| s.ends_with(suffix))
    }
}

/// `len(text) < limit`
pub struct LengthLt;

impl Operation for LengthLt {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        match (char_len(arg(args, 0)), arg(args, 1).as_f64()) {
            (Some(len), Some(limit)) => Value::Bool(len < limit),
            _ => Value::Bool(false),
        }
    }
}

/// `lower <= len(text) <= upper`
pub struct LengthBetween;

impl Operation for LengthBetween {
    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn validate(&self, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
        check_arity(self.arity(), inputs)?;
        check_not_all_constant(inputs)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        match (
            char_len(arg(args, 0)),
            arg(args, 1).as_f64(),
            arg(args, 2).as_f64(),
        ) {
            (Some(len), Some(lower), Some(upper)) => Value::Bool(lower <= len && len <= upper),
            _ => Value::Bool(false),
        }
    }
}
