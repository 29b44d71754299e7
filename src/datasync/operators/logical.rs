// SPDX-License-Identifier: MIT

use super::{arg, Arity, ExecutionContext, Operation};
use crate::engine::value::Value;

fn flags<'a>(args: &'a [&'a Value]) -> impl Iterator<Item = bool> + 'a {
    args.iter().map(|v| v.as_bool().unwrap_or(false))
}

/// All inputs are `true`; no inputs is `false`
pub struct And;

impl Operation for And {
    fn arity(&self) -> Arity {
        Arity::AtLeast(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(!args.is_empty() && flags(args).all(|b| b))
    }
}

pub struct Or;

impl Operation for Or {
    fn arity(&self) -> Arity {
        Arity::AtLeast(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(flags(args).any(|b| b))
    }
}

/// Negation; a non-boolean operand yields `false`
pub struct Not;

impl Operation for Not {
    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(arg(args, 0).as_bool().map(|b| !b).unwrap_or(false))
    }
}
