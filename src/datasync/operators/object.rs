// SPDX-License-Identifier: MIT

//! Object key predicates.
//!
//! The first operand is a JSON object, the second a key or an array of keys.
//! A missing object counts as lacking every key.

use super::{arg, Arity, ExecutionContext, Operation};
use crate::engine::value::Value;
use serde_json::{Map, Value as JsonValue};

/// Key set from a string or an array of strings; any non-string rejects it
fn keys(value: &Value) -> Option<Vec<&str>> {
    match value {
        Value::String(key) => Some(vec![key.as_str()]),
        Value::Array(items) => items.iter().map(Value::as_str).collect(),
        _ => None,
    }
}

fn object_and_keys<'a>(args: &[&'a Value]) -> Option<(&'a Map<String, JsonValue>, Vec<&'a str>)> {
    Some((arg(args, 0).as_object()?, keys(arg(args, 1))?))
}

pub struct HasAnyKey;

impl Operation for HasAnyKey {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(
            object_and_keys(args)
                .map(|(object, keys)| keys.iter().any(|k| object.contains_key(*k)))
                .unwrap_or(false),
        )
    }
}

/// Vacuously true for an empty key set
pub struct HasAllKeys;

impl Operation for HasAllKeys {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        Value::Bool(
            object_and_keys(args)
                .map(|(object, keys)| keys.iter().all(|k| object.contains_key(*k)))
                .unwrap_or(false),
        )
    }
}

pub struct HasNoKeys;

impl Operation for HasNoKeys {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        let Some(object) = arg(args, 0).as_object() else {
            return Value::Bool(true);
        };
        Value::Bool(
            keys(arg(args, 1))
                .map(|keys| !keys.iter().any(|k| object.contains_key(*k)))
                .unwrap_or(false),
        )
    }
}

pub struct LacksKey;

impl Operation for LacksKey {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        let Some(object) = arg(args, 0).as_object() else {
            return Value::Bool(true);
        };
        Value::Bool(
            keys(arg(args, 1))
                .map(|keys| keys.iter().all(|k| !object.contains_key(*k)))
                .unwrap_or(false),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::OperatorKind;
    use super::*;
    use serde_json::json;

    fn obj() -> Value {
        Value::from(json!({"id": 1, "email": "a@b.c"}))
    }

    fn keys_of(keys: JsonValue) -> Value {
        Value::from(keys)
    }

    #[test]
    fn test_has_any_key() {
        assert_eq!(
            run(OperatorKind::HasAnyKey, &[obj(), keys_of(json!(["x", "email"]))]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::HasAnyKey, &[obj(), Value::from("phone")]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::HasAnyKey, &[obj(), keys_of(json!([]))]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_has_all_keys() {
        assert_eq!(
            run(OperatorKind::HasAllKeys, &[obj(), keys_of(json!(["id", "email"]))]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::HasAllKeys, &[obj(), keys_of(json!(["id", "phone"]))]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_has_all_keys_is_vacuous_on_empty_set() {
        assert_eq!(
            run(OperatorKind::HasAllKeys, &[Value::from(json!({})), keys_of(json!([]))]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_non_string_keys_are_rejected() {
        assert_eq!(
            run(OperatorKind::HasAllKeys, &[obj(), keys_of(json!(["id", 3]))]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::HasNoKeys, &[obj(), Value::Number(1.0)]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::LacksKey, &[obj(), keys_of(json!(["phone", 3]))]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_has_no_keys() {
        assert_eq!(
            run(OperatorKind::HasNoKeys, &[obj(), keys_of(json!(["x", "y"]))]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::HasNoKeys, &[obj(), keys_of(json!(["x", "id"]))]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::HasNoKeys, &[Value::Null, Value::from("id")]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_lacks_key() {
        assert_eq!(
            run(OperatorKind::LacksKey, &[obj(), Value::from("phone")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::LacksKey, &[obj(), Value::from("id")]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::LacksKey, &[Value::Null, Value::from("k")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::LacksKey, &[Value::from("not an object"), Value::from("k")]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_lacks_key_accepts_a_key_collection() {
        assert_eq!(
            run(OperatorKind::LacksKey, &[obj(), keys_of(json!(["phone", "fax"]))]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::LacksKey, &[obj(), keys_of(json!(["phone", "email"]))]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::LacksKey, &[Value::Null, keys_of(json!(["phone", "fax"]))]),
            Value::Bool(true)
        );
    }
}
