// SPDX-License-Identifier: MIT

//! Operator library for logic nodes
//!
//! Every `OperatorKind` maps to one `Operation` implementation through a single
//! exhaustive match. Operations read only the cached results of their inputs
//! and never fail on bad data: a missing or wrong-typed operand yields the
//! documented neutral value (usually `false`). Structural problems are caught
//! up front by `Operation::validate`.

mod collection;
mod datetime;
mod logical;
mod numeric;
mod object;
mod schema;
mod string;

pub use schema::SCHEMA_INPUT_POSITION;

use crate::datasync::graph::Node;
use crate::engine::value::{Value, ValueKind};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structural problem with a logic node's inputs
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct OperatorValidationError {
    pub message: String,
}

impl OperatorValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-call information available to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Reference instant for relative date predicates
    pub now: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

/// Number of inputs an operator accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "exactly 1 input"),
            Arity::Exact(n) => write!(f, "exactly {} inputs", n),
            Arity::AtLeast(n) => write!(f, "at least {} inputs", n),
        }
    }
}

/// Strategy implementing one operator
pub trait Operation: Send + Sync {
    fn arity(&self) -> Arity;

    /// Declared result kind, for static type feedback only
    fn return_type(&self) -> ValueKind {
        ValueKind::Boolean
    }

    /// Structural check of the node's inputs, in order
    fn validate(&self, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
        check_arity(self.arity(), inputs)
    }

    /// Compute the result from the inputs' cached values, in order
    fn execute(&self, args: &[&Value], ctx: &ExecutionContext) -> Value;
}

/// Operators available to logic nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorKind {
    // numeric
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    NumberEquals,
    Between,
    NotBetween,
    // string
    EqualsCaseSensitive,
    EqualsIgnoreCase,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    LengthLt,
    LengthBetween,
    // array
    LengthGt,
    ContainsElement,
    NotContainsElement,
    Avg,
    // object keys
    HasAnyKey,
    HasAllKeys,
    HasNoKeys,
    LacksKey,
    // date-time
    Before,
    After,
    SameYear,
    AgeGreaterThan,
    WithinLast,
    WithinNext,
    TimezoneOffsetEquals,
    // schema
    MatchesSchema,
    // boolean
    And,
    Or,
    Not,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 34] = [
        OperatorKind::LessThan,
        OperatorKind::LessThanOrEqual,
        OperatorKind::GreaterThan,
        OperatorKind::GreaterThanOrEqual,
        OperatorKind::NumberEquals,
        OperatorKind::Between,
        OperatorKind::NotBetween,
        OperatorKind::EqualsCaseSensitive,
        OperatorKind::EqualsIgnoreCase,
        OperatorKind::Contains,
        OperatorKind::NotContains,
        OperatorKind::StartsWith,
        OperatorKind::EndsWith,
        OperatorKind::LengthLt,
        OperatorKind::LengthBetween,
        OperatorKind::LengthGt,
        OperatorKind::ContainsElement,
        OperatorKind::NotContainsElement,
        OperatorKind::Avg,
        OperatorKind::HasAnyKey,
        OperatorKind::HasAllKeys,
        OperatorKind::HasNoKeys,
        OperatorKind::LacksKey,
        OperatorKind::Before,
        OperatorKind::After,
        OperatorKind::SameYear,
        OperatorKind::AgeGreaterThan,
        OperatorKind::WithinLast,
        OperatorKind::WithinNext,
        OperatorKind::TimezoneOffsetEquals,
        OperatorKind::MatchesSchema,
        OperatorKind::And,
        OperatorKind::Or,
        OperatorKind::Not,
    ];

    /// The strategy behind this operator
    pub fn operation(&self) -> &'static dyn Operation {
        match self {
            OperatorKind::LessThan => &numeric::LessThan,
            OperatorKind::LessThanOrEqual => &numeric::LessThanOrEqual,
            OperatorKind::GreaterThan => &numeric::GreaterThan,
            OperatorKind::GreaterThanOrEqual => &numeric::GreaterThanOrEqual,
            OperatorKind::NumberEquals => &numeric::NumberEquals,
            OperatorKind::Between => &numeric::Between,
            OperatorKind::NotBetween => &numeric::NotBetween,
            OperatorKind::EqualsCaseSensitive => &string::EqualsCaseSensitive,
            OperatorKind::EqualsIgnoreCase => &string::EqualsIgnoreCase,
            OperatorKind::Contains => &string::Contains,
            OperatorKind::NotContains => &string::NotContains,
            OperatorKind::StartsWith => &string::StartsWith,
            OperatorKind::EndsWith => &string::EndsWith,
            OperatorKind::LengthLt => &string::LengthLt,
            OperatorKind::LengthBetween => &string::LengthBetween,
            OperatorKind::LengthGt => &collection::LengthGt,
            OperatorKind::ContainsElement => &collection::ContainsElement,
            OperatorKind::NotContainsElement => &collection::NotContainsElement,
            OperatorKind::Avg => &collection::Avg,
            OperatorKind::HasAnyKey => &object::HasAnyKey,
            OperatorKind::HasAllKeys => &object::HasAllKeys,
            OperatorKind::HasNoKeys => &object::HasNoKeys,
            OperatorKind::LacksKey => &object::LacksKey,
            OperatorKind::Before => &datetime::Before,
            OperatorKind::After => &datetime::After,
            OperatorKind::SameYear => &datetime::SameYear,
            OperatorKind::AgeGreaterThan => &datetime::AgeGreaterThan,
            OperatorKind::WithinLast => &datetime::WithinLast,
            OperatorKind::WithinNext => &datetime::WithinNext,
            OperatorKind::TimezoneOffsetEquals => &datetime::TimezoneOffsetEquals,
            OperatorKind::MatchesSchema => &schema::MatchesSchema,
            OperatorKind::And => &logical::And,
            OperatorKind::Or => &logical::Or,
            OperatorKind::Not => &logical::Not,
        }
    }

    /// Whether the compiler must hydrate a schema constant for this operator
    pub fn requires_schema(&self) -> bool {
        matches!(self, OperatorKind::MatchesSchema)
    }

    /// Wire name, e.g. `GREATER_THAN`
    pub fn as_str(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", self))
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

static NULL: Value = Value::Null;

/// Operand at `position`, null when absent
pub(crate) fn arg<'a>(args: &[&'a Value], position: usize) -> &'a Value {
    args.get(position).copied().unwrap_or(&NULL)
}

/// The first `N` operands as numbers, if all of them are numeric
pub(crate) fn numbers<const N: usize>(args: &[&Value]) -> Option<[f64; N]> {
    if args.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(args) {
        *slot = value.as_f64()?;
    }
    Some(out)
}

pub(crate) fn check_arity(arity: Arity, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
    if arity.accepts(inputs.len()) {
        Ok(())
    } else {
        Err(OperatorValidationError::new(format!(
            "expected {}, found {}",
            arity,
            inputs.len()
        )))
    }
}

/// Rejects nodes whose inputs are all constants, which would make them
/// statically trivial
pub(crate) fn check_not_all_constant(inputs: &[&Node]) -> Result<(), OperatorValidationError> {
    if !inputs.is_empty() && inputs.iter().all(|node| node.is_constant()) {
        Err(OperatorValidationError::new(
            "all inputs are constants; the result would never change",
        ))
    } else {
        Ok(())
    }
}
