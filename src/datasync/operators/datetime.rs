// SPDX-License-Identifier: MIT

//! Date-time predicates
//!
//! Timestamps are ISO-8601 strings (a bare date means midnight UTC). Relative
//! predicates take `(timestamp, amount, unit)` with a non-negative integer
//! amount and one of the `TimeUnit` names. Anything unparsable yields `false`.

use super::{arg, check_arity, Arity, ExecutionContext, Operation, OperatorValidationError};
use crate::datasync::graph::Node;
use crate::engine::time::{parse_timestamp, TimeUnit};
use crate::engine::value::Value;
use chrono::{DateTime, Datelike, FixedOffset, Utc};

const UNIT_POSITION: usize = 2;

fn timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    parse_timestamp(value.as_str()?)
}

fn instant(value: &Value) -> Option<DateTime<Utc>> {
    timestamp(value).map(|ts| ts.with_timezone(&Utc))
}

fn amount(value: &Value) -> Option<i64> {
    let n = value.as_f64()?;
    if n < 0.0 || n.fract() != 0.0 || n > i64::MAX as f64 {
        return None;
    }
    Some(n as i64)
}

fn unit(value: &Value) -> Option<TimeUnit> {
    value.as_str()?.parse().ok()
}

/// `(timestamp, amount, unit)` operands
fn relative(args: &[&Value]) -> Option<(DateTime<Utc>, i64, TimeUnit)> {
    Some((
        instant(arg(args, 0))?,
        amount(arg(args, 1))?,
        unit(arg(args, UNIT_POSITION))?,
    ))
}

/// Offset in seconds from `"Z"`, `"+HH:MM"`, `"+HHMM"`, `"+HH"` or a number of minutes
fn offset_seconds(value: &Value) -> Option<i32> {
    match value {
        Value::Number(minutes) if minutes.fract() == 0.0 && minutes.abs() <= 24.0 * 60.0 => {
            Some(*minutes as i32 * 60)
        }
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.eq_ignore_ascii_case("z") {
                return Some(0);
            }
            let (sign, rest) = match raw.chars().next()? {
                '+' => (1, &raw[1..]),
                '-' => (-1, &raw[1..]),
                _ => return None,
            };
            let digits: String = rest.chars().filter(|c| *c != ':').collect();
            if !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let (hours, minutes) = match digits.len() {
                2 => (digits.parse::<i32>().ok()?, 0),
                4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
                _ => return None,
            };
            if hours > 23 || minutes > 59 {
                return None;
            }
            Some(sign * (hours * 3600 + minutes * 60))
        }
        _ => None,
    }
}

/// Arity check plus a static check of a constant unit operand
fn validate_relative(arity: Arity, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
    check_arity(arity, inputs)?;
    if let Some(Value::String(raw)) = inputs[UNIT_POSITION].constant_value() {
        raw.parse::<TimeUnit>()
            .map_err(OperatorValidationError::new)?;
    }
    Ok(())
}

fn compare<F>(args: &[&Value], cmp: F) -> Value
where
    F: Fn(DateTime<Utc>, DateTime<Utc>) -> bool,
{
    match (instant(arg(args, 0)), instant(arg(args, 1))) {
        (Some(a), Some(b)) => Value::Bool(cmp(a, b)),
        _ => Value::Bool(false),
    }
}

pub struct Before;

impl Operation for Before {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        compare(args, |a, b| a < b)
    }
}

pub struct After;

impl Operation for After {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        compare(args, |a, b| a > b)
    }
}

/// Same calendar year in UTC
pub struct SameYear;

impl Operation for SameYear {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        compare(args, |a, b| a.year() == b.year())
    }
}

/// Timestamp lies strictly more than `amount` units before now
pub struct AgeGreaterThan;

impl Operation for AgeGreaterThan {
    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn validate(&self, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
        validate_relative(self.arity(), inputs)
    }

    fn execute(&self, args: &[&Value], ctx: &ExecutionContext) -> Value {
        let result = relative(args).and_then(|(ts, amount, unit)| {
            let threshold = unit.shift(ctx.now, -amount)?;
            Some(ts < threshold)
        });
        Value::Bool(result.unwrap_or(false))
    }
}

/// `now - amount <= timestamp <= now`
pub struct WithinLast;

impl Operation for WithinLast {
    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn validate(&self, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
        validate_relative(self.arity(), inputs)
    }

    fn execute(&self, args: &[&Value], ctx: &ExecutionContext) -> Value {
        let result = relative(args).and_then(|(ts, amount, unit)| {
            let start = unit.shift(ctx.now, -amount)?;
            Some(start <= ts && ts <= ctx.now)
        });
        Value::Bool(result.unwrap_or(false))
    }
}

/// `now <= timestamp <= now + amount`
pub struct WithinNext;

impl Operation for WithinNext {
    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn validate(&self, inputs: &[&Node]) -> Result<(), OperatorValidationError> {
        validate_relative(self.arity(), inputs)
    }

    fn execute(&self, args: &[&Value], ctx: &ExecutionContext) -> Value {
        let result = relative(args).and_then(|(ts, amount, unit)| {
            let end = unit.shift(ctx.now, amount)?;
            Some(ctx.now <= ts && ts <= end)
        });
        Value::Bool(result.unwrap_or(false))
    }
}

pub struct TimezoneOffsetEquals;

impl Operation for TimezoneOffsetEquals {
    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn execute(&self, args: &[&Value], _ctx: &ExecutionContext) -> Value {
        match (timestamp(arg(args, 0)), offset_seconds(arg(args, 1))) {
            (Some(ts), Some(expected)) => Value::Bool(ts.offset().local_minus_utc() == expected),
            _ => Value::Bool(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::OperatorKind;
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    // test_support::ctx() is 2024-06-15T12:00:00Z

    #[test]
    fn test_before_and_after() {
        assert_eq!(
            run(OperatorKind::Before, &[s("2024-01-01"), s("2024-01-02T00:00:00Z")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::After, &[s("2024-01-01"), s("2024-01-02")]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::After, &[s("2024-01-01T10:00:00+02:00"), s("2024-01-01T07:59:59Z")]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_unparsable_timestamps_are_false() {
        assert_eq!(run(OperatorKind::Before, &[s("soon"), s("2024-01-02")]), Value::Bool(false));
        assert_eq!(run(OperatorKind::Before, &[n(1.0), s("2024-01-02")]), Value::Bool(false));
    }

    #[test]
    fn test_same_year() {
        assert_eq!(
            run(OperatorKind::SameYear, &[s("2024-01-01"), s("2024-12-31T23:59:59Z")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::SameYear, &[s("2023-12-31"), s("2024-01-01")]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_age_greater_than() {
        assert_eq!(
            run(OperatorKind::AgeGreaterThan, &[s("2024-06-01"), n(10.0), s("DAYS")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::AgeGreaterThan, &[s("2024-06-10"), n(10.0), s("DAYS")]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::AgeGreaterThan, &[s("2000-06-15"), n(18.0), s("years")]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_within_last_is_inclusive() {
        assert_eq!(
            run(OperatorKind::WithinLast, &[s("2024-06-15T10:00:00Z"), n(2.0), s("HOURS")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::WithinLast, &[s("2024-06-15T09:59:59Z"), n(2.0), s("HOURS")]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::WithinLast, &[s("2024-06-15T12:00:01Z"), n(2.0), s("HOURS")]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_within_next() {
        assert_eq!(
            run(OperatorKind::WithinNext, &[s("2024-06-20"), n(1.0), s("WEEKS")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::WithinNext, &[s("2024-06-23"), n(1.0), s("WEEKS")]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::WithinNext, &[s("2024-06-15T12:00:00Z"), n(0.0), s("DAYS")]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_invalid_unit_or_amount_is_false() {
        assert_eq!(
            run(OperatorKind::WithinLast, &[s("2024-06-15"), n(1.0), s("FORTNIGHTS")]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::WithinLast, &[s("2024-06-15"), n(-1.0), s("DAYS")]),
            Value::Bool(false)
        );
        assert_eq!(
            run(OperatorKind::WithinLast, &[s("2024-06-15"), n(1.5), s("DAYS")]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_timezone_offset_equals() {
        let ts = s("2024-03-10T12:30:00+05:30");
        assert_eq!(
            run(OperatorKind::TimezoneOffsetEquals, &[ts.clone(), s("+05:30")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::TimezoneOffsetEquals, &[ts.clone(), n(330.0)]),
            Value::Bool(true)
        );
        assert_eq!(run(OperatorKind::TimezoneOffsetEquals, &[ts, s("Z")]), Value::Bool(false));
        assert_eq!(
            run(OperatorKind::TimezoneOffsetEquals, &[s("2024-03-10"), s("Z")]),
            Value::Bool(true)
        );
        assert_eq!(
            run(OperatorKind::TimezoneOffsetEquals, &[s("2024-03-10"), s("UTC")]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_offset_parsing() {
        assert_eq!(offset_seconds(&s("-0800")), Some(-8 * 3600));
        assert_eq!(offset_seconds(&s("+02")), Some(7200));
        assert_eq!(offset_seconds(&s("+25:00")), None);
    }

    #[test]
    fn test_constant_unit_is_validated() {
        let ts = provider(1);
        let amount = constant(2, n(3.0));
        let bad = constant(3, s("FORTNIGHTS"));
        let good = constant(4, s("days"));

        assert!(WithinLast.validate(&[&ts, &amount, &bad]).is_err());
        assert!(WithinLast.validate(&[&ts, &amount, &good]).is_ok());
        assert!(WithinLast.validate(&[&ts, &amount]).is_err());
    }
}
