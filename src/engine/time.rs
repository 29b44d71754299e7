// SPDX-License-Identifier: MIT

//! Timestamp parsing and calendar units for date-time predicates

use chrono::{DateTime, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use std::fmt;
use std::str::FromStr;

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (offset preserved), a naive date-time (taken as UTC) or a
/// bare date (midnight UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().fixed_offset());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().fixed_offset());
    }
    None
}

/// Fixed set of units accepted by relative date predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    /// Move `from` by `amount` units; months and years follow the calendar
    pub fn shift(&self, from: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
        let delta = match self {
            TimeUnit::Millis => TimeDelta::try_milliseconds(amount),
            TimeUnit::Seconds => TimeDelta::try_seconds(amount),
            TimeUnit::Minutes => TimeDelta::try_minutes(amount),
            TimeUnit::Hours => TimeDelta::try_hours(amount),
            TimeUnit::Days => TimeDelta::try_days(amount),
            TimeUnit::Weeks => TimeDelta::try_weeks(amount),
            TimeUnit::Months => return shift_months(from, amount),
            TimeUnit::Years => return shift_months(from, amount.checked_mul(12)?),
        }?;
        from.checked_add_signed(delta)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Millis => "MILLIS",
            TimeUnit::Seconds => "SECONDS",
            TimeUnit::Minutes => "MINUTES",
            TimeUnit::Hours => "HOURS",
            TimeUnit::Days => "DAYS",
            TimeUnit::Weeks => "WEEKS",
            TimeUnit::Months => "MONTHS",
            TimeUnit::Years => "YEARS",
        }
    }
}

fn shift_months(from: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        from.checked_add_months(count)
    } else {
        from.checked_sub_months(count)
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MILLIS" | "MILLISECONDS" => Ok(TimeUnit::Millis),
            "SECONDS" => Ok(TimeUnit::Seconds),
            "MINUTES" => Ok(TimeUnit::Minutes),
            "HOURS" => Ok(TimeUnit::Hours),
            "DAYS" => Ok(TimeUnit::Days),
            "WEEKS" => Ok(TimeUnit::Weeks),
            "MONTHS" => Ok(TimeUnit::Months),
            "YEARS" => Ok(TimeUnit::Years),
            other => Err(format!("Unknown time unit: {}", other)),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
