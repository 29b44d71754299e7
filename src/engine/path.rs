// SPDX-License-Identifier: MIT

//! JSON-path-like selectors used by provider nodes
//!
//! Supported forms:
//! - `$` (the whole document)
//! - `$.a.b` or `a.b` (object keys, leading `$` optional)
//! - `$['key with spaces']` (quoted keys)
//! - `$.items[0]` (array index)
//! - `$.items[*].name` (wildcard; collects the rest of the path per element)

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A parsed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid path '{path}' at position {position}: {reason}")]
pub struct PathError {
    pub path: String,
    pub position: usize,
    pub reason: String,
}

impl JsonPath {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let raw = input.trim();
        let chars: Vec<char> = raw.chars().collect();
        let err = |position: usize, reason: &str| PathError {
            path: raw.to_string(),
            position,
            reason: reason.to_string(),
        };

        if chars.is_empty() {
            return Err(err(0, "path is empty"));
        }

        let mut segments = Vec::new();
        let mut i = 0;
        if chars[0] == '$' {
            i = 1;
        } else if chars[0] != '[' && chars[0] != '.' {
            // Bare leading key: `a.b`
            let (key, next) = read_key(&chars, 0);
            segments.push(Segment::Key(key));
            i = next;
        }

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    let (key, next) = read_key(&chars, i + 1);
                    if key.is_empty() {
                        return Err(err(i, "expected a key after '.'"));
                    }
                    segments.push(Segment::Key(key));
                    i = next;
                }
                '[' => {
                    let open = skip_spaces(&chars, i + 1);
                    let quote = chars.get(open).copied().filter(|&c| c == '\'' || c == '"');
                    if let Some(quote) = quote {
                        // The closing quote is found first; `]` may appear inside it
                        let end = chars[open + 1..]
                            .iter()
                            .position(|&c| c == quote)
                            .map(|offset| open + 1 + offset)
                            .ok_or_else(|| err(open, "unclosed quote"))?;
                        let close = skip_spaces(&chars, end + 1);
                        if chars.get(close) != Some(&']') {
                            return Err(err(close, "expected ']' after quoted key"));
                        }
                        segments.push(Segment::Key(chars[open + 1..end].iter().collect()));
                        i = close + 1;
                        continue;
                    }

                    let close = chars[i..]
                        .iter()
                        .position(|&c| c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| err(i, "unclosed '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    let inner = inner.trim();
                    let segment = if inner == "*" {
                        Segment::Wildcard
                    } else if let Ok(index) = inner.parse::<usize>() {
                        Segment::Index(index)
                    } else {
                        return Err(err(i, "expected an index, '*' or a quoted key"));
                    };
                    segments.push(segment);
                    i = close + 1;
                }
                _ => return Err(err(i, "expected '.' or '['")),
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Apply the selector; `None` when any step is missing
    pub fn select(&self, root: &Value) -> Option<Value> {
        select_from(root, &self.segments)
    }
}

fn read_key(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn skip_spaces(chars: &[char], mut at: usize) -> usize {
    while chars.get(at).is_some_and(|c| c.is_whitespace()) {
        at += 1;
    }
    at
}

fn select_from(value: &Value, segments: &[Segment]) -> Option<Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match first {
        Segment::Key(key) => select_from(value.as_object()?.get(key)?, rest),
        Segment::Index(index) => select_from(value.as_array()?.get(*index)?, rest),
        Segment::Wildcard => {
            let items: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Object(map) => map.values().collect(),
                _ => return None,
            };
            Some(Value::Array(
                items
                    .into_iter()
                    .filter_map(|item| select_from(item, rest))
                    .collect(),
            ))
        }
    }
}

impl FromStr for JsonPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
