// SPDX-License-Identifier: MIT

//! Per-evaluation input data

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Parsed source payloads keyed by source reference
///
/// Provider nodes resolve their `path` against the entry named by their
/// `sourceRef`. Serialises as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataContext {
    sources: BTreeMap<String, JsonValue>,
}

impl DataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, source_ref: &str, data: JsonValue) -> Self {
        self.insert(source_ref, data);
        self
    }

    pub fn insert(&mut self, source_ref: &str, data: JsonValue) {
        self.sources.insert(source_ref.to_string(), data);
    }

    pub fn get(&self, source_ref: &str) -> Option<&JsonValue> {
        self.sources.get(source_ref)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Build from a JSON object; any other JSON value is rejected
    pub fn from_json(value: JsonValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.sources
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
