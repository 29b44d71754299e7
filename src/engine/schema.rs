// SPDX-License-Identifier: MIT

//! Precompiled JSON Schema values

use jsonschema::JSONSchema;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// A JSON Schema compiled once and shared by every evaluation of a graph.
///
/// Keeps the source document around so the graph can be written back to its
/// definition and so two compiled schemas can be compared.
#[derive(Clone)]
pub struct CompiledSchema {
    source: JsonValue,
    compiled: Arc<JSONSchema>,
}

impl CompiledSchema {
    /// Compile a schema document
    pub fn compile(source: JsonValue) -> Result<Self, String> {
        let compiled = JSONSchema::compile(&source).map_err(|e| e.to_string())?;
        Ok(Self {
            source,
            compiled: Arc::new(compiled),
        })
    }

    /// Parse and compile a schema given as a JSON string
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let source: JsonValue =
            serde_json::from_str(raw).map_err(|e| format!("schema is not valid JSON: {}", e))?;
        if !source.is_object() && !source.is_boolean() {
            return Err("schema must be a JSON object or boolean".to_string());
        }
        Self::compile(source)
    }

    /// Check an instance against the schema
    pub fn is_valid(&self, instance: &JsonValue) -> bool {
        self.compiled.is_valid(instance)
    }

    pub fn source(&self) -> &JsonValue {
        &self.source
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for CompiledSchema {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_and_validate() {
        let schema = CompiledSchema::from_json_str(
            r#"{"type": "object", "required": ["temp"], "properties": {"temp": {"type": "number"}}}"#,
        )
        .unwrap();

        assert!(schema.is_valid(&json!({"temp": 21.5})));
        assert!(!schema.is_valid(&json!({"temp": "hot"})));
        assert!(!schema.is_valid(&json!({})));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = CompiledSchema::from_json_str("{not json").unwrap_err();
        assert!(err.contains("not valid JSON"));
    }

    #[test]
    fn test_non_object_schema_is_rejected() {
        assert!(CompiledSchema::from_json_str("42").is_err());
    }

    #[test]
    fn test_invalid_schema_keyword_is_rejected() {
        assert!(CompiledSchema::from_json_str(r#"{"type": 12}"#).is_err());
    }

    #[test]
    fn test_equality_follows_source() {
        let a = CompiledSchema::compile(json!({"type": "string"})).unwrap();
        let b = CompiledSchema::compile(json!({"type": "string"})).unwrap();
        let c = CompiledSchema::compile(json!({"type": "number"})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
