// SPDX-License-Identifier: MIT

//! Schema hydration pass
//!
//! Runs once on a freshly resolved graph, before validation. Every
//! schema-dependent logic node gets the constant at its schema input position
//! turned from JSON text (or an inline object) into a `CompiledSchema`.
//! Constants that already hold a compiled schema are left untouched, so a
//! second run is a no-op.

use super::node::Graph;
use crate::datasync::operators::SCHEMA_INPUT_POSITION;
use crate::engine::error::CompileError;
use crate::engine::schema::CompiledSchema;
use crate::engine::value::Value;
use serde_json::Value as JsonValue;

/// Compile every schema constant in place; returns how many were compiled
pub fn compile(graph: &mut Graph) -> Result<usize, CompileError> {
    // (logic node, schema constant) arena index pairs
    let targets: Vec<(usize, usize)> = graph
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, node)| node.operator().is_some_and(|op| op.requires_schema()))
        .filter_map(|(index, node)| {
            node.inputs()
                .get(SCHEMA_INPUT_POSITION)
                .map(|&input| (index, input))
        })
        .collect();

    let mut compiled = 0;
    for (consumer, index) in targets {
        let schema = match graph.at(index).constant_value() {
            Some(Value::String(raw)) => CompiledSchema::from_json_str(raw),
            Some(Value::Object(map)) => CompiledSchema::compile(JsonValue::Object(map.clone())),
            // Already compiled, or not a constant at all (the validator reports that)
            _ => continue,
        };

        let schema = schema.map_err(|message| {
            let node = graph.at(consumer);
            CompileError {
                node_id: node.id(),
                node_name: node.name().map(str::to_string),
                message: format!("schema constant {}: {}", graph.at(index).id(), message),
            }
        })?;

        graph.replace_constant(index, Value::Schema(schema));
        compiled += 1;
    }

    if compiled > 0 {
        log::debug!("Compiled {} schema constant(s) in graph '{}'", compiled, graph.name());
    }
    Ok(compiled)
}
