// SPDX-License-Identifier: MIT

//! Exhaustive structural validation
//!
//! The validator never fails fast: every problem in the graph is collected so
//! an author sees all of them at once. An empty list promotes a graph to
//! `FINALIZED`; anything else leaves it in `DRAFT`.

use super::node::{Graph, Node, NodeKind};
use super::sorter;
use super::types::NodeId;
use crate::datasync::operators::SCHEMA_INPUT_POSITION;
use crate::engine::path::JsonPath;
use crate::engine::value::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One structural problem, in the `errorCode`-tagged wire format
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "errorCode")]
pub enum ValidationError {
    #[error("Node {node_id}: {message}")]
    #[serde(rename = "OPERATOR_CONFIG_ERROR", rename_all = "camelCase")]
    OperatorConfiguration {
        node_id: NodeId,
        node_name: Option<String>,
        message: String,
    },

    #[error("{message}")]
    #[serde(rename = "CYCLE_DETECTED", rename_all = "camelCase")]
    Cycle {
        node_ids_in_cycle: Vec<NodeId>,
        message: String,
    },

    #[error("{message}")]
    #[serde(rename = "FINAL_NODE_ERROR")]
    FinalNode { message: String },

    #[error("Node {node_id}: {message}")]
    #[serde(rename = "NODE_CONFIG_ERROR", rename_all = "camelCase")]
    NodeConfiguration {
        node_id: NodeId,
        node_name: Option<String>,
        message: String,
    },

    #[error("{message}")]
    #[serde(rename = "CONFIG_NODE_ERROR")]
    ConfigNode { message: String },
}

impl ValidationError {
    /// Wire discriminator, e.g. `CYCLE_DETECTED`
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::OperatorConfiguration { .. } => "OPERATOR_CONFIG_ERROR",
            ValidationError::Cycle { .. } => "CYCLE_DETECTED",
            ValidationError::FinalNode { .. } => "FINAL_NODE_ERROR",
            ValidationError::NodeConfiguration { .. } => "NODE_CONFIG_ERROR",
            ValidationError::ConfigNode { .. } => "CONFIG_NODE_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ValidationError::OperatorConfiguration { message, .. }
            | ValidationError::Cycle { message, .. }
            | ValidationError::FinalNode { message }
            | ValidationError::NodeConfiguration { message, .. }
            | ValidationError::ConfigNode { message } => message,
        }
    }

    fn node_config(node: &Node, message: impl Into<String>) -> Self {
        ValidationError::NodeConfiguration {
            node_id: node.id(),
            node_name: node.name().map(str::to_string),
            message: message.into(),
        }
    }
}

/// Lifecycle status of a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GraphStatus {
    /// Has validation errors; kept for editing, not executable
    Draft,
    Finalized,
}

impl GraphStatus {
    pub fn from_errors(errors: &[ValidationError]) -> Self {
        if errors.is_empty() {
            GraphStatus::Finalized
        } else {
            GraphStatus::Draft
        }
    }
}

/// Run every check and return all problems found
pub fn validate(graph: &Graph) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    check_singletons(graph, &mut errors);

    for (index, node) in graph.nodes().iter().enumerate() {
        check_node(graph, index, node, &mut errors);
    }

    let sorted = sorter::sort(graph);
    if sorted.has_cycle {
        let members = sorter::cycle_members(graph, &sorted);
        let listed: Vec<String> = members.iter().map(|id| id.to_string()).collect();
        errors.push(ValidationError::Cycle {
            message: format!("Graph contains a cycle through nodes [{}]", listed.join(", ")),
            node_ids_in_cycle: members,
        });
    }

    if errors.is_empty() {
        log::debug!("Graph '{}' passed validation", graph.name());
    } else {
        log::debug!(
            "Graph '{}' has {} validation error(s)",
            graph.name(),
            errors.len()
        );
    }
    errors
}

fn check_singletons(graph: &Graph, errors: &mut Vec<ValidationError>) {
    let configs = graph
        .nodes()
        .iter()
        .filter(|n| matches!(n.kind(), NodeKind::Config(_)))
        .count();
    let finals = graph
        .nodes()
        .iter()
        .filter(|n| matches!(n.kind(), NodeKind::Final))
        .count();

    match configs {
        1 => {}
        0 => errors.push(ValidationError::ConfigNode {
            message: "Graph has no config node; exactly one is required".to_string(),
        }),
        n => errors.push(ValidationError::ConfigNode {
            message: format!("Graph has {} config nodes; exactly one is required", n),
        }),
    }

    match finals {
        1 => {}
        0 => errors.push(ValidationError::FinalNode {
            message: "Graph has no final node; exactly one is required".to_string(),
        }),
        n => errors.push(ValidationError::FinalNode {
            message: format!("Graph has {} final nodes; exactly one is required", n),
        }),
    }
}

fn check_node(graph: &Graph, index: usize, node: &Node, errors: &mut Vec<ValidationError>) {
    let inputs = graph.input_nodes(index);

    match node.kind() {
        NodeKind::Provider {
            source_ref, path, ..
        } => {
            if source_ref.trim().is_empty() {
                errors.push(ValidationError::node_config(
                    node,
                    "Provider node requires a sourceRef",
                ));
            }
            if let Err(e) = JsonPath::parse(path) {
                errors.push(ValidationError::node_config(node, e.to_string()));
            }
            check_no_inputs(node, &inputs, errors);
        }
        NodeKind::Constant { value } => {
            if matches!(value, Value::Null) {
                errors.push(ValidationError::node_config(node, "Constant node requires a value"));
            }
            check_no_inputs(node, &inputs, errors);
            check_schema_sharing(graph, index, node, errors);
        }
        NodeKind::Logic { operator } => {
            check_inputs_produce_values(node, &inputs, errors);
            match operator {
                None => errors.push(ValidationError::node_config(
                    node,
                    "Logic node requires an operator",
                )),
                Some(op) => {
                    if let Err(e) = op.operation().validate(&inputs) {
                        errors.push(ValidationError::OperatorConfiguration {
                            node_id: node.id(),
                            node_name: node.name().map(str::to_string),
                            message: format!("{}: {}", op, e),
                        });
                    }
                }
            }
        }
        NodeKind::Config(config) => {
            if config.active && config.mode.is_none() {
                errors.push(ValidationError::node_config(
                    node,
                    "Change detection is active but no changeDetectionMode is set",
                ));
            }
            check_no_inputs(node, &inputs, errors);
        }
        NodeKind::Final => {
            if inputs.len() != 1 {
                errors.push(ValidationError::FinalNode {
                    message: format!(
                        "Final node {} must have exactly one input, found {}",
                        node.id(),
                        inputs.len()
                    ),
                });
            }
            check_inputs_produce_values(node, &inputs, errors);
        }
    }
}

fn check_no_inputs(node: &Node, inputs: &[&Node], errors: &mut Vec<ValidationError>) {
    if !inputs.is_empty() {
        errors.push(ValidationError::node_config(
            node,
            format!("{} node must not have inputs", capitalize(node.kind().label())),
        ));
    }
}

/// A constant read as a schema is compiled in place, so nothing else may read it
fn check_schema_sharing(
    graph: &Graph,
    index: usize,
    node: &Node,
    errors: &mut Vec<ValidationError>,
) {
    let mut readers = graph.dependents(index).to_vec();
    readers.dedup();

    let mut schema_reads = 0;
    let mut other_readers = Vec::new();
    for reader in readers.into_iter().map(|d| graph.at(d)) {
        let takes_schema = reader.operator().is_some_and(|op| op.requires_schema());
        for (position, &input) in reader.inputs().iter().enumerate() {
            if input != index {
                continue;
            }
            if takes_schema && position == SCHEMA_INPUT_POSITION {
                schema_reads += 1;
            } else {
                other_readers.push(reader.id().to_string());
            }
        }
    }

    if schema_reads > 0 && !other_readers.is_empty() {
        other_readers.dedup();
        errors.push(ValidationError::node_config(
            node,
            format!(
                "schema constant is also read as a plain value by node(s) [{}]",
                other_readers.join(", ")
            ),
        ));
    }
}

fn check_inputs_produce_values(node: &Node, inputs: &[&Node], errors: &mut Vec<ValidationError>) {
    for input in inputs.iter().filter(|i| !i.kind().produces_value()) {
        errors.push(ValidationError::node_config(
            node,
            format!("input {} is a {} node and yields no value", input.id(), input.kind().label()),
        ));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
