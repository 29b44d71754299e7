// SPDX-License-Identifier: MIT

//! Runtime node model and the graph arena
//!
//! Nodes live in a dense `Vec` owned by the `Graph`. Edges are resolved once,
//! at construction, from `(parentId, orderIndex)` pairs into arena indices, so
//! the sorter and evaluator only ever walk indices.

use super::types::{
    ChangeDetectionMode, EdgeDefinition, GraphDefinition, NodeDefinition, NodeId,
    NodeKindDefinition,
};
use crate::datasync::operators::OperatorKind;
use crate::engine::error::GraphError;
use crate::engine::path::JsonPath;
use crate::engine::value::Value;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// Change-detection settings carried by the config node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeDetectionConfig {
    pub mode: Option<ChangeDetectionMode>,
    pub active: bool,
    pub time_window_enabled: bool,
    pub time_window_millis: u64,
}

/// Variant payload of a runtime node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Provider {
        source_ref: String,
        path: String,
        /// `None` when `path` does not parse; the validator reports it
        selector: Option<JsonPath>,
    },
    Constant {
        value: Value,
    },
    Logic {
        operator: Option<OperatorKind>,
    },
    Config(ChangeDetectionConfig),
    Final,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Provider { .. } => "provider",
            NodeKind::Constant { .. } => "constant",
            NodeKind::Logic { .. } => "logic",
            NodeKind::Config(_) => "config",
            NodeKind::Final => "final",
        }
    }

    /// Whether the node yields a value other nodes can consume
    pub fn produces_value(&self) -> bool {
        !matches!(self, NodeKind::Config(_) | NodeKind::Final)
    }
}

/// One computation unit of a graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    name: Option<String>,
    kind: NodeKind,
    /// Arena indices of input nodes, in order
    inputs: Vec<usize>,
    /// Result of the last evaluation pass
    result: Option<Value>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: Option<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name,
            kind,
            inputs: Vec::new(),
            result: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant { .. })
    }

    /// The literal of a constant node
    pub fn constant_value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Constant { value } => Some(value),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<OperatorKind> {
        match self.kind {
            NodeKind::Logic { operator } => operator,
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} node {} ('{}')", self.kind.label(), self.id, name),
            None => write!(f, "{} node {}", self.kind.label(), self.id),
        }
    }
}

/// A loaded graph: node arena plus resolved edges.
///
/// Immutable after construction except for per-node results. Evaluation takes
/// `&mut Graph`, so one instance is evaluated by at most one caller at a time;
/// share across threads behind a lock or give each worker its own instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    name: String,
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    /// For each node, the nodes that list it as input (one entry per edge)
    dependents: Vec<Vec<usize>>,
}

impl Graph {
    /// Resolve a definition into an arena
    pub fn from_definition(def: &GraphDefinition) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(def.nodes.len());
        for (i, node_def) in def.nodes.iter().enumerate() {
            if index.insert(node_def.id, i).is_some() {
                return Err(GraphError::DuplicateNodeId(node_def.id));
            }
        }

        let mut nodes = Vec::with_capacity(def.nodes.len());
        let mut dependents = vec![Vec::new(); def.nodes.len()];

        for (i, node_def) in def.nodes.iter().enumerate() {
            let mut node = Node::new(node_def.id, node_def.name.clone(), node_kind(node_def));
            node.inputs = resolve_edges(node_def, &index)?;
            for &parent in &node.inputs {
                dependents[parent].push(i);
            }
            nodes.push(node);
        }

        Ok(Self {
            name: def.name.clone(),
            nodes,
            index,
            dependents,
        })
    }

    /// Write the graph back out; compiled schemas become their JSON text again
    pub fn to_definition(&self) -> GraphDefinition {
        let nodes = self
            .nodes
            .iter()
            .map(|node| NodeDefinition {
                id: node.id,
                name: node.name.clone(),
                kind: definition_kind(&node.kind),
                edges: node
                    .inputs
                    .iter()
                    .enumerate()
                    .map(|(order, &parent)| EdgeDefinition {
                        parent_id: self.nodes[parent].id,
                        order_index: order as u32,
                    })
                    .collect(),
            })
            .collect();

        GraphDefinition {
            name: self.name.clone(),
            nodes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node at an arena index
    pub fn at(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    pub fn dependents(&self, index: usize) -> &[usize] {
        &self.dependents[index]
    }

    /// Input nodes of the node at `index`, in order
    pub fn input_nodes(&self, index: usize) -> Vec<&Node> {
        self.nodes[index]
            .inputs
            .iter()
            .map(|&i| &self.nodes[i])
            .collect()
    }

    /// Cached result of a node from the last evaluation
    pub fn result(&self, id: NodeId) -> Option<&Value> {
        self.node(id).and_then(Node::result)
    }

    /// Settings of the first config node, if any
    pub fn config(&self) -> Option<&ChangeDetectionConfig> {
        self.nodes.iter().find_map(|node| match &node.kind {
            NodeKind::Config(config) => Some(config),
            _ => None,
        })
    }

    /// Arena index of the first final node, if any
    pub fn final_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| matches!(node.kind, NodeKind::Final))
    }

    pub(crate) fn reset_results(&mut self) {
        for node in &mut self.nodes {
            node.result = None;
        }
    }

    pub(crate) fn set_result(&mut self, index: usize, value: Option<Value>) {
        self.nodes[index].result = value;
    }

    /// Swap the literal of a constant node
    pub(crate) fn replace_constant(&mut self, index: usize, value: Value) {
        if let NodeKind::Constant { value: slot } = &mut self.nodes[index].kind {
            *slot = value;
        }
    }
}

fn node_kind(def: &NodeDefinition) -> NodeKind {
    match &def.kind {
        NodeKindDefinition::Provider { source_ref, path } => NodeKind::Provider {
            source_ref: source_ref.clone(),
            path: path.clone(),
            selector: JsonPath::parse(path).ok(),
        },
        NodeKindDefinition::Constant { value } => NodeKind::Constant {
            value: Value::from(value),
        },
        NodeKindDefinition::Logic { operator } => NodeKind::Logic {
            operator: *operator,
        },
        NodeKindDefinition::Config {
            change_detection_mode,
            change_detection_active,
            time_window_enabled,
            time_window_millis,
        } => NodeKind::Config(ChangeDetectionConfig {
            mode: *change_detection_mode,
            active: *change_detection_active,
            time_window_enabled: *time_window_enabled,
            time_window_millis: *time_window_millis,
        }),
        NodeKindDefinition::Final => NodeKind::Final,
    }
}

fn definition_kind(kind: &NodeKind) -> NodeKindDefinition {
    match kind {
        NodeKind::Provider {
            source_ref, path, ..
        } => NodeKindDefinition::Provider {
            source_ref: source_ref.clone(),
            path: path.clone(),
        },
        NodeKind::Constant { value } => NodeKindDefinition::Constant {
            value: match value {
                Value::Schema(schema) => JsonValue::String(schema.source().to_string()),
                other => other.to_json(),
            },
        },
        NodeKind::Logic { operator } => NodeKindDefinition::Logic {
            operator: *operator,
        },
        NodeKind::Config(config) => NodeKindDefinition::Config {
            change_detection_mode: config.mode,
            change_detection_active: config.active,
            time_window_enabled: config.time_window_enabled,
            time_window_millis: config.time_window_millis,
        },
        NodeKind::Final => NodeKindDefinition::Final,
    }
}

fn resolve_edges(
    def: &NodeDefinition,
    index: &HashMap<NodeId, usize>,
) -> Result<Vec<usize>, GraphError> {
    let mut edges: Vec<&EdgeDefinition> = def.edges.iter().collect();
    edges.sort_by_key(|edge| edge.order_index);

    for pair in edges.windows(2) {
        if pair[0].order_index == pair[1].order_index {
            return Err(GraphError::DuplicateEdgeOrder {
                node_id: def.id,
                order_index: pair[0].order_index,
            });
        }
    }

    edges
        .into_iter()
        .map(|edge| {
            index
                .get(&edge.parent_id)
                .copied()
                .ok_or(GraphError::UnknownEdgeTarget {
                    node_id: def.id,
                    parent_id: edge.parent_id,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::CompiledSchema;
    use serde_json::json;

    fn sample() -> GraphDefinition {
        GraphDefinition::new(
            "sample",
            vec![
                NodeDefinition::provider(10, "sensor", "$.temp"),
                NodeDefinition::constant(20, json!(30)),
                NodeDefinition::logic(30, OperatorKind::GreaterThan, &[10, 20]),
                NodeDefinition::config(40),
                NodeDefinition::final_node(50, 30),
            ],
        )
    }

    #[test]
    fn test_from_definition_resolves_edges() {
        let graph = Graph::from_definition(&sample()).unwrap();
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.at(2).inputs(), &[0, 1]);
        assert_eq!(graph.dependents(0), &[2]);
        assert_eq!(graph.dependents(2), &[4]);
        assert_eq!(graph.index_of(40), Some(3));
        assert_eq!(graph.final_index(), Some(4));
        assert!(graph.config().is_some());
    }

    #[test]
    fn test_edges_follow_order_index() {
        let mut def = sample();
        def.nodes[2].edges = vec![
            EdgeDefinition {
                parent_id: 20,
                order_index: 5,
            },
            EdgeDefinition {
                parent_id: 10,
                order_index: 1,
            },
        ];
        let graph = Graph::from_definition(&def).unwrap();
        assert_eq!(graph.at(2).inputs(), &[0, 1]);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut def = sample();
        def.nodes.push(NodeDefinition::constant(10, json!(1)));
        assert_eq!(
            Graph::from_definition(&def),
            Err(GraphError::DuplicateNodeId(10))
        );
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut def = sample();
        def.nodes[4] = NodeDefinition::final_node(50, 99);
        assert_eq!(
            Graph::from_definition(&def),
            Err(GraphError::UnknownEdgeTarget {
                node_id: 50,
                parent_id: 99
            })
        );
    }

    #[test]
    fn test_duplicate_order_index_is_rejected() {
        let mut def = sample();
        def.nodes[2].edges[1].order_index = 0;
        assert!(matches!(
            Graph::from_definition(&def),
            Err(GraphError::DuplicateEdgeOrder { node_id: 30, .. })
        ));
    }

    #[test]
    fn test_round_trip_definition() {
        let def = sample();
        let graph = Graph::from_definition(&def).unwrap();
        assert_eq!(graph.to_definition(), def);
    }

    #[test]
    fn test_compiled_schema_writes_back_as_text() {
        let def = GraphDefinition::new(
            "schema",
            vec![NodeDefinition::constant(1, json!(r#"{"type":"string"}"#))],
        );
        let mut graph = Graph::from_definition(&def).unwrap();
        let schema = CompiledSchema::from_json_str(r#"{"type":"string"}"#).unwrap();
        graph.replace_constant(0, Value::Schema(schema));

        let back = graph.to_definition();
        assert_eq!(
            back.nodes[0].kind,
            NodeKindDefinition::Constant {
                value: json!(r#"{"type":"string"}"#)
            }
        );
    }

    #[test]
    fn test_invalid_provider_path_has_no_selector() {
        let def = GraphDefinition::new("p", vec![NodeDefinition::provider(1, "s", "$.")]);
        let graph = Graph::from_definition(&def).unwrap();
        assert!(matches!(
            graph.at(0).kind(),
            NodeKind::Provider { selector: None, .. }
        ));
    }

    #[test]
    fn test_node_display() {
        let def = GraphDefinition::new(
            "d",
            vec![NodeDefinition::constant(7, json!(1)).named("threshold")],
        );
        let graph = Graph::from_definition(&def).unwrap();
        assert_eq!(graph.at(0).to_string(), "constant node 7 ('threshold')");
    }
}
