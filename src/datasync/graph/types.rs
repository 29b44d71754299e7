// SPDX-License-Identifier: MIT

//! Graph definition wire types
//!
//! This is the stored form of a graph: ordered node records with a `type`
//! discriminator, variant-specific fields and `(parentId, orderIndex)` edges.
//! Fields a UI may attach (positions, offsets) are ignored on load.

use crate::datasync::operators::OperatorKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Node identity, unique within one graph
pub type NodeId = u32;

/// A stored graph definition
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Default, PartialEq)]
pub struct GraphDefinition {
    /// Unique name of the graph (also the snapshot key)
    pub name: String,
    /// Nodes in definition order
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

/// A node record
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKindDefinition,
    /// Input edges; position is given by `orderIndex`, not list order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<EdgeDefinition>,
}

/// Variant-specific node fields.
///
/// Required fields are defaulted here so that a missing value reaches the
/// validator as a reportable problem instead of failing the whole load.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKindDefinition {
    /// Reads `path` from the data context entry named by `sourceRef`
    #[serde(rename_all = "camelCase")]
    Provider {
        #[serde(default)]
        source_ref: String,
        #[serde(default)]
        path: String,
    },
    /// A literal value
    Constant {
        #[serde(default)]
        value: JsonValue,
    },
    /// Applies an operator to its ordered inputs
    Logic {
        #[serde(default)]
        operator: Option<OperatorKind>,
    },
    /// Change-detection settings, one per graph
    #[serde(rename_all = "camelCase")]
    Config {
        #[serde(default)]
        change_detection_mode: Option<ChangeDetectionMode>,
        #[serde(default)]
        change_detection_active: bool,
        #[serde(default)]
        time_window_enabled: bool,
        #[serde(default)]
        time_window_millis: u64,
    },
    /// Terminal sink, one per graph
    Final,
}

/// An input edge
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDefinition {
    pub parent_id: NodeId,
    #[serde(default)]
    pub order_index: u32,
}

/// How per-provider changes combine
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeDetectionMode {
    /// Every provider value must have changed
    And,
    /// At least one provider value must have changed
    #[default]
    Or,
}

impl NodeDefinition {
    pub fn new(id: NodeId, kind: NodeKindDefinition) -> Self {
        Self {
            id,
            name: None,
            kind,
            edges: Vec::new(),
        }
    }

    pub fn provider(id: NodeId, source_ref: &str, path: &str) -> Self {
        Self::new(
            id,
            NodeKindDefinition::Provider {
                source_ref: source_ref.to_string(),
                path: path.to_string(),
            },
        )
    }

    pub fn constant(id: NodeId, value: JsonValue) -> Self {
        Self::new(id, NodeKindDefinition::Constant { value })
    }

    /// A logic node whose inputs are `parents`, in order
    pub fn logic(id: NodeId, operator: OperatorKind, parents: &[NodeId]) -> Self {
        Self::new(
            id,
            NodeKindDefinition::Logic {
                operator: Some(operator),
            },
        )
        .with_parents(parents)
    }

    /// A config node with change detection switched off
    pub fn config(id: NodeId) -> Self {
        Self::new(
            id,
            NodeKindDefinition::Config {
                change_detection_mode: None,
                change_detection_active: false,
                time_window_enabled: false,
                time_window_millis: 0,
            },
        )
    }

    pub fn final_node(id: NodeId, parent: NodeId) -> Self {
        Self::new(id, NodeKindDefinition::Final).with_parents(&[parent])
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Replace the edges with `parents`, order index following slice order
    pub fn with_parents(mut self, parents: &[NodeId]) -> Self {
        self.edges = parents
            .iter()
            .enumerate()
            .map(|(i, &parent_id)| EdgeDefinition {
                parent_id,
                order_index: i as u32,
            })
            .collect();
        self
    }
}

impl GraphDefinition {
    pub fn new(name: &str, nodes: Vec<NodeDefinition>) -> Self {
        Self {
            name: name.to_string(),
            nodes,
        }
    }
}
