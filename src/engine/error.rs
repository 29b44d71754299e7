// SPDX-License-Identifier: MIT

//! Typed error handling for datasync-rs
//!
//! Author-time defects found by the validator are *returned* as
//! `ValidationError` lists and never show up here. This module holds the
//! errors that are raised: graph construction, schema compilation and
//! evaluation failures.

use crate::datasync::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Top-level error type for datasync-rs
#[derive(Debug, Error)]
pub enum DataSyncError {
    /// A definition could not be turned into a graph
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// A static schema constant is malformed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Evaluation failed at runtime
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Configuration errors (invalid env values, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The definition store has no graph under this name
    #[error("Graph definition '{0}' not found")]
    DefinitionNotFound(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DataSyncError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a definition-not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::DefinitionNotFound(name.into())
    }
}

/// Failures while resolving a definition into a node arena
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two nodes share an id
    #[error("Duplicate node id {0}")]
    DuplicateNodeId(NodeId),

    /// An edge references a node that is not part of the graph
    #[error("Node {node_id} references unknown parent node {parent_id}")]
    UnknownEdgeTarget { node_id: NodeId, parent_id: NodeId },

    /// Two input edges of one node claim the same position
    #[error("Node {node_id} has more than one input at order index {order_index}")]
    DuplicateEdgeOrder { node_id: NodeId, order_index: u32 },
}

/// A schema-bearing constant could not be compiled
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to compile schema for node {node_id} ({}): {message}", label(.node_name))]
pub struct CompileError {
    /// The logic node whose schema input failed
    pub node_id: NodeId,
    pub node_name: Option<String>,
    pub message: String,
}

fn label(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("unnamed")
}

/// Category of an evaluation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    ExecutionFailed,
    TypeMismatch,
    DataNotFound,
    InvalidInput,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ExecutionFailed => "EXECUTION_FAILED",
            ErrorCategory::TypeMismatch => "TYPE_MISMATCH",
            ErrorCategory::DataNotFound => "DATA_NOT_FOUND",
            ErrorCategory::InvalidInput => "INVALID_INPUT",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type surfaced by the evaluator
#[derive(Debug, Error)]
#[error("[{category}] {title}: {message}")]
pub struct EvaluationError {
    pub category: ErrorCategory,
    /// Short, UI-friendly summary
    pub title: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EvaluationError {
    pub fn new(
        category: ErrorCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the originating error
    pub fn with_cause(
        mut self,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn execution_failed(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ExecutionFailed, title, message)
    }

    pub fn type_mismatch(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TypeMismatch, title, message)
    }

    pub fn data_not_found(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::DataNotFound, title, message)
    }

    pub fn invalid_input(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidInput, title, message)
    }

    /// Serializable copy of this error, used by failure snapshots
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            category: self.category,
            title: self.title.clone(),
            message: self.message.clone(),
            cause: self.cause.as_ref().map(|c| c.to_string()),
        }
    }
}

/// Owned, serializable view of an `EvaluationError`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub category: ErrorCategory,
    pub title: String,
    pub message: String,
    pub cause: Option<String>,
}
