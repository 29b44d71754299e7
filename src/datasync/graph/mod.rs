// SPDX-License-Identifier: MIT

//! Logic graph: definitions, node arena and the build/evaluate pipeline
//!
//! This module provides:
//! - `types` - stored definition wire format
//! - `Graph` / `Node` - the resolved node arena
//! - `sorter` - topological order and cycle detection
//! - `validator` - exhaustive structural checks
//! - `compiler` - schema constant hydration
//! - `Evaluator` - runs a graph against a data context
//! - `GraphBuilder` / `GraphStore` - loading and building definitions

mod builder;
pub mod compiler;
mod evaluator;
mod loader;
mod node;
pub mod sorter;
mod types;
pub mod validator;

pub use builder::{BuiltGraph, GraphBuilder};
pub use evaluator::Evaluator;
pub use loader::{DefinitionLoader, FileGraphStore, GraphStore, InMemoryGraphStore};
pub use node::{ChangeDetectionConfig, Graph, Node, NodeKind};
pub use sorter::SortResult;
pub use types::{
    ChangeDetectionMode, EdgeDefinition, GraphDefinition, NodeDefinition, NodeId,
    NodeKindDefinition,
};
pub use validator::{GraphStatus, ValidationError};
