// SPDX-License-Identifier: MIT

//! Graph builder - turns stored definitions into evaluable graphs
//!
//! Construction runs resolve, compile, validate in that order. Resolution and
//! compilation failures abort the build; validation problems are returned with
//! the graph, which then stays in `DRAFT`.

use super::compiler;
use super::loader::GraphStore;
use super::node::Graph;
use super::types::GraphDefinition;
use super::validator::{self, GraphStatus, ValidationError};
use crate::engine::error::DataSyncError;
use std::sync::Arc;

/// A resolved, compiled and validated graph
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub graph: Graph,
    pub errors: Vec<ValidationError>,
    pub status: GraphStatus,
}

impl BuiltGraph {
    /// Only finalized graphs should be evaluated
    pub fn is_executable(&self) -> bool {
        self.status == GraphStatus::Finalized
    }
}

/// Builds graphs from a definition store
pub struct GraphBuilder {
    store: Arc<dyn GraphStore>,
}

impl GraphBuilder {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Load `name` from the store and build it
    pub fn build(&self, name: &str) -> Result<BuiltGraph, DataSyncError> {
        let def = self.store.load(name)?;
        Self::build_from_def(&def)
    }

    /// Build a graph from an already parsed definition
    pub fn build_from_def(def: &GraphDefinition) -> Result<BuiltGraph, DataSyncError> {
        let mut graph = Graph::from_definition(def)?;
        compiler::compile(&mut graph)?;

        let errors = validator::validate(&graph);
        let status = GraphStatus::from_errors(&errors);

        log::info!(
            "Built graph '{}' with {} nodes ({:?}, {} validation error(s))",
            graph.name(),
            graph.len(),
            status,
            errors.len()
        );
        for error in &errors {
            log::warn!("Graph '{}': [{}] {}", graph.name(), error.error_code(), error);
        }

        Ok(BuiltGraph {
            graph,
            errors,
            status,
        })
    }

    /// Persist a graph's definition back to the store under its name
    pub fn save(&self, graph: &Graph) -> Result<(), DataSyncError> {
        self.store.save(graph.name(), &graph.to_definition())
    }
}
