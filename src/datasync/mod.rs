// SPDX-License-Identifier: MIT

//! The logic graph core
//!
//! A definition is loaded, resolved into a `Graph`, compiled, validated and
//! then evaluated repeatedly against fresh `DataContext`s. Snapshot stores
//! carry state between evaluations for change detection and failure replay.

pub mod config;
pub mod context;
pub mod graph;
pub mod operators;
pub mod state;

pub use config::EngineConfig;
pub use context::DataContext;
pub use graph::{
    BuiltGraph, Evaluator, GraphBuilder, GraphDefinition, GraphStatus, GraphStore,
    ValidationError,
};
pub use state::{FailureRecord, Snapshot, SnapshotStore};
