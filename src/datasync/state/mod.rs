// SPDX-License-Identifier: MIT

//! Snapshot state shared across evaluations
//!
//! This module provides:
//! - `SnapshotStore` - keyed, TTL-bounded snapshot history
//! - `Snapshot` / `FailureRecord` - what the stores hold
//! - `change` - provider change detection on top of a store

pub mod change;
mod snapshot;
mod store;

pub use snapshot::{FailureRecord, Snapshot};
pub use store::SnapshotStore;
