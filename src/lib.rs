// SPDX-License-Identifier: MIT

//! datasync-rs: a logic graph engine for data synchronization
//!
//! User-authored conditions are stored as DAGs of typed nodes. This crate
//! loads them, compiles static schema constants, validates their structure and
//! evaluates them against live data, with TTL-bounded snapshot stores for
//! change detection and failure replay.

pub mod datasync;
pub mod engine;
