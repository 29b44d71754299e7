// SPDX-License-Identifier: MIT

//! Change detection across evaluations
//!
//! After a graph is evaluated, the values of its provider nodes are compared
//! with earlier snapshots stored under the graph name, then recorded as the
//! new latest snapshot.

use super::snapshot::Snapshot;
use super::store::SnapshotStore;
use crate::datasync::graph::{ChangeDetectionConfig, ChangeDetectionMode, Graph, NodeKind};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value as JsonValue};

/// Cached provider results keyed by node id
pub fn provider_values(graph: &Graph) -> Map<String, JsonValue> {
    graph
        .nodes()
        .iter()
        .filter(|node| matches!(node.kind(), NodeKind::Provider { .. }))
        .map(|node| {
            let value = node.result().map(|v| v.to_json()).unwrap_or(JsonValue::Null);
            (node.id().to_string(), value)
        })
        .collect()
}

/// Whether `current` counts as changed against `history` (newest first)
///
/// Without a time window only the newest snapshot is the baseline. With one,
/// every snapshot inside the window is, and a provider has changed when its
/// value matches none of them.
pub fn has_changed(
    config: &ChangeDetectionConfig,
    current: &Map<String, JsonValue>,
    history: &[Snapshot<JsonValue>],
    now: DateTime<Utc>,
) -> bool {
    let baselines: Vec<&Snapshot<JsonValue>> = if config.time_window_enabled {
        let window = i64::try_from(config.time_window_millis)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);
        match now.checked_sub_signed(window) {
            Some(start) => history.iter().filter(|s| s.created_at >= start).collect(),
            None => history.iter().collect(),
        }
    } else {
        history.iter().take(1).collect()
    };

    if current.is_empty() || baselines.is_empty() {
        return true;
    }

    let mut changes = current.iter().map(|(id, value)| {
        baselines
            .iter()
            .all(|baseline| baseline.value.get(id) != Some(value))
    });

    match config.mode.unwrap_or_default() {
        ChangeDetectionMode::And => changes.all(|changed| changed),
        ChangeDetectionMode::Or => changes.any(|changed| changed),
    }
}

/// Compare the graph's provider values with the stored history, then record them
pub fn detect_and_record(
    store: &SnapshotStore<JsonValue>,
    graph: &Graph,
    config: &ChangeDetectionConfig,
    now: DateTime<Utc>,
) -> bool {
    let current = provider_values(graph);
    let history = store.recent_at(graph.name(), store.history_limit(), now);
    let changed = has_changed(config, &current, &history, now);

    log::debug!(
        "Change detection for '{}': {} provider(s), {} snapshot(s), changed={}",
        graph.name(),
        current.len(),
        history.len(),
        changed
    );

    store.put_at(graph.name(), Some(JsonValue::Object(current)), now);
    changed
}
