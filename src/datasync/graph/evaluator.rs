// SPDX-License-Identifier: MIT

//! Graph evaluator
//!
//! Each call runs reset, sort, execute and extract over one graph. The
//! evaluator holds no per-call state and can be shared between threads; the
//! per-node result slots belong to the graph, so a given `Graph` must be
//! evaluated by at most one caller at a time (it is taken as `&mut`).

use super::node::{Graph, NodeKind};
use super::sorter::{self, SortResult};
use crate::datasync::context::DataContext;
use crate::datasync::operators::ExecutionContext;
use crate::datasync::state::{change, FailureRecord, Snapshot, SnapshotStore};
use crate::engine::error::EvaluationError;
use crate::engine::value::Value;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Stateless graph evaluator with optional snapshot stores
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    change_store: Option<Arc<SnapshotStore<JsonValue>>>,
    failure_store: Option<Arc<SnapshotStore<FailureRecord>>>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable change detection for graphs whose config node asks for it
    pub fn with_change_store(mut self, store: Arc<SnapshotStore<JsonValue>>) -> Self {
        self.change_store = Some(store);
        self
    }

    /// Record a failure snapshot for every failed evaluation
    pub fn with_failure_store(mut self, store: Arc<SnapshotStore<FailureRecord>>) -> Self {
        self.failure_store = Some(store);
        self
    }

    /// Evaluate `graph` against `data` at the current time
    pub fn evaluate(&self, graph: &mut Graph, data: &DataContext) -> Result<bool, EvaluationError> {
        self.evaluate_at(graph, data, Utc::now())
    }

    /// Evaluate with an explicit reference instant for date predicates and
    /// change detection
    pub fn evaluate_at(
        &self,
        graph: &mut Graph,
        data: &DataContext,
        now: DateTime<Utc>,
    ) -> Result<bool, EvaluationError> {
        log::info!("Evaluating graph '{}' ({} nodes)", graph.name(), graph.len());

        let outcome = self.run(graph, data, now);
        match &outcome {
            Ok(result) => log::info!("Graph '{}' evaluated to {}", graph.name(), result),
            Err(e) => {
                log::error!("Graph '{}' failed: {}", graph.name(), e);
                self.record_failure(graph, data, e, now);
            }
        }
        outcome
    }

    fn run(
        &self,
        graph: &mut Graph,
        data: &DataContext,
        now: DateTime<Utc>,
    ) -> Result<bool, EvaluationError> {
        if graph.is_empty() {
            return Err(EvaluationError::invalid_input(
                "Empty graph",
                format!("Graph '{}' has no nodes", graph.name()),
            ));
        }

        graph.reset_results();

        let sorted = sorter::sort(graph);
        if sorted.has_cycle {
            let members = sorter::cycle_members(graph, &sorted);
            return Err(EvaluationError::execution_failed(
                "Cycle detected",
                format!(
                    "Graph '{}' contains a cycle through nodes {:?}",
                    graph.name(),
                    members
                ),
            ));
        }

        let ctx = ExecutionContext::new(now);
        for &index in &sorted.order {
            let value = calculate(graph, index, data, &ctx)?;
            if let Some(value) = &value {
                log::debug!("{} = {:?}", graph.at(index), value);
            }
            graph.set_result(index, value);
        }

        let raw = extract(graph, &sorted)?;

        let changed = match (graph.config().cloned(), &self.change_store) {
            (Some(config), Some(store)) if config.active => {
                change::detect_and_record(store, graph, &config, now)
            }
            _ => true,
        };

        Ok(raw && changed)
    }

    /// Newest failure snapshot recorded for the graph named `graph`
    ///
    /// `None` without a failure store or once the record has expired as seen
    /// from `now`.
    pub fn last_failure(&self, graph: &str, now: DateTime<Utc>) -> Option<Snapshot<FailureRecord>> {
        self.failure_store.as_ref()?.latest_at(graph, now)
    }

    fn record_failure(
        &self,
        graph: &Graph,
        data: &DataContext,
        error: &EvaluationError,
        now: DateTime<Utc>,
    ) {
        if let Some(store) = &self.failure_store {
            let record = FailureRecord::capture(graph, data, error);
            if let Some(id) = store.put_at(graph.name(), Some(record), now) {
                log::error!("Recorded failure snapshot {} for graph '{}'", id, graph.name());
            }
        }
    }
}

/// Value of the node at `index`; `None` for nodes that yield nothing
fn calculate(
    graph: &Graph,
    index: usize,
    data: &DataContext,
    ctx: &ExecutionContext,
) -> Result<Option<Value>, EvaluationError> {
    let node = graph.at(index);
    match node.kind() {
        NodeKind::Provider {
            source_ref,
            selector,
            ..
        } => {
            let Some(selector) = selector else {
                return Ok(Some(Value::Null));
            };
            let Some(source) = data.get(source_ref) else {
                log::warn!("{} reads unknown source '{}'", node, source_ref);
                return Ok(Some(Value::Null));
            };
            Ok(Some(selector.select(source).map(Value::from).unwrap_or_default()))
        }
        NodeKind::Constant { value } => Ok(Some(value.clone())),
        NodeKind::Logic { operator: None } => Err(EvaluationError::execution_failed(
            "Missing operator",
            format!("{} has no operator", node),
        )),
        NodeKind::Logic {
            operator: Some(operator),
        } => {
            let null = Value::Null;
            let args: Vec<&Value> = node
                .inputs()
                .iter()
                .map(|&i| graph.at(i).result().unwrap_or(&null))
                .collect();

            let operation = operator.operation();
            panic::catch_unwind(AssertUnwindSafe(|| operation.execute(&args, ctx)))
                .map(Some)
                .map_err(|payload| {
                    EvaluationError::execution_failed(
                        "Operator failed",
                        format!("{} ({}) failed during execution", node, operator),
                    )
                    .with_cause(panic_message(payload.as_ref()))
                })
        }
        NodeKind::Config(_) => Ok(None),
        NodeKind::Final => Ok(node
            .inputs()
            .first()
            .and_then(|&i| graph.at(i).result())
            .cloned()),
    }
}

/// Boolean result of the final node, or of the last terminal node when the
/// graph has no final node
fn extract(graph: &Graph, sorted: &SortResult) -> Result<bool, EvaluationError> {
    let terminal = graph.final_index().or_else(|| {
        sorted
            .order
            .iter()
            .rev()
            .find(|&&i| graph.dependents(i).is_empty())
            .copied()
    });
    let Some(terminal) = terminal else {
        return Err(EvaluationError::data_not_found(
            "No result",
            format!("Graph '{}' has no terminal node", graph.name()),
        ));
    };

    let node = graph.at(terminal);
    match node.result() {
        Some(Value::Bool(result)) => Ok(*result),
        Some(Value::Null) => {
            log::warn!("{} produced null; treating as false", node);
            Ok(false)
        }
        Some(other) => {
            log::warn!("{} produced a {} instead of a boolean", node, other.kind());
            Err(EvaluationError::type_mismatch(
                "Non-boolean result",
                format!("{} produced a {} instead of a boolean", node, other.kind()),
            ))
        }
        None => Err(EvaluationError::data_not_found(
            "No result",
            format!("{} produced no result", node),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "operator panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasync::graph::compiler;
    use crate::datasync::graph::types::{
        ChangeDetectionMode, GraphDefinition, NodeDefinition, NodeKindDefinition,
    };
    use crate::datasync::operators::OperatorKind;
    use crate::engine::error::ErrorCategory;
    use chrono::TimeDelta;
    use serde_json::json;
    use std::time::Duration;

    fn build(nodes: Vec<NodeDefinition>) -> Graph {
        let mut graph = Graph::from_definition(&GraphDefinition::new("test", nodes)).unwrap();
        compiler::compile(&mut graph).unwrap();
        graph
    }

    fn sensor(threshold: i64) -> Graph {
        build(vec![
            NodeDefinition::provider(1, "sensor", "$.temp"),
            NodeDefinition::constant(2, json!(threshold)),
            NodeDefinition::logic(3, OperatorKind::GreaterThan, &[1, 2]),
            NodeDefinition::config(4),
            NodeDefinition::final_node(5, 3),
        ])
    }

    fn data(temp: i64) -> DataContext {
        DataContext::new().with("sensor", json!({ "temp": temp }))
    }

    #[test]
    fn test_sensor_threshold() {
        let evaluator = Evaluator::new();
        assert!(evaluator.evaluate(&mut sensor(30), &data(35)).unwrap());
        assert!(!evaluator.evaluate(&mut sensor(40), &data(35)).unwrap());
    }

    #[test]
    fn test_results_are_cached_per_node() {
        let mut graph = sensor(30);
        Evaluator::new().evaluate(&mut graph, &data(35)).unwrap();
        assert_eq!(graph.result(1), Some(&Value::Number(35.0)));
        assert_eq!(graph.result(3), Some(&Value::Bool(true)));
        assert_eq!(graph.result(4), None);
    }

    #[test]
    fn test_repeat_evaluation_is_deterministic() {
        let evaluator = Evaluator::new();
        let mut graph = sensor(30);
        let first = evaluator.evaluate(&mut graph, &data(35)).unwrap();
        let snapshot = graph.clone();
        let second = evaluator.evaluate(&mut graph, &data(35)).unwrap();
        assert_eq!(first, second);
        assert_eq!(graph, snapshot);

        // fresh data replaces the previous pass entirely
        assert!(!evaluator.evaluate(&mut graph, &data(10)).unwrap());
        assert_eq!(graph.result(1), Some(&Value::Number(10.0)));
    }

    #[test]
    fn test_missing_source_degrades_to_false() {
        let mut graph = sensor(30);
        let ctx = DataContext::new().with("other", json!({ "temp": 99 }));
        assert!(!Evaluator::new().evaluate(&mut graph, &ctx).unwrap());
        assert_eq!(graph.result(1), Some(&Value::Null));
    }

    #[test]
    fn test_empty_graph_is_invalid_input() {
        let mut graph = build(vec![]);
        let err = Evaluator::new().evaluate(&mut graph, &DataContext::new()).unwrap_err();
        assert_eq!(err.category, ErrorCategory::InvalidInput);
    }

    #[test]
    fn test_cycle_is_execution_failure() {
        let mut graph = build(vec![
            NodeDefinition::provider(1, "s", "$"),
            NodeDefinition::logic(2, OperatorKind::And, &[1, 3]),
            NodeDefinition::logic(3, OperatorKind::Not, &[2]),
            NodeDefinition::config(4),
            NodeDefinition::final_node(5, 3),
        ]);
        let err = Evaluator::new().evaluate(&mut graph, &DataContext::new()).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ExecutionFailed);
        assert_eq!(err.title, "Cycle detected");
        assert!(err.message.contains("[2, 3]"));
    }

    #[test]
    fn test_logic_without_operator_fails() {
        let mut graph = build(vec![
            NodeDefinition::provider(1, "s", "$"),
            NodeDefinition::new(2, NodeKindDefinition::Logic { operator: None }).with_parents(&[1]),
            NodeDefinition::final_node(3, 2),
        ]);
        let err = Evaluator::new().evaluate(&mut graph, &DataContext::new()).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ExecutionFailed);
        assert_eq!(err.title, "Missing operator");
    }

    #[test]
    fn test_non_boolean_result_is_type_mismatch() {
        let mut graph = build(vec![
            NodeDefinition::provider(1, "s", "$.values"),
            NodeDefinition::logic(2, OperatorKind::Avg, &[1]),
            NodeDefinition::config(3),
            NodeDefinition::final_node(4, 2),
        ]);
        let ctx = DataContext::new().with("s", json!({ "values": [1, 2, 3] }));
        let err = Evaluator::new().evaluate(&mut graph, &ctx).unwrap_err();
        assert_eq!(err.category, ErrorCategory::TypeMismatch);
        assert_eq!(graph.result(2), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_null_result_is_false() {
        let mut graph = build(vec![
            NodeDefinition::provider(1, "s", "$.flag"),
            NodeDefinition::config(2),
            NodeDefinition::final_node(3, 1),
        ]);
        let ctx = DataContext::new().with("s", json!({}));
        assert!(!Evaluator::new().evaluate(&mut graph, &ctx).unwrap());
    }

    #[test]
    fn test_without_final_node_uses_terminal() {
        let mut graph = build(vec![
            NodeDefinition::provider(1, "s", "$.name"),
            NodeDefinition::constant(2, json!("ada")),
            NodeDefinition::logic(3, OperatorKind::EqualsIgnoreCase, &[1, 2]),
        ]);
        let ctx = DataContext::new().with("s", json!({ "name": "Ada" }));
        assert!(Evaluator::new().evaluate(&mut graph, &ctx).unwrap());
    }

    #[test]
    fn test_schema_match_end_to_end() {
        let mut graph = build(vec![
            NodeDefinition::provider(1, "order", "$"),
            NodeDefinition::constant(2, json!(r#"{"type":"object","required":["id"]}"#)),
            NodeDefinition::logic(3, OperatorKind::MatchesSchema, &[1, 2]),
            NodeDefinition::config(4),
            NodeDefinition::final_node(5, 3),
        ]);
        let evaluator = Evaluator::new();
        let good = DataContext::new().with("order", json!({ "id": 1 }));
        let bad = DataContext::new().with("order", json!({ "sku": "x" }));
        assert!(evaluator.evaluate(&mut graph, &good).unwrap());
        assert!(!evaluator.evaluate(&mut graph, &bad).unwrap());
    }

    #[test]
    fn test_date_predicates_use_reference_instant() {
        let mut graph = build(vec![
            NodeDefinition::provider(1, "event", "$.at"),
            NodeDefinition::constant(2, json!(2)),
            NodeDefinition::constant(3, json!("HOURS")),
            NodeDefinition::logic(4, OperatorKind::WithinLast, &[1, 2, 3]),
            NodeDefinition::config(5),
            NodeDefinition::final_node(6, 4),
        ]);
        let ctx = DataContext::new().with("event", json!({ "at": "2024-06-15T11:00:00Z" }));
        let evaluator = Evaluator::new();
        let noon = "2024-06-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        assert!(evaluator.evaluate_at(&mut graph, &ctx, noon).unwrap());
        assert!(!evaluator
            .evaluate_at(&mut graph, &ctx, noon + TimeDelta::hours(3))
            .unwrap());
    }

    fn change_graph(mode: ChangeDetectionMode) -> Graph {
        build(vec![
            NodeDefinition::provider(1, "sensor", "$.temp"),
            NodeDefinition::constant(2, json!(30)),
            NodeDefinition::logic(3, OperatorKind::GreaterThan, &[1, 2]),
            NodeDefinition::new(
                4,
                NodeKindDefinition::Config {
                    change_detection_mode: Some(mode),
                    change_detection_active: true,
                    time_window_enabled: false,
                    time_window_millis: 0,
                },
            ),
            NodeDefinition::final_node(5, 3),
        ])
    }

    #[test]
    fn test_change_detection_suppresses_repeats() {
        let store = Arc::new(SnapshotStore::new(Duration::from_secs(3600), 5));
        let evaluator = Evaluator::new().with_change_store(store.clone());
        let mut graph = change_graph(ChangeDetectionMode::Or);
        let now = Utc::now();

        assert!(evaluator.evaluate_at(&mut graph, &data(35), now).unwrap());
        // same reading again: condition holds but nothing changed
        assert!(!evaluator
            .evaluate_at(&mut graph, &data(35), now + TimeDelta::seconds(1))
            .unwrap());
        assert!(evaluator
            .evaluate_at(&mut graph, &data(36), now + TimeDelta::seconds(2))
            .unwrap());

        let latest = store.latest_at("test", now + TimeDelta::seconds(2)).unwrap();
        assert_eq!(latest.value, json!({ "1": 36 }));
        assert_eq!(store.recent_at("test", 10, now + TimeDelta::seconds(2)).len(), 3);
    }

    #[test]
    fn test_inactive_change_detection_ignores_store() {
        let store = Arc::new(SnapshotStore::new(Duration::from_secs(3600), 5));
        let evaluator = Evaluator::new().with_change_store(store.clone());
        let mut graph = sensor(30);
        assert!(evaluator.evaluate(&mut graph, &data(35)).unwrap());
        assert!(evaluator.evaluate(&mut graph, &data(35)).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_failure_snapshot_recorded() {
        let failures = Arc::new(SnapshotStore::new(Duration::from_secs(3600), 5));
        let evaluator = Evaluator::new().with_failure_store(failures.clone());
        let mut graph = build(vec![
            NodeDefinition::provider(1, "s", "$.values"),
            NodeDefinition::logic(2, OperatorKind::Avg, &[1]),
            NodeDefinition::config(3),
            NodeDefinition::final_node(4, 2),
        ]);
        let ctx = DataContext::new().with("s", json!({ "values": [4] }));
        assert!(evaluator.evaluate(&mut graph, &ctx).is_err());

        let record = failures.latest("test").unwrap().value;
        assert_eq!(record.error.category, ErrorCategory::TypeMismatch);
        assert_eq!(record.data_context, ctx);
        assert_eq!(record.graph.nodes.len(), 4);

        let last = evaluator.last_failure("test", Utc::now()).unwrap();
        assert_eq!(last.value, record);
        assert!(evaluator.last_failure("other", Utc::now()).is_none());
    }

    #[test]
    fn test_last_failure_needs_a_store() {
        let evaluator = Evaluator::new();
        let mut graph = build(vec![
            NodeDefinition::provider(1, "s", "$.values"),
            NodeDefinition::logic(2, OperatorKind::Avg, &[1]),
            NodeDefinition::config(3),
            NodeDefinition::final_node(4, 2),
        ]);
        let ctx = DataContext::new().with("s", json!({ "values": [4] }));
        assert!(evaluator.evaluate(&mut graph, &ctx).is_err());
        assert!(evaluator.last_failure("test", Utc::now()).is_none());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "operator panicked");
    }
}
