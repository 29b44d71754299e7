// SPDX-License-Identifier: MIT

//! Point-in-time records kept by the snapshot stores

use crate::datasync::context::DataContext;
use crate::datasync::graph::{Graph, GraphDefinition};
use crate::engine::error::{ErrorDetail, EvaluationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value captured under a key at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<T> {
    pub id: Uuid,
    /// Graph or transformation name
    pub key: String,
    pub value: T,
    pub created_at: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    pub fn new(key: &str, value: T, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.to_string(),
            value,
            created_at,
        }
    }
}

/// Everything needed to replay a failed evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub graph: GraphDefinition,
    pub data_context: DataContext,
    pub error: ErrorDetail,
}

impl FailureRecord {
    pub fn capture(graph: &Graph, data: &DataContext, error: &EvaluationError) -> Self {
        Self {
            graph: graph.to_definition(),
            data_context: data.clone(),
            error: error.detail(),
        }
    }
}
