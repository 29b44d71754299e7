// SPDX-License-Identifier: MIT

//! Engine configuration
//!
//! Sources, later overriding earlier: built-in defaults, an optional YAML
//! file, then `DATASYNC_*` environment variables.

use crate::engine::error::DataSyncError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const ENV_CHANGE_DETECTION_TTL: &str = "DATASYNC_CHANGE_DETECTION_TTL_SECS";
pub const ENV_FAILURE_TTL: &str = "DATASYNC_FAILURE_TTL_SECS";
pub const ENV_HISTORY_LIMIT: &str = "DATASYNC_HISTORY_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lifetime of change-detection snapshots (24h)
    pub change_detection_ttl_secs: u64,
    /// Lifetime of failure snapshots (1h)
    pub failure_ttl_secs: u64,
    /// Entries kept per key in each snapshot store
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            change_detection_ttl_secs: 24 * 60 * 60,
            failure_ttl_secs: 60 * 60,
            history_limit: 5,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, DataSyncError> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overlaid by `path` when given, overlaid by the environment
    pub fn load(path: Option<&Path>) -> Result<Self, DataSyncError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading engine config from {}", path.display());
                Self::from_yaml_str(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay values from `DATASYNC_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), DataSyncError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), DataSyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CHANGE_DETECTION_TTL) {
            self.change_detection_ttl_secs = parse_var(ENV_CHANGE_DETECTION_TTL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FAILURE_TTL) {
            self.failure_ttl_secs = parse_var(ENV_FAILURE_TTL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HISTORY_LIMIT) {
            self.history_limit = parse_var(ENV_HISTORY_LIMIT, &raw)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), DataSyncError> {
        if self.history_limit == 0 {
            return Err(DataSyncError::config("history_limit must be at least 1"));
        }
        Ok(())
    }

    pub fn change_detection_ttl(&self) -> Duration {
        Duration::from_secs(self.change_detection_ttl_secs)
    }

    pub fn failure_ttl(&self) -> Duration {
        Duration::from_secs(self.failure_ttl_secs)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, DataSyncError> {
    raw.trim()
        .parse()
        .map_err(|_| DataSyncError::config(format!("{} has invalid value '{}'", key, raw)))
}
