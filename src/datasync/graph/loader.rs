// SPDX-License-Identifier: MIT

//! Graph definition loading and storage
//!
//! Definitions are plain YAML or JSON documents. `GraphStore` is the boundary
//! the builder loads from; a directory-backed and an in-memory implementation
//! are provided.

use super::types::GraphDefinition;
use crate::engine::error::DataSyncError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Parses definitions from text or files
pub struct DefinitionLoader;

impl DefinitionLoader {
    /// Parse a definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<GraphDefinition, DataSyncError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a definition from a JSON string
    pub fn parse_json(content: &str) -> Result<GraphDefinition, DataSyncError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a definition file; `.json` is read as JSON, anything else as YAML
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<GraphDefinition, DataSyncError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if is_json(path) {
            Self::parse_json(&content)
        } else {
            Self::parse_yaml(&content)
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Keyed storage for graph definitions
pub trait GraphStore: Send + Sync {
    fn load(&self, name: &str) -> Result<GraphDefinition, DataSyncError>;

    fn save(&self, name: &str, def: &GraphDefinition) -> Result<(), DataSyncError>;

    /// Names of all stored definitions, sorted
    fn list(&self) -> Result<Vec<String>, DataSyncError>;
}

const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// One `<name>.yaml` / `.yml` / `.json` file per graph under a root directory
pub struct FileGraphStore {
    root: PathBuf,
}

impl FileGraphStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_name(name: &str) -> Result<(), DataSyncError> {
        let safe = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !name.starts_with('.');
        if safe {
            Ok(())
        } else {
            Err(DataSyncError::config(format!("invalid graph name '{}'", name)))
        }
    }
}

impl GraphStore for FileGraphStore {
    fn load(&self, name: &str) -> Result<GraphDefinition, DataSyncError> {
        Self::check_name(name)?;
        let path = EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
            .ok_or_else(|| DataSyncError::not_found(name))?;
        log::info!("Loading graph definition '{}' from {}", name, path.display());
        DefinitionLoader::load_file(path)
    }

    fn save(&self, name: &str, def: &GraphDefinition) -> Result<(), DataSyncError> {
        Self::check_name(name)?;
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(format!("{}.yaml", name));
        fs::write(&path, serde_yaml::to_string(def)?)?;
        log::info!("Saved graph definition '{}' to {}", name, path.display());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, DataSyncError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let known = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if let (true, Some(stem)) = (known, path.file_stem().and_then(|s| s.to_str())) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Definitions held in memory
#[derive(Default)]
pub struct InMemoryGraphStore {
    definitions: RwLock<BTreeMap<String, GraphDefinition>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for InMemoryGraphStore {
    fn load(&self, name: &str) -> Result<GraphDefinition, DataSyncError> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| DataSyncError::not_found(name))
    }

    fn save(&self, name: &str, def: &GraphDefinition) -> Result<(), DataSyncError> {
        self.definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), def.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, DataSyncError> {
        Ok(self
            .definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }
}
