//! ParameterStore - Blocking key/value configuration lookup

use crate::environment::{Environment, ALLOWED_ENVIRONMENTS, DEFAULT_ENV_PATH};
use crate::properties::PropertyKey;
use serde::{Deserialize, Serialize};
use shared::{ParameterNotFoundError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Read-only configuration store keyed by path
pub trait ParameterStore {
    /// Read a string parameter. An absent key is a hard failure.
    fn get(&self, path: &str) -> Result<String>;
}

impl<T: ParameterStore + ?Sized> ParameterStore for &T {
    fn get(&self, path: &str) -> Result<String> {
        (**self).get(path)
    }
}

impl<T: ParameterStore + ?Sized> ParameterStore for Box<T> {
    fn get(&self, path: &str) -> Result<String> {
        (**self).get(path)
    }
}

/// Store backed by a map; used for offline synthesis and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryParameterStore {
    values: BTreeMap<String, String>,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a parameter
    pub fn with(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.values.insert(path.into(), value.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.values.remove(path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Load a YAML parameter file
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(ParameterFile::from_file(path)?.to_store())
    }
}

impl ParameterStore for InMemoryParameterStore {
    fn get(&self, path: &str) -> Result<String> {
        debug!(path, "reading parameter");
        self.values.get(path).cloned().ok_or_else(|| {
            ParameterNotFoundError {
                path: path.to_string(),
            }
            .into()
        })
    }
}

/// YAML layout of a parameter file
///
/// ```yaml
/// defaultEnvironment: Dev-local
/// environments:
///   Dev-local:
///     tableName: Goals
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterFile {
    #[serde(default)]
    pub default_environment: Option<String>,

    #[serde(default)]
    pub environments: BTreeMap<String, BTreeMap<String, String>>,
}

impl ParameterFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Built-in defaults for every allow-listed environment
    pub fn defaults() -> Self {
        let values: BTreeMap<String, String> = PropertyKey::ALL
            .iter()
            .map(|key| (key.as_str().to_string(), key.default_value().to_string()))
            .collect();

        Self {
            default_environment: Some(ALLOWED_ENVIRONMENTS[0].to_string()),
            environments: ALLOWED_ENVIRONMENTS
                .iter()
                .map(|env| (env.to_string(), values.clone()))
                .collect(),
        }
    }

    /// Flatten into `(path, value)` pairs
    pub fn parameters(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(default_env) = &self.default_environment {
            params.push((DEFAULT_ENV_PATH.to_string(), default_env.clone()));
        }
        for (env, values) in &self.environments {
            for (key, value) in values {
                params.push((Environment::path_for(env, key), value.clone()));
            }
        }
        params
    }

    pub fn to_store(&self) -> InMemoryParameterStore {
        let mut store = InMemoryParameterStore::new();
        for (path, value) in self.parameters() {
            store.insert(path, value);
        }
        store
    }
}
