//! Error types for the topology

use thiserror::Error;

/// Error thrown when the project name cannot prefix resource names
#[derive(Debug, Error)]
#[error("Project name '{project_name}' must be {max_len} characters or less")]
pub struct ProjectNameTooLongError {
    pub project_name: String,
    pub max_len: usize,
}

/// Error thrown when the selected environment is outside the allow-list
#[derive(Debug, Error)]
#[error("Environment '{environment}' is not allowed. Allowable env values are {}", allowed.join(", "))]
pub struct InvalidEnvironmentError {
    pub environment: String,
    pub allowed: Vec<String>,
}

/// Error thrown when a configuration key is absent from the store
#[derive(Debug, Error)]
#[error("Parameter '{path}' not found in configuration store")]
pub struct ParameterNotFoundError {
    pub path: String,
}

/// General topology error type
#[derive(Debug, Error)]
pub enum StackError {
    #[error(transparent)]
    ProjectNameTooLong(#[from] ProjectNameTooLongError),

    #[error(transparent)]
    InvalidEnvironment(#[from] InvalidEnvironmentError),

    #[error(transparent)]
    ParameterNotFound(#[from] ParameterNotFoundError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Naming error: {0}")]
    Naming(String),

    #[error("Logical id '{logical_id}' already exists in stack '{stack}'")]
    DuplicateResource { stack: String, logical_id: String },

    #[error("Stack '{0}' already exists in app")]
    DuplicateStack(String),

    #[error("Stack '{consumer}' cannot reference '{producer}': {reason}")]
    UnresolvedReference {
        consumer: String,
        producer: String,
        reason: String,
    },

    #[error("Parameter store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, StackError>;
