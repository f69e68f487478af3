//! Deployment environment resolution

use crate::store::ParameterStore;
use shared::{InvalidEnvironmentError, Result};
use tracing::{debug, info};

/// Environments assembly may target
pub const ALLOWED_ENVIRONMENTS: [&str; 2] = ["Dev-local", "Dev-integration"];

/// Root of every configuration path
pub const ENVIRONMENT_ROOT: &str = "/Environments";

/// Store key holding the environment used when no override is given
pub const DEFAULT_ENV_PATH: &str = "/Environments/Default-env";

/// An allow-listed deployment environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    name: String,
}

impl Environment {
    /// Validate a name against the allow-list
    pub fn parse(name: &str) -> Result<Self> {
        if !ALLOWED_ENVIRONMENTS.contains(&name) {
            return Err(InvalidEnvironmentError {
                environment: name.to_string(),
                allowed: ALLOWED_ENVIRONMENTS.iter().map(|s| s.to_string()).collect(),
            }
            .into());
        }

        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store path of a property in this environment
    pub fn parameter_path(&self, property: &str) -> String {
        Self::path_for(&self.name, property)
    }

    /// `/Environments/<env>/<property>`
    pub fn path_for(environment: &str, property: &str) -> String {
        format!("{}/{}/{}", ENVIRONMENT_ROOT, environment, property)
    }
}

/// Resolve the active environment.
///
/// An explicit override wins; otherwise the default environment is read from
/// the store. Either way the name must be allow-listed.
pub fn resolve_environment(
    explicit: Option<&str>,
    store: &dyn ParameterStore,
) -> Result<Environment> {
    let name = match explicit {
        Some(name) => name.to_string(),
        None => {
            debug!(path = DEFAULT_ENV_PATH, "no environment override, reading default");
            store.get(DEFAULT_ENV_PATH)?
        }
    };

    let environment = Environment::parse(&name)?;
    info!(environment = environment.name(), "resolved environment");
    Ok(environment)
}
