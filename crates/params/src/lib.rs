//! # Fullstack Params
//!
//! Configuration for the topology: the deployment environment, the project
//! name, and the per-environment property values read from a parameter store.
//!
//! ## Components
//!
//! - `ParameterStore` - Blocking key lookup (`InMemoryParameterStore`, `SsmParameterStore`)
//! - `Environment` - Allow-listed deployment environment and its resolver
//! - `ProjectName` - Length-checked prefix for physical resource names
//! - `StackProps` - Flat, immutable properties record consumed by every stack

pub mod environment;
pub mod project;
pub mod properties;
pub mod ssm;
pub mod store;

pub use environment::{resolve_environment, Environment, ALLOWED_ENVIRONMENTS, DEFAULT_ENV_PATH};
pub use project::{ProjectName, DEFAULT_PROJECT_NAME};
pub use properties::{load_stack_props, PropertyKey, PropertyValue, StackProps, StackPropsBuilder};
pub use ssm::SsmParameterStore;
pub use store::{InMemoryParameterStore, ParameterFile, ParameterStore};
