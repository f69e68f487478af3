//! # Fullstack Shared
//!
//! Declaration-graph primitives used across all topology crates: tokens,
//! property trees, stacks, IAM documents, file assets and the error taxonomy.

pub mod asset;
pub mod error;
pub mod iam;
pub mod stack;
pub mod token;

// Re-exports
pub use asset::*;
pub use error::*;
pub use iam::*;
pub use stack::*;
pub use token::*;

/// Maximum project name length; the name prefixes every physical resource name
pub const MAX_PROJECT_NAME_LEN: usize = 12;
