//! Project name validation

use shared::{ProjectNameTooLongError, Result, StackError, MAX_PROJECT_NAME_LEN};
use std::fmt;

/// Project name used when none is given
pub const DEFAULT_PROJECT_NAME: &str = "MyCDKGoals";

/// A validated project name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(StackError::Naming("Project name must not be empty".to_string()));
        }
        if name.chars().count() > MAX_PROJECT_NAME_LEN {
            return Err(ProjectNameTooLongError {
                project_name: name.to_string(),
                max_len: MAX_PROJECT_NAME_LEN,
            }
            .into());
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<project>-<value>`
    pub fn prefixed(&self, value: &str) -> String {
        format!("{}-{}", self.0, value)
    }
}

impl Default for ProjectName {
    fn default() -> Self {
        Self(DEFAULT_PROJECT_NAME.to_string())
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
