//! The app: stacks in declaration order plus app-wide tags

use shared::{Result, Stack, StackError};
use std::collections::BTreeMap;

/// Tag applied to every stack of the topology
pub const APP_TAG: (&str, &str) = ("App", "CDKFullStack");

/// Ordered collection of stacks. A stack may only reference stacks added
/// before it.
#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: Vec<Stack>,
    tags: BTreeMap<String, String>,
    region: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target region recorded in the manifest; unset means resolved at deploy
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        if self.stack(stack.name()).is_some() {
            return Err(StackError::DuplicateStack(stack.name().to_string()));
        }
        self.stacks.push(stack);
        Ok(())
    }

    /// Tag recorded on every stack artifact of the manifest
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Position of a stack in declaration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.stacks.iter().position(|s| s.name() == name)
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack_names(&self) -> Vec<&str> {
        self.stacks.iter().map(Stack::name).collect()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_stack_rejected() {
        let mut app = App::new();
        app.add_stack(Stack::new("DatabaseStack")).unwrap();

        let err = app.add_stack(Stack::new("DatabaseStack")).unwrap_err();
        assert!(matches!(err, StackError::DuplicateStack(name) if name == "DatabaseStack"));
    }

    #[test]
    fn test_stacks_keep_declaration_order() {
        let mut app = App::new();
        for name in ["DatabaseStack", "S3Stack", "LambdaStack"] {
            app.add_stack(Stack::new(name)).unwrap();
        }

        assert_eq!(app.stack_names(), vec!["DatabaseStack", "S3Stack", "LambdaStack"]);
        assert_eq!(app.position("LambdaStack"), Some(2));
        assert_eq!(app.position("CdnStack"), None);
    }

    #[test]
    fn test_later_tag_value_wins() {
        let mut app = App::new();
        app.add_tag(APP_TAG.0, APP_TAG.1);
        app.add_tag("Owner", "platform");
        app.add_tag("Owner", "storage");

        assert_eq!(app.tags().get("App").map(String::as_str), Some("CDKFullStack"));
        assert_eq!(app.tags().get("Owner").map(String::as_str), Some("storage"));
    }
}
