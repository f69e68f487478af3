//! IAM policy documents

use crate::token::{Prop, Token};

/// Principal of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    /// `{"Service": "<name>"}`
    Service(String),
    /// `{"AWS": <arn>}`
    Arn(Token),
    /// `{"AWS": "*"}`
    Any,
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Principal::Service(name.into())
    }

    fn to_prop(&self) -> Prop {
        match self {
            Principal::Service(name) => Prop::map([("Service", Prop::from(name.as_str()))]),
            Principal::Arn(arn) => Prop::map([("AWS", Prop::from(arn.clone()))]),
            Principal::Any => Prop::map([("AWS", Prop::from("*"))]),
        }
    }
}

/// A single `Allow` policy statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Token>,
    pub principals: Vec<Principal>,
}

impl PolicyStatement {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn with_actions<S: Into<String>>(mut self, actions: impl IntoIterator<Item = S>) -> Self {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn with_resources(mut self, resources: impl IntoIterator<Item = Token>) -> Self {
        self.resources.extend(resources);
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principals.push(principal);
        self
    }

    pub fn to_prop(&self) -> Prop {
        let mut entries = vec![
            ("Effect", Prop::from("Allow")),
            ("Action", collapse(self.actions.iter().map(Prop::from).collect())),
        ];
        if !self.resources.is_empty() {
            entries.push((
                "Resource",
                collapse(self.resources.iter().cloned().map(Prop::from).collect()),
            ));
        }
        if let Some(principal) = self.principals.first() {
            entries.push(("Principal", principal.to_prop()));
        }
        Prop::map(entries)
    }
}

/// `Version: 2012-10-17` policy document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyDocument {
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statement(mut self, statement: PolicyStatement) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn add_statement(&mut self, statement: PolicyStatement) {
        self.statements.push(statement);
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn to_prop(&self) -> Prop {
        Prop::map([
            ("Version", Prop::from("2012-10-17")),
            (
                "Statement",
                Prop::List(self.statements.iter().map(PolicyStatement::to_prop).collect()),
            ),
        ])
    }

    /// Trust policy letting a service assume the role
    pub fn assume_role(service: &str) -> Self {
        Self::new().with_statement(
            PolicyStatement::allow()
                .with_actions(["sts:AssumeRole"])
                .with_principal(Principal::service(service)),
        )
    }
}

/// Single-element lists render as scalars, matching CDK output
fn collapse(mut items: Vec<Prop>) -> Prop {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Prop::List(items)
    }
}
