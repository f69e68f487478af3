//! Stacks - named groups of resource declarations

use crate::asset::{AssetLocation, FileAsset};
use crate::error::{Result, StackError};
use crate::token::{Prop, ResourceRef, Token};
use std::collections::BTreeMap;

/// What happens to a resource when its stack is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Destroy,
}

impl RemovalPolicy {
    /// CloudFormation `DeletionPolicy` value
    pub fn deletion_policy(&self) -> &'static str {
        match self {
            RemovalPolicy::Destroy => "Delete",
        }
    }
}

/// A single resource declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Resource type (e.g. `AWS::DynamoDB::Table`)
    pub resource_type: String,
    /// Resource properties
    pub properties: BTreeMap<String, Prop>,
    /// Same-stack logical ids this resource must wait for
    pub depends_on: Vec<String>,
    /// Teardown behavior; `None` leaves the engine default
    pub removal_policy: Option<RemovalPolicy>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: BTreeMap::new(),
            depends_on: Vec::new(),
            removal_policy: None,
        }
    }

    /// Builder: set a property
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Prop>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder: add a same-stack dependency
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    /// Builder: set teardown behavior
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Prop> {
        self.properties.get(key)
    }

    /// Visit every resource referenced by the properties
    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a ResourceRef)) {
        self.properties.values().for_each(|p| p.visit_refs(f));
    }
}

/// A stack output
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub value: Token,
    pub description: Option<String>,
}

impl Output {
    pub fn new(value: Token) -> Self {
        Self {
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named group of resource declarations
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    name: String,
    description: Option<String>,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
    assets: Vec<FileAsset>,
}

impl Stack {
    /// Create an empty stack
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            assets: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declare a resource and return a reference to it
    pub fn add_resource(&mut self, logical_id: &str, resource: Resource) -> Result<ResourceRef> {
        self.check_logical_id(logical_id)?;
        if self.resources.contains_key(logical_id) || self.outputs.contains_key(logical_id) {
            return Err(StackError::DuplicateResource {
                stack: self.name.clone(),
                logical_id: logical_id.to_string(),
            });
        }

        self.resources.insert(logical_id.to_string(), resource);
        Ok(ResourceRef::new(&self.name, logical_id))
    }

    /// Declare an output
    pub fn add_output(&mut self, logical_id: &str, output: Output) -> Result<()> {
        self.check_logical_id(logical_id)?;
        if self.outputs.contains_key(logical_id) || self.resources.contains_key(logical_id) {
            return Err(StackError::DuplicateResource {
                stack: self.name.clone(),
                logical_id: logical_id.to_string(),
            });
        }

        self.outputs.insert(logical_id.to_string(), output);
        Ok(())
    }

    /// Register a file asset; registering the same asset twice is a no-op
    pub fn add_asset(&mut self, asset: FileAsset) -> AssetLocation {
        let location = asset.location();
        if !self.assets.iter().any(|a| a.id == asset.id) {
            self.assets.push(asset);
        }
        location
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(id, r)| (id.as_str(), r))
    }

    /// Resources of a given type
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Resource)> + 'a {
        self.resources()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn output(&self, logical_id: &str) -> Option<&Output> {
        self.outputs.get(logical_id)
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Output)> {
        self.outputs.iter().map(|(id, o)| (id.as_str(), o))
    }

    pub fn assets(&self) -> &[FileAsset] {
        &self.assets
    }

    fn check_logical_id(&self, logical_id: &str) -> Result<()> {
        let valid = regex::Regex::new("^[A-Za-z][A-Za-z0-9]{0,254}$")
            .map(|r| r.is_match(logical_id))
            .unwrap_or(false);

        if valid {
            Ok(())
        } else {
            Err(StackError::Naming(format!(
                "Logical id '{}' in stack '{}' must be alphanumeric",
                logical_id, self.name
            )))
        }
    }
}
