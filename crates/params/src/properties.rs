//! StackProps - Flat properties record consumed by every stack

use crate::environment::Environment;
use crate::project::ProjectName;
use crate::store::ParameterStore;
use serde::Serialize;
use shared::{Result, StackError};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Key of `projectName` in the record
pub const PROJECT_NAME: &str = "projectName";
/// Key of `environment` in the record
pub const ENVIRONMENT: &str = "environment";
/// Key of `useCdn` in the record
pub const USE_CDN: &str = "useCdn";

/// Property keys read from the parameter store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKey {
    ApiName,
    AuthorizerName,
    CdnComment,
    CdnWebsiteIndexDocument,
    CodeBuildRoleName,
    CodePipelineRoleName,
    PipelineProjectName,
    PipelineProjectDescription,
    PipelineProjectBuildSpec,
    UserPoolName,
    UserPoolClientName,
    IdentityPoolName,
    TableName,
    PartitionKeyName,
    SortKeyName,
    S3WebsiteDeploySource,
    WebsiteIndexDocument,
    WebsiteErrorDocument,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 18] = [
        PropertyKey::ApiName,
        PropertyKey::AuthorizerName,
        PropertyKey::CdnComment,
        PropertyKey::CdnWebsiteIndexDocument,
        PropertyKey::CodeBuildRoleName,
        PropertyKey::CodePipelineRoleName,
        PropertyKey::PipelineProjectName,
        PropertyKey::PipelineProjectDescription,
        PropertyKey::PipelineProjectBuildSpec,
        PropertyKey::UserPoolName,
        PropertyKey::UserPoolClientName,
        PropertyKey::IdentityPoolName,
        PropertyKey::TableName,
        PropertyKey::PartitionKeyName,
        PropertyKey::SortKeyName,
        PropertyKey::S3WebsiteDeploySource,
        PropertyKey::WebsiteIndexDocument,
        PropertyKey::WebsiteErrorDocument,
    ];

    /// Name of the key in the store and in the record
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKey::ApiName => "apiName",
            PropertyKey::AuthorizerName => "authorizerName",
            PropertyKey::CdnComment => "cdnComment",
            PropertyKey::CdnWebsiteIndexDocument => "cdnWebsiteIndexDocument",
            PropertyKey::CodeBuildRoleName => "codeBuildRoleName",
            PropertyKey::CodePipelineRoleName => "codePipelineRoleName",
            PropertyKey::PipelineProjectName => "pipelineProjectName",
            PropertyKey::PipelineProjectDescription => "pipelineProjectDescription",
            PropertyKey::PipelineProjectBuildSpec => "pipelineProjectBuildSpec",
            PropertyKey::UserPoolName => "userPoolName",
            PropertyKey::UserPoolClientName => "userPoolClientName",
            PropertyKey::IdentityPoolName => "identityPoolName",
            PropertyKey::TableName => "tableName",
            PropertyKey::PartitionKeyName => "partitionKeyName",
            PropertyKey::SortKeyName => "sortKeyName",
            PropertyKey::S3WebsiteDeploySource => "s3WebsiteDeploySource",
            PropertyKey::WebsiteIndexDocument => "websiteIndexDocument",
            PropertyKey::WebsiteErrorDocument => "websiteErrorDocument",
        }
    }

    /// Whether the stored value is a name that gets the `<project>-` prefix
    pub fn is_prefixed(&self) -> bool {
        !matches!(
            self,
            PropertyKey::CdnWebsiteIndexDocument
                | PropertyKey::PipelineProjectBuildSpec
                | PropertyKey::PartitionKeyName
                | PropertyKey::SortKeyName
                | PropertyKey::S3WebsiteDeploySource
                | PropertyKey::WebsiteIndexDocument
                | PropertyKey::WebsiteErrorDocument
        )
    }

    /// Value seeded into a fresh account
    pub fn default_value(&self) -> &'static str {
        match self {
            PropertyKey::ApiName => "Api",
            PropertyKey::AuthorizerName => "Authorizer",
            PropertyKey::CdnComment => "WebsiteCdn",
            PropertyKey::CdnWebsiteIndexDocument => "index.html",
            PropertyKey::CodeBuildRoleName => "CodeBuildRole",
            PropertyKey::CodePipelineRoleName => "CodePipelineRole",
            PropertyKey::PipelineProjectName => "build",
            PropertyKey::PipelineProjectDescription => "CodeBuild project",
            PropertyKey::PipelineProjectBuildSpec => "buildspec.yml",
            PropertyKey::UserPoolName => "UserPool",
            PropertyKey::UserPoolClientName => "UserPoolClient",
            PropertyKey::IdentityPoolName => "IdentityPool",
            PropertyKey::TableName => "Goals",
            PropertyKey::PartitionKeyName => "userId",
            PropertyKey::SortKeyName => "goalId",
            PropertyKey::S3WebsiteDeploySource => "./assets/archive",
            PropertyKey::WebsiteIndexDocument => "index.html",
            PropertyKey::WebsiteErrorDocument => "index.html",
        }
    }
}

/// A record value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Str(String),
    Bool(bool),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// Immutable flat properties record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StackProps {
    values: BTreeMap<String, PropertyValue>,
}

impl StackProps {
    pub fn builder() -> StackPropsBuilder {
        StackPropsBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// String value of a key
    pub fn string(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            Some(PropertyValue::Str(s)) => Ok(s),
            Some(PropertyValue::Bool(_)) => Err(StackError::Config(format!(
                "Property '{}' is a flag, expected a string",
                key
            ))),
            None => Err(StackError::Config(format!("Property '{}' is not set", key))),
        }
    }

    /// Boolean value of a key
    pub fn flag(&self, key: &str) -> Result<bool> {
        match self.values.get(key) {
            Some(PropertyValue::Bool(b)) => Ok(*b),
            Some(PropertyValue::Str(_)) => Err(StackError::Config(format!(
                "Property '{}' is a string, expected a flag",
                key
            ))),
            None => Err(StackError::Config(format!("Property '{}' is not set", key))),
        }
    }

    /// String value of a store-backed key
    pub fn property(&self, key: PropertyKey) -> Result<&str> {
        self.string(key.as_str())
    }

    pub fn project_name(&self) -> Result<&str> {
        self.string(PROJECT_NAME)
    }

    pub fn environment(&self) -> Result<&str> {
        self.string(ENVIRONMENT)
    }

    pub fn use_cdn(&self) -> Result<bool> {
        self.flag(USE_CDN)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Merges per-component property subsets into a [`StackProps`]
#[derive(Debug, Default)]
pub struct StackPropsBuilder {
    values: BTreeMap<String, PropertyValue>,
}

impl StackPropsBuilder {
    /// Merge a subset. A key defined by two subsets is a configuration error.
    pub fn merge<K, V>(mut self, subset: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        for (key, value) in subset {
            let key = key.into();
            if self.values.contains_key(&key) {
                return Err(StackError::Config(format!(
                    "Property '{}' is defined by more than one subset",
                    key
                )));
            }
            self.values.insert(key, value.into());
        }
        Ok(self)
    }

    pub fn build(self) -> StackProps {
        StackProps {
            values: self.values,
        }
    }
}

/// Read a component's keys from the store, prefixing names with the project
fn read_subset(
    store: &dyn ParameterStore,
    environment: &Environment,
    project: &ProjectName,
    keys: &[PropertyKey],
) -> Result<Vec<(&'static str, String)>> {
    keys.iter()
        .map(|key| {
            let path = environment.parameter_path(key.as_str());
            let value = store.get(&path)?;
            debug!(path = %path, value = %value, "read property");
            let value = if key.is_prefixed() {
                project.prefixed(&value)
            } else {
                value
            };
            Ok((key.as_str(), value))
        })
        .collect()
}

/// Assemble the properties record for an environment.
///
/// Every store-backed key must be present; the first missing key aborts.
pub fn load_stack_props(
    store: &dyn ParameterStore,
    environment: &Environment,
    project: &ProjectName,
    use_cdn: bool,
) -> Result<StackProps> {
    use PropertyKey::*;

    let env_props = [(USE_CDN, PropertyValue::Bool(use_cdn))];
    let proj_props = [
        (PROJECT_NAME, PropertyValue::from(project.as_str())),
        (ENVIRONMENT, PropertyValue::from(environment.name())),
    ];
    let api_props = read_subset(store, environment, project, &[ApiName, AuthorizerName])?;
    let cdn_props = read_subset(store, environment, project, &[CdnComment, CdnWebsiteIndexDocument])?;
    let code_props = read_subset(
        store,
        environment,
        project,
        &[
            CodeBuildRoleName,
            CodePipelineRoleName,
            PipelineProjectName,
            PipelineProjectDescription,
            PipelineProjectBuildSpec,
        ],
    )?;
    let cognito_props = read_subset(
        store,
        environment,
        project,
        &[UserPoolName, UserPoolClientName, IdentityPoolName],
    )?;
    let db_props = read_subset(store, environment, project, &[TableName, PartitionKeyName, SortKeyName])?;
    let s3_props = read_subset(
        store,
        environment,
        project,
        &[S3WebsiteDeploySource, WebsiteIndexDocument, WebsiteErrorDocument],
    )?;

    let props = StackProps::builder()
        .merge(env_props)?
        .merge(proj_props)?
        .merge(api_props)?
        .merge(cdn_props)?
        .merge(code_props)?
        .merge(cognito_props)?
        .merge(db_props)?
        .merge(s3_props)?
        .build();

    info!(
        project = project.as_str(),
        environment = environment.name(),
        properties = props.len(),
        "loaded stack properties"
    );
    Ok(props)
}
