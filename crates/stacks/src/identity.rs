//! Identity component - user directory, app client and identity pool

use params::{PropertyKey, StackProps};
use shared::{Prop, Resource, ResourceRef, Result, Stack, Token};
use tracing::info;

pub const STACK_NAME: &str = "CognitoStack";

/// Declared user pool
#[derive(Debug, Clone, PartialEq)]
pub struct UserPoolHandle {
    pub resource: ResourceRef,
}

impl UserPoolHandle {
    pub fn id(&self) -> Token {
        self.resource.reference()
    }

    pub fn arn(&self) -> Token {
        self.resource.get_att("Arn")
    }

    pub fn provider_name(&self) -> Token {
        self.resource.get_att("ProviderName")
    }
}

/// Declared app client
#[derive(Debug, Clone, PartialEq)]
pub struct UserPoolClientHandle {
    pub resource: ResourceRef,
}

impl UserPoolClientHandle {
    pub fn id(&self) -> Token {
        self.resource.reference()
    }
}

/// Declared identity pool
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityPoolHandle {
    pub resource: ResourceRef,
}

impl IdentityPoolHandle {
    pub fn id(&self) -> Token {
        self.resource.reference()
    }
}

/// Handles produced by the identity component
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityOutputs {
    pub user_pool: UserPoolHandle,
    pub client: UserPoolClientHandle,
    pub identity_pool: IdentityPoolHandle,
}

/// Identity pool names only admit word characters and spaces
fn identity_pool_name(name: &str) -> String {
    name.replace('-', "_")
}

pub fn declare(stack: &mut Stack, props: &StackProps) -> Result<IdentityOutputs> {
    let user_pool_name = props.property(PropertyKey::UserPoolName)?;
    let client_name = props.property(PropertyKey::UserPoolClientName)?;
    let pool_name = identity_pool_name(props.property(PropertyKey::IdentityPoolName)?);

    let user_pool = stack.add_resource(
        "UserPool",
        Resource::new("AWS::Cognito::UserPool").with("UserPoolName", user_pool_name),
    )?;
    let user_pool = UserPoolHandle { resource: user_pool };

    let client = stack.add_resource(
        "UserPoolClient",
        Resource::new("AWS::Cognito::UserPoolClient")
            .with("ClientName", client_name)
            .with("UserPoolId", user_pool.id())
            .with("GenerateSecret", false),
    )?;
    let client = UserPoolClientHandle { resource: client };

    let identity_pool = stack.add_resource(
        "IdentityPool",
        Resource::new("AWS::Cognito::IdentityPool")
            .with("IdentityPoolName", pool_name.as_str())
            .with("AllowUnauthenticatedIdentities", false)
            .with(
                "CognitoIdentityProviders",
                Prop::list([Prop::map([
                    ("ClientId", Prop::from(client.id())),
                    ("ProviderName", Prop::from(user_pool.provider_name())),
                ])]),
            ),
    )?;
    let identity_pool = IdentityPoolHandle {
        resource: identity_pool,
    };

    info!(stack = stack.name(), user_pool = user_pool_name, identity_pool = %pool_name, "declared identity");
    Ok(IdentityOutputs {
        user_pool,
        client,
        identity_pool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> StackProps {
        StackProps::builder()
            .merge([
                ("userPoolName", "Goals-UserPool"),
                ("userPoolClientName", "Goals-UserPoolClient"),
                ("identityPoolName", "Goals-IdentityPool"),
            ])
            .unwrap()
            .build()
    }

    #[test]
    fn test_declares_pool_client_and_identity_pool() {
        let mut stack = Stack::new(STACK_NAME);
        declare(&mut stack, &props()).unwrap();

        assert_eq!(stack.resources_of_type("AWS::Cognito::UserPool").count(), 1);
        assert_eq!(stack.resources_of_type("AWS::Cognito::UserPoolClient").count(), 1);
        assert_eq!(stack.resources_of_type("AWS::Cognito::IdentityPool").count(), 1);
        assert_eq!(
            stack.resource("UserPool").unwrap().property("UserPoolName").and_then(Prop::as_str),
            Some("Goals-UserPool")
        );
    }

    #[test]
    fn test_client_has_no_secret() {
        let mut stack = Stack::new(STACK_NAME);
        let outputs = declare(&mut stack, &props()).unwrap();

        let client = stack.resource("UserPoolClient").unwrap();
        assert_eq!(client.property("GenerateSecret"), Some(&Prop::Bool(false)));
        assert_eq!(
            client.property("UserPoolId").and_then(Prop::as_token),
            Some(&outputs.user_pool.id())
        );
    }

    #[test]
    fn test_identity_pool_federates_client() {
        let mut stack = Stack::new(STACK_NAME);
        let outputs = declare(&mut stack, &props()).unwrap();

        let pool = stack.resource("IdentityPool").unwrap();
        assert_eq!(pool.property("AllowUnauthenticatedIdentities"), Some(&Prop::Bool(false)));
        assert_eq!(
            pool.property("IdentityPoolName").and_then(Prop::as_str),
            Some("Goals_IdentityPool")
        );

        let provider = pool
            .property("CognitoIdentityProviders")
            .and_then(|p| p.at(0))
            .unwrap();
        assert_eq!(provider.get("ClientId").and_then(Prop::as_token), Some(&outputs.client.id()));
    }
}
