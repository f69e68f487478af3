//! Gateway component - REST API routing the goal handlers
//!
//! The route table is fixed. Every handler-backed route requires IAM
//! authorization plus the user-pool authorizer, and every collection serving
//! handlers answers CORS preflights.

use crate::compute::{ComputeOutputs, FunctionHandle, HandlerKind};
use crate::cors::add_cors_options;
use crate::identity::UserPoolHandle;
use params::{PropertyKey, StackProps};
use shared::{Output, Prop, Pseudo, Resource, ResourceRef, Result, Stack, StackError, Token};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const STACK_NAME: &str = "ApiGatewayStack";

pub const API_LOGICAL_ID: &str = "AppApi";
pub const AUTHORIZER_LOGICAL_ID: &str = "ApiAuthorizer";
pub const STAGE_NAME: &str = "prod";

/// Header carrying the identity token
pub const IDENTITY_SOURCE: &str = "method.request.header.Authorization";

/// Authorization required on a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAuth {
    None,
    /// IAM signature plus the user-pool authorizer
    IamWithAuthorizer,
}

/// One row of the route table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub method: &'static str,
    /// `None` routes to a passthrough mock
    pub handler: Option<HandlerKind>,
    pub auth: RouteAuth,
    pub cors: bool,
}

pub const ROUTES: [Route; 6] = [
    Route {
        path: "/",
        method: "ANY",
        handler: None,
        auth: RouteAuth::None,
        cors: false,
    },
    Route {
        path: "/goals",
        method: "GET",
        handler: Some(HandlerKind::List),
        auth: RouteAuth::IamWithAuthorizer,
        cors: true,
    },
    Route {
        path: "/goals",
        method: "POST",
        handler: Some(HandlerKind::Create),
        auth: RouteAuth::IamWithAuthorizer,
        cors: true,
    },
    Route {
        path: "/goals/{id}",
        method: "GET",
        handler: Some(HandlerKind::Get),
        auth: RouteAuth::IamWithAuthorizer,
        cors: true,
    },
    Route {
        path: "/goals/{id}",
        method: "PUT",
        handler: Some(HandlerKind::Update),
        auth: RouteAuth::IamWithAuthorizer,
        cors: true,
    },
    Route {
        path: "/goals/{id}",
        method: "DELETE",
        handler: Some(HandlerKind::Delete),
        auth: RouteAuth::IamWithAuthorizer,
        cors: true,
    },
];

/// Declared REST API
#[derive(Debug, Clone, PartialEq)]
pub struct RestApiHandle {
    pub resource: ResourceRef,
    pub stage: String,
}

impl RestApiHandle {
    pub fn id(&self) -> Token {
        self.resource.reference()
    }

    pub fn root_resource_id(&self) -> Token {
        self.resource.get_att("RootResourceId")
    }

    /// `https://<api-id>.execute-api.<region>.<url-suffix>/<stage>/`
    pub fn url(&self) -> Token {
        Token::concat([
            Token::literal("https://"),
            self.id(),
            Token::literal(".execute-api."),
            Pseudo::Region.into(),
            Token::literal("."),
            Pseudo::UrlSuffix.into(),
            Token::literal(format!("/{}/", self.stage)),
        ])
    }

    /// Execute ARN of a method on any stage; path parameters match any value
    pub fn execute_api_arn(&self, method: &str, path: &str) -> Token {
        let path = path
            .split('/')
            .map(|segment| if segment.starts_with('{') { "*" } else { segment })
            .collect::<Vec<_>>()
            .join("/");

        Token::concat([
            Token::literal("arn:"),
            Pseudo::Partition.into(),
            Token::literal(":execute-api:"),
            Pseudo::Region.into(),
            Token::literal(":"),
            Pseudo::AccountId.into(),
            Token::literal(":"),
            self.id(),
            Token::literal(format!("/*/{}{}", method, path)),
        ])
    }
}

/// Handles produced by the gateway component
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOutputs {
    pub api: RestApiHandle,
    pub authorizer: ResourceRef,
}

/// `AppApi` followed by the path segments, braces dropped
fn resource_logical_id(path: &str) -> String {
    let mut id = API_LOGICAL_ID.to_string();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        id.extend(segment.chars().filter(|c| c.is_ascii_alphanumeric()));
    }
    id
}

fn lambda_invocation_uri(function: &FunctionHandle) -> Token {
    Token::concat([
        Token::literal("arn:"),
        Pseudo::Partition.into(),
        Token::literal(":apigateway:"),
        Pseudo::Region.into(),
        Token::literal(":lambda:path/2015-03-31/functions/"),
        function.arn(),
        Token::literal("/invocations"),
    ])
}

/// API resources by path, created on demand with their parents
struct PathTree<'a> {
    api: &'a RestApiHandle,
    resources: BTreeMap<String, Token>,
}

impl<'a> PathTree<'a> {
    fn new(api: &'a RestApiHandle) -> Self {
        let mut resources = BTreeMap::new();
        resources.insert("/".to_string(), api.root_resource_id());
        Self { api, resources }
    }

    fn resource_id(&mut self, stack: &mut Stack, path: &str) -> Result<Token> {
        if let Some(id) = self.resources.get(path) {
            return Ok(id.clone());
        }

        let (parent, part) = path
            .rsplit_once('/')
            .ok_or_else(|| StackError::Config(format!("Route path '{}' must start with '/'", path)))?;
        let parent = if parent.is_empty() { "/" } else { parent };
        let parent_id = self.resource_id(stack, parent)?;

        let resource = stack.add_resource(
            &resource_logical_id(path),
            Resource::new("AWS::ApiGateway::Resource")
                .with("RestApiId", self.api.id())
                .with("ParentId", parent_id)
                .with("PathPart", part),
        )?;
        let id = resource.reference();
        self.resources.insert(path.to_string(), id.clone());
        Ok(id)
    }
}

/// Declare the API, its authorizer, the route table, and a `prod` deployment
pub fn declare(
    stack: &mut Stack,
    props: &StackProps,
    compute: &ComputeOutputs,
    user_pool: &UserPoolHandle,
) -> Result<GatewayOutputs> {
    let api_name = props.property(PropertyKey::ApiName)?;
    let authorizer_name = props.property(PropertyKey::AuthorizerName)?;

    let api = stack.add_resource(
        API_LOGICAL_ID,
        Resource::new("AWS::ApiGateway::RestApi").with("Name", api_name),
    )?;
    let api = RestApiHandle {
        resource: api,
        stage: STAGE_NAME.to_string(),
    };

    let authorizer = stack.add_resource(
        AUTHORIZER_LOGICAL_ID,
        Resource::new("AWS::ApiGateway::Authorizer")
            .with("Name", authorizer_name)
            .with("RestApiId", api.id())
            .with("Type", "COGNITO_USER_POOLS")
            .with("IdentitySource", IDENTITY_SOURCE)
            .with("ProviderARNs", Prop::list([user_pool.arn()])),
    )?;

    let mut tree = PathTree::new(&api);
    let mut methods = Vec::new();
    let mut cors_paths: Vec<&str> = Vec::new();

    for route in ROUTES {
        let resource_id = tree.resource_id(stack, route.path)?;
        let method_id = format!("{}{}", resource_logical_id(route.path), route.method);

        let integration = match route.handler {
            Some(kind) => Prop::map([
                ("Type", Prop::from("AWS_PROXY")),
                ("IntegrationHttpMethod", Prop::from("POST")),
                ("Uri", Prop::from(lambda_invocation_uri(compute.handler(kind)))),
            ]),
            None => Prop::map([("Type", Prop::from("MOCK"))]),
        };

        let mut method = Resource::new("AWS::ApiGateway::Method")
            .with("HttpMethod", route.method)
            .with("RestApiId", api.id())
            .with("ResourceId", resource_id.clone())
            .with("Integration", integration);
        method = match route.auth {
            RouteAuth::None => method.with("AuthorizationType", "NONE"),
            RouteAuth::IamWithAuthorizer => method
                .with("AuthorizationType", "AWS_IAM")
                .with("AuthorizerId", authorizer.reference()),
        };
        stack.add_resource(&method_id, method)?;
        methods.push(method_id.clone());

        if let Some(kind) = route.handler {
            stack.add_resource(
                &format!("{}Permission", method_id),
                Resource::new("AWS::Lambda::Permission")
                    .with("Action", "lambda:InvokeFunction")
                    .with("FunctionName", compute.handler(kind).arn())
                    .with("Principal", "apigateway.amazonaws.com")
                    .with("SourceArn", api.execute_api_arn(route.method, route.path)),
            )?;
        }

        if route.cors && !cors_paths.contains(&route.path) {
            let options_id = format!("{}OPTIONS", resource_logical_id(route.path));
            add_cors_options(stack, &options_id, api.id(), resource_id)?;
            methods.push(options_id);
            cors_paths.push(route.path);
        }

        debug!(path = route.path, method = route.method, "declared route");
    }

    let deployment_id = format!("{}Deployment", API_LOGICAL_ID);
    let deployment = methods.iter().fold(
        Resource::new("AWS::ApiGateway::Deployment").with("RestApiId", api.id()),
        |deployment, method| deployment.depends_on(method),
    );
    let deployment = stack.add_resource(&deployment_id, deployment)?;

    stack.add_resource(
        &format!("{}Stage{}", deployment_id, STAGE_NAME),
        Resource::new("AWS::ApiGateway::Stage")
            .with("RestApiId", api.id())
            .with("DeploymentId", deployment.reference())
            .with("StageName", STAGE_NAME),
    )?;

    stack.add_output(
        &format!("{}Endpoint", API_LOGICAL_ID),
        Output::new(api.url()).with_description("REST API endpoint"),
    )?;

    info!(
        stack = stack.name(),
        api = api_name,
        methods = methods.len(),
        "declared gateway"
    );
    Ok(GatewayOutputs {
        api,
        authorizer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::FunctionHandle;
    use crate::cors::cors_headers;

    fn compute() -> ComputeOutputs {
        let handle = |kind: HandlerKind| FunctionHandle {
            kind,
            resource: ResourceRef::new("LambdaStack", kind.logical_id()),
            function_name: format!("Goals-{}", kind.name()),
        };
        ComputeOutputs {
            list: handle(HandlerKind::List),
            create: handle(HandlerKind::Create),
            get: handle(HandlerKind::Get),
            update: handle(HandlerKind::Update),
            delete: handle(HandlerKind::Delete),
        }
    }

    fn user_pool() -> UserPoolHandle {
        UserPoolHandle {
            resource: ResourceRef::new("CognitoStack", "UserPool"),
        }
    }

    fn declared() -> (Stack, GatewayOutputs) {
        let mut stack = Stack::new(STACK_NAME);
        let props = StackProps::builder()
            .merge([("apiName", "Goals-Api"), ("authorizerName", "Goals-Authorizer")])
            .unwrap()
            .build();
        let outputs = declare(&mut stack, &props, &compute(), &user_pool()).unwrap();
        (stack, outputs)
    }

    fn method<'a>(stack: &'a Stack, logical_id: &str) -> &'a Resource {
        stack
            .resource(logical_id)
            .unwrap_or_else(|| panic!("missing method {}", logical_id))
    }

    // ============== Route Table Tests ==============

    #[test]
    fn test_declares_every_route() {
        let (stack, _) = declared();

        // six routes plus one preflight per collection
        assert_eq!(stack.resources_of_type("AWS::ApiGateway::Method").count(), 8);
        assert_eq!(stack.resources_of_type("AWS::ApiGateway::Resource").count(), 2);
        assert_eq!(stack.resources_of_type("AWS::ApiGateway::RestApi").count(), 1);
        assert_eq!(stack.resources_of_type("AWS::ApiGateway::Authorizer").count(), 1);

        for id in [
            "AppApiANY",
            "AppApigoalsGET",
            "AppApigoalsPOST",
            "AppApigoalsidGET",
            "AppApigoalsidPUT",
            "AppApigoalsidDELETE",
        ] {
            method(&stack, id);
        }
    }

    #[test]
    fn test_nested_resource_hangs_off_collection() {
        let (stack, outputs) = declared();

        let goals = stack.resource("AppApigoals").unwrap();
        assert_eq!(
            goals.property("ParentId").and_then(Prop::as_token),
            Some(&outputs.api.root_resource_id())
        );

        let item = stack.resource("AppApigoalsid").unwrap();
        assert_eq!(item.property("PathPart").and_then(Prop::as_str), Some("{id}"));
        assert_eq!(
            item.property("ParentId").and_then(Prop::as_token),
            Some(&ResourceRef::new(STACK_NAME, "AppApigoals").reference())
        );
    }

    #[test]
    fn test_root_is_unauthenticated_mock() {
        let (stack, _) = declared();
        let root = method(&stack, "AppApiANY");

        assert_eq!(root.property("AuthorizationType").and_then(Prop::as_str), Some("NONE"));
        assert!(root.property("AuthorizerId").is_none());
        assert_eq!(
            root.property("Integration").and_then(|i| i.get("Type")).and_then(Prop::as_str),
            Some("MOCK")
        );
        assert!(stack.resource("AppApiANYPermission").is_none());
    }

    #[test]
    fn test_handler_routes_use_proxy_and_authorizer() {
        let (stack, outputs) = declared();

        for route in ROUTES.iter().filter(|r| r.handler.is_some()) {
            let id = format!("{}{}", resource_logical_id(route.path), route.method);
            let m = method(&stack, &id);

            assert_eq!(m.property("AuthorizationType").and_then(Prop::as_str), Some("AWS_IAM"));
            assert_eq!(
                m.property("AuthorizerId").and_then(Prop::as_token),
                Some(&outputs.authorizer.reference())
            );
            assert_eq!(
                m.property("Integration").and_then(|i| i.get("Type")).and_then(Prop::as_str),
                Some("AWS_PROXY")
            );
        }
    }

    #[test]
    fn test_each_handler_route_grants_invoke() {
        let (stack, outputs) = declared();
        let permission = stack.resource("AppApigoalsidPUTPermission").unwrap();

        assert_eq!(
            permission.property("Principal").and_then(Prop::as_str),
            Some("apigateway.amazonaws.com")
        );
        assert_eq!(
            permission.property("FunctionName").and_then(Prop::as_token),
            Some(&compute().update.arn())
        );
        assert_eq!(
            permission.property("SourceArn").and_then(Prop::as_token),
            Some(&outputs.api.execute_api_arn("PUT", "/goals/{id}"))
        );
        assert_eq!(stack.resources_of_type("AWS::Lambda::Permission").count(), 5);
    }

    // ============== CORS Tests ==============

    #[test]
    fn test_cors_routes_expose_options_with_headers() {
        let (stack, _) = declared();

        for route in ROUTES.iter().filter(|r| r.cors) {
            let options = method(&stack, &format!("{}OPTIONS", resource_logical_id(route.path)));
            let parameters = options
                .property("Integration")
                .and_then(|i| i.get("IntegrationResponses"))
                .and_then(|r| r.at(0))
                .and_then(|r| r.get("ResponseParameters"))
                .unwrap();

            for (header, _) in cors_headers() {
                assert!(
                    parameters.get(&format!("method.response.header.{}", header)).is_some(),
                    "{} missing on {}",
                    header,
                    route.path
                );
            }
        }
    }

    // ============== Deployment Tests ==============

    #[test]
    fn test_deployment_waits_for_methods() {
        let (stack, _) = declared();
        let deployment = stack.resource("AppApiDeployment").unwrap();

        assert_eq!(deployment.depends_on.len(), 8);
        assert!(deployment.depends_on.contains(&"AppApigoalsOPTIONS".to_string()));

        let stage = stack.resource("AppApiDeploymentStageprod").unwrap();
        assert_eq!(stage.property("StageName").and_then(Prop::as_str), Some("prod"));
    }

    #[test]
    fn test_endpoint_output_is_stage_url() {
        let (stack, outputs) = declared();
        let endpoint = stack.output("AppApiEndpoint").unwrap();

        assert_eq!(endpoint.value, outputs.api.url());
        assert_eq!(
            endpoint.value.to_string(),
            "https://${ApiGatewayStack.AppApi}.execute-api.${AWS::Region}.${AWS::URLSuffix}/prod/"
        );
    }

    #[test]
    fn test_execute_arn_wildcards_path_parameters() {
        let api = RestApiHandle {
            resource: ResourceRef::new(STACK_NAME, API_LOGICAL_ID),
            stage: STAGE_NAME.to_string(),
        };

        assert!(api
            .execute_api_arn("GET", "/goals/{id}")
            .to_string()
            .ends_with("${ApiGatewayStack.AppApi}/*/GET/goals/*"));
    }
}
