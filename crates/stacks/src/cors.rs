//! Preflight OPTIONS method for REST API resources

use shared::{Prop, Resource, ResourceRef, Result, Stack, Token};

pub const ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent";
pub const ALLOW_METHODS: &str = "OPTIONS,GET,PUT,POST,DELETE";
pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_CREDENTIALS: &str = "false";

/// Request template of the mock integration
pub const MOCK_REQUEST_TEMPLATE: &str = r#"{"statusCode": 200}"#;

/// Response headers returned by every preflight, in declaration order
pub fn cors_headers() -> [(&'static str, &'static str); 4] {
    [
        ("Access-Control-Allow-Headers", ALLOW_HEADERS),
        ("Access-Control-Allow-Methods", ALLOW_METHODS),
        ("Access-Control-Allow-Origin", ALLOW_ORIGIN),
        ("Access-Control-Allow-Credentials", ALLOW_CREDENTIALS),
    ]
}

fn response_parameter(header: &str) -> String {
    format!("method.response.header.{}", header)
}

/// Add a mocked `OPTIONS` method answering 200 with the CORS headers to an
/// API resource
pub fn add_cors_options(
    stack: &mut Stack,
    logical_id: &str,
    rest_api_id: Token,
    resource_id: Token,
) -> Result<ResourceRef> {
    let integration_headers = cors_headers()
        .into_iter()
        .map(|(header, value)| (response_parameter(header), Prop::from(format!("'{}'", value))));
    let method_headers = cors_headers()
        .into_iter()
        .map(|(header, _)| (response_parameter(header), Prop::from(true)));

    stack.add_resource(
        logical_id,
        Resource::new("AWS::ApiGateway::Method")
            .with("HttpMethod", "OPTIONS")
            .with("RestApiId", rest_api_id)
            .with("ResourceId", resource_id)
            .with("AuthorizationType", "NONE")
            .with(
                "Integration",
                Prop::map([
                    ("Type", Prop::from("MOCK")),
                    ("PassthroughBehavior", Prop::from("NEVER")),
                    (
                        "RequestTemplates",
                        Prop::map([("application/json", Prop::from(MOCK_REQUEST_TEMPLATE))]),
                    ),
                    (
                        "IntegrationResponses",
                        Prop::list([Prop::map([
                            ("StatusCode", Prop::from("200")),
                            ("ResponseParameters", Prop::map(integration_headers)),
                        ])]),
                    ),
                ]),
            )
            .with(
                "MethodResponses",
                Prop::list([Prop::map([
                    ("StatusCode", Prop::from("200")),
                    ("ResponseParameters", Prop::map(method_headers)),
                ])]),
            ),
    )
}
