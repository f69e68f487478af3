//! Pipeline component - build project and two-stage delivery pipeline

use crate::database::RoleHandle;
use crate::gateway::GatewayOutputs;
use crate::identity::IdentityOutputs;
use crate::storage::StorageOutputs;
use params::{PropertyKey, StackProps};
use shared::{PolicyDocument, PolicyStatement, Prop, Pseudo, Resource, ResourceRef, Result, Stack, Token};
use tracing::info;

pub const STACK_NAME: &str = "CodeStack";

/// Object the source stage polls for
pub const SOURCE_OBJECT_KEY: &str = "assets.zip";
pub const SOURCE_ACTION: &str = "s3Source";
pub const BUILD_ACTION: &str = "build-and-deploy";

pub const BUILD_IMAGE: &str = "aws/codebuild/standard:3.0";
pub const BUILD_COMPUTE_TYPE: &str = "BUILD_GENERAL1_SMALL";
pub const BUILD_TIMEOUT_MINUTES: u32 = 5;

const LOG_ACTIONS: [&str; 3] = ["logs:CreateLogStream", "logs:PutLogEvents", "logs:CreateLogGroup"];

/// Handles produced by the pipeline component
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutputs {
    pub build_role: RoleHandle,
    pub pipeline_role: RoleHandle,
    pub project: ResourceRef,
    pub pipeline: ResourceRef,
}

/// Variables handed to the build, sourced from the other components
pub fn build_environment(
    gateway: &GatewayOutputs,
    identity: &IdentityOutputs,
    storage: &StorageOutputs,
) -> Vec<(&'static str, Token)> {
    let api_url = gateway.api.url();
    let api_url = api_url.strip_suffix("/").unwrap_or(api_url);

    vec![
        ("API_GATEWAY_REGION", Pseudo::Region.into()),
        ("API_GATEWAY_URL", api_url),
        ("COGNITO_REGION", Pseudo::Region.into()),
        ("COGNITO_USER_POOL_ID", identity.user_pool.id()),
        ("COGNITO_APP_CLIENT_ID", identity.client.id()),
        ("COGNITO_IDENTITY_POOL_ID", identity.identity_pool.id()),
        ("WEBSITE_BUCKET", storage.website.name()),
    ]
}

/// S3 full access on the three buckets and the website's objects
fn bucket_access(storage: &StorageOutputs) -> PolicyStatement {
    PolicyStatement::allow().with_actions(["s3:*"]).with_resources(
        storage
            .buckets()
            .into_iter()
            .map(|bucket| bucket.arn())
            .chain([storage.website.objects_arn()]),
    )
}

fn declare_role(stack: &mut Stack, logical_id: &str, role_name: &str, service: &str) -> Result<RoleHandle> {
    let resource = stack.add_resource(
        logical_id,
        Resource::new("AWS::IAM::Role")
            .with("RoleName", role_name)
            .with("AssumeRolePolicyDocument", PolicyDocument::assume_role(service).to_prop()),
    )?;
    Ok(RoleHandle { resource })
}

fn attach_policy(stack: &mut Stack, role: &RoleHandle, document: PolicyDocument) -> Result<ResourceRef> {
    let logical_id = format!("{}DefaultPolicy", role.resource.logical_id);
    stack.add_resource(
        &logical_id,
        Resource::new("AWS::IAM::Policy")
            .with("PolicyName", logical_id.as_str())
            .with("Roles", Prop::list([role.name()]))
            .with("PolicyDocument", document.to_prop()),
    )
}

fn artifact(name: &str) -> Prop {
    Prop::list([Prop::map([("Name", Prop::from(name))])])
}

fn action_type(category: &str, provider: &str) -> Prop {
    Prop::map([
        ("Category", Prop::from(category)),
        ("Owner", Prop::from("AWS")),
        ("Provider", Prop::from(provider)),
        ("Version", Prop::from("1")),
    ])
}

pub fn declare(
    stack: &mut Stack,
    props: &StackProps,
    identity: &IdentityOutputs,
    storage: &StorageOutputs,
    gateway: &GatewayOutputs,
) -> Result<PipelineOutputs> {
    let project = props.project_name()?;
    let build_role_name = props.property(PropertyKey::CodeBuildRoleName)?;
    let pipeline_role_name = props.property(PropertyKey::CodePipelineRoleName)?;
    let project_name = props.property(PropertyKey::PipelineProjectName)?;
    let project_description = props.property(PropertyKey::PipelineProjectDescription)?;
    let build_spec = props.property(PropertyKey::PipelineProjectBuildSpec)?;

    let build_role = declare_role(stack, "CodeBuildRole", build_role_name, "codebuild.amazonaws.com")?;
    let build_policy = attach_policy(
        stack,
        &build_role,
        PolicyDocument::new()
            .with_statement(bucket_access(storage))
            .with_statement(
                PolicyStatement::allow()
                    .with_actions(LOG_ACTIONS.into_iter().chain(["cloudfront:CreateInvalidation"]))
                    .with_resources([Token::literal("*")]),
            ),
    )?;

    let variables = build_environment(gateway, identity, storage)
        .into_iter()
        .map(|(name, value)| {
            Prop::map([
                ("Name", Prop::from(name)),
                ("Type", Prop::from("PLAINTEXT")),
                ("Value", Prop::from(value)),
            ])
        })
        .collect::<Vec<_>>();

    let build_project = stack.add_resource(
        "CodeBuildProject",
        Resource::new("AWS::CodeBuild::Project")
            .with("Name", project_name)
            .with("Description", project_description)
            .with("ServiceRole", build_role.arn())
            .with(
                "Source",
                Prop::map([("Type", Prop::from("CODEPIPELINE")), ("BuildSpec", Prop::from(build_spec))]),
            )
            .with("Artifacts", Prop::map([("Type", Prop::from("CODEPIPELINE"))]))
            .with(
                "Environment",
                Prop::map([
                    ("Type", Prop::from("LINUX_CONTAINER")),
                    ("Image", Prop::from(BUILD_IMAGE)),
                    ("ComputeType", Prop::from(BUILD_COMPUTE_TYPE)),
                    ("PrivilegedMode", Prop::from(false)),
                    ("EnvironmentVariables", Prop::from(variables)),
                ]),
            )
            .with("TimeoutInMinutes", BUILD_TIMEOUT_MINUTES)
            .with(
                "Tags",
                Prop::list([Prop::map([("Key", Prop::from("app-name")), ("Value", Prop::from(project))])]),
            )
            .depends_on(&build_policy.logical_id),
    )?;

    let pipeline_role = declare_role(
        stack,
        "CodePipelineRole",
        pipeline_role_name,
        "codepipeline.amazonaws.com",
    )?;
    let pipeline_policy = attach_policy(
        stack,
        &pipeline_role,
        PolicyDocument::new()
            .with_statement(bucket_access(storage))
            .with_statement(
                PolicyStatement::allow()
                    .with_actions(["codebuild:BatchGetBuilds", "codebuild:StartBuild"])
                    .with_resources([build_project.get_att("Arn")]),
            ),
    )?;

    let source_artifact = format!("{}-SourceArtifact", project);
    let build_artifact = format!("{}-BuildArtifact", project);

    let source_stage = Prop::map([
        ("Name", Prop::from("Source")),
        (
            "Actions",
            Prop::list([Prop::map([
                ("Name", Prop::from(SOURCE_ACTION)),
                ("ActionTypeId", action_type("Source", "S3")),
                (
                    "Configuration",
                    Prop::map([
                        ("S3Bucket", Prop::from(storage.source.name())),
                        ("S3ObjectKey", Prop::from(SOURCE_OBJECT_KEY)),
                        ("PollForSourceChanges", Prop::from(true)),
                    ]),
                ),
                ("OutputArtifacts", artifact(&source_artifact)),
                ("RunOrder", Prop::from(1u32)),
            ])]),
        ),
    ]);
    let build_stage = Prop::map([
        ("Name", Prop::from("Build")),
        (
            "Actions",
            Prop::list([Prop::map([
                ("Name", Prop::from(BUILD_ACTION)),
                ("ActionTypeId", action_type("Build", "CodeBuild")),
                (
                    "Configuration",
                    Prop::map([("ProjectName", Prop::from(build_project.reference()))]),
                ),
                ("InputArtifacts", artifact(&source_artifact)),
                ("OutputArtifacts", artifact(&build_artifact)),
                ("RunOrder", Prop::from(1u32)),
            ])]),
        ),
    ]);

    let pipeline = stack.add_resource(
        "AssetsCodePipeline",
        Resource::new("AWS::CodePipeline::Pipeline")
            .with("RoleArn", pipeline_role.arn())
            .with(
                "ArtifactStore",
                Prop::map([
                    ("Type", Prop::from("S3")),
                    ("Location", Prop::from(storage.artifacts.name())),
                ]),
            )
            .with("Stages", Prop::list([source_stage, build_stage]))
            .depends_on(&pipeline_policy.logical_id),
    )?;

    info!(stack = stack.name(), project = project_name, "declared pipeline");
    Ok(PipelineOutputs {
        build_role,
        pipeline_role,
        project: build_project,
        pipeline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RestApiHandle;
    use crate::identity::{IdentityPoolHandle, UserPoolClientHandle, UserPoolHandle};
    use crate::storage::BucketHandle;

    fn bucket(id: &str, name: &str) -> BucketHandle {
        BucketHandle {
            resource: ResourceRef::new("S3Stack", id),
            bucket_name: name.to_string(),
        }
    }

    fn storage() -> StorageOutputs {
        StorageOutputs {
            source: bucket("SourceAssetBucket", "aws-fullstack-template-source-assets-1"),
            website: bucket("WebsiteBucket", "aws-fullstack-template-website-2"),
            artifacts: bucket("PipelineArtifactsBucket", "aws-fullstack-template-codepipeline-artifacts-3"),
        }
    }

    fn identity() -> IdentityOutputs {
        IdentityOutputs {
            user_pool: UserPoolHandle {
                resource: ResourceRef::new("CognitoStack", "UserPool"),
            },
            client: UserPoolClientHandle {
                resource: ResourceRef::new("CognitoStack", "UserPoolClient"),
            },
            identity_pool: IdentityPoolHandle {
                resource: ResourceRef::new("CognitoStack", "IdentityPool"),
            },
        }
    }

    fn gateway() -> GatewayOutputs {
        GatewayOutputs {
            api: RestApiHandle {
                resource: ResourceRef::new("ApiGatewayStack", "AppApi"),
                stage: "prod".to_string(),
            },
            authorizer: ResourceRef::new("ApiGatewayStack", "ApiAuthorizer"),
        }
    }

    fn props() -> StackProps {
        StackProps::builder()
            .merge([
                ("projectName", "Goals"),
                ("codeBuildRoleName", "Goals-CodeBuildRole"),
                ("codePipelineRoleName", "Goals-CodePipelineRole"),
                ("pipelineProjectName", "Goals-build"),
                ("pipelineProjectDescription", "Goals-CodeBuild project"),
                ("pipelineProjectBuildSpec", "buildspec.yml"),
            ])
            .unwrap()
            .build()
    }

    fn declared() -> (Stack, PipelineOutputs) {
        let mut stack = Stack::new(STACK_NAME);
        let outputs = declare(&mut stack, &props(), &identity(), &storage(), &gateway()).unwrap();
        (stack, outputs)
    }

    // ============== Build Project Tests ==============

    #[test]
    fn test_build_environment_variables() {
        let variables = build_environment(&gateway(), &identity(), &storage());
        let names: Vec<_> = variables.iter().map(|(name, _)| *name).collect();

        assert_eq!(
            names,
            vec![
                "API_GATEWAY_REGION",
                "API_GATEWAY_URL",
                "COGNITO_REGION",
                "COGNITO_USER_POOL_ID",
                "COGNITO_APP_CLIENT_ID",
                "COGNITO_IDENTITY_POOL_ID",
                "WEBSITE_BUCKET",
            ]
        );

        let url = &variables[1].1;
        assert!(url.to_string().ends_with("/prod"));
        assert_eq!(variables[6].1, storage().website.name());
    }

    #[test]
    fn test_build_project_settings() {
        let (stack, _) = declared();
        let project = stack.resource("CodeBuildProject").unwrap();
        let environment = project.property("Environment").unwrap();

        assert_eq!(environment.get("Image").and_then(Prop::as_str), Some(BUILD_IMAGE));
        assert_eq!(environment.get("ComputeType").and_then(Prop::as_str), Some("BUILD_GENERAL1_SMALL"));
        assert_eq!(
            environment.get("EnvironmentVariables").and_then(Prop::as_list).map(|v| v.len()),
            Some(7)
        );
        assert_eq!(project.property("TimeoutInMinutes"), Some(&Prop::Int(5)));
        assert_eq!(
            project.property("Source").and_then(|s| s.get("BuildSpec")).and_then(Prop::as_str),
            Some("buildspec.yml")
        );
        assert_eq!(
            project
                .property("Tags")
                .and_then(|t| t.at(0))
                .and_then(|t| t.get("Value"))
                .and_then(Prop::as_str),
            Some("Goals")
        );
    }

    #[test]
    fn test_build_role_covers_buckets_and_logs() {
        let (stack, _) = declared();
        let statements = stack
            .resource("CodeBuildRoleDefaultPolicy")
            .and_then(|p| p.property("PolicyDocument"))
            .and_then(|d| d.get("Statement"))
            .and_then(Prop::as_list)
            .unwrap();

        let buckets = statements[0].get("Resource").and_then(Prop::as_list).unwrap();
        assert_eq!(buckets.len(), 4);
        assert!(buckets.contains(&Prop::from(storage().website.objects_arn())));

        let actions = statements[1].get("Action").and_then(Prop::as_list).unwrap();
        assert!(actions.contains(&Prop::from("cloudfront:CreateInvalidation")));
        assert_eq!(statements[1].get("Resource").and_then(Prop::as_str), Some("*"));
    }

    // ============== Pipeline Tests ==============

    #[test]
    fn test_two_stage_pipeline() {
        let (stack, outputs) = declared();
        let pipeline = stack.resource("AssetsCodePipeline").unwrap();
        let stages = pipeline.property("Stages").and_then(Prop::as_list).unwrap();

        assert_eq!(stages.len(), 2);
        let source = stages[0].get("Actions").and_then(|a| a.at(0)).unwrap();
        assert_eq!(source.get("Name").and_then(Prop::as_str), Some("s3Source"));
        assert_eq!(
            source
                .get("Configuration")
                .and_then(|c| c.get("S3ObjectKey"))
                .and_then(Prop::as_str),
            Some("assets.zip")
        );
        assert_eq!(
            source
                .get("OutputArtifacts")
                .and_then(|a| a.at(0))
                .and_then(|a| a.get("Name"))
                .and_then(Prop::as_str),
            Some("Goals-SourceArtifact")
        );

        let build = stages[1].get("Actions").and_then(|a| a.at(0)).unwrap();
        assert_eq!(build.get("Name").and_then(Prop::as_str), Some("build-and-deploy"));
        assert_eq!(
            build
                .get("Configuration")
                .and_then(|c| c.get("ProjectName"))
                .and_then(Prop::as_token),
            Some(&outputs.project.reference())
        );
    }

    #[test]
    fn test_artifacts_bucket_stores_pipeline_artifacts() {
        let (stack, outputs) = declared();
        let pipeline = stack.resource("AssetsCodePipeline").unwrap();

        assert_eq!(
            pipeline
                .property("ArtifactStore")
                .and_then(|s| s.get("Location"))
                .and_then(Prop::as_token),
            Some(&storage().artifacts.name())
        );
        assert_eq!(
            pipeline.property("RoleArn").and_then(Prop::as_token),
            Some(&outputs.pipeline_role.arn())
        );
    }
}
