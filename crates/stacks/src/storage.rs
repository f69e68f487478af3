//! Storage component - source, website and pipeline artifact buckets

use crate::naming::{validate_bucket_name, BucketNaming, BucketPurpose};
use params::{PropertyKey, StackProps};
use shared::{
    staging_bucket, FileAsset, Packaging, PolicyDocument, PolicyStatement, Principal, Prop, Pseudo,
    RemovalPolicy, Resource, ResourceRef, Result, Stack, Token,
};
use tracing::info;

pub const STACK_NAME: &str = "S3Stack";

/// Bundle of the handler that empties buckets on stack deletion
pub const AUTO_DELETE_HANDLER_ASSET: &str = "./assets/handlers/auto-delete-objects";

/// Bundle of the handler that copies archives into buckets
pub const BUCKET_DEPLOYMENT_HANDLER_ASSET: &str = "./assets/handlers/bucket-deployment";

/// Declared bucket
#[derive(Debug, Clone, PartialEq)]
pub struct BucketHandle {
    pub resource: ResourceRef,
    pub bucket_name: String,
}

impl BucketHandle {
    pub fn name(&self) -> Token {
        self.resource.reference()
    }

    pub fn arn(&self) -> Token {
        self.resource.get_att("Arn")
    }

    /// `<arn>/*`
    pub fn objects_arn(&self) -> Token {
        Token::concat([self.arn(), Token::literal("/*")])
    }

    pub fn regional_domain_name(&self) -> Token {
        self.resource.get_att("RegionalDomainName")
    }
}

/// Handles produced by the storage component
#[derive(Debug, Clone, PartialEq)]
pub struct StorageOutputs {
    pub source: BucketHandle,
    pub website: BucketHandle,
    pub artifacts: BucketHandle,
}

impl StorageOutputs {
    pub fn buckets(&self) -> [&BucketHandle; 3] {
        [&self.source, &self.website, &self.artifacts]
    }
}

/// ACLs are always blocked; public bucket policies only when `block_policy`
fn public_access_block(block_policy: bool) -> Prop {
    Prop::map([
        ("BlockPublicAcls", Prop::from(true)),
        ("BlockPublicPolicy", Prop::from(block_policy)),
        ("IgnorePublicAcls", Prop::from(true)),
        ("RestrictPublicBuckets", Prop::from(block_policy)),
    ])
}

fn lambda_basic_execution() -> Token {
    Token::concat([
        Token::literal("arn:"),
        Pseudo::Partition.into(),
        Token::literal(":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"),
    ])
}

fn staging_bucket_arn(path: &str) -> Token {
    Token::concat([
        Token::literal("arn:"),
        Pseudo::Partition.into(),
        Token::literal(":s3:::"),
        staging_bucket(),
        Token::literal(path),
    ])
}

/// Declare a provider function with its own service role
fn declare_provider(
    stack: &mut Stack,
    logical_id: &str,
    asset_path: &str,
    timeout_seconds: u32,
) -> Result<(ResourceRef, ResourceRef)> {
    let role = stack.add_resource(
        &format!("{}Role", logical_id),
        Resource::new("AWS::IAM::Role")
            .with(
                "AssumeRolePolicyDocument",
                PolicyDocument::assume_role("lambda.amazonaws.com").to_prop(),
            )
            .with("ManagedPolicyArns", Prop::list([lambda_basic_execution()])),
    )?;

    let code = stack.add_asset(FileAsset::new(asset_path, Packaging::ZipDirectory));
    let function = stack.add_resource(
        logical_id,
        Resource::new("AWS::Lambda::Function")
            .with("Runtime", "nodejs12.x")
            .with("Handler", "index.handler")
            .with("MemorySize", 128u32)
            .with("Timeout", timeout_seconds)
            .with("Role", role.get_att("Arn"))
            .with(
                "Code",
                Prop::map([
                    ("S3Bucket", Prop::from(code.bucket)),
                    ("S3Key", Prop::from(code.key)),
                ]),
            )
            .depends_on(&role.logical_id),
    )?;

    Ok((function, role))
}

/// Declare the three buckets, their policies, the auto-delete hooks and the
/// deployment seeding the source bucket
pub fn declare(stack: &mut Stack, props: &StackProps, naming: &dyn BucketNaming) -> Result<StorageOutputs> {
    let index_document = props.property(PropertyKey::WebsiteIndexDocument)?;
    let error_document = props.property(PropertyKey::WebsiteErrorDocument)?;
    let deploy_source = props.property(PropertyKey::S3WebsiteDeploySource)?;

    let mut bucket = |logical_id: &str, purpose: BucketPurpose, resource: Resource| -> Result<BucketHandle> {
        let bucket_name = naming.bucket_name(purpose);
        validate_bucket_name(&bucket_name)?;
        let resource = stack.add_resource(
            logical_id,
            resource
                .with("BucketName", bucket_name.as_str())
                .with_removal_policy(RemovalPolicy::Destroy),
        )?;
        Ok(BucketHandle {
            resource,
            bucket_name,
        })
    };

    let source = bucket(
        "SourceAssetBucket",
        BucketPurpose::SourceAssets,
        Resource::new("AWS::S3::Bucket")
            .with("PublicAccessBlockConfiguration", public_access_block(true))
            .with(
                "VersioningConfiguration",
                Prop::map([("Status", Prop::from("Enabled"))]),
            ),
    )?;
    let website = bucket(
        "WebsiteBucket",
        BucketPurpose::Website,
        Resource::new("AWS::S3::Bucket")
            .with("PublicAccessBlockConfiguration", public_access_block(false))
            .with(
                "WebsiteConfiguration",
                Prop::map([
                    ("IndexDocument", Prop::from(index_document)),
                    ("ErrorDocument", Prop::from(error_document)),
                ]),
            ),
    )?;
    let artifacts = bucket(
        "PipelineArtifactsBucket",
        BucketPurpose::PipelineArtifacts,
        Resource::new("AWS::S3::Bucket")
            .with("PublicAccessBlockConfiguration", public_access_block(true)),
    )?;

    // Auto-delete lifecycle hook
    let (provider, provider_role) =
        declare_provider(stack, "AutoDeleteObjectsProvider", AUTO_DELETE_HANDLER_ASSET, 900)?;

    for (logical_id, handle) in [
        ("SourceAssetBucket", &source),
        ("WebsiteBucket", &website),
        ("PipelineArtifactsBucket", &artifacts),
    ] {
        let mut policy = PolicyDocument::new().with_statement(
            PolicyStatement::allow()
                .with_actions(["s3:GetBucket*", "s3:List*", "s3:DeleteObject*"])
                .with_resources([handle.arn(), handle.objects_arn()])
                .with_principal(Principal::Arn(provider_role.get_att("Arn"))),
        );
        if handle.resource == website.resource {
            policy.add_statement(
                PolicyStatement::allow()
                    .with_actions(["s3:Get*"])
                    .with_resources([handle.objects_arn()])
                    .with_principal(Principal::Any),
            );
        }

        let policy_id = format!("{}Policy", logical_id);
        stack.add_resource(
            &policy_id,
            Resource::new("AWS::S3::BucketPolicy")
                .with("Bucket", handle.name())
                .with("PolicyDocument", policy.to_prop()),
        )?;

        stack.add_resource(
            &format!("{}AutoDeleteObjects", logical_id),
            Resource::new("Custom::S3AutoDeleteObjects")
                .with("ServiceToken", provider.get_att("Arn"))
                .with("BucketName", handle.name())
                .depends_on(policy_id)
                .with_removal_policy(RemovalPolicy::Destroy),
        )?;
    }

    // Seed the source bucket from the local archive
    let archive = stack.add_asset(FileAsset::new(deploy_source, Packaging::ZipDirectory));
    let (deployer, deployer_role) =
        declare_provider(stack, "BucketDeploymentProvider", BUCKET_DEPLOYMENT_HANDLER_ASSET, 900)?;
    stack.add_resource(
        "BucketDeploymentProviderRolePolicy",
        Resource::new("AWS::IAM::Policy")
            .with("PolicyName", "BucketDeploymentProviderRolePolicy")
            .with("Roles", Prop::list([deployer_role.reference()]))
            .with(
                "PolicyDocument",
                PolicyDocument::new()
                    .with_statement(
                        PolicyStatement::allow()
                            .with_actions(["s3:GetObject*", "s3:GetBucket*", "s3:List*"])
                            .with_resources([staging_bucket_arn(""), staging_bucket_arn("/*")]),
                    )
                    .with_statement(
                        PolicyStatement::allow()
                            .with_actions([
                                "s3:GetObject*",
                                "s3:GetBucket*",
                                "s3:List*",
                                "s3:DeleteObject*",
                                "s3:PutObject*",
                                "s3:Abort*",
                            ])
                            .with_resources([source.arn(), source.objects_arn()]),
                    )
                    .to_prop(),
            ),
    )?;
    stack.add_resource(
        "S3WebsiteDeploy",
        Resource::new("Custom::CDKBucketDeployment")
            .with("ServiceToken", deployer.get_att("Arn"))
            .with("SourceBucketNames", Prop::list([archive.bucket]))
            .with("SourceObjectKeys", Prop::list([archive.key]))
            .with("DestinationBucketName", source.name())
            .with("Prune", true)
            .depends_on("BucketDeploymentProviderRolePolicy"),
    )?;

    info!(
        stack = stack.name(),
        source = %source.bucket_name,
        website = %website.bucket_name,
        artifacts = %artifacts.bucket_name,
        "declared storage"
    );
    Ok(StorageOutputs {
        source,
        website,
        artifacts,
    })
}
