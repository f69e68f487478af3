//! Compute component - the five goal request handlers

use crate::database::{RoleHandle, TableHandle};
use params::StackProps;
use shared::{
    FileAsset, Packaging, PolicyDocument, PolicyStatement, Prop, Resource, ResourceRef, Result,
    Stack, Token,
};
use tracing::{debug, info};

pub const STACK_NAME: &str = "LambdaStack";

/// Directory bundled as the handlers' deployable artifact
pub const FUNCTIONS_ASSET_PATH: &str = "../functions";

pub const RUNTIME: &str = "nodejs12.x";
pub const MEMORY_SIZE_MB: u32 = 256;
pub const TIMEOUT_SECONDS: u32 = 120;

/// Actions granted by a read-write data grant on a table
pub const TABLE_READ_WRITE_ACTIONS: [&str; 12] = [
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

/// Which operation a handler serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    List,
    Create,
    Get,
    Update,
    Delete,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 5] = [
        HandlerKind::List,
        HandlerKind::Create,
        HandlerKind::Get,
        HandlerKind::Update,
        HandlerKind::Delete,
    ];

    /// Base name of the handler and its artifact entry file
    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::List => "ListGoals",
            HandlerKind::Create => "CreateGoal",
            HandlerKind::Get => "GetGoal",
            HandlerKind::Update => "UpdateGoal",
            HandlerKind::Delete => "DeleteGoal",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HandlerKind::List => "Get list of goals for userId",
            HandlerKind::Create => "Create goal for user id",
            HandlerKind::Get => "Get goal for user id",
            HandlerKind::Update => "Update goal for user id",
            HandlerKind::Delete => "Delete goal for user id",
        }
    }

    pub fn logical_id(&self) -> String {
        format!("Function{}", self.name())
    }
}

/// Declared request handler
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionHandle {
    pub kind: HandlerKind,
    pub resource: ResourceRef,
    pub function_name: String,
}

impl FunctionHandle {
    pub fn name(&self) -> Token {
        self.resource.reference()
    }

    pub fn arn(&self) -> Token {
        self.resource.get_att("Arn")
    }
}

/// Handles produced by the compute component
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeOutputs {
    pub list: FunctionHandle,
    pub create: FunctionHandle,
    pub get: FunctionHandle,
    pub update: FunctionHandle,
    pub delete: FunctionHandle,
}

impl ComputeOutputs {
    pub fn handler(&self, kind: HandlerKind) -> &FunctionHandle {
        match kind {
            HandlerKind::List => &self.list,
            HandlerKind::Create => &self.create,
            HandlerKind::Get => &self.get,
            HandlerKind::Update => &self.update,
            HandlerKind::Delete => &self.delete,
        }
    }

    pub fn handlers(&self) -> [&FunctionHandle; 5] {
        [&self.list, &self.create, &self.get, &self.update, &self.delete]
    }
}

/// Execution role bound to every handler
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPolicy {
    pub role: RoleHandle,
}

impl AccessPolicy {
    pub fn new(role: RoleHandle) -> Self {
        Self { role }
    }
}

fn declare_handler(
    stack: &mut Stack,
    project: &str,
    kind: HandlerKind,
    table: &TableHandle,
    access: &AccessPolicy,
    code: &Prop,
) -> Result<FunctionHandle> {
    let function_name = format!("{}-{}", project, kind.name());
    let resource = stack.add_resource(
        &kind.logical_id(),
        Resource::new("AWS::Lambda::Function")
            .with("FunctionName", function_name.as_str())
            .with("Description", kind.description())
            .with("Runtime", RUNTIME)
            .with("Handler", format!("{}.handler", kind.name()))
            .with("MemorySize", MEMORY_SIZE_MB)
            .with("Timeout", TIMEOUT_SECONDS)
            .with("Role", access.role.arn())
            .with(
                "Environment",
                Prop::map([(
                    "Variables",
                    Prop::map([("TABLE_NAME", Prop::from(table.name()))]),
                )]),
            )
            .with("Code", code.clone()),
    )?;

    debug!(function = %function_name, "declared handler");
    Ok(FunctionHandle {
        kind,
        resource,
        function_name,
    })
}

/// Grant a handler read-write data access on the table through its role
pub fn grant_read_write_data(
    stack: &mut Stack,
    table: &TableHandle,
    handler: &FunctionHandle,
    access: &AccessPolicy,
) -> Result<ResourceRef> {
    let logical_id = format!("{}TableReadWrite", handler.resource.logical_id);
    stack.add_resource(
        &logical_id,
        Resource::new("AWS::IAM::Policy")
            .with("PolicyName", logical_id.as_str())
            .with("Roles", Prop::list([access.role.name()]))
            .with(
                "PolicyDocument",
                PolicyDocument::new()
                    .with_statement(
                        PolicyStatement::allow()
                            .with_actions(TABLE_READ_WRITE_ACTIONS)
                            .with_resources([table.arn()]),
                    )
                    .to_prop(),
            ),
    )
}

/// Declare the five handlers, all bound to the same access policy, then grant
/// each one read-write access to the table
pub fn declare(
    stack: &mut Stack,
    props: &StackProps,
    table: &TableHandle,
    access: &AccessPolicy,
) -> Result<ComputeOutputs> {
    let project = props.project_name()?;

    let asset = stack.add_asset(FileAsset::new(FUNCTIONS_ASSET_PATH, Packaging::ZipDirectory));
    let code = Prop::map([
        ("S3Bucket", Prop::from(asset.bucket)),
        ("S3Key", Prop::from(asset.key)),
    ]);

    let mut handler =
        |kind: HandlerKind| declare_handler(stack, project, kind, table, access, &code);
    let outputs = ComputeOutputs {
        list: handler(HandlerKind::List)?,
        create: handler(HandlerKind::Create)?,
        get: handler(HandlerKind::Get)?,
        update: handler(HandlerKind::Update)?,
        delete: handler(HandlerKind::Delete)?,
    };

    for function in outputs.handlers() {
        grant_read_write_data(stack, table, function, access)?;
    }

    info!(stack = stack.name(), handlers = outputs.handlers().len(), "declared compute");
    Ok(outputs)
}
