//! Wires the components into an app
//!
//! Configuration is resolved and validated up front; components are then
//! declared in dependency order, each into its own stack, with the typed
//! outputs of earlier components passed to later ones.

use crate::app::{App, APP_TAG};
use params::{
    load_stack_props, resolve_environment, ParameterFile, ParameterStore, ProjectName, PropertyKey,
    StackProps, DEFAULT_PROJECT_NAME,
};
use shared::{Result, Stack};
use stacks::{
    cdn, compute, database, gateway, identity, pipeline, seeder, storage, AccessPolicy, BucketNaming,
    CdnOutputs, ComputeOutputs, DatabaseOutputs, DeterministicNaming, GatewayOutputs,
    IdentityOutputs, PipelineOutputs, RandomSuffixNaming, StorageOutputs,
};
use tracing::info;

/// How bucket names are suffixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    /// Derived from project and environment
    #[default]
    Deterministic,
    /// Fresh random suffix on every run
    RandomSuffix,
}

/// Inputs of an assembly run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyConfig {
    /// Environment override; the store's default environment otherwise
    pub environment: Option<String>,
    pub project_name: String,
    pub use_cdn: bool,
    pub naming: NamingStrategy,
    pub region: Option<String>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            environment: None,
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            use_cdn: true,
            naming: NamingStrategy::default(),
            region: None,
        }
    }
}

/// Outputs of every declared component
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyOutputs {
    pub database: DatabaseOutputs,
    pub storage: StorageOutputs,
    pub cdn: Option<CdnOutputs>,
    pub compute: ComputeOutputs,
    pub identity: IdentityOutputs,
    pub gateway: GatewayOutputs,
    pub pipeline: PipelineOutputs,
}

/// A fully declared topology
#[derive(Debug, Clone)]
pub struct Topology {
    pub app: App,
    pub props: StackProps,
    pub outputs: TopologyOutputs,
}

/// Validate the project name and environment, then read the properties record
pub fn resolve_props(config: &AssemblyConfig, store: &dyn ParameterStore) -> Result<StackProps> {
    let project = ProjectName::parse(&config.project_name)?;
    let environment = resolve_environment(config.environment.as_deref(), store)?;
    let props = load_stack_props(store, &environment, &project, config.use_cdn)?;

    info!(
        project = %project,
        environment = environment.name(),
        properties = props.len(),
        "resolved stack properties"
    );
    Ok(props)
}

/// Declare one component into a fresh stack and add it to the app
fn declare_stack<T>(
    app: &mut App,
    name: &str,
    description: &str,
    declare: impl FnOnce(&mut Stack) -> Result<T>,
) -> Result<T> {
    let mut stack = Stack::new(name).with_description(description);
    let outputs = declare(&mut stack)?;

    info!(stack = name, resources = stack.resource_count(), "stack declared");
    app.add_stack(stack)?;
    Ok(outputs)
}

fn bucket_naming(config: &AssemblyConfig, props: &StackProps) -> Result<Box<dyn BucketNaming>> {
    let naming: Box<dyn BucketNaming> = match config.naming {
        NamingStrategy::Deterministic => {
            Box::new(DeterministicNaming::new(props.project_name()?, props.environment()?))
        }
        NamingStrategy::RandomSuffix => Box::new(RandomSuffixNaming),
    };
    Ok(naming)
}

/// Assemble the Goals topology.
///
/// Fails before any stack is declared when the project name or environment
/// is invalid or a configuration key is missing.
pub fn assemble(config: &AssemblyConfig, store: &dyn ParameterStore) -> Result<Topology> {
    let props = resolve_props(config, store)?;
    let naming = bucket_naming(config, &props)?;

    let mut app = App::new().with_region(config.region.clone());
    app.add_tag(APP_TAG.0, APP_TAG.1);

    let database = declare_stack(&mut app, database::STACK_NAME, "Goals table", |stack| {
        database::declare(
            stack,
            props.property(PropertyKey::TableName)?,
            props.property(PropertyKey::PartitionKeyName)?,
            props.property(PropertyKey::SortKeyName)?,
        )
    })?;

    let storage = declare_stack(&mut app, storage::STACK_NAME, "Website and pipeline buckets", |stack| {
        storage::declare(stack, &props, naming.as_ref())
    })?;

    let cdn = if props.use_cdn()? {
        Some(declare_stack(&mut app, cdn::STACK_NAME, "Website distribution", |stack| {
            cdn::declare(stack, &props, &storage.website)
        })?)
    } else {
        info!("CDN disabled, skipping distribution");
        None
    };

    let access = AccessPolicy::new(database.role.clone());
    let compute = declare_stack(&mut app, compute::STACK_NAME, "Goal handlers", |stack| {
        compute::declare(stack, &props, &database.table, &access)
    })?;

    let identity = declare_stack(&mut app, identity::STACK_NAME, "User directory", |stack| {
        identity::declare(stack, &props)
    })?;

    let gateway = declare_stack(&mut app, gateway::STACK_NAME, "Goals REST API", |stack| {
        gateway::declare(stack, &props, &compute, &identity.user_pool)
    })?;

    let pipeline = declare_stack(&mut app, pipeline::STACK_NAME, "Website build pipeline", |stack| {
        pipeline::declare(stack, &props, &identity, &storage, &gateway)
    })?;

    info!(stacks = app.stacks().len(), "topology assembled");
    Ok(Topology {
        app,
        props,
        outputs: TopologyOutputs {
            database,
            storage,
            cdn,
            compute,
            identity,
            gateway,
            pipeline,
        },
    })
}

/// App holding only the parameter seeder
pub fn seed_app(parameters: &ParameterFile, region: Option<String>) -> Result<App> {
    let mut app = App::new().with_region(region);
    app.add_tag(APP_TAG.0, APP_TAG.1);

    declare_stack(&mut app, seeder::STACK_NAME, "Environment parameters", |stack| {
        seeder::declare(stack, parameters)
    })?;
    Ok(app)
}
