//! # Fullstack Stacks
//!
//! Component declarations of the Goals topology. Each component writes its
//! resources into a [`shared::Stack`] and returns a typed outputs struct that
//! dependent components take by reference.
//!
//! ## Components
//!
//! - `database` - Goals table and the handler role scoped to it
//! - `storage` - Source, website and pipeline artifact buckets
//! - `cdn` - Distribution over the website bucket
//! - `compute` - The five goal handlers
//! - `identity` - User pool, app client and identity pool
//! - `gateway` - REST API, authorizer and route table (`cors` adds preflights)
//! - `pipeline` - Build project and delivery pipeline
//! - `seeder` - Parameter Store values for every environment

pub mod cdn;
pub mod compute;
pub mod cors;
pub mod database;
pub mod gateway;
pub mod identity;
pub mod naming;
pub mod pipeline;
pub mod seeder;
pub mod storage;

pub use cdn::{CdnOutputs, DistributionHandle};
pub use compute::{AccessPolicy, ComputeOutputs, FunctionHandle, HandlerKind};
pub use database::{DatabaseOutputs, RoleHandle, TableHandle};
pub use gateway::{GatewayOutputs, RestApiHandle, Route, RouteAuth, ROUTES};
pub use identity::{IdentityOutputs, IdentityPoolHandle, UserPoolClientHandle, UserPoolHandle};
pub use naming::{BucketNaming, BucketPurpose, DeterministicNaming, RandomSuffixNaming};
pub use pipeline::PipelineOutputs;
pub use seeder::SeederOutputs;
pub use storage::{BucketHandle, StorageOutputs};
