//! # Fullstack Assembly
//!
//! Turns resolved configuration into the Goals topology and synthesizes it.
//!
//! ## Usage
//!
//! ```ignore
//! use assembly::{assemble, synth, AssemblyConfig};
//!
//! let topology = assemble(&AssemblyConfig::default(), &store)?;
//! synth(&topology.app)?.write(Path::new("cdk.out"))?;
//! ```

pub mod app;
pub mod manifest;
pub mod synth;
pub mod topology;

pub use app::{App, APP_TAG};
pub use manifest::{AssetManifest, CloudAssembly, Manifest, StackArtifact};
pub use synth::{export_name, synth};
pub use topology::{
    assemble, resolve_props, seed_app, AssemblyConfig, NamingStrategy, Topology, TopologyOutputs,
};
