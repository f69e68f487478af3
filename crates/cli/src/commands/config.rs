//! Configuration flags shared by `synth` and `props`

use anyhow::Context;
use assembly::{AssemblyConfig, NamingStrategy};
use clap::Args;
use params::{InMemoryParameterStore, ParameterStore, SsmParameterStore, DEFAULT_PROJECT_NAME};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Deployment environment (defaults to the store's default environment)
    #[arg(short, long, env = "FULLSTACK_ENV")]
    pub env: Option<String>,

    /// Prefix of every physical resource name
    #[arg(short, long, env = "FULLSTACK_PROJECT_NAME", default_value = DEFAULT_PROJECT_NAME)]
    pub project_name: String,

    /// Skip the website distribution
    #[arg(long)]
    pub no_cdn: bool,

    /// Read parameters from a YAML file instead of Parameter Store
    #[arg(long)]
    pub params_file: Option<PathBuf>,

    /// Region of the Parameter Store and of the deployment
    #[arg(long)]
    pub region: Option<String>,
}

impl ConfigArgs {
    pub fn assembly_config(&self, naming: NamingStrategy) -> AssemblyConfig {
        AssemblyConfig {
            environment: self.env.clone(),
            project_name: self.project_name.clone(),
            use_cdn: !self.no_cdn,
            naming,
            region: self.region.clone(),
        }
    }

    /// The parameter file when given, Parameter Store otherwise
    pub fn open_store(&self) -> anyhow::Result<Box<dyn ParameterStore>> {
        match &self.params_file {
            Some(path) => {
                debug!(path = %path.display(), "using parameter file");
                let store = InMemoryParameterStore::from_file(path)
                    .with_context(|| format!("Failed to load parameters from {}", path.display()))?;
                Ok(Box::new(store))
            }
            None => {
                debug!(region = ?self.region, "using Parameter Store");
                let store = SsmParameterStore::from_env(self.region.clone())
                    .context("Failed to create Parameter Store client")?;
                Ok(Box::new(store))
            }
        }
    }
}
