//! fullstack props command

use super::config::ConfigArgs;
use anyhow::Context;
use assembly::{resolve_props, NamingStrategy};
use clap::Args;

#[derive(Debug, Args)]
pub struct PropsCommand {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl PropsCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let store = self.config.open_store()?;
        let config = self.config.assembly_config(NamingStrategy::default());
        let props = resolve_props(&config, store.as_ref()).context("Failed to resolve stack properties")?;

        println!("{}", serde_json::to_string_pretty(&props.to_json())?);
        Ok(())
    }
}
