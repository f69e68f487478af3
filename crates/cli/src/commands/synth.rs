//! fullstack synth command

use super::config::ConfigArgs;
use anyhow::Context;
use assembly::{assemble, synth, NamingStrategy};
use clap::Args;
use console::style;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SynthCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Directory receiving the cloud assembly
    #[arg(short, long, default_value = "cdk.out")]
    pub output: PathBuf,

    /// Suffix bucket names randomly instead of deriving them from project and environment
    #[arg(long)]
    pub random_bucket_suffix: bool,
}

impl SynthCommand {
    fn naming(&self) -> NamingStrategy {
        if self.random_bucket_suffix {
            NamingStrategy::RandomSuffix
        } else {
            NamingStrategy::Deterministic
        }
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let store = self.config.open_store()?;
        let topology = assemble(&self.config.assembly_config(self.naming()), store.as_ref())
            .context("Failed to assemble topology")?;
        let assembly = synth(&topology.app).context("Failed to synthesize templates")?;
        assembly
            .write(&self.output)
            .with_context(|| format!("Failed to write cloud assembly to {}", self.output.display()))?;

        for name in &assembly.manifest.stack_order {
            let resources = topology
                .app
                .stack(name)
                .map(|stack| stack.resource_count())
                .unwrap_or(0);
            println!("  {} {} ({} resources)", style("✓").green(), name, resources);
        }
        println!(
            "{} {} stacks synthesized to {}",
            style("✓").green().bold(),
            assembly.templates.len(),
            style(self.output.display()).cyan()
        );
        Ok(())
    }
}
