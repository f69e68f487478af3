//! fullstack seed command

use anyhow::Context;
use assembly::{seed_app, synth};
use clap::Args;
use console::style;
use params::ParameterFile;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SeedCommand {
    /// Directory receiving the cloud assembly
    #[arg(short, long, default_value = "cdk.out")]
    pub output: PathBuf,

    /// YAML file of values to seed (built-in defaults otherwise)
    #[arg(long)]
    pub defaults: Option<PathBuf>,

    /// Deployment region
    #[arg(long)]
    pub region: Option<String>,
}

impl SeedCommand {
    fn parameters(&self) -> anyhow::Result<ParameterFile> {
        match &self.defaults {
            Some(path) => ParameterFile::from_file(path)
                .with_context(|| format!("Failed to load defaults from {}", path.display())),
            None => Ok(ParameterFile::defaults()),
        }
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let parameters = self.parameters()?;
        let app = seed_app(&parameters, self.region.clone()).context("Failed to declare seeder")?;
        let assembly = synth(&app)?;
        assembly
            .write(&self.output)
            .with_context(|| format!("Failed to write cloud assembly to {}", self.output.display()))?;

        println!(
            "{} {} parameters synthesized to {}",
            style("✓").green().bold(),
            parameters.parameters().len(),
            style(self.output.display()).cyan()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_seed_with_custom_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = dir.path().join("defaults.yaml");
        std::fs::write(
            &defaults,
            "defaultEnvironment: Dev-integration\nenvironments:\n  Dev-integration:\n    tableName: Goals\n",
        )
        .unwrap();

        let command = SeedCommand {
            output: dir.path().join("out"),
            defaults: Some(defaults),
            region: None,
        };
        command.run().unwrap();

        let template: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("out/SsmSeederStack.template.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(template["Resources"].as_object().unwrap().len(), 2);
    }
}
