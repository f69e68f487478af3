//! Fullstack CLI - Synthesizes the Goals full-stack topology
//!
//! Usage:
//!   fullstack synth [--env <env>] [--project-name <name>] [--no-cdn]  - Write the cloud assembly
//!   fullstack props [--env <env>] [--project-name <name>]             - Print the resolved properties
//!   fullstack seed [--defaults <yaml>]                                 - Synthesize the parameter seeder

use clap::{Parser, Subcommand};
use cli::commands::{PropsCommand, SeedCommand, SynthCommand};

#[derive(Parser)]
#[command(name = "fullstack")]
#[command(about = "Fullstack - Goals application topology synthesizer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize every stack into a cloud assembly
    Synth(SynthCommand),
    /// Print the resolved stack properties as JSON
    Props(PropsCommand),
    /// Synthesize the stack seeding Parameter Store
    Seed(SeedCommand),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `props` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Synth(cmd) => cmd.run(),
        Commands::Props(cmd) => cmd.run(),
        Commands::Seed(cmd) => cmd.run(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_synth_flags() {
        let cli = Cli::try_parse_from([
            "fullstack",
            "synth",
            "--env",
            "Dev-integration",
            "--project-name",
            "Goals",
            "--no-cdn",
            "--random-bucket-suffix",
            "--output",
            "out",
        ])
        .unwrap();

        match cli.command {
            Commands::Synth(cmd) => {
                assert_eq!(cmd.config.env.as_deref(), Some("Dev-integration"));
                assert_eq!(cmd.config.project_name, "Goals");
                assert!(cmd.config.no_cdn);
                assert!(cmd.random_bucket_suffix);
                assert_eq!(cmd.output, PathBuf::from("out"));
            }
            _ => panic!("expected synth"),
        }
    }

    #[test]
    fn test_parse_seed_defaults() {
        let cli = Cli::try_parse_from(["fullstack", "seed"]).unwrap();

        match cli.command {
            Commands::Seed(cmd) => {
                assert_eq!(cmd.output, PathBuf::from("cdk.out"));
                assert!(cmd.defaults.is_none());
            }
            _ => panic!("expected seed"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["fullstack"]).is_err());
    }
}
