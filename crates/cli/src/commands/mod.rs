//! CLI Commands

pub mod config;
pub mod props;
pub mod seed;
pub mod synth;

pub use config::ConfigArgs;
pub use props::PropsCommand;
pub use seed::SeedCommand;
pub use synth::SynthCommand;
