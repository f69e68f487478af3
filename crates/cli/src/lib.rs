//! # Fullstack CLI
//!
//! Command implementations behind the `fullstack` binary.

pub mod commands;
