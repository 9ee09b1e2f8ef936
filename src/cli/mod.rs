//! CLI module for gorc.
//!
//! This module provides the command-line interface for reconciling a
//! GitHub organization.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
