//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_DOCUMENT_PATH;
use crate::error::Result;
use crate::github::GITHUB_API_URL;
use crate::orchestrator::{Operation, RunSettings};
use crate::planner::DEFAULT_CONCURRENCY;

/// gorc - Declarative GitHub organization reconciliation.
#[derive(Parser, Debug)]
#[command(name = "gorc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Organization login.
    #[arg(long, global = true, env = "GORC_ORG")]
    pub org: Option<String>,

    /// Path to the desired-state document.
    #[arg(short, long, global = true, env = "GORC_CONFIG", default_value = DEFAULT_DOCUMENT_PATH)]
    pub config: PathBuf,

    /// GitHub token.
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub REST API base URL.
    #[arg(long, global = true, env = "GITHUB_API_URL", default_value = GITHUB_API_URL)]
    pub api_url: String,

    /// Reconcile repositories as well.
    #[arg(long, global = true)]
    pub repositories: bool,

    /// Maximum concurrent writes per batch.
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the document from the organization's live state.
    Init,

    /// Validate the document.
    Validate,

    /// Show what apply would change.
    DryRun,

    /// Make the organization match the document.
    Apply,

    /// Run operations in order, e.g. `validate,dry-run`.
    Run {
        /// Comma-separated operation names.
        operations: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Resolves the operations to run, in order.
    ///
    /// # Errors
    ///
    /// Returns an unknown-operation error for an unknown name in `run`.
    pub fn operations(&self) -> Result<Vec<Operation>> {
        match &self.command {
            Commands::Init => Ok(vec![Operation::Init]),
            Commands::Validate => Ok(vec![Operation::Validate]),
            Commands::DryRun => Ok(vec![Operation::DryRun]),
            Commands::Apply => Ok(vec![Operation::Apply]),
            Commands::Run { operations } => Operation::parse_list(operations),
        }
    }

    /// Builds run settings for `organization`.
    #[must_use]
    pub fn settings(&self, organization: &str) -> RunSettings {
        RunSettings {
            include_repositories: self.repositories,
            concurrency: self.concurrency.max(1),
            ..RunSettings::new(organization)
        }
    }
}
