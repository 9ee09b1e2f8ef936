//! gorc CLI entrypoint.
//!
//! This is the main entrypoint for the gorc command-line tool.

use std::path::Path;
use std::process::ExitCode;

use gorc::cli::{Cli, OutputFormatter};
use gorc::config::DocumentParser;
use gorc::error::{DocumentError, GorcError, Result};
use gorc::github::{GitHubClient, GitHubGateway};
use gorc::orchestrator::Orchestrator;
use gorc::state::LocalDocumentStore;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the organization.
const ORG_ENV: &str = "GORC_ORG";

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` wins over the default level.
fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point. Returns whether every operation succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let operations = cli.operations()?;

    let document_dir = cli
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    DocumentParser::new()
        .with_base_path(document_dir)
        .load_dotenv()?;

    let org = organization(cli.org.clone())?;
    let token = DocumentParser::github_token(cli.token.clone())?;
    debug!("Using GitHub API at {}", cli.api_url);

    let client = GitHubClient::with_base_url(&token, &cli.api_url)?;
    let gateway = GitHubGateway::new(client, &org);
    let store = LocalDocumentStore::new(&cli.config);
    let orchestrator = Orchestrator::new(&gateway, &store, cli.settings(&org));
    let formatter = OutputFormatter::new(cli.output);

    let mut success = true;
    for operation in operations {
        match orchestrator.run(operation).await {
            Ok(report) => {
                println!("{}", formatter.format_report(&report));
                success &= report.is_success();
            }
            Err(e) => {
                println!("{}", formatter.format_error(operation, &e));
                return Ok(false);
            }
        }
    }

    Ok(success)
}

/// Resolves the organization, reading `GORC_ORG` again after `.env` is loaded.
fn organization(explicit: Option<String>) -> Result<String> {
    explicit
        .filter(|o| !o.is_empty())
        .or_else(|| std::env::var(ORG_ENV).ok().filter(|o| !o.is_empty()))
        .ok_or_else(|| {
            GorcError::Document(DocumentError::MissingEnvVar {
                name: String::from(ORG_ENV),
            })
        })
}
