// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments

// ============================================================================
// Crate Documentation
// ============================================================================

//! # gorc
//!
//! Declarative reconciliation of a GitHub organization.
//!
//! ## Overview
//!
//! A YAML document describes how an organization should look: its
//! settings, members, outside collaborators, teams and, optionally,
//! repositories. gorc compares that document with the organization's live
//! state and either reports the differences (`dry-run`) or writes them
//! (`apply`). Live entries the document does not mention are removed, left
//! in place with a warning, or (for members) converted to outside
//! collaborators, as the document's `behaviours` say.
//!
//! ## Architecture
//!
//! 1. **Desired state**: the document, checked by the validation gate
//! 2. **Live state**: fetched through the [`github::Gateway`]
//! 3. **Reconcilers**: one per entity kind, run in a fixed order by the
//!    [`orchestrator::Orchestrator`]; a failing kind does not stop the run
//!
//! ## Modules
//!
//! - [`config`]: Document parsing, validation and fingerprinting
//! - [`models`]: Desired-state data model
//! - [`planner`]: Diff engine, change reports and bounded write fan-out
//! - [`reconciler`]: Per-kind reconcilers
//! - [`github`]: GitHub REST client and gateway
//! - [`state`]: Document storage
//! - [`orchestrator`]: Operations and run reports
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! org:
//!   company: Acme
//!   default_repository_permission: read
//!
//! members:
//!   - login: octocat
//!     role: admin
//!
//! teams:
//!   - slug: platform
//!     name: Platform
//!     privacy: closed
//!     members:
//!       - login: octocat
//!         role: maintainer
//!
//! behaviours:
//!   unknown_members: convert_to_outside_collaborator
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod models;
pub mod orchestrator;
pub mod planner;
pub mod reconciler;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{DocumentParser, StateHasher, ValidationGate};
pub use error::{GorcError, Result};
pub use github::{GitHubClient, GitHubGateway, Gateway};
pub use models::{DesiredState, ResolvedState};
pub use orchestrator::{Operation, Orchestrator, Report, RunSettings};
pub use planner::{Diff, KindPlan, WriteExecutor};
pub use state::{DocumentStore, LocalDocumentStore};
