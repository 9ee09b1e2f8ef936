//! GitHub API integration module.
//!
//! This module provides the REST client and the [`Gateway`] the reconcilers
//! use to read live state and write changes.

mod client;
mod gateway;
mod types;

pub use client::{GITHUB_API_URL, GitHubClient};
pub use gateway::{GitHubGateway, Gateway};
#[cfg(test)]
pub use gateway::MockGateway;
