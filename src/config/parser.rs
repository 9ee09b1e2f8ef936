//! Desired-state document parser.
//!
//! This module reads the YAML document into a raw value for validation and
//! into the typed [`DesiredState`] for reconciliation, and resolves the
//! credentials a run needs from the environment.

use crate::error::{DocumentError, GorcError, Result};
use crate::models::DesiredState;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of the desired-state document.
pub const DEFAULT_DOCUMENT_PATH: &str = ".github/gorc.yml";

/// Environment variable holding the GitHub token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Parser for desired-state documents.
#[derive(Debug, Default)]
pub struct DocumentParser {
    /// Directory searched for a `.env` file.
    base_path: Option<PathBuf>,
}

impl DocumentParser {
    /// Creates a new document parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for a `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Parses YAML into a raw document value.
    ///
    /// Empty input yields an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn parse_value(&self, content: &str, source: Option<&Path>) -> Result<Value> {
        if content.trim().is_empty() {
            return Ok(Value::Mapping(serde_yaml::Mapping::new()));
        }

        let value: Value = serde_yaml::from_str(content).map_err(|e| {
            DocumentError::parse(
                format!("YAML parse error: {e}"),
                source.map(|p| p.display().to_string()),
            )
        })?;

        Ok(match value {
            Value::Null => Value::Mapping(serde_yaml::Mapping::new()),
            other => other,
        })
    }

    /// Converts a raw document value into the typed desired state.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the document shape.
    pub fn to_state(&self, value: Value) -> Result<DesiredState> {
        let state: DesiredState = serde_yaml::from_value(value)
            .map_err(|e| DocumentError::parse(format!("Invalid document: {e}"), None))?;

        debug!(
            "Parsed document: {} members, {} collaborators, {} teams, {} repositories",
            state.members.as_ref().map_or(0, Vec::len),
            state.collaborators.as_ref().map_or(0, Vec::len),
            state.teams.as_ref().map_or(0, Vec::len),
            state.repos.as_ref().map_or(0, Vec::len),
        );
        Ok(state)
    }

    /// Serializes a desired state as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self, state: &DesiredState) -> Result<String> {
        serde_yaml::to_string(state).map_err(|e| DocumentError::serialization(e.to_string()).into())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                DocumentError::parse(
                    format!("Failed to load .env file: {e}"),
                    Some(env_path.display().to_string()),
                )
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Resolves the GitHub token, preferring an explicit value.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is given and `GITHUB_TOKEN` is unset.
    pub fn github_token(explicit: Option<String>) -> Result<String> {
        explicit
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()))
            .ok_or_else(|| {
                GorcError::Document(DocumentError::MissingEnvVar {
                    name: String::from(TOKEN_ENV),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberRemovalPolicy, TeamRole};

    #[test]
    fn test_parse_document() {
        let yaml = r"
org:
  billing_email: billing@acme.test
  web_commit_signoff_required: true
members:
  - login: octocat
    role: admin
collaborators:
  - contractor
teams:
  - slug: platform
    name: Platform
    privacy: closed
    members:
      - login: octocat
        role: maintainer
behaviors:
  unknown_members: convert_to_outside_collaborator
";
        let parser = DocumentParser::new();
        let state = parser.to_state(parser.parse_value(yaml, None).unwrap()).unwrap();

        assert_eq!(state.org.web_commit_signoff_required, Some(true));
        assert_eq!(state.members.as_ref().map(Vec::len), Some(1));
        assert_eq!(state.collaborators.unwrap()[0].login, "contractor");
        let teams = state.teams.unwrap();
        assert_eq!(teams[0].members.as_ref().unwrap()[0].role, TeamRole::Maintainer);
        assert_eq!(
            state.behaviours.unknown_members,
            MemberRemovalPolicy::ConvertToOutsideCollaborator
        );
        assert!(state.repos.is_none());
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        let parser = DocumentParser::new();
        assert!(parser.parse_value("", None).unwrap().is_mapping());
        assert!(parser.parse_value("# nothing yet\n", None).unwrap().is_mapping());
    }

    #[test]
    fn test_parse_error_carries_location() {
        let err = DocumentParser::new()
            .parse_value("org: [", Some(Path::new("gorc.yml")))
            .unwrap_err();

        match err {
            GorcError::Document(DocumentError::ParseError { location, .. }) => {
                assert_eq!(location.as_deref(), Some("gorc.yml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_yaml_output_parses_back() {
        let parser = DocumentParser::new();
        let value = parser
            .parse_value("org:\n  company: Acme\nmembers: []\n", None)
            .unwrap();
        let state = parser.to_state(value).unwrap();
        let yaml = parser.to_yaml(&state).unwrap();
        let reparsed = parser.to_state(parser.parse_value(&yaml, None).unwrap()).unwrap();
        assert_eq!(reparsed, state);
    }

    #[test]
    fn test_explicit_token_wins() {
        assert_eq!(
            DocumentParser::github_token(Some(String::from("ghp_explicit"))).unwrap(),
            "ghp_explicit"
        );
    }
}
