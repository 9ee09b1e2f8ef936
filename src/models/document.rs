//! The desired-state document and the state a run resolves to.

use serde::{Deserialize, Serialize};

use super::{Behaviours, Collaborator, Member, Organization, Repository, Team};

/// The root of a `gorc.yml` document.
///
/// A collection left out of the document is not managed at all; an empty
/// list means nothing of that kind should exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DesiredState {
    /// Organization settings.
    #[serde(default)]
    pub org: Organization,
    /// Organization members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Member>>,
    /// Outside collaborators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborators: Option<Vec<Collaborator>>,
    /// Teams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Team>>,
    /// Repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repos: Option<Vec<Repository>>,
    /// Policies for live-only entries.
    #[serde(default, alias = "behaviors")]
    pub behaviours: Behaviours,
}

/// State resolved by a run, one entry per attempted entity kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedState {
    /// Resolved organization settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<Organization>,
    /// Resolved members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Member>>,
    /// Resolved outside collaborators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborators: Option<Vec<Collaborator>>,
    /// Resolved teams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Team>>,
    /// Resolved repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repos: Option<Vec<Repository>>,
}

impl From<&DesiredState> for ResolvedState {
    fn from(state: &DesiredState) -> Self {
        Self {
            org: Some(state.org.clone()),
            members: state.members.clone(),
            collaborators: state.collaborators.clone(),
            teams: state.teams.clone(),
            repos: state.repos.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberRole, RemovalPolicy};

    #[test]
    fn test_parse_document() {
        let yaml = r"
org:
  billing_email: billing@acme.test
members:
  - login: octocat
    role: admin
collaborators:
  - hubot
teams:
  - slug: platform
    name: Platform
    privacy: closed
behaviors:
  unknown_teams: warn
";
        let state: DesiredState = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(state.org.billing_email.as_deref(), Some("billing@acme.test"));
        assert_eq!(state.members.as_ref().map(Vec::len), Some(1));
        assert_eq!(state.members.unwrap()[0].role, MemberRole::Admin);
        assert_eq!(state.collaborators, Some(vec![Collaborator::new("hubot")]));
        assert_eq!(state.repos, None);
        assert_eq!(state.behaviours.unknown_teams, RemovalPolicy::Warn);
    }

    #[test]
    fn test_empty_document_manages_nothing() {
        let state: DesiredState = serde_yaml::from_str("{}").unwrap();
        assert!(state.org.is_empty());
        assert!(state.members.is_none());
        assert!(state.teams.is_none());
    }
}
