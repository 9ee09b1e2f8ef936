//! Policies for live entries that the document does not mention.

use serde::{Deserialize, Serialize};

/// Disposition of unknown (live-only) entries, per entity kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Behaviours {
    /// Policy for live teams absent from the document.
    #[serde(default)]
    pub unknown_teams: RemovalPolicy,
    /// Policy for live members absent from the document.
    #[serde(default)]
    pub unknown_members: MemberRemovalPolicy,
    /// Policy for live outside collaborators absent from the document.
    #[serde(default, alias = "unknown_collaborator")]
    pub unknown_collaborators: RemovalPolicy,
}

/// What to do with an unknown team or collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Delete it.
    #[default]
    Remove,
    /// Leave it in place and log a warning.
    Warn,
}

/// What to do with an unknown organization member.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberRemovalPolicy {
    /// Remove them from the organization.
    #[default]
    Remove,
    /// Leave them in place and log a warning.
    Warn,
    /// Downgrade them to an outside collaborator.
    ConvertToOutsideCollaborator,
}

impl MemberRemovalPolicy {
    /// Policy applied to team memberships, where conversion has no meaning.
    #[must_use]
    pub const fn for_team_members(self) -> RemovalPolicy {
        match self {
            Self::Warn => RemovalPolicy::Warn,
            Self::Remove | Self::ConvertToOutsideCollaborator => RemovalPolicy::Remove,
        }
    }
}
