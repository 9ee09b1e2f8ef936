//! Teams and their memberships.

use serde::{Deserialize, Serialize};

use super::normalize_text;

/// An organization team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    /// Team slug, the identity of the team.
    pub slug: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Visibility of the team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy: Option<TeamPrivacy>,
    /// Slug of the parent team, if nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Team members; `None` leaves membership unmanaged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<TeamMember>>,
}

/// Visibility of a team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TeamPrivacy {
    /// Only visible to owners and team members.
    Secret,
    /// Visible to every organization member.
    Closed,
}

/// A member of a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMember {
    /// GitHub login, compared case-insensitively.
    pub login: String,
    /// Role within the team.
    pub role: TeamRole,
}

/// Role within a team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// Regular team member.
    Member,
    /// Team maintainer.
    Maintainer,
}

impl Team {
    /// Returns a copy with empty strings treated as unset.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            slug: self.slug.clone(),
            name: normalize_text(self.name.as_ref()),
            description: normalize_text(self.description.as_ref()),
            privacy: self.privacy,
            parent: normalize_text(self.parent.as_ref()),
            members: self.members.clone(),
        }
    }
}

impl TeamMember {
    /// Creates a team member record.
    #[must_use]
    pub fn new(login: impl Into<String>, role: TeamRole) -> Self {
        Self {
            login: login.into(),
            role,
        }
    }
}

impl TeamPrivacy {
    /// Returns the privacy as used by the GitHub API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secret => "secret",
            Self::Closed => "closed",
        }
    }
}

impl TeamRole {
    /// Returns the role as used by the GitHub API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Maintainer => "maintainer",
        }
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
