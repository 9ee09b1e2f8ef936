//! Organization members and outside collaborators.

use serde::{Deserialize, Serialize};

/// An organization member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    /// GitHub login, compared case-insensitively.
    pub login: String,
    /// Organization role.
    pub role: MemberRole,
}

/// Role of an organization member.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Organization owner.
    Admin,
    /// Regular member.
    Member,
}

/// An outside collaborator: has repository access but is not a member.
///
/// Serialized as a bare login string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Collaborator {
    /// GitHub login, compared case-insensitively.
    pub login: String,
}

impl Member {
    /// Creates a member record.
    #[must_use]
    pub fn new(login: impl Into<String>, role: MemberRole) -> Self {
        Self {
            login: login.into(),
            role,
        }
    }
}

impl Collaborator {
    /// Creates a collaborator record.
    #[must_use]
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
        }
    }
}

impl MemberRole {
    /// Returns the role as used by the GitHub API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
