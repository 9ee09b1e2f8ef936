//! Repositories and their access bindings.

use serde::{Deserialize, Serialize};

use super::normalize_text;

/// An organization repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    /// Repository name, the identity of the repository.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Homepage URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Whether issues are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_issues: Option<bool>,
    /// Whether projects are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_projects: Option<bool>,
    /// Whether the wiki is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    /// Whether the repository is a template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
    /// Whether squash merging is allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    /// Whether merge commits are allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    /// Whether rebase merging is allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    /// Whether head branches are deleted after merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,
    /// Direct collaborators; `None` leaves them unmanaged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<RepositoryMember>>,
    /// Team bindings; `None` leaves them unmanaged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<RepositoryTeam>>,
}

/// Repository visibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to everyone.
    Public,
    /// Visible to people with access.
    Private,
}

/// A user with direct access to a repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryMember {
    /// GitHub login, compared case-insensitively.
    pub login: String,
    /// Granted permission.
    pub permission: RepoPermission,
}

/// A team with access to a repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryTeam {
    /// Team slug.
    pub slug: String,
    /// Granted permission.
    pub permission: RepoPermission,
}

/// Permission level on a repository.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepoPermission {
    /// Read access.
    #[serde(alias = "pull")]
    Read,
    /// Triage access.
    Triage,
    /// Write access.
    #[serde(alias = "push")]
    Write,
    /// Maintain access.
    Maintain,
    /// Admin access.
    Admin,
}

impl Repository {
    /// Creates a repository record with only a name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            homepage: None,
            visibility: None,
            has_issues: None,
            has_projects: None,
            has_wiki: None,
            is_template: None,
            allow_squash_merge: None,
            allow_merge_commit: None,
            allow_rebase_merge: None,
            delete_branch_on_merge: None,
            members: None,
            teams: None,
        }
    }

    /// Returns a copy with empty strings treated as unset.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            description: normalize_text(self.description.as_ref()),
            homepage: normalize_text(self.homepage.as_ref()),
            ..self.clone()
        }
    }

    /// Returns the repository without its nested access bindings.
    #[must_use]
    pub fn without_bindings(&self) -> Self {
        Self {
            members: None,
            teams: None,
            ..self.clone()
        }
    }
}

impl RepoPermission {
    /// Returns the permission as accepted by the GitHub write endpoints.
    #[must_use]
    pub const fn api_value(self) -> &'static str {
        match self {
            Self::Read => "pull",
            Self::Triage => "triage",
            Self::Write => "push",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for RepoPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Triage => "triage",
            Self::Write => "write",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        };
        write!(f, "{s}")
    }
}
