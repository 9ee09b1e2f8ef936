//! GitHub REST API wire types.
//!
//! Responses carry far more than gorc manages; these types keep only the
//! fields that map onto the entity models and convert into them.

use serde::Deserialize;

use crate::models::{
    RepoPermission, Repository, RepositoryMember, RepositoryTeam, Team, TeamPrivacy, Visibility,
};

/// A user as returned by member and collaborator listings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    /// GitHub login.
    pub login: String,
}

/// A direct repository collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCollaborator {
    /// GitHub login.
    pub login: String,
    /// Role on the repository; may name a custom organization role.
    #[serde(default)]
    pub role_name: Option<String>,
    /// Base permission flags.
    #[serde(default)]
    pub permissions: ApiPermissions,
}

/// Permission flags reported for a collaborator.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiPermissions {
    /// Admin access.
    #[serde(default)]
    pub admin: bool,
    /// Maintain access.
    #[serde(default)]
    pub maintain: bool,
    /// Write access.
    #[serde(default)]
    pub push: bool,
    /// Triage access.
    #[serde(default)]
    pub triage: bool,
    /// Read access.
    #[serde(default)]
    pub pull: bool,
}

impl ApiPermissions {
    /// Returns the highest granted permission, read if none is set.
    #[must_use]
    pub const fn highest(self) -> RepoPermission {
        if self.admin {
            RepoPermission::Admin
        } else if self.maintain {
            RepoPermission::Maintain
        } else if self.push {
            RepoPermission::Write
        } else if self.triage {
            RepoPermission::Triage
        } else {
            RepoPermission::Read
        }
    }
}

/// Maps a built-in role name; custom roles yield `None`.
fn builtin_role(name: &str) -> Option<RepoPermission> {
    match name {
        "read" | "pull" => Some(RepoPermission::Read),
        "triage" => Some(RepoPermission::Triage),
        "write" | "push" => Some(RepoPermission::Write),
        "maintain" => Some(RepoPermission::Maintain),
        "admin" => Some(RepoPermission::Admin),
        _ => None,
    }
}

/// Reference to a parent team.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTeamParent {
    /// Parent team slug.
    pub slug: String,
}

/// A team in the organization.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTeam {
    /// Numeric team id, needed to reference a parent team on writes.
    pub id: u64,
    /// Team slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Privacy level.
    #[serde(default)]
    pub privacy: Option<TeamPrivacy>,
    /// Parent team, if nested.
    #[serde(default)]
    pub parent: Option<ApiTeamParent>,
}

/// A team granted access to a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepositoryTeam {
    /// Team slug.
    pub slug: String,
    /// Granted permission (`pull`, `push`, ... on this endpoint).
    pub permission: RepoPermission,
}

/// A repository in the organization.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepository {
    /// Repository name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Homepage URL.
    #[serde(default)]
    pub homepage: Option<String>,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
    /// Issues enabled.
    #[serde(default)]
    pub has_issues: Option<bool>,
    /// Projects enabled.
    #[serde(default)]
    pub has_projects: Option<bool>,
    /// Wiki enabled.
    #[serde(default)]
    pub has_wiki: Option<bool>,
    /// Template repository.
    #[serde(default)]
    pub is_template: Option<bool>,
    /// Squash merging allowed.
    #[serde(default)]
    pub allow_squash_merge: Option<bool>,
    /// Merge commits allowed.
    #[serde(default)]
    pub allow_merge_commit: Option<bool>,
    /// Rebase merging allowed.
    #[serde(default)]
    pub allow_rebase_merge: Option<bool>,
    /// Head branches deleted after merge.
    #[serde(default)]
    pub delete_branch_on_merge: Option<bool>,
}

impl From<ApiTeam> for Team {
    fn from(team: ApiTeam) -> Self {
        Self {
            slug: team.slug,
            name: Some(team.name),
            description: team.description,
            privacy: team.privacy,
            parent: team.parent.map(|p| p.slug),
            members: None,
        }
    }
}

impl From<ApiRepository> for Repository {
    fn from(repo: ApiRepository) -> Self {
        let visibility = if repo.private {
            Visibility::Private
        } else {
            Visibility::Public
        };

        Self {
            description: repo.description,
            homepage: repo.homepage,
            visibility: Some(visibility),
            has_issues: repo.has_issues,
            has_projects: repo.has_projects,
            has_wiki: repo.has_wiki,
            is_template: repo.is_template,
            allow_squash_merge: repo.allow_squash_merge,
            allow_merge_commit: repo.allow_merge_commit,
            allow_rebase_merge: repo.allow_rebase_merge,
            delete_branch_on_merge: repo.delete_branch_on_merge,
            ..Repository::named(repo.name)
        }
    }
}

impl From<ApiCollaborator> for RepositoryMember {
    fn from(collaborator: ApiCollaborator) -> Self {
        Self {
            permission: collaborator
                .role_name
                .as_deref()
                .and_then(builtin_role)
                .unwrap_or_else(|| collaborator.permissions.highest()),
            login: collaborator.login,
        }
    }
}

impl From<ApiRepositoryTeam> for RepositoryTeam {
    fn from(team: ApiRepositoryTeam) -> Self {
        Self {
            slug: team.slug,
            permission: team.permission,
        }
    }
}
