//! Remote gateway over the GitHub REST API.
//!
//! The [`Gateway`] trait is the only surface reconcilers talk to. Every list
//! call returns a complete collection; every write either succeeds or
//! returns the mapped API error unmodified.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::{Value, json};
use tracing::debug;

use super::client::GitHubClient;
use super::types::{ApiCollaborator, ApiRepository, ApiRepositoryTeam, ApiTeam, ApiUser};
use crate::error::{DocumentError, GorcError, Result};
use crate::models::{
    Collaborator, Member, MemberRole, Organization, RepoPermission, Repository, RepositoryMember,
    RepositoryTeam, Team, TeamMember, TeamRole,
};

/// Concurrent repository detail fetches while listing.
const DETAIL_CONCURRENCY: usize = 8;

/// Fetch and mutate operations per entity kind.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetches the organization settings.
    async fn get_organization(&self) -> Result<Organization>;

    /// Lists organization members holding `role`.
    async fn list_members(&self, role: MemberRole) -> Result<Vec<Member>>;

    /// Lists outside collaborators of the organization.
    async fn list_outside_collaborators(&self) -> Result<Vec<Collaborator>>;

    /// Lists teams, without their members.
    async fn list_teams(&self) -> Result<Vec<Team>>;

    /// Lists members of a team holding `role`.
    async fn list_team_members(&self, slug: &str, role: TeamRole) -> Result<Vec<TeamMember>>;

    /// Lists repositories, without their access bindings.
    async fn list_repositories(&self) -> Result<Vec<Repository>>;

    /// Lists direct collaborators of a repository.
    async fn list_repository_collaborators(&self, repo: &str) -> Result<Vec<RepositoryMember>>;

    /// Lists teams with access to a repository.
    async fn list_repository_teams(&self, repo: &str) -> Result<Vec<RepositoryTeam>>;

    /// Updates organization settings with the fields set in `org`.
    async fn update_organization(&self, org: &Organization) -> Result<()>;

    /// Invites or updates an organization member.
    async fn add_member(&self, login: &str, role: MemberRole) -> Result<()>;

    /// Removes an organization member.
    async fn remove_member(&self, login: &str) -> Result<()>;

    /// Adds an outside collaborator, converting a member if needed.
    async fn add_outside_collaborator(&self, login: &str) -> Result<()>;

    /// Removes an outside collaborator from every repository.
    async fn remove_outside_collaborator(&self, login: &str) -> Result<()>;

    /// Updates a team, creating it when it does not exist.
    async fn create_or_update_team(&self, team: &Team) -> Result<()>;

    /// Deletes a team.
    async fn delete_team(&self, slug: &str) -> Result<()>;

    /// Adds or updates a team membership.
    async fn add_team_member(&self, slug: &str, login: &str, role: TeamRole) -> Result<()>;

    /// Removes a team membership.
    async fn remove_team_member(&self, slug: &str, login: &str) -> Result<()>;

    /// Updates a repository, creating it when it does not exist.
    async fn create_or_update_repository(&self, repo: &Repository) -> Result<()>;

    /// Grants a user access to a repository.
    async fn add_repository_collaborator(
        &self,
        repo: &str,
        login: &str,
        permission: RepoPermission,
    ) -> Result<()>;

    /// Revokes a user's access to a repository.
    async fn remove_repository_collaborator(&self, repo: &str, login: &str) -> Result<()>;

    /// Grants a team access to a repository.
    async fn add_repository_team(
        &self,
        repo: &str,
        slug: &str,
        permission: RepoPermission,
    ) -> Result<()>;

    /// Revokes a team's access to a repository.
    async fn remove_repository_team(&self, repo: &str, slug: &str) -> Result<()>;
}

/// [`Gateway`] bound to one organization.
#[derive(Debug, Clone)]
pub struct GitHubGateway {
    client: GitHubClient,
    org: String,
}

impl GitHubGateway {
    /// Creates a gateway for `org`.
    #[must_use]
    pub fn new(client: GitHubClient, org: impl Into<String>) -> Self {
        Self {
            client,
            org: org.into(),
        }
    }

    /// Returns the organization login.
    #[must_use]
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Resolves a team slug to its numeric id.
    async fn team_id(&self, slug: &str) -> Result<u64> {
        let team: ApiTeam = self
            .client
            .get(&format!("/orgs/{}/teams/{slug}", self.org))
            .await?;
        Ok(team.id)
    }

    async fn team_body(&self, team: &Team, creating: bool) -> Result<Value> {
        let mut body = json!({});
        match (&team.name, creating) {
            (Some(name), _) => body["name"] = json!(name),
            (None, true) => body["name"] = json!(team.slug),
            (None, false) => {}
        }
        if let Some(description) = &team.description {
            body["description"] = json!(description);
        }
        if let Some(privacy) = team.privacy {
            body["privacy"] = json!(privacy.as_str());
        }
        if let Some(parent) = &team.parent {
            body["parent_team_id"] = json!(self.team_id(parent).await?);
        }
        Ok(body)
    }
}

/// Serializes a record as a JSON request body.
fn to_body<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| DocumentError::serialization(e.to_string()).into())
}

#[async_trait]
impl Gateway for GitHubGateway {
    async fn get_organization(&self) -> Result<Organization> {
        self.client.get(&format!("/orgs/{}", self.org)).await
    }

    async fn list_members(&self, role: MemberRole) -> Result<Vec<Member>> {
        let users: Vec<ApiUser> = self
            .client
            .paginate(&format!("/orgs/{}/members?role={}", self.org, role.as_str()))
            .await?;
        Ok(users.into_iter().map(|u| Member::new(u.login, role)).collect())
    }

    async fn list_outside_collaborators(&self) -> Result<Vec<Collaborator>> {
        let users: Vec<ApiUser> = self
            .client
            .paginate(&format!("/orgs/{}/outside_collaborators", self.org))
            .await?;
        Ok(users.into_iter().map(|u| Collaborator::new(u.login)).collect())
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let teams: Vec<ApiTeam> = self
            .client
            .paginate(&format!("/orgs/{}/teams", self.org))
            .await?;
        Ok(teams.into_iter().map(Team::from).collect())
    }

    async fn list_team_members(&self, slug: &str, role: TeamRole) -> Result<Vec<TeamMember>> {
        let users: Vec<ApiUser> = self
            .client
            .paginate(&format!(
                "/orgs/{}/teams/{slug}/members?role={}",
                self.org,
                role.as_str()
            ))
            .await?;
        Ok(users
            .into_iter()
            .map(|u| TeamMember::new(u.login, role))
            .collect())
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let listed: Vec<ApiRepository> = self
            .client
            .paginate(&format!("/orgs/{}/repos", self.org))
            .await?;
        debug!("Fetching settings for {} repositories", listed.len());

        // The listing omits merge settings, so each repository is read in full.
        stream::iter(listed)
            .map(|repo| async move {
                let full: ApiRepository = self
                    .client
                    .get(&format!("/repos/{}/{}", self.org, repo.name))
                    .await?;
                Ok::<_, GorcError>(Repository::from(full))
            })
            .buffered(DETAIL_CONCURRENCY)
            .try_collect()
            .await
    }

    async fn list_repository_collaborators(&self, repo: &str) -> Result<Vec<RepositoryMember>> {
        let collaborators: Vec<ApiCollaborator> = self
            .client
            .paginate(&format!(
                "/repos/{}/{repo}/collaborators?affiliation=direct",
                self.org
            ))
            .await?;
        Ok(collaborators
            .into_iter()
            .map(RepositoryMember::from)
            .collect())
    }

    async fn list_repository_teams(&self, repo: &str) -> Result<Vec<RepositoryTeam>> {
        let teams: Vec<ApiRepositoryTeam> = self
            .client
            .paginate(&format!("/repos/{}/{repo}/teams", self.org))
            .await?;
        Ok(teams.into_iter().map(RepositoryTeam::from).collect())
    }

    async fn update_organization(&self, org: &Organization) -> Result<()> {
        self.client
            .patch(&format!("/orgs/{}", self.org), &to_body(org)?)
            .await
    }

    async fn add_member(&self, login: &str, role: MemberRole) -> Result<()> {
        let body = json!({ "role": role.as_str() });
        self.client
            .put(
                &format!("/orgs/{}/memberships/{login}", self.org),
                Some(&body),
            )
            .await
    }

    async fn remove_member(&self, login: &str) -> Result<()> {
        self.client
            .delete(&format!("/orgs/{}/members/{login}", self.org))
            .await
    }

    async fn add_outside_collaborator(&self, login: &str) -> Result<()> {
        self.client
            .put(
                &format!("/orgs/{}/outside_collaborators/{login}", self.org),
                None,
            )
            .await
    }

    async fn remove_outside_collaborator(&self, login: &str) -> Result<()> {
        self.client
            .delete(&format!("/orgs/{}/outside_collaborators/{login}", self.org))
            .await
    }

    async fn create_or_update_team(&self, team: &Team) -> Result<()> {
        let path = format!("/orgs/{}/teams/{}", self.org, team.slug);
        match self.client.patch(&path, &self.team_body(team, false).await?).await {
            Err(e) if e.is_not_found() => {
                debug!("Team {} does not exist, creating it", team.slug);
                let body = self.team_body(team, true).await?;
                self.client
                    .post(&format!("/orgs/{}/teams", self.org), &body)
                    .await
            }
            other => other,
        }
    }

    async fn delete_team(&self, slug: &str) -> Result<()> {
        self.client
            .delete(&format!("/orgs/{}/teams/{slug}", self.org))
            .await
    }

    async fn add_team_member(&self, slug: &str, login: &str, role: TeamRole) -> Result<()> {
        let body = json!({ "role": role.as_str() });
        self.client
            .put(
                &format!("/orgs/{}/teams/{slug}/memberships/{login}", self.org),
                Some(&body),
            )
            .await
    }

    async fn remove_team_member(&self, slug: &str, login: &str) -> Result<()> {
        self.client
            .delete(&format!(
                "/orgs/{}/teams/{slug}/memberships/{login}",
                self.org
            ))
            .await
    }

    async fn create_or_update_repository(&self, repo: &Repository) -> Result<()> {
        let body = to_body(&repo.without_bindings())?;
        let path = format!("/repos/{}/{}", self.org, repo.name);
        match self.client.patch(&path, &body).await {
            Err(e) if e.is_not_found() => {
                debug!("Repository {} does not exist, creating it", repo.name);
                self.client
                    .post(&format!("/orgs/{}/repos", self.org), &body)
                    .await
            }
            other => other,
        }
    }

    async fn add_repository_collaborator(
        &self,
        repo: &str,
        login: &str,
        permission: RepoPermission,
    ) -> Result<()> {
        let body = json!({ "permission": permission.api_value() });
        self.client
            .put(
                &format!("/repos/{}/{repo}/collaborators/{login}", self.org),
                Some(&body),
            )
            .await
    }

    async fn remove_repository_collaborator(&self, repo: &str, login: &str) -> Result<()> {
        self.client
            .delete(&format!("/repos/{}/{repo}/collaborators/{login}", self.org))
            .await
    }

    async fn add_repository_team(
        &self,
        repo: &str,
        slug: &str,
        permission: RepoPermission,
    ) -> Result<()> {
        let body = json!({ "permission": permission.api_value() });
        self.client
            .put(
                &format!("/orgs/{0}/teams/{slug}/repos/{0}/{repo}", self.org),
                Some(&body),
            )
            .await
    }

    async fn remove_repository_team(&self, repo: &str, slug: &str) -> Result<()> {
        self.client
            .delete(&format!(
                "/orgs/{0}/teams/{slug}/repos/{0}/{repo}",
                self.org
            ))
            .await
    }
}
