//! Repository reconciler.
//!
//! Repositories are diffed on their scalar settings. Each desired repository
//! that lists `members` or `teams` additionally gets nested access diffs,
//! reported under the repository name. Live-only repositories are never
//! deleted; they are reported with a warning.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::{KindOutcome, ReconcileContext, log_diff, warn_unknown};
use crate::error::{GorcError, Result};
use crate::github::Gateway;
use crate::models::{Repository, RepositoryMember, RepositoryTeam};
use crate::planner::{Diff, Disposition, KindPlan, WriteExecutor, diff_entities};

/// Fetches every live repository together with its access bindings.
///
/// # Errors
///
/// Returns the gateway error if any listing fails.
pub async fn fetch(gateway: &dyn Gateway, executor: WriteExecutor) -> Result<Vec<Repository>> {
    let repos = gateway.list_repositories().await?;
    debug!("Found {} repositories", repos.len());

    stream::iter(repos)
        .map(|repo| async move {
            let (members, teams) = tokio::try_join!(
                gateway.list_repository_collaborators(&repo.name),
                gateway.list_repository_teams(&repo.name),
            )?;
            Ok::<_, GorcError>(Repository {
                members: Some(members),
                teams: Some(teams),
                ..repo
            })
        })
        .buffered(executor.concurrency())
        .try_collect()
        .await
}

/// Access diffs for one desired repository.
struct AccessDiff<'a> {
    name: &'a str,
    members: Option<Diff<RepositoryMember>>,
    teams: Option<Diff<RepositoryTeam>>,
}

/// Reconciles repositories and their access bindings.
///
/// Live-only collaborators of a managed repository follow
/// `unknown_collaborators`; live-only team bindings follow `unknown_teams`.
///
/// # Errors
///
/// Returns the first gateway error; writes already made are kept.
pub async fn reconcile(
    ctx: &ReconcileContext<'_>,
    desired: &[Repository],
) -> Result<KindOutcome<Vec<Repository>>> {
    let desired: Vec<Repository> = desired.iter().map(Repository::normalized).collect();
    let current: Vec<Repository> = ctx
        .gateway
        .list_repositories()
        .await?
        .iter()
        .map(Repository::normalized)
        .collect();
    let diff = diff_entities(&current, &desired);
    let member_disposition = Disposition::from(ctx.behaviours.unknown_collaborators);
    let team_disposition = Disposition::from(ctx.behaviours.unknown_teams);
    log_diff(&diff, ctx.dry_run);

    let access = diff_access(ctx, &current, &desired).await?;
    let mut plan = KindPlan::from_diff(&diff, Disposition::Warn);
    for entry in &access {
        if let Some(members) = &entry.members {
            plan.push_nested(entry.name, members, member_disposition);
        }
        if let Some(teams) = &entry.teams {
            plan.push_nested(entry.name, teams, team_disposition);
        }
    }

    if !ctx.dry_run && plan.has_changes() {
        let gateway = ctx.gateway;
        ctx.executor
            .run(&diff.update, |repo| gateway.create_or_update_repository(repo))
            .await?;
        warn_unknown("organization", &diff.remove);

        let member_grants: Vec<(&str, &RepositoryMember)> = access
            .iter()
            .flat_map(|a| {
                a.members
                    .iter()
                    .flat_map(move |d| d.update.iter().map(move |m| (a.name, m)))
            })
            .collect();
        let team_grants: Vec<(&str, &RepositoryTeam)> = access
            .iter()
            .flat_map(|a| {
                a.teams
                    .iter()
                    .flat_map(move |d| d.update.iter().map(move |t| (a.name, t)))
            })
            .collect();
        tokio::try_join!(
            ctx.executor.run(&member_grants, |(repo, m)| {
                gateway.add_repository_collaborator(repo, &m.login, m.permission)
            }),
            ctx.executor.run(&team_grants, |(repo, t)| {
                gateway.add_repository_team(repo, &t.slug, t.permission)
            }),
        )?;

        for entry in &access {
            let repo = entry.name;
            if let Some(members) = &entry.members {
                ctx.dispose(repo, &members.remove, member_disposition, |m| {
                    gateway.remove_repository_collaborator(repo, &m.login)
                })
                .await?;
            }
            if let Some(teams) = &entry.teams {
                ctx.dispose(repo, &teams.remove, team_disposition, |t| {
                    gateway.remove_repository_team(repo, &t.slug)
                })
                .await?;
            }
        }
    }

    Ok(KindOutcome {
        resolved: desired,
        plan: plan.finish(ctx.dry_run),
    })
}

/// Diffs access bindings of every desired repository that manages them.
///
/// Repositories that do not exist yet are compared against no bindings.
async fn diff_access<'a>(
    ctx: &ReconcileContext<'_>,
    current: &[Repository],
    desired: &'a [Repository],
) -> Result<Vec<AccessDiff<'a>>> {
    let gateway = ctx.gateway;
    let managed = desired
        .iter()
        .filter(|repo| repo.members.is_some() || repo.teams.is_some())
        .map(|repo| (repo, current.iter().any(|c| c.name == repo.name)));

    stream::iter(managed)
        .map(|(repo, exists)| async move {
            let members = match &repo.members {
                Some(desired) => {
                    let live = if exists {
                        gateway.list_repository_collaborators(&repo.name).await?
                    } else {
                        Vec::new()
                    };
                    Some(diff_entities(&live, desired))
                }
                None => None,
            };
            let teams = match &repo.teams {
                Some(desired) => {
                    let live = if exists {
                        gateway.list_repository_teams(&repo.name).await?
                    } else {
                        Vec::new()
                    };
                    Some(diff_entities(&live, desired))
                }
                None => None,
            };
            Ok::<_, GorcError>(AccessDiff {
                name: &repo.name,
                members,
                teams,
            })
        })
        .buffered(ctx.executor.concurrency())
        .try_collect()
        .await
}
