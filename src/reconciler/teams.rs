//! Team reconciler.
//!
//! Teams are diffed on their own fields; each desired team that lists
//! `members` additionally gets a nested membership diff, reported under the
//! team slug. New teams are created parents first.
//!
//! GitHub lists a team's members together with the members of its child
//! teams. Those inherited logins are not treated as direct members unless
//! the document lists them.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::{KindOutcome, ReconcileContext, log_diff};
use crate::error::{GorcError, ReconcileError, Result};
use crate::github::Gateway;
use crate::models::{Team, TeamMember, TeamRole, same_login};
use crate::planner::{Diff, Disposition, EntityKind, KindPlan, WriteExecutor, diff_entities};

/// Fetches every live team together with its members.
///
/// # Errors
///
/// Returns the gateway error if any listing fails.
pub async fn fetch(gateway: &dyn Gateway, executor: WriteExecutor) -> Result<Vec<Team>> {
    let teams = gateway.list_teams().await?;
    debug!("Found {} teams", teams.len());
    let all = &teams;

    stream::iter(all)
        .map(|team| async move {
            let members = direct_members(gateway, all, &team.slug, &[]).await?;
            Ok::<_, GorcError>(Team {
                members: Some(members),
                ..team.clone()
            })
        })
        .buffered(executor.concurrency())
        .try_collect()
        .await
}

/// Fetches the members of one team, maintainers first.
///
/// # Errors
///
/// Returns the gateway error if either listing fails.
pub async fn fetch_members(gateway: &dyn Gateway, slug: &str) -> Result<Vec<TeamMember>> {
    let (maintainers, members) = tokio::try_join!(
        gateway.list_team_members(slug, TeamRole::Maintainer),
        gateway.list_team_members(slug, TeamRole::Member),
    )?;
    Ok(maintainers.into_iter().chain(members).collect())
}

/// Fetches the members of one team without those inherited from its child
/// teams, unless `keep` lists them.
async fn direct_members(
    gateway: &dyn Gateway,
    teams: &[Team],
    slug: &str,
    keep: &[TeamMember],
) -> Result<Vec<TeamMember>> {
    let live = fetch_members(gateway, slug).await?;
    let mut inherited = Vec::new();
    for child in teams.iter().filter(|t| t.parent.as_deref() == Some(slug)) {
        inherited.extend(fetch_members(gateway, &child.slug).await?);
    }
    if !inherited.is_empty() {
        debug!("Team {slug} inherits {} members from child teams", inherited.len());
    }

    Ok(live
        .into_iter()
        .filter(|m| {
            keep.iter().any(|k| same_login(&k.login, &m.login))
                || !inherited.iter().any(|i| same_login(&i.login, &m.login))
        })
        .collect())
}

/// A membership diff for one desired team.
struct MemberDiff<'a> {
    slug: &'a str,
    diff: Diff<TeamMember>,
}

/// Reconciles teams and their memberships.
///
/// Live-only teams follow `unknown_teams`; live-only memberships of a
/// managed team follow `unknown_members`, where conversion means removal
/// from the team.
///
/// # Errors
///
/// Returns the first gateway error; writes already made are kept.
/// Returns a reconcile error if team parents form a cycle.
pub async fn reconcile(
    ctx: &ReconcileContext<'_>,
    desired: &[Team],
) -> Result<KindOutcome<Vec<Team>>> {
    let desired: Vec<Team> = desired.iter().map(Team::normalized).collect();
    let current = ctx.gateway.list_teams().await?;
    let diff = diff_entities(&current, &desired);
    let team_disposition = Disposition::from(ctx.behaviours.unknown_teams);
    let member_disposition = Disposition::from(ctx.behaviours.unknown_members.for_team_members());
    log_diff(&diff, ctx.dry_run);

    let member_diffs = diff_members(ctx, &current, &desired).await?;
    let mut plan = KindPlan::from_diff(&diff, team_disposition);
    for nested in &member_diffs {
        plan.push_nested(nested.slug, &nested.diff, member_disposition);
    }

    if !ctx.dry_run && plan.has_changes() {
        let gateway = ctx.gateway;
        create_in_waves(ctx, &diff.update).await?;
        let unknown = if team_disposition == Disposition::Remove {
            without_cascaded(&diff.remove)
        } else {
            diff.remove.clone()
        };
        ctx.dispose("organization", &unknown, team_disposition, |t| {
            delete_team(gateway, &t.slug)
        })
        .await?;

        let additions: Vec<(&str, &TeamMember)> = member_diffs
            .iter()
            .flat_map(|n| n.diff.update.iter().map(move |m| (n.slug, m)))
            .collect();
        ctx.executor
            .run(&additions, |(slug, m)| {
                gateway.add_team_member(slug, &m.login, m.role)
            })
            .await?;

        for nested in &member_diffs {
            let slug = nested.slug;
            ctx.dispose(slug, &nested.diff.remove, member_disposition, |m| {
                gateway.remove_team_member(slug, &m.login)
            })
            .await?;
        }
    }

    Ok(KindOutcome {
        resolved: desired,
        plan: plan.finish(ctx.dry_run),
    })
}

/// Diffs memberships of every desired team that manages its members.
///
/// Teams that do not exist yet are compared against no members.
async fn diff_members<'a>(
    ctx: &ReconcileContext<'_>,
    current: &[Team],
    desired: &'a [Team],
) -> Result<Vec<MemberDiff<'a>>> {
    let gateway = ctx.gateway;
    let managed = desired.iter().filter_map(|team| {
        team.members
            .as_deref()
            .map(|members| (team, members, current.iter().any(|c| c.slug == team.slug)))
    });

    stream::iter(managed)
        .map(|(team, members, exists)| async move {
            let live = if exists {
                direct_members(gateway, current, &team.slug, members).await?
            } else {
                Vec::new()
            };
            Ok::<_, GorcError>(MemberDiff {
                slug: &team.slug,
                diff: diff_entities(&live, members),
            })
        })
        .buffered(ctx.executor.concurrency())
        .try_collect()
        .await
}

/// Drops teams whose parent is deleted too; GitHub deletes child teams
/// with their parent.
fn without_cascaded(teams: &[Team]) -> Vec<Team> {
    teams
        .iter()
        .filter(|team| {
            team.parent
                .as_ref()
                .is_none_or(|parent| !teams.iter().any(|t| &t.slug == parent))
        })
        .cloned()
        .collect()
}

/// Deletes a team, counting one that is already gone as deleted.
async fn delete_team(gateway: &dyn Gateway, slug: &str) -> Result<()> {
    match gateway.delete_team(slug).await {
        Err(e) if e.is_not_found() => {
            debug!("Team {slug} was already deleted");
            Ok(())
        }
        other => other,
    }
}

/// Creates or updates teams so that every parent exists before its children.
///
/// Each wave holds the teams whose parent is not itself pending.
async fn create_in_waves(ctx: &ReconcileContext<'_>, teams: &[Team]) -> Result<()> {
    let gateway = ctx.gateway;
    let mut pending: Vec<&Team> = teams.iter().collect();

    while !pending.is_empty() {
        let (ready, blocked): (Vec<&Team>, Vec<&Team>) =
            pending.iter().copied().partition(|team| {
                team.parent
                    .as_ref()
                    .is_none_or(|parent| !pending.iter().any(|p| &p.slug == parent))
            });

        if ready.is_empty() {
            let slugs: Vec<&str> = blocked.iter().map(|t| t.slug.as_str()).collect();
            return Err(ReconcileError::KindFailed {
                kind: EntityKind::Teams.to_string(),
                reason: format!("team parents form a cycle: {}", slugs.join(", ")),
            }
            .into());
        }

        debug!("Writing a wave of {} teams", ready.len());
        ctx.executor
            .run(&ready, |team| gateway.create_or_update_team(team))
            .await?;
        pending = blocked;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitHubError;
    use crate::github::MockGateway;
    use crate::models::{Behaviours, MemberRemovalPolicy, RemovalPolicy, TeamPrivacy};
    use crate::planner::SyncStatus;
    use std::sync::{Arc, Mutex};

    fn team(slug: &str, parent: Option<&str>) -> Team {
        Team {
            slug: slug.to_string(),
            name: Some(slug.to_string()),
            description: None,
            privacy: Some(TeamPrivacy::Closed),
            parent: parent.map(String::from),
            members: None,
        }
    }

    fn gateway_with_live() -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list_teams()
            .returning(|| Ok(vec![team("platform", None), team("legacy", None)]));
        gateway
            .expect_list_team_members()
            .returning(|slug, role| {
                Ok(match (slug, role) {
                    ("platform", TeamRole::Maintainer) => {
                        vec![TeamMember::new("lead", TeamRole::Maintainer)]
                    }
                    ("platform", TeamRole::Member) => {
                        vec![TeamMember::new("dev", TeamRole::Member)]
                    }
                    _ => Vec::new(),
                })
            });
        gateway
    }

    #[tokio::test]
    async fn test_parents_are_created_before_children() {
        let mut gateway = gateway_with_live();
        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&order);
        gateway
            .expect_create_or_update_team()
            .returning(move |t| {
                seen.lock().unwrap().push(t.slug.clone());
                Ok(())
            });
        gateway.expect_delete_team().returning(|_| Ok(()));

        let desired = vec![
            team("sre", Some("infra")),
            team("infra", Some("platform")),
            team("platform", None),
        ];
        let behaviours = Behaviours::default();
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let outcome = reconcile(&ctx, &desired).await.unwrap();

        assert_eq!(outcome.plan.update, vec!["sre", "infra"]);
        assert_eq!(outcome.plan.remove, vec!["legacy"]);
        assert_eq!(*order.lock().unwrap(), vec!["infra", "sre"]);
    }

    #[tokio::test]
    async fn test_parent_cycle_is_rejected() {
        let mut gateway = gateway_with_live();
        gateway.expect_create_or_update_team().never();

        let desired = vec![team("a", Some("b")), team("b", Some("a"))];
        let behaviours = Behaviours {
            unknown_teams: RemovalPolicy::Warn,
            ..Behaviours::default()
        };
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let err = reconcile(&ctx, &desired).await.unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[tokio::test]
    async fn test_member_diff_is_nested_under_team() {
        let mut gateway = gateway_with_live();
        gateway
            .expect_add_team_member()
            .withf(|slug, login, role| {
                slug == "platform" && login == "DEV" && *role == TeamRole::Maintainer
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        gateway
            .expect_remove_team_member()
            .withf(|slug, login| slug == "platform" && login == "lead")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut platform = team("platform", None);
        platform.members = Some(vec![TeamMember::new("DEV", TeamRole::Maintainer)]);
        let behaviours = Behaviours {
            unknown_teams: RemovalPolicy::Warn,
            unknown_members: MemberRemovalPolicy::ConvertToOutsideCollaborator,
            ..Behaviours::default()
        };
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let outcome = reconcile(&ctx, &[platform]).await.unwrap();

        assert!(outcome.plan.update.is_empty());
        assert_eq!(outcome.plan.nested.len(), 1);
        let nested = &outcome.plan.nested[0];
        assert_eq!(nested.kind, EntityKind::TeamMembers);
        assert_eq!(nested.parent, "platform");
        assert_eq!(nested.update, vec!["DEV"]);
        assert_eq!(nested.remove, vec!["lead"]);
        assert_eq!(nested.disposition, Disposition::Remove);
        assert_eq!(outcome.plan.status, SyncStatus::Applied);
    }

    #[tokio::test]
    async fn test_new_team_members_are_all_updates() {
        let gateway = gateway_with_live();
        let mut fresh = team("fresh", None);
        fresh.members = Some(vec![TeamMember::new("dev", TeamRole::Member)]);

        let behaviours = Behaviours {
            unknown_teams: RemovalPolicy::Warn,
            ..Behaviours::default()
        };
        let ctx = ReconcileContext::new(&gateway, &behaviours, true, WriteExecutor::default());
        let outcome = reconcile(&ctx, &[fresh]).await.unwrap();

        assert_eq!(outcome.plan.update, vec!["fresh"]);
        assert_eq!(outcome.plan.nested[0].update, vec!["dev"]);
        assert_eq!(outcome.plan.status, SyncStatus::Planned);
    }

    #[tokio::test]
    async fn test_fetch_includes_members() {
        let gateway = gateway_with_live();
        let teams = fetch(&gateway, WriteExecutor::default()).await.unwrap();

        assert_eq!(teams.len(), 2);
        let members = teams[0].members.as_ref().unwrap();
        assert_eq!(members[0], TeamMember::new("lead", TeamRole::Maintainer));
        assert_eq!(members[1], TeamMember::new("dev", TeamRole::Member));
        assert_eq!(teams[1].members, Some(Vec::new()));
    }
    #[tokio::test]
    async fn test_child_of_deleted_parent_is_left_to_cascade() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list_teams()
            .returning(|| Ok(vec![team("parent", None), team("child", Some("parent"))]));
        gateway
            .expect_delete_team()
            .withf(|slug| slug == "parent")
            .times(1)
            .returning(|_| Ok(()));
        gateway
            .expect_delete_team()
            .withf(|slug| slug == "child")
            .never();

        let behaviours = Behaviours::default();
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let outcome = reconcile(&ctx, &[]).await.unwrap();

        assert_eq!(outcome.plan.remove, vec!["parent", "child"]);
        assert_eq!(outcome.plan.status, SyncStatus::Applied);
    }

    #[tokio::test]
    async fn test_team_already_deleted_counts_as_removed() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list_teams()
            .returning(|| Ok(vec![team("gone", None), team("stale", None)]));
        gateway
            .expect_delete_team()
            .withf(|slug| slug == "gone")
            .times(1)
            .returning(|_| {
                Err(GitHubError::NotFound {
                    resource: String::from("/orgs/acme/teams/gone"),
                }
                .into())
            });
        gateway
            .expect_delete_team()
            .withf(|slug| slug == "stale")
            .times(1)
            .returning(|_| Ok(()));

        let behaviours = Behaviours::default();
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let outcome = reconcile(&ctx, &[]).await.unwrap();

        assert_eq!(outcome.plan.status, SyncStatus::Applied);
    }

    fn gateway_with_child_team() -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list_teams()
            .returning(|| Ok(vec![team("eng", None), team("web", Some("eng"))]));
        gateway
            .expect_list_team_members()
            .returning(|slug, role| {
                Ok(match (slug, role) {
                    ("eng", TeamRole::Maintainer) => {
                        vec![TeamMember::new("lead", TeamRole::Maintainer)]
                    }
                    ("eng", TeamRole::Member) => vec![
                        TeamMember::new("Dev", TeamRole::Member),
                        TeamMember::new("ops", TeamRole::Member),
                    ],
                    ("web", TeamRole::Member) => vec![
                        TeamMember::new("dev", TeamRole::Member),
                        TeamMember::new("ops", TeamRole::Member),
                    ],
                    _ => Vec::new(),
                })
            });
        gateway
    }

    #[tokio::test]
    async fn test_child_team_members_are_not_removed_from_parent() {
        let mut gateway = gateway_with_child_team();
        gateway.expect_remove_team_member().never();
        gateway.expect_add_team_member().never();

        let mut eng = team("eng", None);
        eng.members = Some(vec![
            TeamMember::new("lead", TeamRole::Maintainer),
            TeamMember::new("ops", TeamRole::Member),
        ]);
        let web = team("web", Some("eng"));
        let behaviours = Behaviours::default();
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let outcome = reconcile(&ctx, &[eng, web]).await.unwrap();

        assert!(outcome.plan.nested.is_empty());
        assert_eq!(outcome.plan.status, SyncStatus::InSync);
    }

    #[tokio::test]
    async fn test_fetch_leaves_out_child_team_members() {
        let gateway = gateway_with_child_team();
        let teams = fetch(&gateway, WriteExecutor::default()).await.unwrap();

        let logins: Vec<&str> = teams[0]
            .members
            .iter()
            .flatten()
            .map(|m| m.login.as_str())
            .collect();
        assert_eq!(logins, vec!["lead"]);
        assert_eq!(teams[1].members.as_ref().map(Vec::len), Some(2));
    }
}
