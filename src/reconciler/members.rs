//! Organization member reconciler.

use tracing::debug;

use super::{KindOutcome, ReconcileContext, log_diff};
use crate::error::Result;
use crate::github::Gateway;
use crate::models::{Member, MemberRemovalPolicy, MemberRole};
use crate::planner::{KindPlan, diff_entities};

/// Fetches every live member, admins first.
///
/// # Errors
///
/// Returns the gateway error if either listing fails.
pub async fn fetch(gateway: &dyn Gateway) -> Result<Vec<Member>> {
    let (admins, members) = tokio::try_join!(
        gateway.list_members(MemberRole::Admin),
        gateway.list_members(MemberRole::Member),
    )?;
    debug!("Found {} admins and {} members", admins.len(), members.len());
    Ok(admins.into_iter().chain(members).collect())
}

/// Reconciles organization members.
///
/// Desired members are invited or have their role changed. Live-only
/// members are removed, kept with a warning, or converted to outside
/// collaborators according to `unknown_members`.
///
/// # Errors
///
/// Returns the first gateway error; writes already made are kept.
pub async fn reconcile(
    ctx: &ReconcileContext<'_>,
    desired: &[Member],
) -> Result<KindOutcome<Vec<Member>>> {
    let current = fetch(ctx.gateway).await?;
    let diff = diff_entities(&current, desired);
    let policy = ctx.behaviours.unknown_members;
    log_diff(&diff, ctx.dry_run);

    if !ctx.dry_run && !diff.is_empty() {
        let gateway = ctx.gateway;
        let updates = ctx
            .executor
            .run(&diff.update, |m| gateway.add_member(&m.login, m.role));
        let removals = ctx.dispose("organization", &diff.remove, policy.into(), |m| {
            if policy == MemberRemovalPolicy::ConvertToOutsideCollaborator {
                gateway.add_outside_collaborator(&m.login)
            } else {
                gateway.remove_member(&m.login)
            }
        });
        tokio::try_join!(updates, removals)?;
    }

    Ok(KindOutcome {
        resolved: desired.to_vec(),
        plan: KindPlan::from_diff(&diff, policy.into()).finish(ctx.dry_run),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::MockGateway;
    use crate::models::Behaviours;
    use crate::planner::{Disposition, SyncStatus, WriteExecutor};

    fn gateway_with_live() -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway.expect_list_members().returning(|role| {
            Ok(match role {
                MemberRole::Admin => vec![Member::new("b", MemberRole::Admin)],
                MemberRole::Member => vec![Member::new("a", MemberRole::Member)],
            })
        });
        gateway
    }

    fn desired() -> Vec<Member> {
        vec![
            Member::new("a", MemberRole::Admin),
            Member::new("c", MemberRole::Member),
        ]
    }

    fn behaviours(policy: MemberRemovalPolicy) -> Behaviours {
        Behaviours {
            unknown_members: policy,
            ..Behaviours::default()
        }
    }

    #[tokio::test]
    async fn test_remove_policy_deletes_unknown_member() {
        let mut gateway = gateway_with_live();
        gateway.expect_add_member().times(2).returning(|_, _| Ok(()));
        gateway
            .expect_remove_member()
            .withf(|login| login == "b")
            .times(1)
            .returning(|_| Ok(()));
        gateway.expect_add_outside_collaborator().never();

        let behaviours = behaviours(MemberRemovalPolicy::Remove);
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let outcome = reconcile(&ctx, &desired()).await.unwrap();

        assert_eq!(outcome.plan.update, vec!["a", "c"]);
        assert_eq!(outcome.plan.remove, vec!["b"]);
        assert_eq!(outcome.plan.disposition, Some(Disposition::Remove));
        assert_eq!(outcome.plan.status, SyncStatus::Applied);
        assert_eq!(outcome.resolved, desired());
    }

    #[tokio::test]
    async fn test_warn_policy_never_deletes() {
        let mut gateway = gateway_with_live();
        gateway.expect_add_member().times(2).returning(|_, _| Ok(()));
        gateway.expect_remove_member().never();
        gateway.expect_add_outside_collaborator().never();

        let behaviours = behaviours(MemberRemovalPolicy::Warn);
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let outcome = reconcile(&ctx, &desired()).await.unwrap();

        assert_eq!(outcome.plan.remove, vec!["b"]);
        assert_eq!(outcome.plan.disposition, Some(Disposition::Warn));
        assert!(!outcome.resolved.iter().any(|m| m.login == "b"));
    }

    #[tokio::test]
    async fn test_convert_policy_adds_outside_collaborator() {
        let mut gateway = gateway_with_live();
        gateway.expect_add_member().times(2).returning(|_, _| Ok(()));
        gateway.expect_remove_member().never();
        gateway
            .expect_add_outside_collaborator()
            .withf(|login| login == "b")
            .times(1)
            .returning(|_| Ok(()));

        let behaviours = behaviours(MemberRemovalPolicy::ConvertToOutsideCollaborator);
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        let outcome = reconcile(&ctx, &desired()).await.unwrap();

        assert_eq!(
            outcome.plan.disposition,
            Some(Disposition::ConvertToOutsideCollaborator)
        );
    }

    #[tokio::test]
    async fn test_dry_run_matches_apply_plan_without_writes() {
        let gateway = gateway_with_live();
        let behaviours = behaviours(MemberRemovalPolicy::Remove);

        let ctx = ReconcileContext::new(&gateway, &behaviours, true, WriteExecutor::default());
        let planned = reconcile(&ctx, &desired()).await.unwrap();

        assert_eq!(planned.plan.status, SyncStatus::Planned);
        assert_eq!(planned.plan.update, vec!["a", "c"]);
        assert_eq!(planned.plan.remove, vec!["b"]);
        assert_eq!(planned.resolved, desired());
    }

    #[tokio::test]
    async fn test_failed_write_propagates() {
        let mut gateway = gateway_with_live();
        gateway.expect_add_member().returning(|_, _| {
            Err(crate::error::GitHubError::api_error(422, "invalid").into())
        });
        gateway.expect_remove_member().returning(|_| Ok(()));

        let behaviours = behaviours(MemberRemovalPolicy::Remove);
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());
        assert!(reconcile(&ctx, &desired()).await.is_err());
    }

    #[tokio::test]
    async fn test_logins_match_case_insensitively() {
        let gateway = gateway_with_live();
        let behaviours = Behaviours::default();
        let ctx = ReconcileContext::new(&gateway, &behaviours, false, WriteExecutor::default());

        let desired = vec![
            Member::new("A", MemberRole::Member),
            Member::new("B", MemberRole::Admin),
        ];
        let outcome = reconcile(&ctx, &desired).await.unwrap();
        assert_eq!(outcome.plan.status, SyncStatus::InSync);
    }
}
