//! Outside collaborator reconciler.

use tracing::debug;

use super::{KindOutcome, ReconcileContext, log_diff};
use crate::error::Result;
use crate::github::Gateway;
use crate::models::Collaborator;
use crate::planner::{Disposition, KindPlan, diff_entities};

/// Fetches every live outside collaborator.
///
/// # Errors
///
/// Returns the gateway error if the listing fails.
pub async fn fetch(gateway: &dyn Gateway) -> Result<Vec<Collaborator>> {
    let collaborators = gateway.list_outside_collaborators().await?;
    debug!("Found {} outside collaborators", collaborators.len());
    Ok(collaborators)
}

/// Reconciles outside collaborators.
///
/// # Errors
///
/// Returns the first gateway error; writes already made are kept.
pub async fn reconcile(
    ctx: &ReconcileContext<'_>,
    desired: &[Collaborator],
) -> Result<KindOutcome<Vec<Collaborator>>> {
    let current = fetch(ctx.gateway).await?;
    let diff = diff_entities(&current, desired);
    let disposition = Disposition::from(ctx.behaviours.unknown_collaborators);
    log_diff(&diff, ctx.dry_run);

    if !ctx.dry_run && !diff.is_empty() {
        let gateway = ctx.gateway;
        tokio::try_join!(
            ctx.executor
                .run(&diff.update, |c| gateway.add_outside_collaborator(&c.login)),
            ctx.dispose("organization", &diff.remove, disposition, |c| {
                gateway.remove_outside_collaborator(&c.login)
            }),
        )?;
    }

    Ok(KindOutcome {
        resolved: desired.to_vec(),
        plan: KindPlan::from_diff(&diff, disposition).finish(ctx.dry_run),
    })
}
