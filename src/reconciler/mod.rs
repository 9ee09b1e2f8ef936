//! Per-kind reconcilers.
//!
//! Each reconciler fetches live state through the [`Gateway`], diffs it
//! against the desired collection, and on apply issues the resulting
//! writes. Live-only entries receive the disposition chosen by the
//! document's behaviours. Every reconciler returns the resolved state,
//! whose identities are exactly the desired ones, together with the
//! [`KindPlan`] describing what differed.

pub mod collaborators;
pub mod members;
pub mod organization;
pub mod repositories;
pub mod teams;

use std::future::Future;

use tracing::{info, warn};

use crate::error::Result;
use crate::github::Gateway;
use crate::models::Behaviours;
use crate::planner::{Diff, Disposition, Entity, KindPlan, WriteExecutor};

/// Everything a reconciler needs for one run.
#[derive(Clone, Copy)]
pub struct ReconcileContext<'a> {
    /// Remote gateway.
    pub gateway: &'a dyn Gateway,
    /// Policies for live-only entries.
    pub behaviours: &'a Behaviours,
    /// When true, no mutating gateway call is made.
    pub dry_run: bool,
    /// Executor for concurrent writes.
    pub executor: WriteExecutor,
}

/// Result of reconciling one kind.
#[derive(Debug, Clone)]
pub struct KindOutcome<T> {
    /// Resolved state; on dry-run, what apply would produce.
    pub resolved: T,
    /// What differed.
    pub plan: KindPlan,
}

impl<'a> ReconcileContext<'a> {
    /// Creates a context.
    #[must_use]
    pub const fn new(
        gateway: &'a dyn Gateway,
        behaviours: &'a Behaviours,
        dry_run: bool,
        executor: WriteExecutor,
    ) -> Self {
        Self {
            gateway,
            behaviours,
            dry_run,
            executor,
        }
    }

    /// Applies `disposition` to live-only entries.
    ///
    /// `scope` names where the entries live (the organization or a parent).
    /// `Warn` only logs. Any other disposition runs `op` for every entry.
    pub(crate) async fn dispose<'i, T, F, Fut>(
        &self,
        scope: &str,
        unknown: &'i [T],
        disposition: Disposition,
        op: F,
    ) -> Result<()>
    where
        T: Entity,
        F: Fn(&'i T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if unknown.is_empty() {
            return Ok(());
        }

        if disposition == Disposition::Warn {
            warn_unknown(scope, unknown);
            return Ok(());
        }

        info!("{scope}: {disposition} {} unknown {}", unknown.len(), T::KIND);
        self.executor.run(unknown, op).await.map(drop)
    }
}

/// Logs live-only entries that are left in place.
fn warn_unknown<T: Entity>(scope: &str, unknown: &[T]) {
    if unknown.is_empty() {
        return;
    }
    let keys: Vec<String> = unknown.iter().map(Entity::key).collect();
    warn!(
        "{scope}: unknown {} left in place: {}",
        T::KIND,
        keys.join(", ")
    );
}

/// Logs the outcome of a top-level diff.
fn log_diff<T: Entity>(diff: &Diff<T>, dry_run: bool) {
    if diff.is_empty() {
        info!("{} in sync", T::KIND);
        return;
    }

    info!(
        "{} out of sync: update [{}], unknown [{}]",
        T::KIND,
        diff.update_keys().join(", "),
        diff.remove_keys().join(", ")
    );
    if dry_run {
        info!("Dry run, skipping writes for {}", T::KIND);
    }
}
