//! Planning module for reconciliation.
//!
//! This module holds the entity-agnostic diff engine, the per-kind change
//! reports built from its output, and the executor that issues the
//! resulting remote writes.

mod diff;
mod executor;
mod plan;

pub use diff::{Diff, Entity, EntityKind, Predicates, diff, diff_entities};
pub use executor::{DEFAULT_CONCURRENCY, WriteExecutor};
pub use plan::{Disposition, FieldChange, KindPlan, NestedPlan, SyncStatus};
