//! Change reports for a single entity kind.
//!
//! A [`KindPlan`] is what dry-run reports and what apply acts on: the
//! identities to create or update, the identities found only live and the
//! disposition they receive, field-level changes for the organization and
//! nested diffs attributed to their parent.

use serde::Serialize;

use crate::models::{MemberRemovalPolicy, RemovalPolicy};

use super::diff::{Diff, Entity, EntityKind};

/// Outcome of reconciling one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Live state already matched.
    InSync,
    /// Differences found; dry-run, nothing written.
    Planned,
    /// Differences found and written.
    Applied,
}

/// What happens to live entries that the document does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Deleted.
    Remove,
    /// Left in place with a warning.
    Warn,
    /// Converted from member to outside collaborator.
    ConvertToOutsideCollaborator,
}

/// A single organization field that differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// Field name.
    pub field: String,
    /// Live value, if any.
    pub current: Option<String>,
    /// Desired value.
    pub desired: String,
}

/// Differences in a nested collection, attributed to its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedPlan {
    /// Nested collection kind.
    pub kind: EntityKind,
    /// Parent identity (team slug or repository name).
    pub parent: String,
    /// Identities to add or update.
    pub update: Vec<String>,
    /// Identities found only live.
    pub remove: Vec<String>,
    /// Disposition of `remove`.
    pub disposition: Disposition,
}

/// Differences for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindPlan {
    /// Entity kind.
    pub kind: EntityKind,
    /// Outcome of the reconciliation.
    pub status: SyncStatus,
    /// Identities to create or update.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update: Vec<String>,
    /// Identities found only live.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
    /// Disposition of `remove`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,
    /// Field-level changes (organization only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldChange>,
    /// Nested collection diffs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<NestedPlan>,
}

impl KindPlan {
    /// Creates an in-sync plan with no changes.
    #[must_use]
    pub const fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            status: SyncStatus::InSync,
            update: Vec::new(),
            remove: Vec::new(),
            disposition: None,
            fields: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Creates a plan from a top-level diff.
    #[must_use]
    pub fn from_diff<T: Entity>(diff: &Diff<T>, disposition: Disposition) -> Self {
        let mut plan = Self::new(T::KIND);
        plan.update = diff.update_keys();
        plan.remove = diff.remove_keys();
        if !plan.remove.is_empty() {
            plan.disposition = Some(disposition);
        }
        plan
    }

    /// Attaches a nested diff under `parent`, if it has differences.
    pub fn push_nested<T: Entity>(&mut self, parent: &str, diff: &Diff<T>, disposition: Disposition) {
        if diff.is_empty() {
            return;
        }
        self.nested.push(NestedPlan {
            kind: T::KIND,
            parent: parent.to_string(),
            update: diff.update_keys(),
            remove: diff.remove_keys(),
            disposition,
        });
    }

    /// Returns true if anything differs.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.update.is_empty()
            || !self.remove.is_empty()
            || !self.fields.is_empty()
            || !self.nested.is_empty()
    }

    /// Total number of differences, nested ones included.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.update.len()
            + self.remove.len()
            + self.fields.len()
            + self
                .nested
                .iter()
                .map(|n| n.update.len() + n.remove.len())
                .sum::<usize>()
    }

    /// Marks the plan with its final status.
    #[must_use]
    pub fn finish(mut self, dry_run: bool) -> Self {
        self.status = if !self.has_changes() {
            SyncStatus::InSync
        } else if dry_run {
            SyncStatus::Planned
        } else {
            SyncStatus::Applied
        };
        self
    }
}

impl From<RemovalPolicy> for Disposition {
    fn from(policy: RemovalPolicy) -> Self {
        match policy {
            RemovalPolicy::Remove => Self::Remove,
            RemovalPolicy::Warn => Self::Warn,
        }
    }
}

impl From<MemberRemovalPolicy> for Disposition {
    fn from(policy: MemberRemovalPolicy) -> Self {
        match policy {
            MemberRemovalPolicy::Remove => Self::Remove,
            MemberRemovalPolicy::Warn => Self::Warn,
            MemberRemovalPolicy::ConvertToOutsideCollaborator => Self::ConvertToOutsideCollaborator,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InSync => "in sync",
            Self::Planned => "planned",
            Self::Applied => "applied",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Remove => "remove",
            Self::Warn => "warn",
            Self::ConvertToOutsideCollaborator => "convert to outside collaborator",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for KindPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.status)?;
        if self.has_changes() {
            write!(
                f,
                " ({} to update, {} unknown",
                self.update.len(),
                self.remove.len()
            )?;
            if let Some(disposition) = self.disposition {
                write!(f, " -> {disposition}")?;
            }
            write!(f, ", {} nested)", self.nested.len())?;
        }
        Ok(())
    }
}
