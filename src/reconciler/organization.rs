//! Organization settings reconciler.
//!
//! The organization is a singleton: there is no identity or removal, only a
//! field-by-field comparison and at most one update call.

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{KindOutcome, ReconcileContext};
use crate::error::{DocumentError, Result};
use crate::github::Gateway;
use crate::models::Organization;
use crate::planner::{EntityKind, FieldChange, KindPlan};

/// Fetches the live organization settings, normalized.
///
/// # Errors
///
/// Returns the gateway error if the fetch fails.
pub async fn fetch(gateway: &dyn Gateway) -> Result<Organization> {
    Ok(gateway.get_organization().await?.normalized())
}

/// Reconciles organization settings.
///
/// Only fields set in `desired` are managed.
///
/// # Errors
///
/// Returns the gateway error if the fetch or the update fails.
pub async fn reconcile(
    ctx: &ReconcileContext<'_>,
    desired: &Organization,
) -> Result<KindOutcome<Organization>> {
    let desired = desired.normalized();
    let current = fetch(ctx.gateway).await?;

    let (fields, patch) = field_changes(&current, &desired)?;
    let mut plan = KindPlan::new(EntityKind::Organization);

    if fields.is_empty() {
        info!("organization in sync");
    } else {
        info!(
            "organization out of sync: {}",
            fields
                .iter()
                .map(|f| f.field.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        if ctx.dry_run {
            info!("Dry run, skipping organization update");
        } else {
            ctx.gateway.update_organization(&patch).await?;
            debug!("Updated {} organization fields", fields.len());
        }
        plan.fields = fields;
    }

    Ok(KindOutcome {
        resolved: desired,
        plan: plan.finish(ctx.dry_run),
    })
}

/// Compares every field set in `desired` with `current`.
///
/// Returns the differing fields and a patch holding only those fields.
fn field_changes(
    current: &Organization,
    desired: &Organization,
) -> Result<(Vec<FieldChange>, Organization)> {
    let current = to_map(current)?;
    let desired = to_map(desired)?;

    let mut fields = Vec::new();
    let mut patch = Map::new();
    for (field, value) in desired {
        let live = current.get(&field);
        if live == Some(&value) {
            continue;
        }
        fields.push(FieldChange {
            field: field.clone(),
            current: live.map(render),
            desired: render(&value),
        });
        patch.insert(field, value);
    }

    let patch = serde_json::from_value(Value::Object(patch))
        .map_err(|e| DocumentError::serialization(e.to_string()))?;
    Ok((fields, patch))
}

fn to_map(org: &Organization) -> Result<Map<String, Value>> {
    match serde_json::to_value(org) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(DocumentError::serialization(e.to_string()).into()),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
