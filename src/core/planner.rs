//! Plan generation — diff desired state against the state lock.
//!
//! Desired state is hashed after substituting params only. Output and secret
//! references stay symbolic, so a plan never depends on provider-assigned or
//! secret values and re-planning unchanged inputs is a no-op.

use super::catalog;
use super::error::Result;
use super::resolver::{dependencies, resolve_resource, Deferred};
use super::types::*;
use crate::tripwire::hasher;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// Generate an execution plan by comparing desired config to lock state.
///
/// Anything downstream of a created, updated or re-read resource is
/// re-applied too, since it consumes that resource's outputs or secrets.
pub fn plan(
    config: &StackConfig,
    execution_order: &[String],
    lock: Option<&StateLock>,
) -> Result<ExecutionPlan> {
    let mut changes = Vec::new();
    let mut to_create = 0u32;
    let mut to_update = 0u32;
    let mut to_read = 0u32;
    let mut unchanged = 0u32;
    let mut touched: FxHashSet<&str> = FxHashSet::default();

    for resource_id in execution_order {
        let resource = match config.resources.get(resource_id) {
            Some(r) => r,
            None => continue,
        };

        let mut action = determine_action(resource_id, resource, &config.params, lock)?;
        let mut upstream: Vec<String> = Vec::new();
        if action == PlanAction::NoOp {
            upstream = dependencies(resource)?
                .into_iter()
                .filter(|d| touched.contains(d.as_str()))
                .collect();
            if !upstream.is_empty() {
                action = if catalog::is_reference(resource.resource_type()) {
                    PlanAction::Read
                } else {
                    PlanAction::Update
                };
            }
        }
        if action != PlanAction::NoOp {
            touched.insert(resource_id.as_str());
        }
        match action {
            PlanAction::Create => to_create += 1,
            PlanAction::Update => to_update += 1,
            PlanAction::Read => to_read += 1,
            PlanAction::NoOp => unchanged += 1,
            PlanAction::Destroy => {}
        }

        changes.push(PlannedChange {
            resource_id: resource_id.clone(),
            resource_type: resource.resource_type(),
            action,
            description: if upstream.is_empty() {
                describe_action(resource_id, resource, action)
            } else {
                format!(
                    "{}: re-apply, upstream changed ({})",
                    resource_id,
                    upstream.join(", ")
                )
            },
        });
    }

    let orphaned = lock
        .map(|l| {
            l.resources
                .keys()
                .filter(|id| !config.resources.contains_key(*id))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    Ok(ExecutionPlan {
        name: config.name.clone(),
        changes,
        execution_order: execution_order.to_vec(),
        orphaned,
        to_create,
        to_update,
        to_read,
        to_destroy: 0,
        unchanged,
    })
}

/// Plan the teardown of every locked resource, dependents first.
pub fn plan_destroy(lock: &StateLock) -> ExecutionPlan {
    let order: Vec<String> = lock.resources.keys().rev().cloned().collect();
    let changes: Vec<PlannedChange> = order
        .iter()
        .filter_map(|id| lock.resources.get(id).map(|rl| (id, rl)))
        .map(|(id, rl)| PlannedChange {
            resource_id: id.clone(),
            resource_type: rl.resource_type,
            action: PlanAction::Destroy,
            description: if catalog::is_reference(rl.resource_type) {
                format!("{}: forget {} reference", id, rl.resource_type)
            } else {
                format!("{}: delete {}", id, rl.resource_type)
            },
        })
        .collect();

    ExecutionPlan {
        name: lock.stack.clone(),
        to_destroy: changes.len() as u32,
        changes,
        execution_order: order,
        orphaned: Vec::new(),
        to_create: 0,
        to_update: 0,
        to_read: 0,
        unchanged: 0,
    }
}

/// Determine what action to take for a resource.
fn determine_action(
    resource_id: &str,
    resource: &Resource,
    params: &IndexMap<String, serde_yaml_ng::Value>,
    lock: Option<&StateLock>,
) -> Result<PlanAction> {
    let rt = resource.resource_type();
    let changed = match lock.and_then(|l| l.resources.get(resource_id)) {
        // Previously failed or drifted — re-apply
        Some(rl) if rl.status != ResourceStatus::Provisioned => true,
        Some(rl) => rl.hash != hash_desired_state(resource, params)?,
        None if catalog::is_reference(rt) => return Ok(PlanAction::Read),
        None => return Ok(PlanAction::Create),
    };

    Ok(match (changed, catalog::is_reference(rt)) {
        (false, _) => PlanAction::NoOp,
        (true, true) => PlanAction::Read,
        (true, false) => PlanAction::Update,
    })
}

/// Compute a hash of the desired state for comparison.
pub fn hash_desired_state(
    resource: &Resource,
    params: &IndexMap<String, serde_yaml_ng::Value>,
) -> Result<String> {
    let resolved = resolve_resource(resource, params, &Deferred)?;
    hasher::hash_value(&resolved.kind)
}

/// Human-readable description of a planned action.
fn describe_action(resource_id: &str, resource: &Resource, action: PlanAction) -> String {
    match action {
        PlanAction::NoOp => format!("{}: no changes", resource_id),
        PlanAction::Destroy => format!("{}: delete {}", resource_id, resource.resource_type()),
        _ => catalog::describe(resource_id, &resource.kind),
    }
}
