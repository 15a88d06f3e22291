//! Executor — orchestration loop for apply and destroy.
//!
//! Applies resources in topological order:
//! parse → validate → DAG → plan → for each resource:
//! resolve → provider → state → events
//!
//! Templates are resolved per resource right before the provider call, from
//! the outputs gathered so far in the run; secrets are read from the store at
//! that moment. The first failure is recorded and aborts the run.

use super::catalog;
use super::error::{Error, Result};
use super::planner;
use super::resolver::{self, ValueSource};
use super::state;
use super::types::*;
use crate::provider::{Outputs, Provider};
use crate::tripwire::eventlog;
use indexmap::IndexMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for an apply run.
pub struct ApplyConfig<'a> {
    pub config: &'a StackConfig,
    pub state_dir: &'a Path,
    pub force: bool,
    pub dry_run: bool,
}

/// Outputs gathered during a run, backed by the provider's secret store.
struct RunValues<'a> {
    outputs: &'a IndexMap<String, Outputs>,
    provider: &'a dyn Provider,
}

impl ValueSource for RunValues<'_> {
    fn output(&self, resource: &str, attribute: &str) -> Option<String> {
        self.outputs
            .get(resource)
            .and_then(|o| o.get(attribute))
            .cloned()
    }

    fn secret(&self, resource: &str) -> Result<String> {
        let arn = self
            .output(resource, "arn")
            .ok_or_else(|| Error::UnresolvedOutput {
                resource: resource.to_string(),
                attribute: "arn".to_string(),
            })?;
        self.provider.secret_value(&arn)
    }
}

/// Log a tripwire event if tripwire is enabled.
fn log_tripwire(state_dir: &Path, stack: &str, tripwire: bool, event: ProvenanceEvent) {
    if tripwire {
        if let Err(e) = eventlog::append_event(state_dir, stack, event) {
            warn!(stack, error = %e, "cannot append provenance event");
        }
    }
}

/// Execute the apply loop.
pub fn apply(cfg: &ApplyConfig, provider: &mut dyn Provider) -> Result<ApplyResult> {
    let start = Instant::now();
    let config = cfg.config;
    let tripwire = config.policy.tripwire;

    // Build execution order (DAG toposort)
    let execution_order = resolver::build_execution_order(config)?;
    let existing = state::load_lock(cfg.state_dir, &config.name)?;
    let plan = planner::plan(config, &execution_order, existing.as_ref())?;

    for id in &plan.orphaned {
        warn!(resource = %id, "resource is no longer declared; kept until destroy");
    }

    if cfg.dry_run {
        return Ok(ApplyResult {
            stack: config.name.clone(),
            resources_provisioned: 0,
            resources_unchanged: plan.unchanged,
            total_duration: start.elapsed(),
            outputs: IndexMap::new(),
        });
    }

    let run_id = eventlog::generate_run_id();
    info!(stack = %config.name, %run_id, "apply started");
    log_tripwire(
        cfg.state_dir,
        &config.name,
        tripwire,
        ProvenanceEvent::ApplyStarted {
            stack: config.name.clone(),
            run_id: run_id.clone(),
            cloudjar_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );

    let mut lock = existing.unwrap_or_else(|| state::new_lock(&config.name));
    let mut values: IndexMap<String, Outputs> = IndexMap::new();
    let mut provisioned = 0u32;
    let mut unchanged = 0u32;

    for change in &plan.changes {
        let id = change.resource_id.as_str();
        let resource = match config.resources.get(id) {
            Some(r) => r,
            None => continue,
        };
        let deps = resolver::dependencies(resource)?;

        // The plan already re-applies dependents of changed resources.
        let current = provider.read(id)?;
        let action = match (change.action, &current) {
            (PlanAction::NoOp, Some(_)) if !cfg.force => PlanAction::NoOp,
            (PlanAction::NoOp, _) if catalog::is_reference(change.resource_type) => {
                PlanAction::Read
            }
            (PlanAction::NoOp, _) => PlanAction::Update,
            (action, _) => action,
        };

        if action == PlanAction::NoOp {
            debug!(resource = %id, "unchanged");
            if let Some(outputs) = current {
                values.insert(id.to_string(), outputs);
            }
            unchanged += 1;
            continue;
        }

        log_tripwire(
            cfg.state_dir,
            &config.name,
            tripwire,
            ProvenanceEvent::ResourceStarted {
                stack: config.name.clone(),
                resource: id.to_string(),
                action: action.to_string(),
            },
        );

        let resource_start = Instant::now();
        let exists = current.is_some();
        let result = apply_resource(config, id, resource, action, exists, &values, provider);
        let duration = resource_start.elapsed().as_secs_f64();

        match result {
            Ok((hash, outputs)) => {
                info!(resource = %id, %action, duration, "provisioned");
                lock.resources.insert(
                    id.to_string(),
                    ResourceLock {
                        resource_type: resource.resource_type(),
                        status: ResourceStatus::Provisioned,
                        applied_at: Some(eventlog::now_iso8601()),
                        duration_seconds: Some(duration),
                        hash: hash.clone(),
                        depends_on: deps.iter().cloned().collect(),
                        outputs: public_outputs(resource.resource_type(), &outputs),
                    },
                );
                log_tripwire(
                    cfg.state_dir,
                    &config.name,
                    tripwire,
                    ProvenanceEvent::ResourceProvisioned {
                        stack: config.name.clone(),
                        resource: id.to_string(),
                        duration_seconds: duration,
                        hash,
                    },
                );
                values.insert(id.to_string(), outputs);
                provisioned += 1;
            }
            Err(e) => {
                lock.resources.insert(
                    id.to_string(),
                    ResourceLock {
                        resource_type: resource.resource_type(),
                        status: ResourceStatus::Failed,
                        applied_at: Some(eventlog::now_iso8601()),
                        duration_seconds: Some(duration),
                        hash: String::new(),
                        depends_on: deps.iter().cloned().collect(),
                        outputs: IndexMap::new(),
                    },
                );
                log_tripwire(
                    cfg.state_dir,
                    &config.name,
                    tripwire,
                    ProvenanceEvent::ResourceFailed {
                        stack: config.name.clone(),
                        resource: id.to_string(),
                        error: e.to_string(),
                    },
                );
                log_tripwire(
                    cfg.state_dir,
                    &config.name,
                    tripwire,
                    ProvenanceEvent::ApplyCompleted {
                        stack: config.name.clone(),
                        run_id,
                        resources_provisioned: provisioned,
                        resources_unchanged: unchanged,
                        resources_failed: 1,
                        total_seconds: start.elapsed().as_secs_f64(),
                    },
                );
                lock.generated_at = eventlog::now_iso8601();
                state::save_lock(cfg.state_dir, &reorder(lock, &execution_order))?;
                tracing::error!(resource = %id, error = %e, "apply aborted");
                return Err(e);
            }
        }
    }

    let outputs = resolver::resolve_outputs(
        config,
        &RunValues {
            outputs: &values,
            provider: &*provider,
        },
    )?;

    lock.outputs = outputs.clone();
    lock.generated_at = eventlog::now_iso8601();
    state::save_lock(cfg.state_dir, &reorder(lock, &execution_order))?;

    let total = start.elapsed();
    log_tripwire(
        cfg.state_dir,
        &config.name,
        tripwire,
        ProvenanceEvent::ApplyCompleted {
            stack: config.name.clone(),
            run_id,
            resources_provisioned: provisioned,
            resources_unchanged: unchanged,
            resources_failed: 0,
            total_seconds: total.as_secs_f64(),
        },
    );
    info!(provisioned, unchanged, "apply completed");

    Ok(ApplyResult {
        stack: config.name.clone(),
        resources_provisioned: provisioned,
        resources_unchanged: unchanged,
        total_duration: total,
        outputs,
    })
}

/// Resolve one resource against the run's values and hand it to the provider.
fn apply_resource(
    config: &StackConfig,
    id: &str,
    resource: &Resource,
    action: PlanAction,
    exists: bool,
    values: &IndexMap<String, Outputs>,
    provider: &mut dyn Provider,
) -> Result<(String, Outputs)> {
    let hash = planner::hash_desired_state(resource, &config.params)?;
    let resolved = resolver::resolve_resource(
        resource,
        &config.params,
        &RunValues {
            outputs: values,
            provider: &*provider,
        },
    )?;
    let outputs = match action {
        PlanAction::Read => provider.import(id, &resolved, &hash)?,
        _ if exists => provider.update(id, &resolved, &hash)?,
        _ => provider.create(id, &resolved, &hash)?,
    };
    Ok((hash, outputs))
}

/// Lock entries never carry sensitive outputs.
fn public_outputs(rt: ResourceType, outputs: &Outputs) -> Outputs {
    outputs
        .iter()
        .filter(|(attr, _)| !catalog::is_sensitive(rt, attr))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Put lock entries in execution order, keeping orphans last.
fn reorder(mut lock: StateLock, execution_order: &[String]) -> StateLock {
    let mut ordered = IndexMap::with_capacity(lock.resources.len());
    for id in execution_order {
        if let Some(rl) = lock.resources.shift_remove(id) {
            ordered.insert(id.clone(), rl);
        }
    }
    ordered.extend(lock.resources.drain(..));
    lock.resources = ordered;
    lock
}

/// Tear down every locked resource, dependents first.
pub fn destroy(
    config: &StackConfig,
    state_dir: &Path,
    provider: &mut dyn Provider,
) -> Result<DestroyResult> {
    let start = Instant::now();
    let tripwire = config.policy.tripwire;
    let Some(mut lock) = state::load_lock(state_dir, &config.name)? else {
        return Ok(DestroyResult {
            stack: config.name.clone(),
            resources_destroyed: 0,
            total_duration: start.elapsed(),
        });
    };

    let run_id = eventlog::generate_run_id();
    let plan = planner::plan_destroy(&lock);
    let mut destroyed = 0u32;

    for change in &plan.changes {
        let id = change.resource_id.as_str();
        if provider.records().contains_key(id) {
            if let Err(e) = provider.delete(id) {
                lock.generated_at = eventlog::now_iso8601();
                state::save_lock(state_dir, &lock)?;
                tracing::error!(resource = %id, error = %e, "destroy aborted");
                return Err(e);
            }
            destroyed += 1;
        }
        lock.resources.shift_remove(id);
        info!(resource = %id, "destroyed");
        log_tripwire(
            state_dir,
            &config.name,
            tripwire,
            ProvenanceEvent::ResourceDestroyed {
                stack: config.name.clone(),
                resource: id.to_string(),
            },
        );
    }

    state::remove_lock(state_dir, &config.name)?;
    log_tripwire(
        state_dir,
        &config.name,
        tripwire,
        ProvenanceEvent::DestroyCompleted {
            stack: config.name.clone(),
            run_id,
            resources_destroyed: destroyed,
        },
    );

    Ok(DestroyResult {
        stack: config.name.clone(),
        resources_destroyed: destroyed,
        total_duration: start.elapsed(),
    })
}
