//! Drift detection — compare what the provider reports to lock hashes.

use crate::core::catalog;
use crate::core::types::{ProvenanceEvent, ResourceStatus, ResourceType, StateLock};
use crate::provider::{Outputs, ProviderRecord};
use crate::tripwire::hasher;
use indexmap::IndexMap;

/// A single drift finding.
#[derive(Debug, Clone)]
pub struct DriftFinding {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub expected_hash: String,
    pub actual_hash: String,
    pub detail: String,
}

impl DriftFinding {
    pub fn to_event(&self, stack: &str) -> ProvenanceEvent {
        ProvenanceEvent::DriftDetected {
            stack: stack.to_string(),
            resource: self.resource_id.clone(),
            expected_hash: self.expected_hash.clone(),
            actual_hash: self.actual_hash.clone(),
        }
    }
}

/// Fingerprint of a resource's non-sensitive outputs.
pub fn outputs_digest(rt: ResourceType, outputs: &Outputs) -> String {
    let parts: Vec<String> = outputs
        .iter()
        .filter(|(attr, _)| !catalog::is_sensitive(rt, attr))
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
    hasher::composite_hash(&refs)
}

/// Check one locked resource against the provider's record of it.
pub fn check_resource_drift(
    resource_id: &str,
    locked_type: ResourceType,
    locked_hash: &str,
    locked_outputs: &Outputs,
    record: Option<&ProviderRecord>,
) -> Option<DriftFinding> {
    let finding = |actual_hash: String, detail: String| DriftFinding {
        resource_id: resource_id.to_string(),
        resource_type: locked_type,
        expected_hash: locked_hash.to_string(),
        actual_hash,
        detail,
    };

    let Some(record) = record else {
        return Some(finding(
            "MISSING".to_string(),
            format!("{} no longer exists", resource_id),
        ));
    };

    if record.resource_type != locked_type {
        return Some(finding(
            record.hash.clone(),
            format!(
                "{} is a {} but was locked as a {}",
                resource_id, record.resource_type, locked_type
            ),
        ));
    }

    if record.hash != locked_hash {
        return Some(finding(
            record.hash.clone(),
            format!("{} was changed outside this stack", resource_id),
        ));
    }

    let expected = outputs_digest(locked_type, locked_outputs);
    let actual = outputs_digest(locked_type, &record.outputs);
    if expected != actual {
        let changed: Vec<&str> = locked_outputs
            .iter()
            .filter(|(k, v)| record.outputs.get(*k) != Some(*v))
            .map(|(k, _)| k.as_str())
            .collect();
        return Some(finding(
            actual,
            format!("{} outputs changed: {}", resource_id, changed.join(", ")),
        ));
    }

    None
}

/// Check every provisioned resource in a lock for drift.
pub fn detect_drift(
    lock: &StateLock,
    records: &IndexMap<String, ProviderRecord>,
) -> Vec<DriftFinding> {
    lock.resources
        .iter()
        .filter(|(_, rl)| rl.status == ResourceStatus::Provisioned)
        .filter_map(|(id, rl)| {
            check_resource_drift(id, rl.resource_type, &rl.hash, &rl.outputs, records.get(id))
        })
        .collect()
}

/// Flag drifted entries so the next plan re-applies them.
pub fn mark_drifted(lock: &mut StateLock, findings: &[DriftFinding]) -> usize {
    let mut marked = 0;
    for f in findings {
        if let Some(rl) = lock.resources.get_mut(&f.resource_id) {
            rl.status = ResourceStatus::Drifted;
            marked += 1;
        }
    }
    marked
}
