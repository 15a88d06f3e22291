//! Managed datastores: document database, cache cluster, search domain.
//!
//! Endpoints are derived from the resource identifier, account and region so
//! that they stay stable across teardown and reapply.

use super::{require, require_at_least};
use crate::core::error::ValidationError;
use crate::core::types::{CacheSpec, DocumentDbSpec, ProviderConfig, ResourceType, SearchDomainSpec};
use crate::tripwire::hasher::short_digest;
use indexmap::IndexMap;

pub const DOCDB_PORT: u16 = 27017;
pub const CACHE_PORT: u16 = 6379;
pub const MIN_VOLUME_GIB: u32 = 10;

pub const DOCDB_OUTPUTS: &[&str] = &["id", "arn", "endpoint", "port", "master_username"];
pub const CACHE_OUTPUTS: &[&str] = &["id", "address", "port"];
pub const SEARCH_OUTPUTS: &[&str] = &["arn", "domain_name", "endpoint"];

fn digest(provider: &ProviderConfig, kind: &str, identifier: &str, len: usize) -> String {
    short_digest(
        &format!(
            "{}/{}/{}/{}",
            provider.account_id, provider.region, kind, identifier
        ),
        len,
    )
}

// -- Document database --

pub fn validate_document_db(id: &str, spec: &DocumentDbSpec) -> Vec<ValidationError> {
    let rt = ResourceType::DocdbCluster;
    let mut errors = Vec::new();
    require(&mut errors, id, rt, "cluster_identifier", &spec.cluster_identifier);
    require(&mut errors, id, rt, "engine", &spec.engine);
    require(&mut errors, id, rt, "family", &spec.family);
    require(&mut errors, id, rt, "master_username", &spec.master_username);
    require(&mut errors, id, rt, "master_password", &spec.master_password);
    require(&mut errors, id, rt, "instance_class", &spec.instance_class);
    require_at_least(&mut errors, id, rt, "instance_count", spec.instance_count, 1);
    if spec.backup_retention_period > 35 {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) backup_retention_period must be at most 35 days",
            id, rt
        )));
    }
    errors
}

pub fn document_db_outputs(
    spec: &DocumentDbSpec,
    provider: &ProviderConfig,
) -> IndexMap<String, String> {
    let cid = &spec.cluster_identifier;
    IndexMap::from([
        ("id".to_string(), cid.clone()),
        (
            "arn".to_string(),
            format!(
                "arn:aws:rds:{}:{}:cluster:{}",
                provider.region, provider.account_id, cid
            ),
        ),
        (
            "endpoint".to_string(),
            format!(
                "{}.cluster-{}.{}.docdb.amazonaws.com",
                cid,
                digest(provider, "docdb", cid, 12),
                provider.region
            ),
        ),
        ("port".to_string(), DOCDB_PORT.to_string()),
        ("master_username".to_string(), spec.master_username.clone()),
    ])
}

pub fn describe_document_db(id: &str, spec: &DocumentDbSpec) -> String {
    format!(
        "{}: {} cluster {} ({} x {}, tls {})",
        id,
        spec.family,
        spec.cluster_identifier,
        spec.instance_count,
        spec.instance_class,
        if spec.tls { "enabled" } else { "disabled" }
    )
}

// -- Cache --

pub fn validate_cache(id: &str, spec: &CacheSpec) -> Vec<ValidationError> {
    let rt = ResourceType::CacheCluster;
    let mut errors = Vec::new();
    require(&mut errors, id, rt, "engine", &spec.engine);
    require(&mut errors, id, rt, "engine_version", &spec.engine_version);
    require(&mut errors, id, rt, "node_type", &spec.node_type);
    require_at_least(&mut errors, id, rt, "num_cache_nodes", spec.num_cache_nodes, 1);
    errors
}

/// The cache cluster is addressed through its first node.
pub fn cache_outputs(id: &str, provider: &ProviderConfig) -> IndexMap<String, String> {
    IndexMap::from([
        ("id".to_string(), id.to_string()),
        (
            "address".to_string(),
            format!(
                "{}.{}.0001.{}.cache.amazonaws.com",
                id,
                digest(provider, "cache", id, 6),
                provider.region
            ),
        ),
        ("port".to_string(), CACHE_PORT.to_string()),
    ])
}

pub fn describe_cache(id: &str, spec: &CacheSpec) -> String {
    format!(
        "{}: {} {} ({} x {})",
        id, spec.engine, spec.engine_version, spec.num_cache_nodes, spec.node_type
    )
}

// -- Search domain --

pub const TLS_POLICIES: &[&str] = &[
    "Policy-Min-TLS-1-0-2019-07",
    "Policy-Min-TLS-1-2-2019-07",
    "Policy-Min-TLS-1-2-PFS-2023-10",
];

/// An access policy needs a version and at least one Allow/Deny statement.
fn check_access_policy(
    id: &str,
    rt: ResourceType,
    policy: &serde_json::Value,
    errors: &mut Vec<ValidationError>,
) {
    let mut fail = |msg: &str| {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) access_policy {}",
            id, rt, msg
        )))
    };
    if !policy.get("Version").is_some_and(serde_json::Value::is_string) {
        fail("has no Version");
    }
    let statements = match policy.get("Statement").and_then(serde_json::Value::as_array) {
        Some(s) if !s.is_empty() => s,
        _ => return fail("has no Statement"),
    };
    for st in statements {
        match st.get("Effect").and_then(serde_json::Value::as_str) {
            Some("Allow") | Some("Deny") => {}
            _ => fail("statement Effect must be Allow or Deny"),
        }
        if st.get("Action").is_none() || st.get("Resource").is_none() {
            fail("statement needs Action and Resource");
        }
    }
}

pub fn validate_search_domain(id: &str, spec: &SearchDomainSpec) -> Vec<ValidationError> {
    let rt = ResourceType::SearchDomain;
    let mut errors = Vec::new();
    require(&mut errors, id, rt, "domain_name", &spec.domain_name);
    require(&mut errors, id, rt, "engine_version", &spec.engine_version);
    require(&mut errors, id, rt, "instance_type", &spec.instance_type);
    if !TLS_POLICIES.contains(&spec.tls_security_policy.as_str()) {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) has unknown tls_security_policy '{}'",
            id, rt, spec.tls_security_policy
        )));
    }
    require_at_least(&mut errors, id, rt, "volume_size", spec.volume_size, MIN_VOLUME_GIB);
    if let Some(ref policy) = spec.access_policy {
        check_access_policy(id, rt, policy, &mut errors);
    }

    if spec.internal_user_database {
        match spec.master_user {
            Some(ref user) => {
                require(&mut errors, id, rt, "master_user.name", &user.name);
                require(&mut errors, id, rt, "master_user.password", &user.password);
            }
            None => errors.push(ValidationError::new(format!(
                "resource '{}' ({}) enables the internal user database without a master_user",
                id, rt
            ))),
        }
    }
    errors
}

pub fn search_domain_outputs(
    spec: &SearchDomainSpec,
    provider: &ProviderConfig,
) -> IndexMap<String, String> {
    let domain = &spec.domain_name;
    IndexMap::from([
        (
            "arn".to_string(),
            format!(
                "arn:aws:es:{}:{}:domain/{}",
                provider.region, provider.account_id, domain
            ),
        ),
        ("domain_name".to_string(), domain.clone()),
        (
            "endpoint".to_string(),
            format!(
                "search-{}-{}.{}.es.amazonaws.com",
                domain,
                digest(provider, "search", domain, 26),
                provider.region
            ),
        ),
    ])
}

pub fn describe_search_domain(id: &str, spec: &SearchDomainSpec) -> String {
    format!(
        "{}: {} domain {} ({}, {} GiB)",
        id, spec.engine_version, spec.domain_name, spec.instance_type, spec.volume_size
    )
}
