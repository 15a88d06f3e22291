//! Template resolution and dependency DAG construction.
//!
//! Resolves `{{params.key}}`, `{{<resource>.<attribute>}}` and
//! `{{secret.<resource>}}` templates. Output and secret references are also
//! the implicit edges of the dependency graph; together with explicit
//! `depends_on` they feed Kahn's algorithm with deterministic (alphabetical)
//! tie-breaking.

use super::error::{Error, Result};
use super::types::*;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::collections::{BTreeSet, VecDeque};

/// Reserved namespace for parameters.
pub const PARAMS_NAMESPACE: &str = "params";

/// Reserved namespace for secret-store lookups.
pub const SECRET_NAMESPACE: &str = "secret";

/// A single `{{...}}` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateRef {
    Param(String),
    Output { resource: String, attribute: String },
    Secret(String),
}

impl TemplateRef {
    /// The resource this reference depends on, if any.
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::Param(_) => None,
            Self::Output { resource, .. } => Some(resource),
            Self::Secret(resource) => Some(resource),
        }
    }
}

impl std::fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Param(key) => write!(f, "{{{{{}.{}}}}}", PARAMS_NAMESPACE, key),
            Self::Output {
                resource,
                attribute,
            } => write!(f, "{{{{{}.{}}}}}", resource, attribute),
            Self::Secret(resource) => write!(f, "{{{{{}.{}}}}}", SECRET_NAMESPACE, resource),
        }
    }
}

/// Where provider-assigned values come from during resolution.
pub trait ValueSource {
    /// A provisioned output, or None if the resource has no such value yet.
    fn output(&self, resource: &str, attribute: &str) -> Option<String>;

    /// The live value of a secret resource, read from the secret store.
    fn secret(&self, resource: &str) -> Result<String>;
}

/// Leaves output and secret references untouched.
///
/// Resolving against `Deferred` substitutes params only, which is what the
/// planner hashes: secret values never reach a lock or a plan.
pub struct Deferred;

impl ValueSource for Deferred {
    fn output(&self, resource: &str, attribute: &str) -> Option<String> {
        Some(
            TemplateRef::Output {
                resource: resource.to_string(),
                attribute: attribute.to_string(),
            }
            .to_string(),
        )
    }

    fn secret(&self, resource: &str) -> Result<String> {
        Ok(TemplateRef::Secret(resource.to_string()).to_string())
    }
}

fn parse_key(key: &str) -> Result<TemplateRef> {
    let (head, tail) = key
        .split_once('.')
        .ok_or_else(|| Error::Template(format!("invalid reference: {}", key)))?;
    if head.is_empty() || tail.is_empty() {
        return Err(Error::Template(format!("invalid reference: {}", key)));
    }
    match head {
        PARAMS_NAMESPACE => Ok(TemplateRef::Param(tail.to_string())),
        SECRET_NAMESPACE => {
            if tail.contains('.') {
                return Err(Error::Template(format!("invalid secret reference: {}", key)));
            }
            Ok(TemplateRef::Secret(tail.to_string()))
        }
        resource => {
            if tail.contains('.') {
                return Err(Error::Template(format!("invalid output reference: {}", key)));
            }
            Ok(TemplateRef::Output {
                resource: resource.to_string(),
                attribute: tail.to_string(),
            })
        }
    }
}

/// Every reference in a template, in order of appearance.
pub fn parse_refs(template: &str) -> Result<Vec<TemplateRef>> {
    let mut refs = Vec::new();
    let mut start = 0;
    while let Some(open) = template[start..].find("{{") {
        let open = start + open;
        let close = template[open..]
            .find("}}")
            .ok_or_else(|| Error::Template(format!("unclosed template at position {}", open)))?;
        let close = open + close + 2;
        refs.push(parse_key(template[open + 2..close - 2].trim())?);
        start = close;
    }
    Ok(refs)
}

/// Resolve all template variables in a string.
pub fn resolve_template(
    template: &str,
    params: &IndexMap<String, serde_yaml_ng::Value>,
    source: &dyn ValueSource,
) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..]
            .find("}}")
            .ok_or_else(|| Error::Template(format!("unclosed template at position {}", open)))?;
        let close = open + close + 2;

        let value = match parse_key(result[open + 2..close - 2].trim())? {
            TemplateRef::Param(key) => params
                .get(&key)
                .map(yaml_value_to_string)
                .ok_or_else(|| Error::Template(format!("unknown param: {}", key)))?,
            TemplateRef::Output {
                resource,
                attribute,
            } => source
                .output(&resource, &attribute)
                .ok_or(Error::UnresolvedOutput {
                    resource,
                    attribute,
                })?,
            TemplateRef::Secret(resource) => source.secret(&resource)?,
        };

        result.replace_range(open..close, &value);
        start = open + value.len();
    }

    Ok(result)
}

fn collect_strings<'a>(value: &'a serde_json::Value, out: &mut Vec<&'a str>) {
    match value {
        serde_json::Value::String(s) => out.push(s),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        serde_json::Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn map_strings(
    value: &mut serde_json::Value,
    f: &mut dyn FnMut(&str) -> Result<String>,
) -> Result<()> {
    match value {
        serde_json::Value::String(s) => {
            *s = f(s)?;
        }
        serde_json::Value::Array(items) => {
            for v in items {
                map_strings(v, f)?;
            }
        }
        serde_json::Value::Object(map) => {
            for v in map.values_mut() {
                map_strings(v, f)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Every reference in a resource's string fields.
pub fn resource_refs(resource: &Resource) -> Result<Vec<TemplateRef>> {
    let value = serde_json::to_value(&resource.kind)?;
    let mut strings = Vec::new();
    collect_strings(&value, &mut strings);
    let mut refs = Vec::new();
    for s in strings {
        refs.extend(parse_refs(s)?);
    }
    Ok(refs)
}

/// Resolve every string field of a resource.
pub fn resolve_resource(
    resource: &Resource,
    params: &IndexMap<String, serde_yaml_ng::Value>,
    source: &dyn ValueSource,
) -> Result<Resource> {
    let mut value = serde_json::to_value(&resource.kind)?;
    map_strings(&mut value, &mut |s| resolve_template(s, params, source))?;
    Ok(Resource {
        kind: serde_json::from_value(value)?,
        depends_on: resource.depends_on.clone(),
    })
}

/// Resolve the stack's `outputs:` table.
pub fn resolve_outputs(
    config: &StackConfig,
    source: &dyn ValueSource,
) -> Result<IndexMap<String, String>> {
    config
        .outputs
        .iter()
        .map(|(name, template)| {
            resolve_template(template, &config.params, source).map(|v| (name.clone(), v))
        })
        .collect()
}

/// Explicit and template-implied dependencies of one resource.
pub fn dependencies(resource: &Resource) -> Result<BTreeSet<String>> {
    let mut deps: BTreeSet<String> = resource.depends_on.iter().cloned().collect();
    for r in resource_refs(resource)? {
        if let Some(id) = r.resource() {
            deps.insert(id.to_string());
        }
    }
    Ok(deps)
}

/// Dependencies of every resource, in declaration order.
pub fn dependency_edges(config: &StackConfig) -> Result<IndexMap<String, BTreeSet<String>>> {
    let mut edges = IndexMap::new();
    for (id, resource) in &config.resources {
        let deps = dependencies(resource)?;
        for dep in &deps {
            if !config.resources.contains_key(dep) {
                return Err(Error::UnknownDependency {
                    resource: id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        edges.insert(id.clone(), deps);
    }
    Ok(edges)
}

/// Build a topological execution order from resource dependencies.
/// Uses Kahn's algorithm with alphabetical tie-breaking for determinism.
pub fn build_execution_order(config: &StackConfig) -> Result<Vec<String>> {
    let edges = dependency_edges(config)?;
    let mut in_degree: FxHashMap<&str, usize> = FxHashMap::default();
    let mut adjacency: FxHashMap<&str, Vec<&str>> = FxHashMap::default();

    for id in edges.keys() {
        in_degree.insert(id, 0);
        adjacency.insert(id, Vec::new());
    }

    for (id, deps) in &edges {
        for dep in deps {
            adjacency.entry(dep.as_str()).or_default().push(id.as_str());
            *in_degree.entry(id.as_str()).or_default() += 1;
        }
    }

    let mut zero_degree: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| *id)
        .collect();
    zero_degree.sort_unstable();
    let mut queue: VecDeque<&str> = zero_degree.into_iter().collect();

    let mut order: Vec<String> = Vec::with_capacity(edges.len());
    while let Some(current) = queue.pop_front() {
        order.push(current.to_string());

        let mut next_ready: Vec<&str> = Vec::new();
        if let Some(neighbors) = adjacency.get(current) {
            for neighbor in neighbors {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        next_ready.push(*neighbor);
                    }
                }
            }
        }
        next_ready.sort_unstable();
        queue.extend(next_ready);
    }

    if order.len() != edges.len() {
        let mut cycle_members: Vec<&str> = edges
            .keys()
            .map(String::as_str)
            .filter(|id| !order.iter().any(|o| o.as_str() == *id))
            .collect();
        cycle_members.sort_unstable();
        return Err(Error::Cycle(cycle_members.join(", ")));
    }

    Ok(order)
}
