//! YAML parsing and validation.
//!
//! Parses cloudjar.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - Stack name and resource ids are lowercase identifiers
//! - depends_on and template references must exist
//! - Sensitive values only flow into kinds that accept them
//! - The dependency graph is acyclic
//! - Kind-specific field rules

use super::catalog;
use super::error::{Error, Result, ValidationError};
use super::resolver::{self, Deferred, TemplateRef, PARAMS_NAMESPACE, SECRET_NAMESPACE};
use super::types::*;
use crate::resources::compute;
use indexmap::IndexMap;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("Invalid regex pattern"));

/// Parse a cloudjar.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<StackConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    parse_config(&content)
}

/// Parse a cloudjar.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<StackConfig> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Parse and validate in one step, failing with every validation error.
pub fn load_config(path: &Path) -> Result<StackConfig> {
    let config = parse_config_file(path)?;
    let errors = validate_config(&config);
    if !errors.is_empty() {
        return Err(Error::Validation { errors });
    }
    Ok(config)
}

/// Check one template reference made by `owner`.
fn check_ref(
    config: &StackConfig,
    owner: &str,
    owner_type: Option<ResourceType>,
    r: &TemplateRef,
    errors: &mut Vec<ValidationError>,
) {
    match r {
        TemplateRef::Param(key) => {
            if !config.params.contains_key(key) {
                errors.push(ValidationError::new(format!(
                    "{} references unknown param '{}'",
                    owner, key
                )));
            }
        }
        TemplateRef::Output {
            resource,
            attribute,
        } => {
            let Some(target) = config.resources.get(resource) else {
                errors.push(ValidationError::new(format!(
                    "{} references unknown resource '{}'",
                    owner, resource
                )));
                return;
            };
            let rt = target.resource_type();
            if !catalog::output_attributes(rt).contains(&attribute.as_str()) {
                errors.push(ValidationError::new(format!(
                    "{} references unknown attribute '{}' of {} '{}'",
                    owner, attribute, rt, resource
                )));
            } else if catalog::is_sensitive(rt, attribute)
                && !owner_type.is_some_and(catalog::accepts_sensitive)
            {
                errors.push(ValidationError::new(format!(
                    "{} references sensitive value {}; \
                     store it in a secret and use '{{{{{}.<id>}}}}'",
                    owner, r, SECRET_NAMESPACE
                )));
            }
        }
        TemplateRef::Secret(resource) => {
            if owner_type.is_none() {
                errors.push(ValidationError::new(format!(
                    "{} may not reference secret '{}'",
                    owner, resource
                )));
                return;
            }
            match config.resources.get(resource).map(Resource::resource_type) {
                Some(ResourceType::Secret) => {}
                Some(rt) => errors.push(ValidationError::new(format!(
                    "{} reads secret '{}' but it is a {}",
                    owner, resource, rt
                ))),
                None => errors.push(ValidationError::new(format!(
                    "{} references unknown secret '{}'",
                    owner, resource
                ))),
            }
        }
    }
}

fn validate_resource(
    config: &StackConfig,
    id: &str,
    resource: &Resource,
    errors: &mut Vec<ValidationError>,
) {
    if !IDENTIFIER.is_match(id) {
        errors.push(ValidationError::new(format!(
            "resource id '{}' must match [a-z0-9][a-z0-9-]*",
            id
        )));
    }
    if id == PARAMS_NAMESPACE || id == SECRET_NAMESPACE {
        errors.push(ValidationError::new(format!(
            "resource id '{}' is reserved",
            id
        )));
    }

    for dep in &resource.depends_on {
        if !config.resources.contains_key(dep) {
            errors.push(ValidationError::new(format!(
                "resource '{}' depends on unknown resource '{}'",
                id, dep
            )));
        }
        if dep == id {
            errors.push(ValidationError::new(format!(
                "resource '{}' depends on itself",
                id
            )));
        }
    }

    let owner = format!("resource '{}'", id);
    match resolver::resource_refs(resource) {
        Ok(refs) => {
            for r in &refs {
                if r.resource() == Some(id) {
                    errors.push(ValidationError::new(format!(
                        "resource '{}' references itself via {}",
                        id, r
                    )));
                    continue;
                }
                check_ref(config, &owner, Some(resource.resource_type()), r, errors);
            }
        }
        Err(e) => errors.push(ValidationError::new(format!("resource '{}': {}", id, e))),
    }

    // Kind rules run on the params-resolved declaration.
    if let Ok(resolved) = resolver::resolve_resource(resource, &config.params, &Deferred) {
        errors.extend(catalog::validate(id, &resolved.kind, config));
    }
}

fn validate_outputs(config: &StackConfig, errors: &mut Vec<ValidationError>) {
    for (name, template) in &config.outputs {
        let owner = format!("output '{}'", name);
        match resolver::parse_refs(template) {
            Ok(refs) if refs.is_empty() => errors.push(ValidationError::new(format!(
                "{} references no resource",
                owner
            ))),
            Ok(refs) => {
                for r in &refs {
                    check_ref(config, &owner, None, r, errors);
                }
            }
            Err(e) => errors.push(ValidationError::new(format!("{}: {}", owner, e))),
        }
    }
}

/// Each load balancer target group fronts at most one service.
fn validate_target_groups(config: &StackConfig, errors: &mut Vec<ValidationError>) {
    let mut bindings: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for (id, resource) in &config.resources {
        if let ResourceKind::Service(ref spec) = resource.kind {
            if let Some(tg) = compute::bound_target_group(spec) {
                bindings.entry(tg.trim()).or_default().push(id);
            }
        }
    }
    for (tg, services) in bindings {
        if services.len() > 1 {
            errors.push(ValidationError::new(format!(
                "target group {} is bound by several services: {}",
                tg,
                services.join(", ")
            )));
        }
    }
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &StackConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError::new(format!(
            "version must be \"1.0\", got \"{}\"",
            config.version
        )));
    }

    if !IDENTIFIER.is_match(&config.name) {
        errors.push(ValidationError::new(format!(
            "name '{}' must match [a-z0-9][a-z0-9-]*",
            config.name
        )));
    }

    for (id, resource) in &config.resources {
        validate_resource(config, id, resource, &mut errors);
    }

    validate_outputs(config, &mut errors);
    validate_target_groups(config, &mut errors);

    // Unknown references were reported above.
    if let Err(Error::Cycle(members)) = resolver::build_execution_order(config) {
        errors.push(ValidationError::new(format!(
            "dependency cycle detected involving: {}",
            members
        )));
    }

    errors
}
