//! Per-kind dispatch: output attributes, sensitivity, validation, descriptions
//! and provider-assigned outputs.

use super::error::ValidationError;
use super::resolver::{parse_refs, TemplateRef};
use super::types::*;
use crate::resources::{compute, datastore, frontend, secret};
use indexmap::IndexMap;

/// Attributes a resource of this type exposes once provisioned.
pub fn output_attributes(rt: ResourceType) -> &'static [&'static str] {
    match rt {
        ResourceType::RandomPassword => secret::PASSWORD_OUTPUTS,
        ResourceType::Secret => secret::SECRET_OUTPUTS,
        ResourceType::DocdbCluster => datastore::DOCDB_OUTPUTS,
        ResourceType::CacheCluster => datastore::CACHE_OUTPUTS,
        ResourceType::SearchDomain => datastore::SEARCH_OUTPUTS,
        ResourceType::Bucket => frontend::BUCKET_OUTPUTS,
        ResourceType::OriginAccessIdentity => frontend::OAI_OUTPUTS,
        ResourceType::Certificate => frontend::CERTIFICATE_OUTPUTS,
        ResourceType::Distribution => frontend::DISTRIBUTION_OUTPUTS,
        ResourceType::ComputeCluster => compute::CLUSTER_OUTPUTS,
        ResourceType::LoadBalancer => compute::LOAD_BALANCER_OUTPUTS,
        ResourceType::Service => compute::SERVICE_OUTPUTS,
    }
}

/// Sensitive outputs are never written to the lock or a stack output.
pub fn is_sensitive(rt: ResourceType, attribute: &str) -> bool {
    rt == ResourceType::RandomPassword && attribute == "result"
}

/// Kinds that may consume a sensitive output directly.
pub fn accepts_sensitive(rt: ResourceType) -> bool {
    matches!(
        rt,
        ResourceType::Secret | ResourceType::DocdbCluster | ResourceType::SearchDomain
    )
}

/// Reference kinds point at something that already exists and are only read.
pub fn is_reference(rt: ResourceType) -> bool {
    rt == ResourceType::Certificate
}

/// The reference a template consists of, when it is nothing but one reference.
pub fn sole_ref(template: &str) -> Option<TemplateRef> {
    let t = template.trim();
    if !t.starts_with("{{") || !t.ends_with("}}") || t.len() < 4 {
        return None;
    }
    if t[2..].find("}}") != Some(t.len() - 4) {
        return None;
    }
    parse_refs(t).ok()?.into_iter().next()
}

/// True when `template` is exactly `{{<id>.<attribute>}}` for a resource of type `rt`.
pub fn is_output_of(
    config: &StackConfig,
    template: &str,
    rt: ResourceType,
    attribute: &str,
) -> bool {
    match sole_ref(template) {
        Some(TemplateRef::Output {
            resource,
            attribute: attr,
        }) => {
            attr == attribute
                && config
                    .resources
                    .get(&resource)
                    .is_some_and(|r| r.resource_type() == rt)
        }
        _ => false,
    }
}

/// Kind-specific validation of a params-resolved resource.
pub fn validate(id: &str, kind: &ResourceKind, config: &StackConfig) -> Vec<ValidationError> {
    match kind {
        ResourceKind::RandomPassword(spec) => secret::check_policy(id, spec),
        ResourceKind::Secret(spec) => secret::validate_secret(id, spec),
        ResourceKind::DocdbCluster(spec) => datastore::validate_document_db(id, spec),
        ResourceKind::CacheCluster(spec) => datastore::validate_cache(id, spec),
        ResourceKind::SearchDomain(spec) => datastore::validate_search_domain(id, spec),
        ResourceKind::Bucket(spec) => frontend::validate_bucket(id, spec, config),
        ResourceKind::OriginAccessIdentity(_) => Vec::new(),
        ResourceKind::Certificate(spec) => frontend::validate_certificate(id, spec),
        ResourceKind::Distribution(spec) => frontend::validate_distribution(id, spec, config),
        ResourceKind::ComputeCluster(spec) => compute::validate_cluster(id, spec),
        ResourceKind::LoadBalancer(spec) => compute::validate_load_balancer(id, spec, config),
        ResourceKind::Service(spec) => compute::validate_service(id, spec, config),
    }
}

/// One-line description used by plans.
pub fn describe(id: &str, kind: &ResourceKind) -> String {
    match kind {
        ResourceKind::RandomPassword(spec) => secret::describe_password(id, spec),
        ResourceKind::Secret(spec) => secret::describe_secret(id, spec),
        ResourceKind::DocdbCluster(spec) => datastore::describe_document_db(id, spec),
        ResourceKind::CacheCluster(spec) => datastore::describe_cache(id, spec),
        ResourceKind::SearchDomain(spec) => datastore::describe_search_domain(id, spec),
        ResourceKind::Bucket(spec) => frontend::describe_bucket(id, spec),
        ResourceKind::OriginAccessIdentity(_) => format!("{}: origin access identity", id),
        ResourceKind::Certificate(spec) => format!("{}: certificate {}", id, spec.arn),
        ResourceKind::Distribution(spec) => frontend::describe_distribution(id, spec),
        ResourceKind::ComputeCluster(spec) => compute::describe_cluster(id, spec),
        ResourceKind::LoadBalancer(spec) => compute::describe_load_balancer(id, spec),
        ResourceKind::Service(spec) => compute::describe_service(id, spec),
    }
}

/// Deterministic provider-assigned outputs of a fully resolved resource.
///
/// Returns None for credential kinds, whose outputs depend on freshly
/// generated material owned by the provider's secret store.
pub fn synthesize_outputs(
    id: &str,
    kind: &ResourceKind,
    provider: &ProviderConfig,
) -> Option<IndexMap<String, String>> {
    let outputs = match kind {
        ResourceKind::RandomPassword(_) | ResourceKind::Secret(_) => return None,
        ResourceKind::DocdbCluster(spec) => datastore::document_db_outputs(spec, provider),
        ResourceKind::CacheCluster(_) => datastore::cache_outputs(id, provider),
        ResourceKind::SearchDomain(spec) => datastore::search_domain_outputs(spec, provider),
        ResourceKind::Bucket(spec) => frontend::bucket_outputs(spec, provider),
        ResourceKind::OriginAccessIdentity(_) => frontend::oai_outputs(id, provider),
        ResourceKind::Certificate(spec) => frontend::certificate_outputs(spec),
        ResourceKind::Distribution(_) => frontend::distribution_outputs(id, provider),
        ResourceKind::ComputeCluster(spec) => compute::cluster_outputs(id, spec, provider),
        ResourceKind::LoadBalancer(_) => compute::load_balancer_outputs(id, provider),
        ResourceKind::Service(spec) => compute::service_outputs(id, spec, provider),
    };
    Some(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StackConfig {
        serde_yaml_ng::from_str(
            r#"
version: "1.0"
name: t
resources:
  oai:
    type: origin_access_identity
  cluster:
    type: compute_cluster
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_every_type_has_outputs() {
        for rt in [
            ResourceType::RandomPassword,
            ResourceType::Secret,
            ResourceType::DocdbCluster,
            ResourceType::CacheCluster,
            ResourceType::SearchDomain,
            ResourceType::Bucket,
            ResourceType::OriginAccessIdentity,
            ResourceType::Certificate,
            ResourceType::Distribution,
            ResourceType::ComputeCluster,
            ResourceType::LoadBalancer,
            ResourceType::Service,
        ] {
            assert!(!output_attributes(rt).is_empty(), "{}", rt);
        }
    }

    #[test]
    fn test_sensitivity() {
        assert!(is_sensitive(ResourceType::RandomPassword, "result"));
        assert!(!is_sensitive(ResourceType::Secret, "arn"));
        assert!(accepts_sensitive(ResourceType::Secret));
        assert!(!accepts_sensitive(ResourceType::Service));
        assert!(is_reference(ResourceType::Certificate));
    }

    #[test]
    fn test_sole_ref() {
        assert_eq!(
            sole_ref(" {{oai.iam_arn}} "),
            Some(TemplateRef::Output {
                resource: "oai".to_string(),
                attribute: "iam_arn".to_string()
            })
        );
        assert_eq!(sole_ref("x{{oai.iam_arn}}"), None);
        assert_eq!(sole_ref("{{a.b}}{{c.d}}"), None);
        assert_eq!(sole_ref("plain"), None);
    }

    #[test]
    fn test_is_output_of() {
        let c = config();
        assert!(is_output_of(&c, "{{oai.iam_arn}}", ResourceType::OriginAccessIdentity, "iam_arn"));
        assert!(!is_output_of(&c, "{{oai.path}}", ResourceType::OriginAccessIdentity, "iam_arn"));
        assert!(!is_output_of(&c, "{{cluster.arn}}", ResourceType::OriginAccessIdentity, "arn"));
        assert!(!is_output_of(&c, "{{ghost.arn}}", ResourceType::ComputeCluster, "arn"));
    }

    #[test]
    fn test_synthesize_skips_credentials() {
        let kind = ResourceKind::RandomPassword(PasswordSpec::default());
        assert!(synthesize_outputs("pw", &kind, &ProviderConfig::default()).is_none());
    }

    #[test]
    fn test_synthesized_outputs_match_declared_attributes() {
        let kind = ResourceKind::OriginAccessIdentity(OriginAccessIdentitySpec::default());
        let out = synthesize_outputs("oai", &kind, &ProviderConfig::default()).unwrap();
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, output_attributes(ResourceType::OriginAccessIdentity));
    }
}
