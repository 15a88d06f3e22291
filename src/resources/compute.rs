//! Compute: container cluster, load balancer and container services.

use super::{require, require_at_least};
use crate::core::catalog::{is_output_of, sole_ref};
use crate::core::error::ValidationError;
use crate::core::resolver::TemplateRef;
use crate::core::types::*;
use crate::resources::frontend::certificate_region;
use crate::tripwire::hasher::short_digest;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

pub const CLUSTER_OUTPUTS: &[&str] = &["arn", "name"];
pub const LOAD_BALANCER_OUTPUTS: &[&str] = &["arn", "dns_name", "target_group_arn"];
pub const SERVICE_OUTPUTS: &[&str] = &["arn", "name"];

static ENV_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("Invalid regex pattern"));

/// `scheme://user:password@` — captures the password part.
static URL_CREDENTIALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9+.-]*://[^:/@\s]+:([^@\s]+)@").expect("Invalid regex pattern")
});

// -- Cluster --

pub fn validate_cluster(id: &str, spec: &ComputeClusterSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if let Some(ref name) = spec.name {
        require(&mut errors, id, ResourceType::ComputeCluster, "name", name);
    }
    errors
}

pub fn cluster_name<'a>(id: &'a str, spec: &'a ComputeClusterSpec) -> &'a str {
    spec.name.as_deref().unwrap_or(id)
}

pub fn cluster_outputs(
    id: &str,
    spec: &ComputeClusterSpec,
    provider: &ProviderConfig,
) -> IndexMap<String, String> {
    let name = cluster_name(id, spec);
    IndexMap::from([
        (
            "arn".to_string(),
            format!(
                "arn:aws:ecs:{}:{}:cluster/{}",
                provider.region, provider.account_id, name
            ),
        ),
        ("name".to_string(), name.to_string()),
    ])
}

pub fn describe_cluster(id: &str, spec: &ComputeClusterSpec) -> String {
    format!(
        "{}: container cluster {}{}",
        id,
        cluster_name(id, spec),
        if spec.container_insights {
            " (insights)"
        } else {
            ""
        }
    )
}

// -- Load balancer --

fn listener_certificate_ok(arn: &str, config: &StackConfig) -> bool {
    match sole_ref(arn) {
        Some(_) => is_output_of(config, arn, ResourceType::Certificate, "arn"),
        None => certificate_region(arn).is_some(),
    }
}

pub fn validate_load_balancer(
    id: &str,
    spec: &LoadBalancerSpec,
    config: &StackConfig,
) -> Vec<ValidationError> {
    let rt = ResourceType::LoadBalancer;
    let mut errors = Vec::new();

    if spec.listeners.is_empty() {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) has no listeners",
            id, rt
        )));
    }

    let mut ports = HashSet::new();
    for listener in &spec.listeners {
        if !ports.insert(listener.port) {
            errors.push(ValidationError::new(format!(
                "resource '{}' ({}) declares port {} twice",
                id, rt, listener.port
            )));
        }
        match (listener.protocol, &listener.certificate_arn) {
            (ListenerProtocol::Https, None) => errors.push(ValidationError::new(format!(
                "resource '{}' ({}) HTTPS listener on port {} has no certificate_arn",
                id, rt, listener.port
            ))),
            (ListenerProtocol::Https, Some(arn)) if !listener_certificate_ok(arn, config) => {
                errors.push(ValidationError::new(format!(
                    "resource '{}' ({}) listener on port {} has invalid certificate_arn '{}'",
                    id, rt, listener.port, arn
                )))
            }
            (ListenerProtocol::Http, Some(_)) => errors.push(ValidationError::new(format!(
                "resource '{}' ({}) HTTP listener on port {} does not take a certificate",
                id, rt, listener.port
            ))),
            _ => {}
        }
    }

    if spec.target_port == 0 {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) target_port must be non-zero",
            id, rt
        )));
    }
    if !spec.health_check_path.starts_with('/') {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) health_check_path must start with '/'",
            id, rt
        )));
    }
    errors
}

pub fn load_balancer_outputs(id: &str, provider: &ProviderConfig) -> IndexMap<String, String> {
    let seed = format!("{}/{}/lb/{}", provider.account_id, provider.region, id);
    let prefix = format!(
        "arn:aws:elasticloadbalancing:{}:{}",
        provider.region, provider.account_id
    );
    IndexMap::from([
        (
            "arn".to_string(),
            format!("{}:loadbalancer/app/{}/{}", prefix, id, short_digest(&seed, 16)),
        ),
        (
            "dns_name".to_string(),
            format!(
                "{}-{}.{}.elb.amazonaws.com",
                id,
                short_digest(&seed, 10),
                provider.region
            ),
        ),
        (
            "target_group_arn".to_string(),
            format!(
                "{}:targetgroup/{}-tg/{}",
                prefix,
                id,
                short_digest(&format!("{}/tg", seed), 16)
            ),
        ),
    ])
}

pub fn describe_load_balancer(id: &str, spec: &LoadBalancerSpec) -> String {
    let listeners: Vec<String> = spec
        .listeners
        .iter()
        .map(|l| format!("{} :{}", l.protocol, l.port))
        .collect();
    format!(
        "{}: load balancer [{}] -> :{}",
        id,
        listeners.join(", "),
        spec.target_port
    )
}

// -- Service --

/// Check that credentials embedded in a URL come from the secret store.
fn check_embedded_credentials(
    id: &str,
    name: &str,
    value: &str,
    config: &StackConfig,
    errors: &mut Vec<ValidationError>,
) {
    let Some(password) = URL_CREDENTIALS.captures(value).and_then(|c| c.get(1)) else {
        return;
    };
    let from_store = match sole_ref(password.as_str()) {
        Some(TemplateRef::Secret(secret_id)) => config
            .resources
            .get(&secret_id)
            .is_some_and(|r| r.resource_type() == ResourceType::Secret),
        _ => false,
    };
    if !from_store {
        errors.push(ValidationError::new(format!(
            "resource '{}' (service) env {} embeds a credential that is not '{{{{secret.<id>}}}}'",
            id, name
        )));
    }
}

pub fn validate_service(
    id: &str,
    spec: &ServiceSpec,
    config: &StackConfig,
) -> Vec<ValidationError> {
    let rt = ResourceType::Service;
    let mut errors = Vec::new();

    if !is_output_of(config, &spec.cluster, ResourceType::ComputeCluster, "arn") {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) cluster must be '{{{{<compute_cluster>.arn}}}}', got '{}'",
            id, rt, spec.cluster
        )));
    }

    require(&mut errors, id, rt, "image", &spec.image);
    require_at_least(&mut errors, id, rt, "cpu", spec.cpu, 1);
    require_at_least(&mut errors, id, rt, "memory", spec.memory, 1);
    require_at_least(&mut errors, id, rt, "desired_count", spec.desired_count, 1);
    if let Some(ref name) = spec.container_name {
        require(&mut errors, id, rt, "container_name", name);
    }

    let mut bound = 0;
    for mapping in &spec.port_mappings {
        if mapping.container_port == 0 {
            errors.push(ValidationError::new(format!(
                "resource '{}' ({}) has container_port 0",
                id, rt
            )));
        }
        if let Some(ref tg) = mapping.target_group {
            bound += 1;
            if !is_output_of(config, tg, ResourceType::LoadBalancer, "target_group_arn") {
                errors.push(ValidationError::new(format!(
                    "resource '{}' ({}) target_group must be \
                     '{{{{<load_balancer>.target_group_arn}}}}', got '{}'",
                    id, rt, tg
                )));
            }
        }
    }
    if bound > 1 {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) binds {} target groups, at most one is allowed",
            id, rt, bound
        )));
    }

    for (name, value) in &spec.environment {
        if !ENV_NAME.is_match(name) {
            errors.push(ValidationError::new(format!(
                "resource '{}' ({}) has invalid env name '{}'",
                id, rt, name
            )));
        }
        if value.trim().is_empty() {
            errors.push(ValidationError::new(format!(
                "resource '{}' ({}) env {} is empty",
                id, rt, name
            )));
        }
        check_embedded_credentials(id, name, value, config, &mut errors);
    }
    errors
}

/// The target group a service is bound to, if externally reachable.
pub fn bound_target_group(spec: &ServiceSpec) -> Option<&str> {
    spec.port_mappings
        .iter()
        .find_map(|m| m.target_group.as_deref())
}

pub fn service_name<'a>(id: &'a str, spec: &'a ServiceSpec) -> &'a str {
    spec.container_name.as_deref().unwrap_or(id)
}

/// Outputs of a resolved service; `spec.cluster` holds the cluster ARN.
pub fn service_outputs(
    id: &str,
    spec: &ServiceSpec,
    provider: &ProviderConfig,
) -> IndexMap<String, String> {
    let name = service_name(id, spec);
    let cluster = spec.cluster.rsplit('/').next().unwrap_or(&spec.cluster);
    IndexMap::from([
        (
            "arn".to_string(),
            format!(
                "arn:aws:ecs:{}:{}:service/{}/{}",
                provider.region, provider.account_id, cluster, name
            ),
        ),
        ("name".to_string(), name.to_string()),
    ])
}

pub fn describe_service(id: &str, spec: &ServiceSpec) -> String {
    let reach = if bound_target_group(spec).is_some() {
        "load-balanced"
    } else {
        "internal"
    };
    format!(
        "{}: {} x {} ({} cpu, {} MiB, {}, {} env)",
        id,
        spec.desired_count,
        spec.image,
        spec.cpu,
        spec.memory,
        reach,
        spec.environment.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const LB_CERT: &str =
        "arn:aws:acm:eu-central-1:767397730875:certificate/173730c4-db25-4005-b164-6cb0cf7648a6";

    fn config() -> StackConfig {
        serde_yaml_ng::from_str(
            r#"
version: "1.0"
name: t
resources:
  cluster:
    type: compute_cluster
  lb:
    type: load_balancer
    listeners:
      - { port: 80, protocol: HTTP }
  mongo-secret:
    type: secret
    name_prefix: searchx-mongodb-password
    value: "{{mongo-password.result}}"
  mongo-password:
    type: random_password
"#,
        )
        .unwrap()
    }

    fn service() -> ServiceSpec {
        ServiceSpec {
            cluster: "{{cluster.arn}}".to_string(),
            image: "ghcr.io/levdops/server:latest".to_string(),
            container_name: Some("searchx-server".to_string()),
            cpu: 128,
            memory: 512,
            essential: true,
            assign_public_ip: false,
            desired_count: 1,
            port_mappings: vec![PortMapping {
                container_port: 80,
                target_group: Some("{{lb.target_group_arn}}".to_string()),
            }],
            environment: IndexMap::from([
                ("NODE_ENV".to_string(), "production".to_string()),
                (
                    "DB".to_string(),
                    concat!(
                        "mongodb://{{mongo.master_username}}:{{secret.mongo-secret}}",
                        "@{{mongo.endpoint}}:27017/app"
                    )
                    .to_string(),
                ),
            ]),
        }
    }

    fn lb() -> LoadBalancerSpec {
        LoadBalancerSpec {
            listeners: vec![
                Listener {
                    port: 80,
                    protocol: ListenerProtocol::Http,
                    certificate_arn: None,
                },
                Listener {
                    port: 443,
                    protocol: ListenerProtocol::Https,
                    certificate_arn: Some(LB_CERT.to_string()),
                },
            ],
            target_port: 80,
            health_check_path: "/".to_string(),
        }
    }

    #[test]
    fn test_service_valid() {
        let errors = validate_service("server", &service(), &config());
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_service_cluster_must_reference_cluster() {
        let mut spec = service();
        spec.cluster = "{{lb.arn}}".to_string();
        let errors = validate_service("server", &spec, &config());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cluster"));
    }

    #[test]
    fn test_service_single_target_group() {
        let mut spec = service();
        spec.port_mappings.push(PortMapping {
            container_port: 443,
            target_group: Some("{{lb.target_group_arn}}".to_string()),
        });
        let errors = validate_service("server", &spec, &config());
        assert!(errors.iter().any(|e| e.message.contains("binds 2 target groups")));
    }

    #[test]
    fn test_service_target_group_must_be_load_balancer() {
        let mut spec = service();
        spec.port_mappings[0].target_group = Some("{{lb.arn}}".to_string());
        assert_eq!(validate_service("server", &spec, &config()).len(), 1);
    }

    #[test]
    fn test_hardcoded_credential_rejected() {
        let mut spec = service();
        spec.environment.insert(
            "DB".to_string(),
            "mongodb://searchx:hunter2@{{mongo.endpoint}}:27017/app".to_string(),
        );
        let errors = validate_service("server", &spec, &config());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("env DB"));
    }

    #[test]
    fn test_credential_must_come_from_secret_resource() {
        let mut spec = service();
        spec.environment.insert(
            "DB".to_string(),
            "mongodb://u:{{secret.mongo-password}}@h:27017/app".to_string(),
        );
        assert_eq!(validate_service("server", &spec, &config()).len(), 1);
    }

    #[test]
    fn test_url_without_credentials_ok() {
        let mut spec = service();
        spec.environment.insert(
            "REDIS".to_string(),
            "redis://{{redis.address}}:6379".to_string(),
        );
        assert!(validate_service("server", &spec, &config()).is_empty());
    }

    #[test]
    fn test_env_names_and_values() {
        let mut spec = service();
        spec.environment.insert("lower".to_string(), "x".to_string());
        spec.environment.insert("EMPTY".to_string(), String::new());
        assert_eq!(validate_service("server", &spec, &config()).len(), 2);
    }

    #[test]
    fn test_service_counts() {
        let mut spec = service();
        spec.cpu = 0;
        spec.desired_count = 0;
        assert_eq!(validate_service("server", &spec, &config()).len(), 2);
    }

    #[test]
    fn test_load_balancer_valid() {
        assert!(validate_load_balancer("lb", &lb(), &config()).is_empty());
    }

    #[test]
    fn test_load_balancer_https_needs_certificate() {
        let mut spec = lb();
        spec.listeners[1].certificate_arn = None;
        let errors = validate_load_balancer("lb", &spec, &config());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("HTTPS"));
    }

    #[test]
    fn test_load_balancer_duplicate_ports() {
        let mut spec = lb();
        spec.listeners[1].port = 80;
        let errors = validate_load_balancer("lb", &spec, &config());
        assert!(errors.iter().any(|e| e.message.contains("twice")));
    }

    #[test]
    fn test_load_balancer_no_listeners() {
        let mut spec = lb();
        spec.listeners.clear();
        assert_eq!(validate_load_balancer("lb", &spec, &config()).len(), 1);
    }

    #[test]
    fn test_outputs() {
        let provider = ProviderConfig::default();
        let cluster = cluster_outputs("cluster", &ComputeClusterSpec::default(), &provider);
        assert_eq!(cluster["arn"], "arn:aws:ecs:eu-central-1:000000000000:cluster/cluster");

        let lb_out = load_balancer_outputs("searchx-server-lb", &provider);
        assert!(lb_out["dns_name"].starts_with("searchx-server-lb-"));
        assert!(lb_out["dns_name"].ends_with(".eu-central-1.elb.amazonaws.com"));
        assert!(lb_out["target_group_arn"].contains(":targetgroup/searchx-server-lb-tg/"));

        let mut spec = service();
        spec.cluster = cluster["arn"].clone();
        let svc = service_outputs("server", &spec, &provider);
        assert_eq!(svc["name"], "searchx-server");
        assert_eq!(
            svc["arn"],
            "arn:aws:ecs:eu-central-1:000000000000:service/cluster/searchx-server"
        );
    }

    #[test]
    fn test_describe_service() {
        assert!(describe_service("server", &service()).contains("load-balanced"));
        let mut spec = service();
        spec.port_mappings.clear();
        assert!(describe_service("worker", &spec).contains("internal"));
    }
}
