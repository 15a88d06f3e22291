//! Schema types for cloudjar.yaml, the state lock, plans, and provenance events.
//!
//! Every declaration type derives Serialize/Deserialize for YAML roundtripping
//! and JsonSchema so `cloudjar schema` can publish the format.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level cloudjar.yaml
// ============================================================================

/// Root declaration — the desired state of one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StackConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Stack name; also names the state directory
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Cloud account and region the stack targets
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Global parameters (templatable via `{{params.key}}`)
    #[serde(default)]
    #[schemars(with = "IndexMap<String, serde_json::Value>")]
    pub params: IndexMap<String, serde_yaml_ng::Value>,

    /// Resource declarations (order-preserving)
    pub resources: IndexMap<String, Resource>,

    /// Operator-visible outputs (name → template)
    #[serde(default)]
    pub outputs: IndexMap<String, String>,

    /// Execution policy
    #[serde(default)]
    pub policy: Policy,
}

/// Target account and region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProviderConfig {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_account_id")]
    pub account_id: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            account_id: default_account_id(),
        }
    }
}

fn default_region() -> String {
    "eu-central-1".to_string()
}

fn default_account_id() -> String {
    "000000000000".to_string()
}

/// Execution policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Policy {
    /// Append provenance events on every apply/destroy
    #[serde(default = "default_true")]
    pub tripwire: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self { tripwire: true }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Resources
// ============================================================================

/// A single cloud resource declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Resource {
    /// Kind tag (`type:`) and kind-specific fields
    #[serde(flatten)]
    pub kind: ResourceKind,

    /// Explicit dependencies on top of the ones implied by templates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            depends_on: Vec::new(),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.kind.resource_type()
    }
}

/// Kind-specific declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKind {
    RandomPassword(PasswordSpec),
    Secret(SecretSpec),
    DocdbCluster(DocumentDbSpec),
    CacheCluster(CacheSpec),
    SearchDomain(SearchDomainSpec),
    Bucket(BucketSpec),
    OriginAccessIdentity(OriginAccessIdentitySpec),
    Certificate(CertificateSpec),
    Distribution(DistributionSpec),
    ComputeCluster(ComputeClusterSpec),
    LoadBalancer(LoadBalancerSpec),
    Service(ServiceSpec),
}

impl ResourceKind {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::RandomPassword(_) => ResourceType::RandomPassword,
            Self::Secret(_) => ResourceType::Secret,
            Self::DocdbCluster(_) => ResourceType::DocdbCluster,
            Self::CacheCluster(_) => ResourceType::CacheCluster,
            Self::SearchDomain(_) => ResourceType::SearchDomain,
            Self::Bucket(_) => ResourceType::Bucket,
            Self::OriginAccessIdentity(_) => ResourceType::OriginAccessIdentity,
            Self::Certificate(_) => ResourceType::Certificate,
            Self::Distribution(_) => ResourceType::Distribution,
            Self::ComputeCluster(_) => ResourceType::ComputeCluster,
            Self::LoadBalancer(_) => ResourceType::LoadBalancer,
            Self::Service(_) => ResourceType::Service,
        }
    }
}

/// Resource type tag, used in locks, plans and provider records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    RandomPassword,
    Secret,
    DocdbCluster,
    CacheCluster,
    SearchDomain,
    Bucket,
    OriginAccessIdentity,
    Certificate,
    Distribution,
    ComputeCluster,
    LoadBalancer,
    Service,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RandomPassword => "random_password",
            Self::Secret => "secret",
            Self::DocdbCluster => "docdb_cluster",
            Self::CacheCluster => "cache_cluster",
            Self::SearchDomain => "search_domain",
            Self::Bucket => "bucket",
            Self::OriginAccessIdentity => "origin_access_identity",
            Self::Certificate => "certificate",
            Self::Distribution => "distribution",
            Self::ComputeCluster => "compute_cluster",
            Self::LoadBalancer => "load_balancer",
            Self::Service => "service",
        };
        write!(f, "{}", name)
    }
}

// -- Credentials --

/// Random password policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PasswordSpec {
    #[serde(default = "default_password_length")]
    pub length: u32,

    /// Allow special characters
    #[serde(default = "default_true")]
    pub special: bool,

    #[serde(default)]
    pub min_lower: u32,

    #[serde(default)]
    pub min_upper: u32,

    #[serde(default)]
    pub min_numeric: u32,

    #[serde(default)]
    pub min_special: u32,

    /// Replaces the default special character set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_special: Option<String>,
}

impl Default for PasswordSpec {
    fn default() -> Self {
        Self {
            length: default_password_length(),
            special: true,
            min_lower: 0,
            min_upper: 0,
            min_numeric: 0,
            min_special: 0,
            override_special: None,
        }
    }
}

fn default_password_length() -> u32 {
    16
}

/// Managed secret holding one string value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SecretSpec {
    /// The store appends a unique suffix to this prefix
    pub name_prefix: String,

    /// Secret value, usually `{{<password>.result}}`
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// -- Datastores --

/// Document database cluster with its parameter group and instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentDbSpec {
    pub cluster_identifier: String,

    #[serde(default = "default_docdb_engine")]
    pub engine: String,

    /// Parameter group family
    #[serde(default = "default_docdb_family")]
    pub family: String,

    /// `tls` cluster parameter
    #[serde(default)]
    pub tls: bool,

    pub master_username: String,

    pub master_password: String,

    #[serde(default = "default_backup_retention")]
    pub backup_retention_period: u32,

    #[serde(default = "default_true")]
    pub skip_final_snapshot: bool,

    pub instance_class: String,

    #[serde(default = "default_one")]
    pub instance_count: u32,
}

fn default_docdb_engine() -> String {
    "docdb".to_string()
}

fn default_docdb_family() -> String {
    "docdb5.0".to_string()
}

fn default_backup_retention() -> u32 {
    5
}

fn default_one() -> u32 {
    1
}

/// Cache cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CacheSpec {
    #[serde(default = "default_cache_engine")]
    pub engine: String,

    pub engine_version: String,

    pub node_type: String,

    #[serde(default = "default_one")]
    pub num_cache_nodes: u32,
}

fn default_cache_engine() -> String {
    "redis".to_string()
}

/// Search domain with fine-grained access control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchDomainSpec {
    pub domain_name: String,

    pub engine_version: String,

    pub instance_type: String,

    /// EBS volume size in GiB
    #[serde(default = "default_volume_size")]
    pub volume_size: u32,

    #[serde(default = "default_true")]
    pub encrypt_at_rest: bool,

    #[serde(default = "default_true")]
    pub node_to_node_encryption: bool,

    #[serde(default = "default_true")]
    pub enforce_https: bool,

    #[serde(default = "default_tls_policy")]
    pub tls_security_policy: String,

    #[serde(default = "default_true")]
    pub internal_user_database: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_user: Option<MasterUser>,

    /// Resource-based access policy document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_policy: Option<serde_json::Value>,
}

fn default_volume_size() -> u32 {
    10
}

fn default_tls_policy() -> String {
    "Policy-Min-TLS-1-2-2019-07".to_string()
}

/// Master user of a search domain's internal user database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MasterUser {
    pub name: String,
    pub password: String,
}

// -- Static hosting --

/// Private storage bucket readable only through an origin access identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BucketSpec {
    pub bucket: String,

    /// Principal granted read access, `{{<oai>.iam_arn}}`
    pub reader: String,

    #[serde(default = "default_object_ownership")]
    pub object_ownership: String,

    #[serde(default)]
    pub force_destroy: bool,
}

fn default_object_ownership() -> String {
    "BucketOwnerEnforced".to_string()
}

/// CDN identity allowed to read a private bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OriginAccessIdentitySpec {
    #[serde(default)]
    pub comment: String,
}

/// Pre-existing certificate, referenced by ARN and never issued here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CertificateSpec {
    pub arn: String,
}

/// CDN distribution with a single bucket origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DistributionSpec {
    pub origin: Origin,

    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default = "default_root_object")]
    pub default_root_object: String,

    #[serde(default)]
    pub cache: CachePolicy,

    #[serde(default = "default_price_class")]
    pub price_class: String,

    /// Viewer certificate ARN (SNI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_certificate: Option<String>,

    #[serde(default = "default_ssl_support_method")]
    pub ssl_support_method: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_root_object() -> String {
    "index.html".to_string()
}

fn default_price_class() -> String {
    "PriceClass_100".to_string()
}

fn default_ssl_support_method() -> String {
    "sni-only".to_string()
}

/// Distribution origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Origin {
    pub origin_id: String,

    /// `{{<bucket>.regional_domain_name}}`
    pub domain_name: String,

    /// `{{<oai>.path}}`
    pub origin_access_identity: String,
}

/// Cache behavior applied to every path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CachePolicy {
    pub viewer_protocol_policy: String,
    pub allowed_methods: Vec<String>,
    pub cached_methods: Vec<String>,
    pub forward_query_string: bool,
    pub forward_cookies: String,
    pub min_ttl: u32,
    pub default_ttl: u32,
    pub max_ttl: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        let methods = vec!["GET".to_string(), "HEAD".to_string(), "OPTIONS".to_string()];
        Self {
            viewer_protocol_policy: "redirect-to-https".to_string(),
            allowed_methods: methods.clone(),
            cached_methods: methods,
            forward_query_string: false,
            forward_cookies: "none".to_string(),
            min_ttl: 0,
            default_ttl: 600,
            max_ttl: 600,
        }
    }
}

// -- Compute --

/// Container cluster grouping services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComputeClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub container_insights: bool,
}

/// Application load balancer with one default target group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LoadBalancerSpec {
    pub listeners: Vec<Listener>,

    /// Port the default target group forwards to
    #[serde(default = "default_target_port")]
    pub target_port: u16,

    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,
}

fn default_target_port() -> u16 {
    80
}

fn default_health_check_path() -> String {
    "/".to_string()
}

/// Load balancer listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Listener {
    pub port: u16,

    pub protocol: ListenerProtocol,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_arn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListenerProtocol {
    Http,
    Https,
}

impl fmt::Display for ListenerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "HTTP"),
            Self::Https => write!(f, "HTTPS"),
        }
    }
}

/// Container service running on a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceSpec {
    /// `{{<cluster>.arn}}`
    pub cluster: String,

    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,

    /// CPU units
    pub cpu: u32,

    /// Memory in MiB
    pub memory: u32,

    #[serde(default = "default_true")]
    pub essential: bool,

    #[serde(default)]
    pub assign_public_ip: bool,

    #[serde(default = "default_one")]
    pub desired_count: u32,

    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,

    /// Container environment (name → template)
    #[serde(default)]
    pub environment: IndexMap<String, String>,
}

/// Container port, optionally bound to a load balancer target group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PortMapping {
    pub container_port: u16,

    /// `{{<lb>.target_group_arn}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_group: Option<String>,
}

// ============================================================================
// State / Lock file
// ============================================================================

/// Per-stack state lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateLock {
    pub schema: String,

    pub stack: String,

    pub generated_at: String,

    pub generator: String,

    pub blake3_version: String,

    /// Per-resource state, in apply order
    pub resources: IndexMap<String, ResourceLock>,

    /// Resolved stack outputs from the last apply
    #[serde(default)]
    pub outputs: IndexMap<String, String>,
}

/// Per-resource lock entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLock {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    pub status: ResourceStatus,

    #[serde(default)]
    pub applied_at: Option<String>,

    #[serde(default)]
    pub duration_seconds: Option<f64>,

    /// BLAKE3 of the unresolved declaration
    pub hash: String,

    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Non-sensitive provider outputs
    #[serde(default)]
    pub outputs: IndexMap<String, String>,
}

/// Resource lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Provisioned,
    Failed,
    Drifted,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisioned => write!(f, "PROVISIONED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Drifted => write!(f, "DRIFTED"),
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Action to take on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update,
    /// Look up a pre-existing resource
    Read,
    Destroy,
    NoOp,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Read => write!(f, "READ"),
            Self::Destroy => write!(f, "DESTROY"),
            Self::NoOp => write!(f, "NO-OP"),
        }
    }
}

/// A single planned change.
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub action: PlanAction,
    pub description: String,
}

/// Full execution plan.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub name: String,

    pub changes: Vec<PlannedChange>,

    /// Topological order (resource IDs)
    pub execution_order: Vec<String>,

    /// Locked resources no longer declared; kept until teardown
    pub orphaned: Vec<String>,

    pub to_create: u32,
    pub to_update: u32,
    pub to_read: u32,
    pub to_destroy: u32,
    pub unchanged: u32,
}

impl ExecutionPlan {
    /// True when applying would not touch any resource.
    pub fn is_empty(&self) -> bool {
        self.to_create == 0 && self.to_update == 0 && self.to_read == 0 && self.to_destroy == 0
    }
}

// ============================================================================
// Provenance events
// ============================================================================

/// Provenance event for the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvenanceEvent {
    ApplyStarted {
        stack: String,
        run_id: String,
        cloudjar_version: String,
    },
    ResourceStarted {
        stack: String,
        resource: String,
        action: String,
    },
    ResourceProvisioned {
        stack: String,
        resource: String,
        duration_seconds: f64,
        hash: String,
    },
    ResourceFailed {
        stack: String,
        resource: String,
        error: String,
    },
    ApplyCompleted {
        stack: String,
        run_id: String,
        resources_provisioned: u32,
        resources_unchanged: u32,
        resources_failed: u32,
        total_seconds: f64,
    },
    ResourceDestroyed {
        stack: String,
        resource: String,
    },
    DestroyCompleted {
        stack: String,
        run_id: String,
        resources_destroyed: u32,
    },
    DriftDetected {
        stack: String,
        resource: String,
        expected_hash: String,
        actual_hash: String,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: ProvenanceEvent,
}

// ============================================================================
// Apply / destroy results
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub stack: String,
    pub resources_provisioned: u32,
    pub resources_unchanged: u32,
    pub total_duration: std::time::Duration,
    pub outputs: IndexMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct DestroyResult {
    pub stack: String,
    pub resources_destroyed: u32,
    pub total_duration: std::time::Duration,
}

// ============================================================================
// Template helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for template resolution.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_with_defaults() {
        let yaml = r#"
version: "1.0"
name: test-stack
resources:
  db-password:
    type: random_password
    special: false
  cluster:
    type: compute_cluster
"#;
        let config: StackConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.name, "test-stack");
        assert_eq!(config.provider.region, "eu-central-1");
        assert!(config.policy.tripwire);
        match &config.resources["db-password"].kind {
            ResourceKind::RandomPassword(p) => {
                assert_eq!(p.length, 16);
                assert!(!p.special);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert_eq!(
            config.resources["cluster"].resource_type(),
            ResourceType::ComputeCluster
        );
    }

    #[test]
    fn test_resource_depends_on_next_to_kind_fields() {
        let yaml = r#"
type: cache_cluster
engine_version: "7.1"
node_type: cache.t3.micro
depends_on: [vpc]
"#;
        let r: Resource = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(r.depends_on, vec!["vpc"]);
        match r.kind {
            ResourceKind::CacheCluster(c) => {
                assert_eq!(c.engine, "redis");
                assert_eq!(c.num_cache_nodes, 1);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let yaml = r#"
type: mainframe
"#;
        assert!(serde_yaml_ng::from_str::<Resource>(yaml).is_err());
    }

    #[test]
    fn test_resource_roundtrip() {
        let r = Resource {
            kind: ResourceKind::Service(ServiceSpec {
                cluster: "{{cluster.arn}}".to_string(),
                image: "ghcr.io/levdops/worker:latest".to_string(),
                container_name: None,
                cpu: 128,
                memory: 512,
                essential: true,
                assign_public_ip: true,
                desired_count: 1,
                port_mappings: vec![],
                environment: IndexMap::from([(
                    "NODE_ENV".to_string(),
                    "production".to_string(),
                )]),
            }),
            depends_on: vec![],
        };
        let yaml = serde_yaml_ng::to_string(&r).unwrap();
        assert!(yaml.contains("type: service"));
        assert!(!yaml.contains("depends_on"));
        let back: Resource = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_cache_policy_defaults() {
        let p = CachePolicy::default();
        assert_eq!(p.min_ttl, 0);
        assert_eq!(p.default_ttl, 600);
        assert_eq!(p.max_ttl, 600);
        assert_eq!(p.allowed_methods, vec!["GET", "HEAD", "OPTIONS"]);
    }

    #[test]
    fn test_listener_protocol_serde() {
        let l: Listener = serde_yaml_ng::from_str("port: 443\nprotocol: HTTPS\n").unwrap();
        assert_eq!(l.protocol, ListenerProtocol::Https);
        assert_eq!(l.protocol.to_string(), "HTTPS");
    }

    #[test]
    fn test_resource_type_display() {
        assert_eq!(ResourceType::DocdbCluster.to_string(), "docdb_cluster");
        assert_eq!(
            ResourceType::OriginAccessIdentity.to_string(),
            "origin_access_identity"
        );
    }

    #[test]
    fn test_status_and_action_display() {
        assert_eq!(ResourceStatus::Provisioned.to_string(), "PROVISIONED");
        assert_eq!(PlanAction::Read.to_string(), "READ");
        assert_eq!(PlanAction::NoOp.to_string(), "NO-OP");
    }

    #[test]
    fn test_provenance_event_serde() {
        let event = ProvenanceEvent::ApplyStarted {
            stack: "searchx".to_string(),
            run_id: "r-abc".to_string(),
            cloudjar_version: "0.3.0".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"apply_started\""));
        assert!(json.contains("\"run_id\":\"r-abc\""));
    }

    #[test]
    fn test_yaml_value_to_string() {
        assert_eq!(
            yaml_value_to_string(&serde_yaml_ng::Value::String("hello".into())),
            "hello"
        );
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Bool(true)), "true");
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Null), "");
    }
}
