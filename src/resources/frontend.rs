//! Static asset hosting: private bucket, origin access identity, certificate
//! reference and CDN distribution.

use super::require;
use crate::core::catalog::{is_output_of, sole_ref};
use crate::core::error::ValidationError;
use crate::core::resolver::{resolve_template, Deferred, TemplateRef};
use crate::core::types::*;
use crate::tripwire::hasher::short_digest;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

pub const BUCKET_OUTPUTS: &[&str] = &["id", "arn", "regional_domain_name"];
pub const OAI_OUTPUTS: &[&str] = &["id", "iam_arn", "path"];
pub const CERTIFICATE_OUTPUTS: &[&str] = &["arn"];
pub const DISTRIBUTION_OUTPUTS: &[&str] = &["id", "arn", "domain_name"];

/// CDN viewer certificates must live in this region.
pub const CDN_CERTIFICATE_REGION: &str = "us-east-1";

static BUCKET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("Invalid regex pattern")
});
static CERTIFICATE_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws:acm:([a-z0-9-]+):\d{12}:certificate/[A-Za-z0-9-]+$")
        .expect("Invalid regex pattern")
});

const OBJECT_OWNERSHIP: &[&str] = &["BucketOwnerEnforced", "BucketOwnerPreferred", "ObjectWriter"];
const VIEWER_PROTOCOLS: &[&str] = &["allow-all", "https-only", "redirect-to-https"];
const PRICE_CLASSES: &[&str] = &["PriceClass_100", "PriceClass_200", "PriceClass_All"];

/// Region of a certificate ARN, if it is one.
pub fn certificate_region(arn: &str) -> Option<&str> {
    CERTIFICATE_ARN
        .captures(arn)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// -- Bucket --

pub fn validate_bucket(id: &str, spec: &BucketSpec, config: &StackConfig) -> Vec<ValidationError> {
    let rt = ResourceType::Bucket;
    let mut errors = Vec::new();

    if !BUCKET_NAME.is_match(&spec.bucket) || spec.bucket.contains("..") {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) has invalid bucket name '{}'",
            id, rt, spec.bucket
        )));
    }

    if !is_output_of(config, &spec.reader, ResourceType::OriginAccessIdentity, "iam_arn") {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) reader must be \
             '{{{{<origin_access_identity>.iam_arn}}}}', got '{}'",
            id, rt, spec.reader
        )));
    }

    if !OBJECT_OWNERSHIP.contains(&spec.object_ownership.as_str()) {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) has unknown object_ownership '{}'",
            id, rt, spec.object_ownership
        )));
    }
    errors
}

pub fn bucket_outputs(spec: &BucketSpec, provider: &ProviderConfig) -> IndexMap<String, String> {
    IndexMap::from([
        ("id".to_string(), spec.bucket.clone()),
        ("arn".to_string(), format!("arn:aws:s3:::{}", spec.bucket)),
        (
            "regional_domain_name".to_string(),
            format!("{}.s3.{}.amazonaws.com", spec.bucket, provider.region),
        ),
    ])
}

pub fn describe_bucket(id: &str, spec: &BucketSpec) -> String {
    format!("{}: private bucket {} ({})", id, spec.bucket, spec.object_ownership)
}

// -- Origin access identity --

pub fn oai_outputs(id: &str, provider: &ProviderConfig) -> IndexMap<String, String> {
    let oai_id = format!(
        "E{}",
        short_digest(&format!("{}/oai/{}", provider.account_id, id), 13).to_uppercase()
    );
    IndexMap::from([
        ("id".to_string(), oai_id.clone()),
        (
            "iam_arn".to_string(),
            format!(
                "arn:aws:iam::cloudfront:user/CloudFront Origin Access Identity {}",
                oai_id
            ),
        ),
        (
            "path".to_string(),
            format!("origin-access-identity/cloudfront/{}", oai_id),
        ),
    ])
}

// -- Certificate --

pub fn validate_certificate(id: &str, spec: &CertificateSpec) -> Vec<ValidationError> {
    if CERTIFICATE_ARN.is_match(&spec.arn) {
        return Vec::new();
    }
    vec![ValidationError::new(format!(
        "resource '{}' (certificate) arn '{}' is not a certificate ARN",
        id, spec.arn
    ))]
}

pub fn certificate_outputs(spec: &CertificateSpec) -> IndexMap<String, String> {
    IndexMap::from([("arn".to_string(), spec.arn.clone())])
}

// -- Distribution --

/// The ARN a viewer certificate template points at, resolving params and
/// `{{<certificate>.arn}}` references.
fn viewer_certificate_arn(template: &str, config: &StackConfig) -> Option<String> {
    match sole_ref(template) {
        Some(TemplateRef::Output {
            resource,
            attribute,
        }) if attribute == "arn" => match config.resources.get(&resource).map(|r| &r.kind) {
            Some(ResourceKind::Certificate(cert)) => {
                resolve_template(&cert.arn, &config.params, &Deferred).ok()
            }
            _ => None,
        },
        Some(_) => None,
        None => Some(template.to_string()),
    }
}

pub fn validate_distribution(
    id: &str,
    spec: &DistributionSpec,
    config: &StackConfig,
) -> Vec<ValidationError> {
    let rt = ResourceType::Distribution;
    let mut errors = Vec::new();
    let origin = &spec.origin;

    require(&mut errors, id, rt, "origin.origin_id", &origin.origin_id);
    require(&mut errors, id, rt, "default_root_object", &spec.default_root_object);

    if !is_output_of(config, &origin.domain_name, ResourceType::Bucket, "regional_domain_name") {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) origin.domain_name must be '{{{{<bucket>.regional_domain_name}}}}'",
            id, rt
        )));
    }
    if !is_output_of(
        config,
        &origin.origin_access_identity,
        ResourceType::OriginAccessIdentity,
        "path",
    ) {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) origin.origin_access_identity must be \
             '{{{{<origin_access_identity>.path}}}}'",
            id, rt
        )));
    }

    let cache = &spec.cache;
    if !(cache.min_ttl <= cache.default_ttl && cache.default_ttl <= cache.max_ttl) {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) TTLs must satisfy min <= default <= max (got {}/{}/{})",
            id, rt, cache.min_ttl, cache.default_ttl, cache.max_ttl
        )));
    }
    if !VIEWER_PROTOCOLS.contains(&cache.viewer_protocol_policy.as_str()) {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) has unknown viewer_protocol_policy '{}'",
            id, rt, cache.viewer_protocol_policy
        )));
    }
    if let Some(method) = cache
        .cached_methods
        .iter()
        .find(|m| !cache.allowed_methods.contains(m))
    {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) caches method {} that is not allowed",
            id, rt, method
        )));
    }
    if !PRICE_CLASSES.contains(&spec.price_class.as_str()) {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) has unknown price_class '{}'",
            id, rt, spec.price_class
        )));
    }

    match spec.viewer_certificate {
        Some(ref cert) => match viewer_certificate_arn(cert, config) {
            Some(arn) => match certificate_region(&arn) {
                Some(CDN_CERTIFICATE_REGION) => {}
                Some(region) => errors.push(ValidationError::new(format!(
                    "resource '{}' ({}) viewer certificate is in {}, \
                     CDN certificates must be in {}",
                    id, rt, region, CDN_CERTIFICATE_REGION
                ))),
                None => errors.push(ValidationError::new(format!(
                    "resource '{}' ({}) viewer_certificate '{}' is not a certificate ARN",
                    id, rt, arn
                ))),
            },
            None => errors.push(ValidationError::new(format!(
                "resource '{}' ({}) viewer_certificate must be an ARN \
                 or '{{{{<certificate>.arn}}}}'",
                id, rt
            ))),
        },
        None if !spec.aliases.is_empty() => {
            errors.push(ValidationError::new(format!(
                "resource '{}' ({}) declares aliases without a viewer_certificate",
                id, rt
            )));
        }
        None => {}
    }

    errors
}

pub fn distribution_outputs(id: &str, provider: &ProviderConfig) -> IndexMap<String, String> {
    let seed = format!("{}/distribution/{}", provider.account_id, id);
    let dist_id = format!("E{}", short_digest(&seed, 13).to_uppercase());
    IndexMap::from([
        ("id".to_string(), dist_id.clone()),
        (
            "arn".to_string(),
            format!(
                "arn:aws:cloudfront::{}:distribution/{}",
                provider.account_id, dist_id
            ),
        ),
        (
            "domain_name".to_string(),
            format!("d{}.cloudfront.net", short_digest(&seed, 13)),
        ),
    ])
}

pub fn describe_distribution(id: &str, spec: &DistributionSpec) -> String {
    let aliases = if spec.aliases.is_empty() {
        String::new()
    } else {
        format!(" for {}", spec.aliases.join(", "))
    };
    format!(
        "{}: CDN{} ({}, ttl {}/{}/{})",
        id,
        aliases,
        spec.price_class,
        spec.cache.min_ttl,
        spec.cache.default_ttl,
        spec.cache.max_ttl
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const CDN_CERT: &str =
        "arn:aws:acm:us-east-1:767397730875:certificate/7837223a-390e-4d97-bd9b-793c50f496cc";
    const LB_CERT: &str =
        "arn:aws:acm:eu-central-1:767397730875:certificate/173730c4-db25-4005-b164-6cb0cf7648a6";

    fn config() -> StackConfig {
        serde_yaml_ng::from_str(&format!(
            r#"
version: "1.0"
name: t
params:
  cdn_cert: {CDN_CERT}
resources:
  oai:
    type: origin_access_identity
  site:
    type: bucket
    bucket: searchx-frontend
    reader: "{{{{oai.iam_arn}}}}"
  cdn-cert:
    type: certificate
    arn: "{{{{params.cdn_cert}}}}"
  lb-cert:
    type: certificate
    arn: {LB_CERT}
"#
        ))
        .unwrap()
    }

    fn distribution() -> DistributionSpec {
        DistributionSpec {
            origin: Origin {
                origin_id: "site".to_string(),
                domain_name: "{{site.regional_domain_name}}".to_string(),
                origin_access_identity: "{{oai.path}}".to_string(),
            },
            aliases: vec!["searchx.geisink.com".to_string()],
            default_root_object: "index.html".to_string(),
            cache: CachePolicy::default(),
            price_class: "PriceClass_100".to_string(),
            viewer_certificate: Some("{{cdn-cert.arn}}".to_string()),
            ssl_support_method: "sni-only".to_string(),
            enabled: true,
        }
    }

    fn bucket(reader: &str) -> BucketSpec {
        BucketSpec {
            bucket: "searchx-frontend".to_string(),
            reader: reader.to_string(),
            object_ownership: "BucketOwnerEnforced".to_string(),
            force_destroy: false,
        }
    }

    #[test]
    fn test_bucket_valid() {
        assert!(validate_bucket("site", &bucket("{{oai.iam_arn}}"), &config()).is_empty());
    }

    #[test]
    fn test_bucket_reader_must_be_oai() {
        let errors = validate_bucket("site", &bucket("*"), &config());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("reader"));
    }

    #[test]
    fn test_bucket_name_rules() {
        let mut spec = bucket("{{oai.iam_arn}}");
        spec.bucket = "Not_A_Bucket".to_string();
        assert_eq!(validate_bucket("site", &spec, &config()).len(), 1);
        spec.bucket = "a..b".to_string();
        assert_eq!(validate_bucket("site", &spec, &config()).len(), 1);
    }

    #[test]
    fn test_bucket_outputs() {
        let out = bucket_outputs(&bucket("x"), &ProviderConfig::default());
        assert_eq!(out["id"], "searchx-frontend");
        assert_eq!(out["arn"], "arn:aws:s3:::searchx-frontend");
        assert_eq!(
            out["regional_domain_name"],
            "searchx-frontend.s3.eu-central-1.amazonaws.com"
        );
    }

    #[test]
    fn test_oai_outputs_consistent() {
        let out = oai_outputs("oai", &ProviderConfig::default());
        let id = &out["id"];
        assert!(id.starts_with('E'));
        assert_eq!(id.len(), 14);
        assert!(out["iam_arn"].ends_with(id.as_str()));
        assert_eq!(out["path"], format!("origin-access-identity/cloudfront/{}", id));
    }

    #[test]
    fn test_certificate_validation() {
        let ok = CertificateSpec {
            arn: LB_CERT.to_string(),
        };
        assert!(validate_certificate("c", &ok).is_empty());
        let bad = CertificateSpec {
            arn: "not-an-arn".to_string(),
        };
        assert_eq!(validate_certificate("c", &bad).len(), 1);
        assert_eq!(certificate_region(CDN_CERT), Some("us-east-1"));
    }

    #[test]
    fn test_distribution_valid() {
        let errors = validate_distribution("cdn", &distribution(), &config());
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_distribution_literal_certificate() {
        let mut spec = distribution();
        spec.viewer_certificate = Some(CDN_CERT.to_string());
        assert!(validate_distribution("cdn", &spec, &config()).is_empty());
    }

    #[test]
    fn test_distribution_certificate_region() {
        let mut spec = distribution();
        spec.viewer_certificate = Some("{{lb-cert.arn}}".to_string());
        let errors = validate_distribution("cdn", &spec, &config());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("eu-central-1"));
    }

    #[test]
    fn test_distribution_ttl_window() {
        let mut spec = distribution();
        spec.cache.default_ttl = 900;
        let errors = validate_distribution("cdn", &spec, &config());
        assert!(errors.iter().any(|e| e.message.contains("TTLs")));
    }

    #[test]
    fn test_distribution_aliases_need_certificate() {
        let mut spec = distribution();
        spec.viewer_certificate = None;
        let errors = validate_distribution("cdn", &spec, &config());
        assert!(errors.iter().any(|e| e.message.contains("aliases")));
    }

    #[test]
    fn test_distribution_origin_must_be_bucket() {
        let mut spec = distribution();
        spec.origin.domain_name = "example.com".to_string();
        spec.origin.origin_access_identity = "{{oai.iam_arn}}".to_string();
        let errors = validate_distribution("cdn", &spec, &config());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_distribution_outputs() {
        let out = distribution_outputs("cdn", &ProviderConfig::default());
        assert!(out["domain_name"].ends_with(".cloudfront.net"));
        assert!(out["arn"].ends_with(out["id"].as_str()));
    }
}
