//! Static site: private bucket behind a CDN via an origin access identity.

use super::{Handle, Output, StackBuilder};
use crate::core::types::*;
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct StaticSite {
    pub bucket: Handle,
    pub identity: Handle,
    pub distribution: Handle,
}

impl StaticSite {
    pub fn bucket_name(&self) -> Output {
        self.bucket.output("id")
    }

    pub fn cdn_domain(&self) -> Output {
        self.distribution.output("domain_name")
    }
}

/// A pre-existing certificate, referenced by ARN.
pub fn certificate(b: &mut StackBuilder, id: &str, arn: &impl Display) -> Handle {
    b.add(
        id,
        ResourceKind::Certificate(CertificateSpec {
            arn: arn.to_string(),
        }),
    )
}

/// Declare `<id>-bucket`, `<id>-oai` and `<id>-cdn`.
pub fn static_site(
    b: &mut StackBuilder,
    id: &str,
    bucket_name: &impl Display,
    alias: &impl Display,
    viewer_certificate: &Handle,
) -> StaticSite {
    let identity = b.add(
        &format!("{}-oai", id),
        ResourceKind::OriginAccessIdentity(OriginAccessIdentitySpec {
            comment: format!("{} static assets", id),
        }),
    );
    let bucket = b.add(
        &format!("{}-bucket", id),
        ResourceKind::Bucket(BucketSpec {
            bucket: bucket_name.to_string(),
            reader: identity.output("iam_arn").to_string(),
            object_ownership: "BucketOwnerEnforced".to_string(),
            force_destroy: false,
        }),
    );
    let distribution = b.add(
        &format!("{}-cdn", id),
        ResourceKind::Distribution(DistributionSpec {
            origin: Origin {
                origin_id: bucket.id().to_string(),
                domain_name: bucket.output("regional_domain_name").to_string(),
                origin_access_identity: identity.output("path").to_string(),
            },
            aliases: vec![alias.to_string()],
            default_root_object: "index.html".to_string(),
            cache: CachePolicy::default(),
            price_class: "PriceClass_100".to_string(),
            viewer_certificate: Some(viewer_certificate.output("arn").to_string()),
            ssl_support_method: "sni-only".to_string(),
            enabled: true,
        }),
    );
    StaticSite {
        bucket,
        identity,
        distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_site_wiring() {
        let mut b = StackBuilder::new("t");
        let arn = b.param(
            "cdn_certificate_arn",
            "arn:aws:acm:us-east-1:000000000000:certificate/x",
        );
        let cert = certificate(&mut b, "cdn-certificate", &arn);
        let site = static_site(
            &mut b,
            "frontend",
            &"searchx-frontend",
            &"searchx.geisink.com",
            &cert,
        );
        assert_eq!(site.bucket_name().to_string(), "{{frontend-bucket.id}}");
        assert_eq!(site.cdn_domain().to_string(), "{{frontend-cdn.domain_name}}");

        let config = b.build();
        match &config.resources["frontend-bucket"].kind {
            ResourceKind::Bucket(s) => assert_eq!(s.reader, "{{frontend-oai.iam_arn}}"),
            other => panic!("unexpected kind: {:?}", other),
        }
        match &config.resources["frontend-cdn"].kind {
            ResourceKind::Distribution(d) => {
                assert_eq!(d.origin.origin_access_identity, "{{frontend-oai.path}}");
                assert_eq!(d.viewer_certificate.as_deref(), Some("{{cdn-certificate.arn}}"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }
}
