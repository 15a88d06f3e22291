//! The canonical searchx deployment.

use super::compute::{self, ServiceArgs};
use super::datastores::{self, DocumentDbArgs, SearchDomainArgs};
use super::frontend;
use super::secrets::managed_password;
use super::StackBuilder;
use crate::core::types::{PasswordSpec, StackConfig};
use indexmap::IndexMap;

pub const STACK_NAME: &str = "searchx";

const SERVER_PORT: u16 = 80;
const REGION: &str = "eu-central-1";
const ACCOUNT: &str = "767397730875";
const SEARCH_DOMAIN: &str = "searchx-elasticsearch";

pub fn searchx() -> StackConfig {
    let mut b = StackBuilder::new(STACK_NAME)
        .description("searchx: API and worker services, datastores, static frontend behind a CDN")
        .provider(REGION, ACCOUNT);

    let node_env = b.param("node_env", "production");
    let db_name = b.param("db_name", "searchx-pilot-app-1");
    let es_index = b.param("es_index", "trec_car");
    let domain_alias = b.param("domain_alias", "searchx.geisink.com");
    let server_image = b.param("server_image", "ghcr.io/levdops/server:latest");
    let worker_image = b.param("worker_image", "ghcr.io/levdops/worker:latest");
    let lb_certificate_arn = b.param(
        "lb_certificate_arn",
        "arn:aws:acm:eu-central-1:767397730875:certificate/173730c4-db25-4005-b164-6cb0cf7648a6",
    );
    let cdn_certificate_arn = b.param(
        "cdn_certificate_arn",
        "arn:aws:acm:us-east-1:767397730875:certificate/7837223a-390e-4d97-bd9b-793c50f496cc",
    );

    // Datastores
    let mongo_credential = managed_password(
        &mut b,
        "mongo",
        "searchx-mongodb-password",
        PasswordSpec {
            special: false,
            ..PasswordSpec::default()
        },
    );
    let mongo = datastores::document_db(
        &mut b,
        "mongo",
        DocumentDbArgs {
            cluster_identifier: "searchx-mongo-cluster",
            master_username: "searchx",
            instance_class: "db.t3.medium",
            tls: false,
        },
        &mongo_credential,
    );

    let redis = datastores::cache(&mut b, "redis", "7.1", "cache.t3.micro");

    let elastic_credential = managed_password(
        &mut b,
        "elastic",
        "searchx-elastic-password",
        PasswordSpec {
            length: 16,
            special: true,
            min_lower: 1,
            min_upper: 1,
            min_numeric: 1,
            min_special: 1,
            override_special: Some("!*".to_string()),
        },
    );
    let elastic = datastores::search_domain(
        &mut b,
        "elastic",
        SearchDomainArgs {
            domain_name: SEARCH_DOMAIN,
            engine_version: "Elasticsearch_7.10",
            instance_type: "t3.small.search",
            master_user: "elasticSearchXUser",
            access_policy: Some(serde_json::json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": "es:*",
                    "Principal": {"AWS": "*"},
                    "Resource": format!(
                        "arn:aws:es:{}:{}:domain/{}/*",
                        REGION, ACCOUNT, SEARCH_DOMAIN
                    ),
                }],
            })),
        },
        &elastic_credential,
    );

    // Frontend
    let cdn_certificate = frontend::certificate(&mut b, "cdn-certificate", &cdn_certificate_arn);
    let site = frontend::static_site(
        &mut b,
        "frontend",
        &"searchx-frontend",
        &domain_alias,
        &cdn_certificate,
    );

    // Compute
    let lb_certificate = frontend::certificate(&mut b, "lb-certificate", &lb_certificate_arn);
    let cluster = compute::cluster(&mut b, "searchx-cluster");
    let balancer =
        compute::load_balancer(&mut b, "searchx-server-lb", &lb_certificate, SERVER_PORT);

    let db = mongo.connection_string(&db_name);
    let cache = redis.connection_string();

    compute::api_service(
        &mut b,
        "server",
        &cluster,
        &balancer,
        SERVER_PORT,
        ServiceArgs {
            name: "searchx-server",
            image: &server_image,
            cpu: 128,
            memory: 512,
            environment: env(&[
                ("NODE_ENV", node_env.to_string()),
                ("PORT", SERVER_PORT.to_string()),
                ("SUGGESTIONS_TYPE", "none".to_string()),
                ("DEFAULT_SEARCH_PROVIDER", "elasticsearch".to_string()),
                ("ES_INDEX", es_index.to_string()),
                ("DB", db.clone()),
                ("REDIS", cache.clone()),
                ("ELASTIC_SEARCH", elastic.connection_string()),
            ]),
        },
    );

    let worker = compute::worker_service(
        &mut b,
        "worker",
        &cluster,
        ServiceArgs {
            name: "searchx-worker",
            image: &worker_image,
            cpu: 128,
            memory: 512,
            environment: env(&[
                ("NODE_ENV", node_env.to_string()),
                ("DB", db),
                ("REDIS", cache),
            ]),
        },
    );

    b.output("bucket_name", &site.bucket_name());
    b.output("cloudfront_domain", &site.cdn_domain());
    b.output("server_endpoint", &balancer.dns_name());
    b.output("worker_service", &worker.name());

    b.build()
}

fn env(vars: &[(&str, String)]) -> IndexMap<String, String> {
    vars.iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
