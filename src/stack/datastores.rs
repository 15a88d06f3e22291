//! Managed datastores and their connection strings.

use super::secrets::ManagedPassword;
use super::{Handle, Output, SecretRef, StackBuilder};
use crate::core::types::*;
use crate::resources::datastore::{CACHE_PORT, DOCDB_PORT};
use std::fmt::Display;

/// A document database cluster.
#[derive(Debug, Clone)]
pub struct DocumentDb {
    pub cluster: Handle,
    credential: SecretRef,
}

impl DocumentDb {
    pub fn endpoint(&self) -> Output {
        self.cluster.output("endpoint")
    }

    /// `mongodb://<user>:<secret>@<endpoint>:27017/<db-name>`
    pub fn connection_string(&self, db_name: &impl Display) -> String {
        format!(
            "mongodb://{}:{}@{}:{}/{}",
            self.cluster.output("master_username"),
            self.credential,
            self.endpoint(),
            DOCDB_PORT,
            db_name
        )
    }
}

pub struct DocumentDbArgs<'a> {
    pub cluster_identifier: &'a str,
    pub master_username: &'a str,
    pub instance_class: &'a str,
    pub tls: bool,
}

pub fn document_db(
    b: &mut StackBuilder,
    id: &str,
    args: DocumentDbArgs<'_>,
    credential: &ManagedPassword,
) -> DocumentDb {
    let cluster = b.add(
        id,
        ResourceKind::DocdbCluster(DocumentDbSpec {
            cluster_identifier: args.cluster_identifier.to_string(),
            engine: "docdb".to_string(),
            family: "docdb5.0".to_string(),
            tls: args.tls,
            master_username: args.master_username.to_string(),
            master_password: credential.value().to_string(),
            backup_retention_period: 5,
            skip_final_snapshot: true,
            instance_class: args.instance_class.to_string(),
            instance_count: 1,
        }),
    );
    DocumentDb {
        cluster,
        credential: credential.secret_ref(),
    }
}

/// A cache cluster addressed through its first node.
#[derive(Debug, Clone)]
pub struct Cache {
    pub cluster: Handle,
}

impl Cache {
    pub fn address(&self) -> Output {
        self.cluster.output("address")
    }

    /// `redis://<endpoint>:6379`
    pub fn connection_string(&self) -> String {
        format!("redis://{}:{}", self.address(), CACHE_PORT)
    }
}

pub fn cache(b: &mut StackBuilder, id: &str, engine_version: &str, node_type: &str) -> Cache {
    let cluster = b.add(
        id,
        ResourceKind::CacheCluster(CacheSpec {
            engine: "redis".to_string(),
            engine_version: engine_version.to_string(),
            node_type: node_type.to_string(),
            num_cache_nodes: 1,
        }),
    );
    Cache { cluster }
}

/// A search domain with an internal master user.
#[derive(Debug, Clone)]
pub struct SearchDomain {
    pub domain: Handle,
    master_user: String,
    credential: SecretRef,
}

impl SearchDomain {
    pub fn endpoint(&self) -> Output {
        self.domain.output("endpoint")
    }

    /// `https://<search-user>:<secret>@<search-endpoint>`
    pub fn connection_string(&self) -> String {
        format!(
            "https://{}:{}@{}",
            self.master_user,
            self.credential,
            self.endpoint()
        )
    }
}

pub struct SearchDomainArgs<'a> {
    pub domain_name: &'a str,
    pub engine_version: &'a str,
    pub instance_type: &'a str,
    pub master_user: &'a str,
    pub access_policy: Option<serde_json::Value>,
}

pub fn search_domain(
    b: &mut StackBuilder,
    id: &str,
    args: SearchDomainArgs<'_>,
    credential: &ManagedPassword,
) -> SearchDomain {
    let domain = b.add(
        id,
        ResourceKind::SearchDomain(SearchDomainSpec {
            domain_name: args.domain_name.to_string(),
            engine_version: args.engine_version.to_string(),
            instance_type: args.instance_type.to_string(),
            volume_size: 10,
            encrypt_at_rest: true,
            node_to_node_encryption: true,
            enforce_https: true,
            tls_security_policy: "Policy-Min-TLS-1-2-2019-07".to_string(),
            internal_user_database: true,
            master_user: Some(MasterUser {
                name: args.master_user.to_string(),
                password: credential.value().to_string(),
            }),
            access_policy: args.access_policy,
        }),
    );
    SearchDomain {
        domain,
        master_user: args.master_user.to_string(),
        credential: credential.secret_ref(),
    }
}
