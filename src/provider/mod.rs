//! Provider layer — the seam between the engine and a cloud account.
//!
//! A `Provider` creates, updates and deletes fully resolved resources and
//! hands back their outputs. Secret material lives behind a `SecretStore`
//! and is only ever read by reference.

pub mod local;
pub mod secrets;

use crate::core::error::Result;
use crate::core::types::{Resource, ResourceType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outputs of one resource, attribute → value.
pub type Outputs = IndexMap<String, String>;

/// What a provider remembers about a resource it manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    /// Desired-state hash the resource was last applied with
    pub hash: String,

    /// Non-sensitive outputs
    #[serde(default)]
    pub outputs: Outputs,

    /// Secret-store entry holding this resource's sensitive material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,
}

/// Cloud provider operations.
pub trait Provider {
    /// Every output of a managed resource, sensitive ones included.
    fn read(&self, id: &str) -> Result<Option<Outputs>>;

    /// Provision a new resource.
    fn create(&mut self, id: &str, resource: &Resource, hash: &str) -> Result<Outputs>;

    /// Converge an existing resource to a new declaration.
    fn update(&mut self, id: &str, resource: &Resource, hash: &str) -> Result<Outputs>;

    /// Start tracking a pre-existing resource without creating it.
    fn import(&mut self, id: &str, resource: &Resource, hash: &str) -> Result<Outputs>;

    /// Delete a resource; reference kinds are only forgotten.
    fn delete(&mut self, id: &str) -> Result<()>;

    /// Live value of a stored secret.
    fn secret_value(&self, arn: &str) -> Result<String>;

    /// Records of every managed resource.
    fn records(&self) -> &IndexMap<String, ProviderRecord>;
}

/// Secret store with write-once creation and versioned updates.
pub trait SecretStore {
    /// Create a secret; fails if the name is taken.
    fn create(&mut self, name: &str, value: &str) -> Result<()>;

    /// Store a new version of an existing secret.
    fn put_version(&mut self, name: &str, value: &str) -> Result<()>;

    fn get(&self, name: &str) -> Result<String>;

    fn remove(&mut self, name: &str) -> Result<()>;
}
