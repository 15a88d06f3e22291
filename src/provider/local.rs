//! Local provider — stands in for the cloud APIs.
//!
//! Records live in `<state_dir>/<stack>/provider.yaml`. Identifiers and
//! endpoints are synthesized deterministically from resource identifiers,
//! account and region; credentials are generated fresh on every create and
//! kept in a `FileSecretStore`.

use super::secrets::FileSecretStore;
use super::{Outputs, Provider, ProviderRecord, SecretStore};
use crate::core::catalog;
use crate::core::error::{Error, Result};
use crate::core::state::{stack_dir, write_atomic};
use crate::core::types::{ProviderConfig, Resource, ResourceKind, ResourceType, SecretSpec};
use crate::resources::secret;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProviderFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    config: Option<ProviderConfig>,

    #[serde(default)]
    records: IndexMap<String, ProviderRecord>,
}

pub struct LocalProvider {
    config: ProviderConfig,
    path: PathBuf,
    file: ProviderFile,
    store: FileSecretStore,
}

fn password_ref(id: &str) -> String {
    format!("random_password/{}", id)
}

impl LocalProvider {
    /// Open a stack's provider for the given account and region.
    /// The config is persisted with the records on the next write.
    pub fn open(state_dir: &Path, stack: &str, config: ProviderConfig) -> Result<Self> {
        let mut provider = Self::load(state_dir, stack)?;
        provider.file.config = Some(config.clone());
        provider.config = config;
        Ok(provider)
    }

    /// Reopen a stack's provider with the account and region it last wrote with.
    pub fn reopen(state_dir: &Path, stack: &str) -> Result<Self> {
        let mut provider = Self::load(state_dir, stack)?;
        if let Some(config) = provider.file.config.clone() {
            provider.config = config;
        }
        Ok(provider)
    }

    fn load(state_dir: &Path, stack: &str) -> Result<Self> {
        let path = stack_dir(state_dir, stack).join("provider.yaml");
        let file = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| Error::read(&path, e))?;
            serde_yaml_ng::from_str(&content)?
        } else {
            ProviderFile::default()
        };
        let store = FileSecretStore::open(state_dir, stack)?;
        Ok(Self {
            config: ProviderConfig::default(),
            path,
            file,
            store,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn secret_store(&self) -> &FileSecretStore {
        &self.store
    }

    fn save(&self) -> Result<()> {
        write_atomic(&self.path, &serde_yaml_ng::to_string(&self.file)?)
    }

    /// Provision or converge the provider side of a resource.
    fn converge(
        &mut self,
        id: &str,
        resource: &Resource,
        existing: Option<ProviderRecord>,
    ) -> Result<(Outputs, Option<String>)> {
        match resource.kind {
            ResourceKind::RandomPassword(ref spec) => {
                let value = secret::generate_password(id, spec)?;
                let name = password_ref(id);
                match existing {
                    Some(_) => self.store.put_version(&name, &value)?,
                    None => self.store.create(&name, &value)?,
                }
                Ok((Outputs::new(), Some(name)))
            }
            ResourceKind::Secret(ref spec) => match existing {
                Some(record) => {
                    let arn = record
                        .outputs
                        .get("arn")
                        .cloned()
                        .ok_or_else(|| Error::provider(id, "secret record has no arn"))?;
                    let name = record.outputs.get("name").map(String::as_str).unwrap_or("");
                    if secret::has_prefix(name, &spec.name_prefix) {
                        self.store.put_version(&arn, &spec.value)?;
                        return Ok((record.outputs, Some(arn)));
                    }
                    // A secret's name is fixed at creation; a new prefix means a new secret.
                    let created = self.new_secret(spec)?;
                    self.store.remove(&arn)?;
                    Ok(created)
                }
                None => self.new_secret(spec),
            },
            ref kind => {
                let outputs = catalog::synthesize_outputs(id, kind, &self.config)
                    .ok_or_else(|| Error::provider(id, "no outputs for this kind"))?;
                Ok((outputs, None))
            }
        }
    }

    fn new_secret(&mut self, spec: &SecretSpec) -> Result<(Outputs, Option<String>)> {
        let name = secret::secret_name(&spec.name_prefix);
        let arn = secret::secret_arn(&self.config, &name);
        self.store.create(&arn, &spec.value)?;
        let outputs = IndexMap::from([
            ("arn".to_string(), arn.clone()),
            ("name".to_string(), name),
        ]);
        Ok((outputs, Some(arn)))
    }

    fn record(
        &mut self,
        id: &str,
        resource: &Resource,
        hash: &str,
        outputs: Outputs,
        secret_ref: Option<String>,
    ) -> Result<Outputs> {
        self.file.records.insert(
            id.to_string(),
            ProviderRecord {
                resource_type: resource.resource_type(),
                hash: hash.to_string(),
                outputs,
                secret_ref,
            },
        );
        self.save()?;
        self.read(id)?
            .ok_or_else(|| Error::provider(id, "record vanished after write"))
    }
}

impl Provider for LocalProvider {
    fn read(&self, id: &str) -> Result<Option<Outputs>> {
        let Some(record) = self.file.records.get(id) else {
            return Ok(None);
        };
        let mut outputs = record.outputs.clone();
        if record.resource_type == ResourceType::RandomPassword {
            let name = record
                .secret_ref
                .as_deref()
                .ok_or_else(|| Error::provider(id, "password record has no secret"))?;
            outputs.insert("result".to_string(), self.store.get(name)?);
        }
        Ok(Some(outputs))
    }

    fn create(&mut self, id: &str, resource: &Resource, hash: &str) -> Result<Outputs> {
        if self.file.records.contains_key(id) {
            return Err(Error::provider(id, "already exists"));
        }
        if catalog::is_reference(resource.resource_type()) {
            return Err(Error::provider(id, "reference resources are imported, not created"));
        }
        let (outputs, secret_ref) = self.converge(id, resource, None)?;
        self.record(id, resource, hash, outputs, secret_ref)
    }

    fn update(&mut self, id: &str, resource: &Resource, hash: &str) -> Result<Outputs> {
        let existing = self
            .file
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| Error::provider(id, "does not exist"))?;
        if existing.resource_type != resource.resource_type() {
            return Err(Error::provider(
                id,
                format!(
                    "cannot change type from {} to {}",
                    existing.resource_type,
                    resource.resource_type()
                ),
            ));
        }
        let (outputs, secret_ref) = self.converge(id, resource, Some(existing))?;
        self.record(id, resource, hash, outputs, secret_ref)
    }

    fn import(&mut self, id: &str, resource: &Resource, hash: &str) -> Result<Outputs> {
        let ResourceKind::Certificate(ref spec) = resource.kind else {
            return Err(Error::provider(id, "only certificates can be imported"));
        };
        let errors = crate::resources::frontend::validate_certificate(id, spec);
        if let Some(e) = errors.first() {
            return Err(Error::provider(id, e.message.clone()));
        }
        let (outputs, _) = self.converge(id, resource, None)?;
        self.record(id, resource, hash, outputs, None)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let record = self
            .file
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| Error::provider(id, "does not exist"))?;
        if let Some(ref name) = record.secret_ref {
            self.store.remove(name)?;
        }
        self.file.records.shift_remove(id);
        self.save()
    }

    fn secret_value(&self, arn: &str) -> Result<String> {
        self.store.get(arn)
    }

    fn records(&self) -> &IndexMap<String, ProviderRecord> {
        &self.file.records
    }
}
