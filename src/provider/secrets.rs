//! File-backed secret store.
//!
//! Secrets of a stack live in `<state_dir>/<stack>/secrets.yaml`, outside the
//! lock file, and every write is atomic.

use super::SecretStore;
use crate::core::error::{Error, Result};
use crate::core::state::{stack_dir, write_atomic};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SecretFile {
    #[serde(default)]
    secrets: IndexMap<String, SecretEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SecretEntry {
    value: String,
    version: u32,
    created_at: String,
}

pub struct FileSecretStore {
    path: PathBuf,
    file: SecretFile,
}

impl FileSecretStore {
    pub fn open(state_dir: &Path, stack: &str) -> Result<Self> {
        let path = stack_dir(state_dir, stack).join("secrets.yaml");
        let file = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| Error::read(&path, e))?;
            serde_yaml_ng::from_str(&content)?
        } else {
            SecretFile::default()
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.file.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.secrets.is_empty()
    }

    /// Current version of a secret, starting at 1.
    pub fn version(&self, name: &str) -> Option<u32> {
        self.file.secrets.get(name).map(|e| e.version)
    }

    fn save(&self) -> Result<()> {
        write_atomic(&self.path, &serde_yaml_ng::to_string(&self.file)?)
    }
}

impl SecretStore for FileSecretStore {
    fn create(&mut self, name: &str, value: &str) -> Result<()> {
        if self.file.secrets.contains_key(name) {
            return Err(Error::Secret(format!("secret {} already exists", name)));
        }
        self.file.secrets.insert(
            name.to_string(),
            SecretEntry {
                value: value.to_string(),
                version: 1,
                created_at: crate::tripwire::eventlog::now_iso8601(),
            },
        );
        self.save()
    }

    fn put_version(&mut self, name: &str, value: &str) -> Result<()> {
        let entry = self
            .file
            .secrets
            .get_mut(name)
            .ok_or_else(|| Error::Secret(format!("secret {} not found", name)))?;
        if entry.value == value {
            return Ok(());
        }
        entry.value = value.to_string();
        entry.version += 1;
        self.save()
    }

    fn get(&self, name: &str) -> Result<String> {
        self.file
            .secrets
            .get(name)
            .map(|e| e.value.clone())
            .ok_or_else(|| Error::Secret(format!("secret {} not found", name)))
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        if self.file.secrets.shift_remove(name).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSecretStore::open(dir.path(), "searchx").unwrap();
        assert!(store.is_empty());
        store.create("db", "s3cr3t").unwrap();
        assert_eq!(store.get("db").unwrap(), "s3cr3t");
        assert_eq!(store.version("db"), Some(1));
    }

    #[test]
    fn test_create_is_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSecretStore::open(dir.path(), "searchx").unwrap();
        store.create("db", "a").unwrap();
        let err = store.create("db", "b").unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(store.get("db").unwrap(), "a");
    }

    #[test]
    fn test_put_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSecretStore::open(dir.path(), "searchx").unwrap();
        store.create("db", "a").unwrap();
        store.put_version("db", "a").unwrap();
        assert_eq!(store.version("db"), Some(1));
        store.put_version("db", "b").unwrap();
        assert_eq!(store.version("db"), Some(2));
        assert!(store.put_version("missing", "x").is_err());
    }

    #[test]
    fn test_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileSecretStore::open(dir.path(), "searchx").unwrap();
            store.create("db", "s3cr3t").unwrap();
        }
        let store = FileSecretStore::open(dir.path(), "searchx").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("db").unwrap(), "s3cr3t");
        assert!(store.path().ends_with("searchx/secrets.yaml"));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSecretStore::open(dir.path(), "searchx").unwrap();
        store.create("db", "s3cr3t").unwrap();
        store.remove("db").unwrap();
        store.remove("db").unwrap();
        assert!(matches!(store.get("db"), Err(Error::Secret(_))));
    }
}
