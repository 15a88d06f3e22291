//! Lock file management — load, save (atomic), path derivation.

use super::error::{Error, Result};
use super::types::StateLock;
use std::path::{Path, PathBuf};

/// Directory holding everything recorded for one stack.
pub fn stack_dir(state_dir: &Path, stack: &str) -> PathBuf {
    state_dir.join(stack)
}

/// Derive the lock file path for a stack within the state directory.
pub fn lock_file_path(state_dir: &Path, stack: &str) -> PathBuf {
    stack_dir(state_dir, stack).join("state.lock.yaml")
}

/// Write a file atomically (write to temp, then rename).
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    std::fs::write(&tmp_path, contents).map_err(|e| Error::write(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| Error::write(path, e))?;
    Ok(())
}

/// Load a lock file for a stack. Returns None if the file doesn't exist.
pub fn load_lock(state_dir: &Path, stack: &str) -> Result<Option<StateLock>> {
    let path = lock_file_path(state_dir, stack);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| Error::read(&path, e))?;
    let lock: StateLock = serde_yaml_ng::from_str(&content)?;
    Ok(Some(lock))
}

/// Save a lock file atomically.
pub fn save_lock(state_dir: &Path, lock: &StateLock) -> Result<()> {
    let path = lock_file_path(state_dir, &lock.stack);
    let yaml = serde_yaml_ng::to_string(lock)?;
    write_atomic(&path, &yaml)
}

/// Remove a stack's lock file after teardown.
pub fn remove_lock(state_dir: &Path, stack: &str) -> Result<()> {
    let path = lock_file_path(state_dir, stack);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::write(&path, e)),
    }
}

/// Stacks that have a lock file under the state directory, sorted.
pub fn list_stacks(state_dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(state_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::read(state_dir, e)),
    };
    let mut stacks = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::read(state_dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if lock_file_path(state_dir, &name).exists() {
            stacks.push(name);
        }
    }
    stacks.sort();
    Ok(stacks)
}

/// Create a new empty StateLock for a stack.
pub fn new_lock(stack: &str) -> StateLock {
    use crate::tripwire::eventlog::now_iso8601;
    StateLock {
        schema: "1.0".to_string(),
        stack: stack.to_string(),
        generated_at: now_iso8601(),
        generator: format!("cloudjar {}", env!("CARGO_PKG_VERSION")),
        blake3_version: "1.8".to_string(),
        resources: indexmap::IndexMap::new(),
        outputs: indexmap::IndexMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ResourceLock, ResourceStatus, ResourceType};
    use indexmap::IndexMap;

    fn make_lock() -> StateLock {
        let mut resources = IndexMap::new();
        resources.insert(
            "cluster".to_string(),
            ResourceLock {
                resource_type: ResourceType::ComputeCluster,
                status: ResourceStatus::Provisioned,
                applied_at: Some("2026-02-16T14:00:00Z".to_string()),
                duration_seconds: Some(0.01),
                hash: "blake3:abc123".to_string(),
                depends_on: Vec::new(),
                outputs: IndexMap::from([(
                    "name".to_string(),
                    "cluster".to_string(),
                )]),
            },
        );
        StateLock {
            resources,
            ..new_lock("searchx")
        }
    }

    #[test]
    fn test_lock_file_path() {
        let p = lock_file_path(Path::new("/state"), "searchx");
        assert_eq!(p, PathBuf::from("/state/searchx/state.lock.yaml"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let lock = make_lock();
        save_lock(dir.path(), &lock).unwrap();

        let loaded = load_lock(dir.path(), "searchx").unwrap().unwrap();
        assert_eq!(loaded.stack, "searchx");
        assert_eq!(loaded.resources.len(), 1);
        assert_eq!(loaded.resources["cluster"].outputs["name"], "cluster");
        assert!(!lock_file_path(dir.path(), "searchx")
            .with_extension("yaml.tmp")
            .exists());
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_lock(dir.path(), "nope").unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_file_path(dir.path(), "searchx");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "resources: [not, a, map").unwrap();
        assert!(matches!(
            load_lock(dir.path(), "searchx"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn test_remove_lock_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        save_lock(dir.path(), &make_lock()).unwrap();
        remove_lock(dir.path(), "searchx").unwrap();
        remove_lock(dir.path(), "searchx").unwrap();
        assert!(load_lock(dir.path(), "searchx").unwrap().is_none());
    }

    #[test]
    fn test_list_stacks() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_stacks(&dir.path().join("missing")).unwrap().is_empty());
        save_lock(dir.path(), &make_lock()).unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        assert_eq!(list_stacks(dir.path()).unwrap(), vec!["searchx"]);
    }

    #[test]
    fn test_new_lock() {
        let lock = new_lock("searchx");
        assert_eq!(lock.schema, "1.0");
        assert!(lock.generator.starts_with("cloudjar "));
        assert!(lock.resources.is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut lock = make_lock();
        for id in ["zeta", "alpha", "mid"] {
            let mut rl = lock.resources["cluster"].clone();
            rl.hash = format!("blake3:{}", id);
            lock.resources.insert(id.to_string(), rl);
        }
        save_lock(dir.path(), &lock).unwrap();
        let loaded = load_lock(dir.path(), "searchx").unwrap().unwrap();
        let keys: Vec<&String> = loaded.resources.keys().collect();
        assert_eq!(keys, vec!["cluster", "zeta", "alpha", "mid"]);
    }
}
