//! BLAKE3 hashing for declarations and provider-assigned identifiers.

use crate::core::error::Result;
use serde::Serialize;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Hash the canonical JSON encoding of a value.
///
/// Struct fields serialize in declaration order and maps are `IndexMap`s,
/// so equal declarations always produce equal hashes.
pub fn hash_value<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    Ok(hash_string(&json))
}

/// Compute a composite hash from multiple component hashes.
pub fn composite_hash(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"\0");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

/// First `len` hex characters of the BLAKE3 of `seed`.
///
/// Used for identifiers that must stay stable as long as their seed does.
pub fn short_digest(seed: &str, len: usize) -> String {
    let hex = blake3::hash(seed.as_bytes()).to_hex();
    hex.as_str()[..len.min(64)].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_hash_string() {
        let h1 = hash_string("hello");
        let h2 = hash_string("hello");
        let h3 = hash_string("world");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert!(h1.starts_with("blake3:"));
        assert_eq!(h1.len(), 7 + 64);
    }

    #[test]
    fn test_hash_value_order_sensitive() {
        let a = IndexMap::from([("x", 1), ("y", 2)]);
        let b = IndexMap::from([("x", 1), ("y", 2)]);
        let c = IndexMap::from([("y", 2), ("x", 1)]);
        assert_eq!(hash_value(&a).unwrap(), hash_value(&b).unwrap());
        assert_ne!(hash_value(&a).unwrap(), hash_value(&c).unwrap());
    }

    #[test]
    fn test_composite_hash_separates_components() {
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(composite_hash(&["ab", "c"]), composite_hash(&["a", "bc"]));
    }

    #[test]
    fn test_short_digest() {
        let d = short_digest("searchx-mongo-cluster", 12);
        assert_eq!(d.len(), 12);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(d, short_digest("searchx-mongo-cluster", 12));
        assert_ne!(d, short_digest("searchx-mongo-cluster-2", 12));
        assert_eq!(short_digest("x", 100).len(), 64);
    }
}
