//! Content hashing for incremental builds
//!
//! A file is rebuilt when its own hash or the hash of any dependency
//! recorded during its last parse differs from what the cache holds.

use crate::unit::{Dependency, PathKeys};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Calculate SHA256 hash of content
pub fn calculate_hash(content: &str) -> String {
    hash_bytes(content.as_bytes())
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash a file's raw bytes. Non-UTF-8 headers still hash.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// First recorded dependency whose current content no longer matches,
/// including dependencies that were deleted.
pub fn changed_dependency<'a>(keys: &PathKeys, dependencies: &'a [Dependency]) -> Option<&'a Dependency> {
    dependencies.iter().find(|dep| {
        hash_file(&keys.resolve(&dep.path))
            .map(|current| current != dep.content_hash)
            .unwrap_or(true)
    })
}

/// Get current UTC timestamp in seconds since UNIX_EPOCH
pub fn get_utc_timestamp() -> u64 {
    Utc::now().timestamp() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_calculation() {
        let hash1 = calculate_hash("Hello, World!");
        let hash2 = calculate_hash("Hello, World!");
        let hash3 = calculate_hash("Hello, world!");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        // 256 bits in hex
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_file_matches_content_hash() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.h");
        std::fs::write(&path, "int x;").unwrap();
        assert_eq!(hash_file(&path).unwrap(), calculate_hash("int x;"));
        assert!(hash_file(&dir.path().join("missing.h")).is_err());
    }

    #[test]
    fn test_changed_dependency() {
        let dir = TempDir::new().unwrap();
        let keys = PathKeys::new(Some(dir.path().to_path_buf()));
        std::fs::write(dir.path().join("util.h"), "int a;").unwrap();
        let deps = vec![Dependency::capture(&keys, &dir.path().join("util.h")).unwrap()];
        assert_eq!(&*deps[0].path, "util.h");
        assert!(changed_dependency(&keys, &deps).is_none());

        std::fs::write(dir.path().join("util.h"), "int b;").unwrap();
        assert!(changed_dependency(&keys, &deps).is_some());

        std::fs::remove_file(dir.path().join("util.h")).unwrap();
        assert!(changed_dependency(&keys, &deps).is_some());
    }
}
