use crate::error::{CacheError, CacheResult};
use crate::indexing::file_info::{changed_dependency, get_utc_timestamp};
use crate::types::{CompactString, Diagnostic};
use crate::unit::{Dependency, PathKeys, TranslationUnit};
use serde::{Deserialize, Serialize};

/// Magic bytes identifying cache entry files
const MAGIC_BYTES: &[u8; 4] = b"TUC1";

/// Version of the entry encoding, bumped whenever `CacheEntry` changes shape
const VERSION: u32 = 1;

const HEADER_SIZE: usize = 8;

/// Build state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheState {
    Missing,
    /// Content and dependency hashes match, the unit can be reused.
    Fresh,
    /// Content or a dependency changed since the unit was built.
    Stale,
    /// A build is in flight. Never persisted.
    Building,
    /// The last build failed; retried on later builds up to a limit.
    Error,
}

impl CacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::Missing => "missing",
            CacheState::Fresh => "fresh",
            CacheState::Stale => "stale",
            CacheState::Building => "building",
            CacheState::Error => "error",
        }
    }
}

/// Persisted build result for one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: CompactString,
    pub state: CacheState,
    /// Hash of the content the state refers to.
    pub content_hash: String,
    pub dependencies: Vec<Dependency>,
    /// Last successfully built unit. On `Error` this is the previous good
    /// build of older content, if there was one.
    pub unit: Option<TranslationUnit>,
    /// Diagnostics of the failed build, `Error` only.
    pub diagnostics: Vec<Diagnostic>,
    /// Consecutive failed builds of `content_hash`.
    pub failed_attempts: u32,
    pub built_at: u64,
}

impl CacheEntry {
    pub fn fresh(unit: TranslationUnit) -> Self {
        Self {
            path: unit.path.clone(),
            state: CacheState::Fresh,
            content_hash: unit.content_hash.clone(),
            dependencies: unit.dependencies.clone(),
            unit: Some(unit),
            diagnostics: Vec::new(),
            failed_attempts: 0,
            built_at: get_utc_timestamp(),
        }
    }

    /// Record a failed build of `content_hash`, keeping the previous good
    /// unit. `dependencies` are those the failed parse discovered, so a fix
    /// in a header makes the entry stale.
    pub fn failed(
        path: &str,
        content_hash: &str,
        previous: Option<&CacheEntry>,
        dependencies: Vec<Dependency>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let failed_attempts = match previous {
            Some(prev) if prev.state == CacheState::Error && prev.content_hash == content_hash => {
                prev.failed_attempts + 1
            }
            _ => 1,
        };
        let unit = previous.and_then(|prev| prev.unit.clone());
        Self {
            path: path.into(),
            state: CacheState::Error,
            content_hash: content_hash.to_string(),
            dependencies,
            unit,
            diagnostics,
            failed_attempts,
            built_at: get_utc_timestamp(),
        }
    }

    /// State of this entry for the file's current content.
    ///
    /// `Fresh` needs the content hash and every dependency hash to match.
    /// A failed entry for unchanged content stays `Error`.
    pub fn state_for(&self, content_hash: &str, keys: &PathKeys) -> CacheState {
        if self.content_hash != content_hash {
            return CacheState::Stale;
        }
        if changed_dependency(keys, &self.dependencies).is_some() {
            return CacheState::Stale;
        }
        match self.state {
            CacheState::Fresh if self.unit.is_some() => CacheState::Fresh,
            CacheState::Error => CacheState::Error,
            _ => CacheState::Stale,
        }
    }

    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
            |e| CacheError::Encode {
                file: self.path.to_string(),
                reason: e.to_string(),
            },
        )?;
        let compressed = lz4_flex::compress_prepend_size(&payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + compressed.len());
        bytes.extend_from_slice(MAGIC_BYTES);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&compressed);
        Ok(bytes)
    }

    /// Decode an entry read for `file`, validating header and owner.
    pub fn decode(file: &str, bytes: &[u8]) -> CacheResult<Self> {
        let corrupt = |reason: String| CacheError::Corruption {
            file: file.to_string(),
            reason,
        };

        if bytes.len() < HEADER_SIZE {
            return Err(corrupt("entry too small".to_string()));
        }
        if &bytes[0..4] != MAGIC_BYTES {
            return Err(corrupt("invalid magic bytes".to_string()));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != VERSION {
            return Err(corrupt(format!("unsupported entry version: {version}")));
        }

        let payload = lz4_flex::decompress_size_prepended(&bytes[HEADER_SIZE..])
            .map_err(|e| corrupt(format!("decompression failed: {e}")))?;
        let (entry, _): (CacheEntry, usize) =
            bincode::serde::decode_from_slice(&payload, bincode::config::standard())
                .map_err(|e| corrupt(format!("decode failed: {e}")))?;

        if &*entry.path != file {
            return Err(corrupt(format!("entry belongs to '{}'", entry.path)));
        }
        if entry.state == CacheState::Building {
            return Err(corrupt("entry persisted mid-build".to_string()));
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstNode, NodeKind};
    use crate::parsing::LanguageId;
    use crate::types::{Extent, Position};
    use tempfile::TempDir;

    fn unit(path: &str, hash: &str) -> TranslationUnit {
        TranslationUnit {
            path: path.into(),
            language: LanguageId::new("python"),
            content_hash: hash.to_string(),
            dependencies: Vec::new(),
            imports: Vec::new(),
            root: AstNode::new(
                NodeKind::TranslationUnit,
                "module",
                Extent::new(Position::new(1, 1, 0), Position::new(1, 10, 9)),
            ),
            symbols: Vec::new(),
            references: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_encode_decode_preserves_entry() {
        let entry = CacheEntry::fresh(unit("pkg/a.py", "h1"));
        let bytes = entry.encode().unwrap();
        assert_eq!(&bytes[0..4], MAGIC_BYTES);
        let decoded = CacheEntry::decode("pkg/a.py", &bytes).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_rejects_damage() {
        let bytes = CacheEntry::fresh(unit("a.py", "h1")).encode().unwrap();

        assert!(matches!(
            CacheEntry::decode("a.py", &bytes[..5]),
            Err(CacheError::Corruption { .. })
        ));
        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(CacheEntry::decode("a.py", &bad_magic).is_err());

        let mut truncated = bytes.clone();
        truncated.truncate(bytes.len() - 3);
        assert!(CacheEntry::decode("a.py", &truncated).is_err());

        // A valid entry for another file is as good as corrupt
        assert!(CacheEntry::decode("b.py", &bytes).is_err());
    }

    #[test]
    fn test_state_for_content_and_dependencies() {
        let dir = TempDir::new().unwrap();
        let keys = PathKeys::new(Some(dir.path().to_path_buf()));
        std::fs::write(dir.path().join("dep.h"), "int a;").unwrap();

        let mut u = unit("main.c", "h1");
        u.dependencies = vec![Dependency::capture(&keys, &dir.path().join("dep.h")).unwrap()];
        let entry = CacheEntry::fresh(u);

        assert_eq!(entry.state_for("h1", &keys), CacheState::Fresh);
        assert_eq!(entry.state_for("h2", &keys), CacheState::Stale);

        std::fs::write(dir.path().join("dep.h"), "int b;").unwrap();
        assert_eq!(entry.state_for("h1", &keys), CacheState::Stale);
    }

    #[test]
    fn test_failed_counts_attempts_per_content() {
        let good = CacheEntry::fresh(unit("a.py", "h1"));
        let first = CacheEntry::failed("a.py", "h2", Some(&good), Vec::new(), Vec::new());
        assert_eq!(first.failed_attempts, 1);
        // Keeps the previous good unit as a stale record
        assert_eq!(first.unit.as_ref().map(|u| u.content_hash.as_str()), Some("h1"));

        let second = CacheEntry::failed("a.py", "h2", Some(&first), Vec::new(), Vec::new());
        assert_eq!(second.failed_attempts, 2);
        let other = CacheEntry::failed("a.py", "h3", Some(&second), Vec::new(), Vec::new());
        assert_eq!(other.failed_attempts, 1);

        let keys = PathKeys::new(None);
        assert_eq!(second.state_for("h2", &keys), CacheState::Error);
        assert_eq!(second.state_for("h4", &keys), CacheState::Stale);
    }
}
