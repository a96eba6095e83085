use super::CacheEntry;
use crate::error::{CacheError, CacheResult};
use crate::indexing::file_info::hash_bytes;
use crate::types::CompactString;
use dashmap::DashMap;
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "tuc";

/// Snapshot of cache size and this session's activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub hits: u64,
    pub rebuilds: u64,
    pub errors: u64,
    pub corruptions: u64,
}

/// Directory of cache entries keyed by source path key.
///
/// Entry file names are the SHA-256 of the key, so arbitrary paths map to
/// flat, fixed-length names. Loaded entries are memoized for the session.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    memo: DashMap<CompactString, Arc<CacheEntry>>,
    hits: AtomicU64,
    rebuilds: AtomicU64,
    errors: AtomicU64,
    corruptions: AtomicU64,
}

impl CacheStore {
    pub fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            memo: DashMap::new(),
            hits: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            corruptions: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", hash_bytes(key.as_bytes())))
    }

    /// Load the entry for `key`. `Ok(None)` when there is none.
    pub fn load(&self, key: &str) -> CacheResult<Option<Arc<CacheEntry>>> {
        if let Some(entry) = self.memo.get(key) {
            return Ok(Some(Arc::clone(entry.value())));
        }

        let path = self.entry_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        match CacheEntry::decode(key, &bytes) {
            Ok(entry) => {
                let entry = Arc::new(entry);
                self.memo.insert(key.into(), Arc::clone(&entry));
                Ok(Some(entry))
            }
            Err(e) => {
                self.corruptions.fetch_add(1, Ordering::Relaxed);
                warn!(file = key, "{e}");
                Err(e)
            }
        }
    }

    /// Persist `entry`, replacing any previous entry for the same file.
    pub fn store(&self, entry: CacheEntry) -> CacheResult<Arc<CacheEntry>> {
        let bytes = entry.encode()?;
        let path = self.entry_path(&entry.path);
        let io_err = |source| CacheError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        debug!(file = %entry.path, state = entry.state.as_str(), bytes = bytes.len(), "cache entry written");

        let entry = Arc::new(entry);
        self.memo.insert(entry.path.clone(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Remove the entry for `key`; `true` if one existed on disk.
    pub fn evict(&self, key: &str) -> CacheResult<bool> {
        self.memo.remove(key);
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    /// Delete every entry, returning how many were removed.
    pub fn clear(&self) -> CacheResult<usize> {
        self.memo.clear();
        let mut removed = 0;
        for path in self.entry_files()? {
            std::fs::remove_file(&path).map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;
            removed += 1;
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheResult<CacheStats> {
        let files = self.entry_files()?;
        let total_bytes = files
            .iter()
            .filter_map(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum();
        Ok(CacheStats {
            entries: files.len(),
            total_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            corruptions: self.corruptions.load(Ordering::Relaxed),
        })
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn entry_files(&self) -> CacheResult<Vec<PathBuf>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };
        Ok(read_dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION))
            .collect())
    }
}
