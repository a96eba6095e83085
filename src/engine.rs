//! Per-session service object tying the pipeline together
//!
//! `build` runs files through the incremental builder, feeds the resulting
//! units to the resolver and commits the files whose rows changed to the
//! symbol index in one transaction. Queries only read the index and the
//! cache.

use crate::ast::{AstPrinter, PrintOptions};
use crate::cache::{CacheStats, CacheStore};
use crate::completion::{CancellationToken, Completion, CompletionService, Freshness, ReferenceSet};
use crate::error::{TuError, TuResult};
use crate::indexing::{BuildOptions, BuildStats, BuildStatus, FileWalker, IncrementalBuilder};
use crate::parsing::{LanguageId, LanguageRegistry, get_registry};
use crate::resolution::SymbolResolver;
use crate::storage::{FileRows, IndexBatch, IndexRecord, IndexStats, SymbolIndex};
use crate::types::{CompactString, Diagnostic, Location, SymbolKind};
use crate::unit::{PathKeys, SourceFile};
use crate::Settings;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-file line of a build report
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: CompactString,
    pub language: Option<LanguageId>,
    pub status: BuildStatus,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
pub struct BuildReport {
    pub files: Vec<FileReport>,
    #[serde(skip)]
    pub stats: BuildStats,
    /// Files whose index rows were replaced or dropped.
    pub indexed_files: usize,
    pub resolved_references: usize,
    pub unresolved_references: usize,
    /// Languages skipped this session because their toolchain is missing.
    pub unavailable_languages: Vec<(LanguageId, String)>,
}

impl BuildReport {
    pub fn count(&self, status: BuildStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }
}

/// Filters for [`Engine::query`]; all given filters must match.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub name: Option<String>,
    pub kind: Option<SymbolKind>,
    pub file: Option<PathBuf>,
}

pub struct Engine {
    settings: Arc<Settings>,
    cache: Arc<CacheStore>,
    builder: IncrementalBuilder,
    /// Also serializes build sessions: apply and commit happen under it.
    resolver: Mutex<SymbolResolver>,
    index: Arc<SymbolIndex>,
    completion: CompletionService,
    keys: PathKeys,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cache", &self.cache.dir())
            .field("index", &self.index.path())
            .finish()
    }
}

impl Engine {
    /// Open the cache and index configured in `settings` with the built-in
    /// languages.
    pub fn open(settings: Arc<Settings>) -> TuResult<Self> {
        Self::with_registry(settings, get_registry())
    }

    pub fn with_registry(settings: Arc<Settings>, registry: Arc<LanguageRegistry>) -> TuResult<Self> {
        let cache_dir = settings.resolve_path(&settings.cache_path);
        let index_dir = settings.resolve_path(&settings.index_path).join("tantivy");

        let cache = Arc::new(CacheStore::open(cache_dir)?);
        let index = Arc::new(SymbolIndex::open(&index_dir, &settings.index)?);
        let keys = PathKeys::new(settings.workspace_root.clone());
        let builder = IncrementalBuilder::new(Arc::clone(&settings), registry, Arc::clone(&cache));
        let completion = CompletionService::new(
            Arc::clone(&index),
            Arc::clone(&cache),
            keys.clone(),
            settings.completion.max_results,
        );

        let engine = Self {
            settings,
            cache,
            builder,
            resolver: Mutex::new(SymbolResolver::new()),
            index,
            completion,
            keys,
        };
        engine.prime()?;
        Ok(engine)
    }

    /// Load the units behind the indexed files so later batches resolve
    /// against the whole project.
    fn prime(&self) -> TuResult<()> {
        let files = self.index.indexed_files()?;
        let units: Vec<_> = files
            .iter()
            .filter_map(|(file, _)| match self.cache.load(file) {
                Ok(entry) => entry.and_then(|e| e.unit.clone()).map(Arc::new),
                Err(e) => {
                    debug!(file = %file, "not primed: {e}");
                    None
                }
            })
            .collect();
        info!(indexed = files.len(), primed = units.len(), "session opened");
        self.resolver.lock().prime(units);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn keys(&self) -> &PathKeys {
        &self.keys
    }

    /// Turn paths into build inputs. Directories are walked for files of
    /// enabled languages; indexed files under them that no longer exist are
    /// added so the build drops them.
    pub fn expand_paths(&self, paths: &[PathBuf]) -> TuResult<Vec<SourceFile>> {
        let walker = FileWalker::new(Arc::clone(&self.settings));
        let indexed = self.index.indexed_files()?;
        let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
        let mut files = Vec::new();

        for path in paths {
            if !path.is_dir() {
                if seen.insert(path.clone()) {
                    files.push(SourceFile::new(path.clone()));
                }
                continue;
            }
            for file in walker.walk(path) {
                if seen.insert(file.clone()) {
                    files.push(SourceFile::new(file));
                }
            }

            let dir_key = self.keys.key(path);
            for (file, _) in &indexed {
                let under = dir_key.is_empty() || file.starts_with(&format!("{dir_key}/"));
                let fs_path = self.keys.resolve(file);
                if under && !fs_path.exists() && seen.insert(fs_path.clone()) {
                    files.push(SourceFile::new(fs_path));
                }
            }
        }
        Ok(files)
    }

    /// Build `files`, resolve what changed and commit it to the index.
    ///
    /// File-scoped failures are reported per file. An index failure aborts
    /// the operation with nothing committed.
    pub fn build(&self, files: &[SourceFile], options: BuildOptions) -> TuResult<BuildReport> {
        let batch = self.builder.build_batch(files, options)?;

        let mut changed = Vec::new();
        let mut removed = Vec::new();
        for outcome in &batch.outcomes {
            match (&outcome.status, &outcome.unit) {
                (BuildStatus::Removed, _) => removed.push(outcome.path.clone()),
                (_, Some(unit)) => changed.push(Arc::clone(unit)),
                (_, None) => {}
            }
        }

        let mut resolver = self.resolver.lock();
        let delta = resolver.apply(changed.iter().cloned(), &removed);

        // Units the resolver already had may still be missing from the index
        let mut dirty = delta.files.clone();
        for unit in &changed {
            if self.index.file_hash(&unit.path)?.as_deref() != Some(unit.content_hash.as_str()) {
                dirty.insert(unit.path.clone());
            }
        }

        let mut index_batch = IndexBatch {
            files: Vec::with_capacity(dirty.len()),
            removed: delta.removed.iter().cloned().collect(),
        };
        for file in &removed {
            if !index_batch.removed.contains(file) {
                index_batch.removed.push(file.clone());
            }
        }
        for file in &dirty {
            let Some(unit) = resolver.unit(file) else {
                continue;
            };
            index_batch.files.push(FileRows {
                file: file.clone(),
                content_hash: unit.content_hash.clone(),
                symbols: unit.symbols.clone(),
                references: resolver.references(file).to_vec(),
            });
        }
        self.index.upsert_symbols(&index_batch)?;
        drop(resolver);

        Ok(BuildReport {
            indexed_files: index_batch.files.len() + index_batch.removed.len(),
            resolved_references: delta.resolved,
            unresolved_references: delta.unresolved,
            unavailable_languages: self.builder.unavailable_languages(),
            files: batch
                .outcomes
                .into_iter()
                .map(|outcome| FileReport {
                    path: outcome.path,
                    language: outcome.language,
                    status: outcome.status,
                    diagnostics: outcome.diagnostics,
                })
                .collect(),
            stats: batch.stats,
        })
    }

    /// Expand `paths` and build them.
    pub fn build_paths(&self, paths: &[PathBuf], options: BuildOptions) -> TuResult<BuildReport> {
        let files = self.expand_paths(paths)?;
        self.build(&files, options)
    }

    /// Indexed definitions matching every given filter, in location order.
    pub fn query(&self, filter: &QueryFilter) -> TuResult<Vec<IndexRecord>> {
        let file_key = filter.file.as_deref().map(|path| self.keys.key(path));
        let mut records = match (&filter.name, &file_key, filter.kind) {
            (Some(name), _, _) => self.index.find_by_name(name)?,
            (None, Some(file), _) => self.index.list_by_file(file)?,
            (None, None, Some(kind)) => self.index.list_by_kind(kind)?,
            (None, None, None) => self.index.all_records()?,
        };
        records.retain(|record| {
            filter.kind.is_none_or(|kind| record.kind == kind)
                && file_key
                    .as_ref()
                    .is_none_or(|file| record.definition.file == *file)
        });
        Ok(records)
    }

    pub fn complete(
        &self,
        path: &Path,
        line: u32,
        column: u32,
        token: &CancellationToken,
    ) -> TuResult<Completion> {
        Ok(self.completion.complete(path, line, column, token)?)
    }

    pub fn references(
        &self,
        path: &Path,
        line: u32,
        column: u32,
        token: &CancellationToken,
    ) -> TuResult<Option<ReferenceSet>> {
        Ok(self.completion.references(path, line, column, token)?)
    }

    pub fn definition(
        &self,
        path: &Path,
        line: u32,
        column: u32,
        token: &CancellationToken,
    ) -> TuResult<Option<(Location, Freshness)>> {
        Ok(self.completion.definition(path, line, column, token)?)
    }

    /// Render the tree of `path`, building it first if the cache has no
    /// current unit.
    pub fn print_ast(&self, path: &Path, options: PrintOptions) -> TuResult<String> {
        let outcome = self.builder.build_file(&SourceFile::new(path), false);
        let unit = outcome.unit.ok_or_else(|| {
            let reasons: Vec<String> = outcome.diagnostics.iter().map(ToString::to_string).collect();
            TuError::General(format!(
                "no syntax tree for '{}': {}",
                outcome.path,
                reasons.join("; ")
            ))
        })?;
        Ok(AstPrinter::new(options).print_unit(&unit))
    }

    /// Delete every cache entry. The index is left alone.
    pub fn cache_clear(&self) -> TuResult<usize> {
        let removed = self.cache.clear()?;
        info!(removed, "cache cleared");
        Ok(removed)
    }

    pub fn cache_stats(&self) -> TuResult<CacheStats> {
        Ok(self.cache.stats()?)
    }

    pub fn index_stats(&self) -> TuResult<IndexStats> {
        Ok(self.index.stats()?)
    }

    /// Number of parser invocations this session.
    pub fn parser_runs(&self) -> u64 {
        self.builder.parser_runs()
    }
}
