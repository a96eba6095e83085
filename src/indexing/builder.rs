//! Incremental builder
//!
//! Decides per file whether the cached unit can be reused or the language
//! parser has to run again, and records the outcome in the cache store.
//!
//! Per-file state machine:
//! - `Missing/Stale -> Building -> Fresh` when the parse succeeds
//! - `Missing/Stale -> Building -> Error` when it fails; later builds retry
//!   an unchanged file until `indexing.max_parse_attempts` is reached
//! - `Fresh -> Stale` when the file or a recorded dependency changes
//!
//! At most one build per file runs at a time. A second request for the
//! same file waits on the first and then finds a fresh cache entry; a forced
//! request that waited reuses that build instead of parsing again.

use super::file_info::calculate_hash;
use super::progress::BuildStats;
use crate::Settings;
use crate::cache::{CacheEntry, CacheState, CacheStore};
use crate::error::{CacheError, ParseError, TuError, TuResult};
use crate::parsing::{LanguageId, LanguageRegistry, ParseInput};
use crate::types::{CompactString, Diagnostic};
use crate::unit::{PathKeys, SourceFile, TranslationUnit};
use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::io::ErrorKind;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Per-file result reported by `build`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Reused from the cache without running a parser.
    Cached,
    Rebuilt,
    Error,
    /// The file no longer exists; its cache entry was evicted.
    Removed,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Cached => "cached",
            BuildStatus::Rebuilt => "rebuilt",
            BuildStatus::Error => "error",
            BuildStatus::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: CompactString,
    pub language: Option<LanguageId>,
    pub status: BuildStatus,
    /// Unit handed to the resolver. For failed files this is the previous
    /// good build, if one exists.
    pub unit: Option<Arc<TranslationUnit>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileOutcome {
    fn error(path: &str, language: Option<LanguageId>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            path: path.into(),
            language,
            status: BuildStatus::Error,
            unit: None,
            diagnostics,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Ignore cached entries and retry budgets.
    pub force: bool,
    /// Worker threads; `indexing.parallel_threads` when `None`.
    pub threads: Option<usize>,
}

#[derive(Debug)]
pub struct BatchResult {
    /// One outcome per submitted file, in submission order.
    pub outcomes: Vec<FileOutcome>,
    pub stats: BuildStats,
}

/// Serializes builds of one file while any request for it is in flight.
#[derive(Default)]
struct BuildSlot {
    lock: Mutex<()>,
    /// Successful parses completed through this slot.
    generation: AtomicU64,
}

pub struct IncrementalBuilder {
    settings: Arc<Settings>,
    registry: Arc<LanguageRegistry>,
    cache: Arc<CacheStore>,
    keys: PathKeys,
    inflight: DashMap<CompactString, Arc<BuildSlot>>,
    /// Languages whose toolchain failed to start this session.
    unavailable: DashMap<LanguageId, String>,
    parser_runs: AtomicU64,
}

impl std::fmt::Debug for IncrementalBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalBuilder")
            .field("cache", &self.cache.dir())
            .field("inflight", &self.inflight.len())
            .field("unavailable", &self.unavailable.len())
            .finish()
    }
}

impl IncrementalBuilder {
    pub fn new(
        settings: Arc<Settings>,
        registry: Arc<LanguageRegistry>,
        cache: Arc<CacheStore>,
    ) -> Self {
        let keys = PathKeys::new(settings.workspace_root.clone());
        Self {
            settings,
            registry,
            cache,
            keys,
            inflight: DashMap::new(),
            unavailable: DashMap::new(),
            parser_runs: AtomicU64::new(0),
        }
    }

    pub fn keys(&self) -> &PathKeys {
        &self.keys
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Parser invocations so far in this session.
    pub fn parser_runs(&self) -> u64 {
        self.parser_runs.load(Ordering::Relaxed)
    }

    /// Languages marked unsupported for this session, with the reason.
    pub fn unavailable_languages(&self) -> Vec<(LanguageId, String)> {
        let mut langs: Vec<_> = self
            .unavailable
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        langs.sort();
        langs
    }

    fn fs_path(&self, key: &str) -> PathBuf {
        self.keys.resolve(key)
    }

    /// Current state of a file without building it.
    pub fn state(&self, path: &std::path::Path) -> CacheState {
        let key = self.keys.key(path);
        if let Some(slot) = self.inflight.get(&key) {
            if slot.lock.is_locked() {
                return CacheState::Building;
            }
        }
        let Ok(text) = std::fs::read_to_string(self.fs_path(&key)) else {
            return CacheState::Missing;
        };
        match self.cache.load(&key) {
            Ok(Some(entry)) => entry.state_for(&calculate_hash(&text), &self.keys),
            _ => CacheState::Missing,
        }
    }

    /// Build one file, reusing its cached unit when nothing changed.
    pub fn build_file(&self, source: &SourceFile, force: bool) -> FileOutcome {
        let key = self.keys.key(&source.path);
        let fs_path = self.fs_path(&key);

        let language = match source.language {
            Some(language) => language,
            None => match self.registry.language_for_path(&fs_path, &self.settings) {
                Ok(language) => language,
                Err(e) => {
                    return FileOutcome::error(&key, None, vec![Diagnostic::error(&key, e.to_string())]);
                }
            },
        };

        let (slot, requested_at) = {
            let entry = self.inflight.entry(key.clone()).or_default();
            (Arc::clone(entry.value()), entry.generation.load(Ordering::Acquire))
        };
        let outcome = {
            let _building = slot.lock.lock();
            let waited = slot.generation.load(Ordering::Acquire) != requested_at;
            if force && waited {
                debug!(file = %key, "forced request reuses the build it waited on");
            }
            let force = force && !waited;
            let outcome = self.build_locked(key.clone(), language, source, &fs_path, force);
            if outcome.status == BuildStatus::Rebuilt {
                slot.generation.fetch_add(1, Ordering::AcqRel);
            }
            outcome
        };
        // Only this request and the map still hold the slot.
        self.inflight.remove_if(&key, |_, held| Arc::strong_count(held) == 2);
        outcome
    }

    fn build_locked(
        &self,
        key: CompactString,
        language: LanguageId,
        source: &SourceFile,
        fs_path: &std::path::Path,
        force: bool,
    ) -> FileOutcome {
        let text = match std::fs::read_to_string(fs_path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Err(e) = self.cache.evict(&key) {
                    warn!(file = %key, "failed to evict cache entry: {e}");
                }
                debug!(file = %key, "file removed");
                return FileOutcome {
                    path: key,
                    language: Some(language),
                    status: BuildStatus::Removed,
                    unit: None,
                    diagnostics: Vec::new(),
                };
            }
            Err(e) => {
                warn!(file = %key, "unreadable: {e}");
                self.cache.record_error();
                let diagnostic = Diagnostic::error(&key, format!("cannot read file: {e}"));
                return FileOutcome::error(&key, Some(language), vec![diagnostic]);
            }
        };
        let content_hash = calculate_hash(&text);

        let cached = match self.cache.load(&key) {
            Ok(entry) => entry,
            Err(CacheError::Corruption { reason, .. }) => {
                debug!(file = %key, "corrupt cache entry treated as missing: {reason}");
                None
            }
            Err(e) => {
                warn!(file = %key, "cache unreadable: {e}");
                None
            }
        };

        if !force {
            if let Some(entry) = &cached {
                match entry.state_for(&content_hash, &self.keys) {
                    CacheState::Fresh => {
                        debug!(file = %key, "cache hit");
                        self.cache.record_hit();
                        let unit = entry.unit.clone().map(Arc::new);
                        let diagnostics = unit
                            .as_ref()
                            .map(|u| u.diagnostics.clone())
                            .unwrap_or_default();
                        return FileOutcome {
                            path: key,
                            language: Some(language),
                            status: BuildStatus::Cached,
                            unit,
                            diagnostics,
                        };
                    }
                    CacheState::Error
                        if entry.failed_attempts >= self.settings.indexing.max_parse_attempts =>
                    {
                        debug!(
                            file = %key,
                            attempts = entry.failed_attempts,
                            "retry budget exhausted, keeping last failure"
                        );
                        return FileOutcome {
                            path: key,
                            language: Some(language),
                            status: BuildStatus::Error,
                            unit: entry.unit.clone().map(Arc::new),
                            diagnostics: entry.diagnostics.clone(),
                        };
                    }
                    _ => {}
                }
            }
        }

        if let Some(reason) = self.unavailable.get(&language) {
            let diagnostic = Diagnostic::warning(
                &key,
                format!("{language} parser unavailable this session: {}", reason.value()),
            );
            return FileOutcome {
                path: key,
                language: Some(language),
                status: BuildStatus::Error,
                unit: cached.as_ref().and_then(|e| e.unit.clone()).map(Arc::new),
                diagnostics: vec![diagnostic],
            };
        }

        self.parse(&key, language, source, fs_path, &text, &content_hash, cached.as_deref())
    }

    #[allow(clippy::too_many_arguments)]
    fn parse(
        &self,
        key: &CompactString,
        language: LanguageId,
        source: &SourceFile,
        fs_path: &std::path::Path,
        text: &str,
        content_hash: &str,
        cached: Option<&CacheEntry>,
    ) -> FileOutcome {
        let mut parser = match self.registry.create_parser(language, &self.settings) {
            Ok(parser) => parser,
            Err(e) => {
                self.cache.record_error();
                return FileOutcome::error(key, Some(language), vec![Diagnostic::error(key, e.to_string())]);
            }
        };

        let input = ParseInput {
            path: key,
            source_path: fs_path,
            text,
            content_hash,
            context: &source.context,
            keys: &self.keys,
        };
        self.parser_runs.fetch_add(1, Ordering::Relaxed);
        debug!(file = %key, %language, "parsing");

        match parser.parse(&input) {
            Ok(unit) => {
                self.cache.record_rebuild();
                let diagnostics = unit.diagnostics.clone();
                let entry = CacheEntry::fresh(unit);
                let unit = match self.cache.store(entry.clone()) {
                    Ok(stored) => stored.unit.clone(),
                    Err(e) => {
                        warn!(file = %key, "cache write failed: {e}");
                        entry.unit
                    }
                };
                FileOutcome {
                    path: key.clone(),
                    language: Some(language),
                    status: BuildStatus::Rebuilt,
                    unit: unit.map(Arc::new),
                    diagnostics,
                }
            }
            Err(ParseError::ParserUnavailable { reason, .. }) => {
                warn!(%language, "parser unavailable, skipping language for this session: {reason}");
                self.unavailable.insert(language, reason.clone());
                self.cache.record_error();
                let diagnostic =
                    Diagnostic::warning(key, format!("{language} parser unavailable: {reason}"));
                FileOutcome {
                    path: key.clone(),
                    language: Some(language),
                    status: BuildStatus::Error,
                    unit: cached.and_then(|e| e.unit.clone()).map(Arc::new),
                    diagnostics: vec![diagnostic],
                }
            }
            Err(ParseError::ParseExecution {
                reason,
                mut diagnostics,
                partial,
                ..
            }) => {
                debug!(file = %key, "parse failed: {reason}");
                self.cache.record_error();
                if diagnostics.is_empty() {
                    diagnostics.push(Diagnostic::error(key, reason));
                }
                let dependencies = partial.map(|u| u.dependencies).unwrap_or_default();
                let entry = CacheEntry::failed(key, content_hash, cached, dependencies, diagnostics);
                let unit = entry.unit.clone().map(Arc::new);
                let diagnostics = entry.diagnostics.clone();
                if let Err(e) = self.cache.store(entry) {
                    warn!(file = %key, "cache write failed: {e}");
                }
                FileOutcome {
                    path: key.clone(),
                    language: Some(language),
                    status: BuildStatus::Error,
                    unit,
                    diagnostics,
                }
            }
        }
    }

    /// Build every file on a bounded worker pool. One file's failure never
    /// affects another's outcome.
    pub fn build_batch(&self, files: &[SourceFile], options: BuildOptions) -> TuResult<BatchResult> {
        let threads = options
            .threads
            .unwrap_or(self.settings.indexing.parallel_threads)
            .max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tu-build-{i}"))
            .build()
            .map_err(|e| TuError::General(format!("failed to start build workers: {e}")))?;

        // Force applies to the first request for each file; repeats reuse it.
        let mut seen = HashSet::new();
        let forced: Vec<bool> = files
            .iter()
            .map(|file| options.force && seen.insert(self.keys.key(&file.path)))
            .collect();

        let mut stats = BuildStats::new();
        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .zip(forced.par_iter())
                .map(|(file, &force)| self.build_file(file, force))
                .collect()
        });

        for outcome in &outcomes {
            match outcome.status {
                BuildStatus::Cached => stats.files_cached += 1,
                BuildStatus::Rebuilt => stats.files_rebuilt += 1,
                BuildStatus::Removed => stats.files_removed += 1,
                BuildStatus::Error => {
                    let message = outcome
                        .diagnostics
                        .first()
                        .map(|d| d.message.clone())
                        .unwrap_or_else(|| "build failed".to_string());
                    stats.add_error(&outcome.path, message);
                }
            }
            stats.symbols_found += outcome.unit.as_ref().map_or(0, |u| u.symbols.len());
        }
        stats.stop_timing();
        info!(threads, "{}", stats.summary());

        Ok(BatchResult { outcomes, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstNode, NodeKind};
    use crate::error::ParseResult;
    use crate::parsing::{LanguageDefinition, LanguageParser, get_registry};
    use crate::parsing::parser::text_extent;
    use crate::parsing::UnitCollector;
    use crate::types::{Position, SymbolKind};
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Defines one symbol per non-empty line; "fail" lines reject the file.
    struct LineParser {
        runs: Arc<AtomicUsize>,
    }

    impl LanguageParser for LineParser {
        fn language(&self) -> LanguageId {
            LanguageId::new("lines")
        }

        fn parse(&mut self, input: &ParseInput<'_>) -> ParseResult<TranslationUnit> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if input.text.contains("fail") {
                return Err(ParseError::ParseExecution {
                    language: self.language(),
                    path: input.path.to_string(),
                    reason: "bad line".into(),
                    diagnostics: Vec::new(),
                    partial: None,
                });
            }
            let mut collector = UnitCollector::new(input.path);
            let mut offset = 0u32;
            for (i, line) in input.text.lines().enumerate() {
                let at = Position::new(i as u32 + 1, 1, offset);
                if !line.is_empty() {
                    let end = Position::new(i as u32 + 1, line.len() as u32 + 1, offset + line.len() as u32);
                    collector.define(line, SymbolKind::Function, at, crate::types::Extent::new(at, end), None);
                }
                offset += line.len() as u32 + 1;
            }
            let root = AstNode::new(NodeKind::TranslationUnit, "lines", text_extent(input.text));
            Ok(collector.finish(self.language(), input.content_hash, root, Vec::new()))
        }
    }

    struct LineLanguage {
        runs: Arc<AtomicUsize>,
    }

    impl LanguageDefinition for LineLanguage {
        fn id(&self) -> LanguageId {
            LanguageId::new("lines")
        }
        fn name(&self) -> &'static str {
            "Lines"
        }
        fn extensions(&self) -> &'static [&'static str] {
            &["lines"]
        }
        fn create_parser(&self, _settings: &Settings) -> ParseResult<Box<dyn LanguageParser>> {
            Ok(Box::new(LineParser {
                runs: Arc::clone(&self.runs),
            }))
        }
    }

    fn setup() -> (TempDir, IncrementalBuilder, Arc<AtomicUsize>) {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.workspace_root = Some(dir.path().to_path_buf());
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = LanguageRegistry::new();
        registry.register(Arc::new(LineLanguage {
            runs: Arc::clone(&runs),
        }));
        let cache = Arc::new(CacheStore::open(dir.path().join(".tu/cache")).unwrap());
        let builder = IncrementalBuilder::new(Arc::new(settings), Arc::new(registry), cache);
        (dir, builder, runs)
    }

    #[test]
    fn test_second_build_is_a_cache_hit() {
        let (dir, builder, runs) = setup();
        std::fs::write(dir.path().join("a.lines"), "alpha\nbeta\n").unwrap();
        let file = SourceFile::new("a.lines");

        let first = builder.build_file(&file, false);
        assert_eq!(first.status, BuildStatus::Rebuilt);
        let second = builder.build_file(&file, false);
        assert_eq!(second.status, BuildStatus::Cached);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(first.unit.unwrap().symbols, second.unit.unwrap().symbols);

        let forced = builder.build_file(&file, true);
        assert_eq!(forced.status, BuildStatus::Rebuilt);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_changed_content_rebuilds() {
        let (dir, builder, runs) = setup();
        let path = dir.path().join("a.lines");
        std::fs::write(&path, "alpha\n").unwrap();
        let file = SourceFile::new(&path);
        builder.build_file(&file, false);
        assert_eq!(builder.state(&path), CacheState::Fresh);

        std::fs::write(&path, "alpha\ngamma\n").unwrap();
        assert_eq!(builder.state(&path), CacheState::Stale);
        let outcome = builder.build_file(&file, false);
        assert_eq!(outcome.status, BuildStatus::Rebuilt);
        assert_eq!(outcome.unit.unwrap().symbols.len(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failures_retry_up_to_the_limit() {
        let (dir, builder, runs) = setup();
        std::fs::write(dir.path().join("bad.lines"), "fail\n").unwrap();
        let file = SourceFile::new("bad.lines");

        for _ in 0..5 {
            let outcome = builder.build_file(&file, false);
            assert_eq!(outcome.status, BuildStatus::Error);
            assert_eq!(outcome.diagnostics[0].message, "bad line");
        }
        // max_parse_attempts defaults to 3
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        std::fs::write(dir.path().join("bad.lines"), "fixed\n").unwrap();
        assert_eq!(builder.build_file(&file, false).status, BuildStatus::Rebuilt);
    }

    #[test]
    fn test_corrupt_entry_is_rebuilt() {
        let (dir, builder, runs) = setup();
        std::fs::write(dir.path().join("a.lines"), "alpha\n").unwrap();
        let file = SourceFile::new("a.lines");
        builder.build_file(&file, false);

        for entry in std::fs::read_dir(dir.path().join(".tu/cache")).unwrap() {
            std::fs::write(entry.unwrap().path(), b"not an entry").unwrap();
        }
        let fresh_builder = IncrementalBuilder::new(
            Arc::clone(&builder.settings),
            Arc::clone(&builder.registry),
            Arc::new(CacheStore::open(dir.path().join(".tu/cache")).unwrap()),
        );
        assert_eq!(fresh_builder.build_file(&file, false).status, BuildStatus::Rebuilt);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_file_is_removed() {
        let (dir, builder, _) = setup();
        let path = dir.path().join("gone.lines");
        std::fs::write(&path, "alpha\n").unwrap();
        builder.build_file(&SourceFile::new(&path), false);
        std::fs::remove_file(&path).unwrap();

        let outcome = builder.build_file(&SourceFile::new(&path), false);
        assert_eq!(outcome.status, BuildStatus::Removed);
        assert!(builder.cache().load("gone.lines").unwrap().is_none());
    }

    #[test]
    fn test_batch_isolates_failures_and_keeps_order() {
        let (dir, builder, _) = setup();
        let mut files = Vec::new();
        for i in 1..=10 {
            let name = format!("f{i:02}.lines");
            let text = if i == 5 { "fail\n".to_string() } else { format!("sym{i}\n") };
            std::fs::write(dir.path().join(&name), text).unwrap();
            files.push(SourceFile::new(name));
        }

        let batch = builder
            .build_batch(&files, BuildOptions { force: false, threads: Some(4) })
            .unwrap();
        assert_eq!(batch.outcomes.len(), 10);
        for (i, outcome) in batch.outcomes.iter().enumerate() {
            assert_eq!(&*outcome.path, format!("f{:02}.lines", i + 1));
            if i == 4 {
                assert_eq!(outcome.status, BuildStatus::Error);
                assert!(outcome.unit.is_none());
                assert!(!outcome.diagnostics.is_empty());
            } else {
                assert_eq!(outcome.status, BuildStatus::Rebuilt);
            }
        }
        assert_eq!(batch.stats.files_rebuilt, 9);
        assert_eq!(batch.stats.files_failed, 1);
        assert_eq!(batch.stats.symbols_found, 9);
    }

    #[test]
    fn test_concurrent_requests_parse_once() {
        let (dir, builder, runs) = setup();
        std::fs::write(dir.path().join("a.lines"), "alpha\n").unwrap();
        let files = vec![SourceFile::new("a.lines"); 16];

        let batch = builder
            .build_batch(&files, BuildOptions { force: false, threads: Some(8) })
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        let rebuilt = batch
            .outcomes
            .iter()
            .filter(|o| o.status == BuildStatus::Rebuilt)
            .count();
        assert_eq!(rebuilt, 1);
        assert_eq!(batch.stats.files_cached, 15);
    }

    #[test]
    fn test_forced_batch_parses_each_file_once() {
        let (dir, builder, runs) = setup();
        std::fs::write(dir.path().join("a.lines"), "alpha\n").unwrap();
        builder.build_file(&SourceFile::new("a.lines"), false);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let files = vec![SourceFile::new("a.lines"); 16];
        let batch = builder
            .build_batch(&files, BuildOptions { force: true, threads: Some(8) })
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(batch.stats.files_rebuilt, 1);
        assert_eq!(batch.stats.files_cached, 15);
    }

    #[test]
    fn test_forced_waiters_reuse_the_running_build() {
        let (dir, builder, runs) = setup();
        std::fs::write(dir.path().join("a.lines"), "alpha\n").unwrap();
        let file = SourceFile::new("a.lines");
        builder.build_file(&file, false);

        let key: CompactString = "a.lines".into();
        let slot = Arc::clone(builder.inflight.entry(key.clone()).or_default().value());
        let building = slot.lock.lock();

        let waiters = 6;
        let outcomes = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..waiters)
                .map(|_| scope.spawn(|| builder.build_file(&file, true)))
                .collect();
            // Every waiter has taken the slot once the map and the test hold the rest.
            while builder.inflight.get(&key).map_or(0, |s| Arc::strong_count(s.value())) < waiters + 2 {
                std::thread::yield_now();
            }
            slot.generation.fetch_add(1, Ordering::AcqRel);
            drop(building);
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(outcomes.iter().all(|o| o.status == BuildStatus::Cached));
    }

    #[test]
    fn test_finished_builds_release_their_slot() {
        let (dir, builder, _) = setup();
        let mut files = Vec::new();
        for i in 0..8 {
            let name = format!("f{i}.lines");
            std::fs::write(dir.path().join(&name), format!("sym{i}\n")).unwrap();
            files.push(SourceFile::new(name));
        }
        files.extend(files.clone());

        builder
            .build_batch(&files, BuildOptions { force: false, threads: Some(4) })
            .unwrap();
        builder.build_file(&SourceFile::new("missing.lines"), false);
        assert!(builder.inflight.is_empty());
    }

    #[test]
    fn test_unknown_extension_is_a_file_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        let mut settings = Settings::default();
        settings.workspace_root = Some(dir.path().to_path_buf());
        let cache = Arc::new(CacheStore::open(dir.path().join("cache")).unwrap());
        let builder = IncrementalBuilder::new(Arc::new(settings), get_registry(), cache);

        let outcome = builder.build_file(&SourceFile::new("notes.txt"), false);
        assert_eq!(outcome.status, BuildStatus::Error);
        assert!(outcome.diagnostics[0].message.contains("extension"));
    }
}
