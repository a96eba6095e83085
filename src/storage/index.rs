//! Tantivy-backed symbol index
//!
//! Three document types share one schema, told apart by `doc_type`:
//! - `file`: one per indexed file, with the content hash it was built from
//! - `symbol`: one per definition, keyed by `symbol_id`
//! - `reference`: one per use, with its resolved `target` if any
//!
//! Every document carries its `file`, so replacing a file's rows is a
//! delete-by-term followed by adds, all inside the batch's single commit.

use super::{StorageError, StorageResult};
use crate::config::IndexConfig;
use crate::symbol::{ReferenceKind, ScopeContext, Symbol, SymbolReference};
use crate::types::{CompactString, Extent, Location, Position, SymbolId, SymbolKind};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tantivy::collector::DocSetCollector;
use tantivy::directory::MmapDirectory;
use tantivy::directory::error::LockError;
use tantivy::query::{BooleanQuery, Occur, Query, RegexQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, STORED, STRING, Schema, Value};
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, TantivyError, Term,
};
use tracing::{debug, info, warn};

const DOC_FILE: &str = "file";
const DOC_SYMBOL: &str = "symbol";
const DOC_REFERENCE: &str = "reference";

/// Definition with its resolved references, as returned by queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    pub symbol_id: SymbolId,
    pub name: CompactString,
    pub kind: SymbolKind,
    pub definition: Location,
    pub extent: Extent,
    pub scope: ScopeContext,
    pub parent: Option<SymbolId>,
    pub container: Option<CompactString>,
    pub type_hint: Option<CompactString>,
    /// Locations of every use bound to this definition, in file order.
    pub references: Vec<Location>,
}

impl IndexRecord {
    pub fn to_symbol(&self) -> Symbol {
        Symbol {
            id: self.symbol_id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            definition: self.definition.clone(),
            extent: self.extent,
            scope: self.scope,
            parent: self.parent.clone(),
            container: self.container.clone(),
            type_hint: self.type_hint.clone(),
        }
    }
}

/// A stored use of a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRow {
    pub name: CompactString,
    pub kind: ReferenceKind,
    pub location: Location,
    pub receiver: Option<CompactString>,
    pub target: Option<SymbolId>,
}

impl ReferenceRow {
    pub fn name_covers(&self, line: u32, column: u32) -> bool {
        self.location.covers(line, column, self.name.len())
    }
}

/// Rows replacing everything stored for one file
#[derive(Debug, Clone)]
pub struct FileRows {
    pub file: CompactString,
    pub content_hash: String,
    pub symbols: Vec<Symbol>,
    /// References with targets as resolved.
    pub references: Vec<SymbolReference>,
}

/// One transactional update
#[derive(Debug, Clone, Default)]
pub struct IndexBatch {
    pub files: Vec<FileRows>,
    pub removed: Vec<CompactString>,
}

impl IndexBatch {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub files: usize,
    pub symbols: usize,
    pub references: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, Copy)]
struct Fields {
    doc_type: Field,
    file: Field,
    symbol_id: Field,
    name: Field,
    name_lower: Field,
    kind: Field,
    line: Field,
    column: Field,
    start_line: Field,
    start_column: Field,
    start_offset: Field,
    end_line: Field,
    end_column: Field,
    end_offset: Field,
    scope: Field,
    parent: Field,
    container: Field,
    type_hint: Field,
    receiver: Field,
    target: Field,
    content_hash: Field,
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let fields = Fields {
        doc_type: builder.add_text_field("doc_type", STRING),
        file: builder.add_text_field("file", STRING | STORED),
        symbol_id: builder.add_text_field("symbol_id", STRING | STORED),
        name: builder.add_text_field("name", STRING | STORED),
        name_lower: builder.add_text_field("name_lower", STRING),
        kind: builder.add_text_field("kind", STRING | STORED),
        line: builder.add_u64_field("line", STORED),
        column: builder.add_u64_field("column", STORED),
        start_line: builder.add_u64_field("start_line", STORED),
        start_column: builder.add_u64_field("start_column", STORED),
        start_offset: builder.add_u64_field("start_offset", STORED),
        end_line: builder.add_u64_field("end_line", STORED),
        end_column: builder.add_u64_field("end_column", STORED),
        end_offset: builder.add_u64_field("end_offset", STORED),
        scope: builder.add_text_field("scope", STRING | STORED),
        parent: builder.add_text_field("parent", STORED),
        container: builder.add_text_field("container", STRING | STORED),
        type_hint: builder.add_text_field("type_hint", STORED),
        receiver: builder.add_text_field("receiver", STORED),
        target: builder.add_text_field("target", STRING | STORED),
        content_hash: builder.add_text_field("content_hash", STORED),
    };
    (builder.build(), fields)
}

fn text(doc: &TantivyDocument, field: Field) -> Option<String> {
    doc.get_first(field)
        .and_then(|value| value.as_str().map(str::to_string))
}

fn number(doc: &TantivyDocument, field: Field) -> u32 {
    doc.get_first(field)
        .and_then(|value| value.as_u64())
        .unwrap_or(0) as u32
}

fn term_query(field: Field, value: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, value),
        IndexRecordOption::Basic,
    ))
}

/// Symbol index over one project
pub struct SymbolIndex {
    index: Index,
    reader: IndexReader,
    fields: Fields,
    path: Option<PathBuf>,
    config: IndexConfig,
    /// Serializes writers inside this process; the directory lock covers
    /// other processes.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for SymbolIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolIndex")
            .field("path", &self.path)
            .finish()
    }
}

impl SymbolIndex {
    /// Open the index stored in `path`, creating it if needed.
    pub fn open(path: impl AsRef<Path>, config: &IndexConfig) -> StorageResult<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let (schema, fields) = build_schema();
        let directory = MmapDirectory::open(path)?;
        let index = Index::open_or_create(directory, schema)?;
        Self::with_index(index, fields, Some(path.to_path_buf()), config)
    }

    /// Index kept in memory, for tests and one-shot queries.
    pub fn in_memory(config: &IndexConfig) -> StorageResult<Self> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        Self::with_index(index, fields, None, config)
    }

    fn with_index(
        index: Index,
        fields: Fields,
        path: Option<PathBuf>,
        config: &IndexConfig,
    ) -> StorageResult<Self> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            fields,
            path,
            config: config.clone(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Acquire the index writer, backing off while another writer holds it.
    fn acquire_writer(&self) -> StorageResult<IndexWriter> {
        let attempts = self.config.write_retries.max(1);
        let mut backoff = Duration::from_millis(self.config.retry_backoff_ms);
        for attempt in 1..=attempts {
            match self
                .index
                .writer_with_num_threads(1, self.config.writer_heap_bytes)
            {
                Ok(writer) => return Ok(writer),
                Err(TantivyError::LockFailure(LockError::LockBusy, _)) if attempt < attempts => {
                    warn!(attempt, backoff_ms = backoff.as_millis() as u64, "index writer busy, retrying");
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(TantivyError::LockFailure(LockError::LockBusy, _)) => {
                    return Err(StorageError::WriteConflict { attempts });
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StorageError::WriteConflict { attempts })
    }

    /// Replace the rows of every file in `batch` and drop removed files.
    ///
    /// All changes land in one commit: readers see either none or all of
    /// them. On error nothing is committed.
    pub fn upsert_symbols(&self, batch: &IndexBatch) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock();
        let mut writer = self.acquire_writer()?;
        let f = self.fields;

        for file in batch.removed.iter().chain(batch.files.iter().map(|rows| &rows.file)) {
            writer.delete_term(Term::from_field_text(f.file, file));
        }

        let mut symbols = 0usize;
        let mut references = 0usize;
        for rows in &batch.files {
            let mut file_doc = TantivyDocument::default();
            file_doc.add_text(f.doc_type, DOC_FILE);
            file_doc.add_text(f.file, &rows.file);
            file_doc.add_text(f.content_hash, &rows.content_hash);
            writer.add_document(file_doc)?;

            for symbol in &rows.symbols {
                writer.add_document(self.symbol_doc(&rows.file, symbol))?;
            }
            for reference in &rows.references {
                writer.add_document(self.reference_doc(&rows.file, reference))?;
            }
            symbols += rows.symbols.len();
            references += rows.references.len();
        }

        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        info!(
            files = batch.files.len(),
            removed = batch.removed.len(),
            symbols,
            references,
            "index committed"
        );
        Ok(())
    }

    fn symbol_doc(&self, file: &str, symbol: &Symbol) -> TantivyDocument {
        let f = self.fields;
        let mut doc = TantivyDocument::default();
        doc.add_text(f.doc_type, DOC_SYMBOL);
        doc.add_text(f.file, file);
        doc.add_text(f.symbol_id, symbol.id.as_str());
        doc.add_text(f.name, &symbol.name);
        doc.add_text(f.name_lower, symbol.name.to_lowercase());
        doc.add_text(f.kind, symbol.kind.as_str());
        doc.add_u64(f.line, symbol.definition.line as u64);
        doc.add_u64(f.column, symbol.definition.column as u64);
        doc.add_u64(f.start_line, symbol.extent.start.line as u64);
        doc.add_u64(f.start_column, symbol.extent.start.column as u64);
        doc.add_u64(f.start_offset, symbol.extent.start.offset as u64);
        doc.add_u64(f.end_line, symbol.extent.end.line as u64);
        doc.add_u64(f.end_column, symbol.extent.end.column as u64);
        doc.add_u64(f.end_offset, symbol.extent.end.offset as u64);
        doc.add_text(f.scope, symbol.scope.as_str());
        if let Some(parent) = &symbol.parent {
            doc.add_text(f.parent, parent.as_str());
        }
        if let Some(container) = &symbol.container {
            doc.add_text(f.container, container);
        }
        if let Some(type_hint) = &symbol.type_hint {
            doc.add_text(f.type_hint, type_hint);
        }
        doc
    }

    fn reference_doc(&self, file: &str, reference: &SymbolReference) -> TantivyDocument {
        let f = self.fields;
        let mut doc = TantivyDocument::default();
        doc.add_text(f.doc_type, DOC_REFERENCE);
        doc.add_text(f.file, file);
        doc.add_text(f.name, &reference.name);
        doc.add_text(f.kind, reference.kind.as_str());
        doc.add_u64(f.line, reference.location.line as u64);
        doc.add_u64(f.column, reference.location.column as u64);
        if let Some(receiver) = &reference.receiver {
            doc.add_text(f.receiver, receiver);
        }
        // Unresolved references get an empty target so they can be queried
        let target = reference.target.symbol_id().map(SymbolId::as_str).unwrap_or("");
        doc.add_text(f.target, target);
        doc
    }

    fn search(&self, searcher: &Searcher, query: &dyn Query) -> StorageResult<Vec<TantivyDocument>> {
        let addresses = searcher.search(query, &DocSetCollector)?;
        let mut docs = Vec::with_capacity(addresses.len());
        for address in addresses {
            docs.push(searcher.doc::<TantivyDocument>(address)?);
        }
        Ok(docs)
    }

    fn typed(&self, doc_type: &str, field: Field, value: &str) -> BooleanQuery {
        BooleanQuery::new(vec![
            (Occur::Must, term_query(self.fields.doc_type, doc_type)),
            (Occur::Must, term_query(field, value)),
        ])
    }

    fn decode_symbol(&self, doc: &TantivyDocument) -> StorageResult<IndexRecord> {
        let f = self.fields;
        let invalid = |field: &str, reason: String| StorageError::InvalidFieldValue {
            field: field.to_string(),
            reason,
        };
        let kind_text = text(doc, f.kind).unwrap_or_default();
        let kind = SymbolKind::from_str(&kind_text)
            .map_err(|e| invalid("kind", format!("{e}: '{kind_text}'")))?;
        let scope_text = text(doc, f.scope).unwrap_or_default();
        let scope = ScopeContext::parse(&scope_text)
            .ok_or_else(|| invalid("scope", format!("unknown scope '{scope_text}'")))?;
        let file = text(doc, f.file).ok_or_else(|| invalid("file", "missing".into()))?;
        let symbol_id =
            text(doc, f.symbol_id).ok_or_else(|| invalid("symbol_id", "missing".into()))?;

        Ok(IndexRecord {
            symbol_id: SymbolId::from_raw(&symbol_id),
            name: text(doc, f.name).unwrap_or_default().into(),
            kind,
            definition: Location::new(&file, number(doc, f.line), number(doc, f.column)),
            extent: Extent::new(
                Position::new(
                    number(doc, f.start_line),
                    number(doc, f.start_column),
                    number(doc, f.start_offset),
                ),
                Position::new(
                    number(doc, f.end_line),
                    number(doc, f.end_column),
                    number(doc, f.end_offset),
                ),
            ),
            scope,
            parent: text(doc, f.parent).map(|p| SymbolId::from_raw(&p)),
            container: text(doc, f.container).map(Into::into),
            type_hint: text(doc, f.type_hint).map(Into::into),
            references: Vec::new(),
        })
    }

    fn decode_reference(&self, doc: &TantivyDocument) -> StorageResult<ReferenceRow> {
        let f = self.fields;
        let kind_text = text(doc, f.kind).unwrap_or_default();
        let kind = ReferenceKind::parse(&kind_text).ok_or_else(|| StorageError::InvalidFieldValue {
            field: "kind".to_string(),
            reason: format!("unknown reference kind '{kind_text}'"),
        })?;
        let file = text(doc, f.file).unwrap_or_default();
        Ok(ReferenceRow {
            name: text(doc, f.name).unwrap_or_default().into(),
            kind,
            location: Location::new(&file, number(doc, f.line), number(doc, f.column)),
            receiver: text(doc, f.receiver).map(Into::into),
            target: text(doc, f.target)
                .filter(|t| !t.is_empty())
                .map(|t| SymbolId::from_raw(&t)),
        })
    }

    /// Decode symbol docs into records with their reference lists, sorted
    /// by definition location.
    fn records(&self, searcher: &Searcher, docs: Vec<TantivyDocument>) -> StorageResult<Vec<IndexRecord>> {
        let mut records = docs
            .iter()
            .map(|doc| self.decode_symbol(doc))
            .collect::<StorageResult<Vec<_>>>()?;
        for record in &mut records {
            record.references = self.reference_locations(searcher, &record.symbol_id)?;
        }
        records.sort_by(|a, b| {
            (&a.definition, &a.symbol_id).cmp(&(&b.definition, &b.symbol_id))
        });
        Ok(records)
    }

    fn reference_locations(&self, searcher: &Searcher, id: &SymbolId) -> StorageResult<Vec<Location>> {
        let query = self.typed(DOC_REFERENCE, self.fields.target, id.as_str());
        let mut locations = self
            .search(searcher, &query)?
            .iter()
            .map(|doc| self.decode_reference(doc).map(|r| r.location))
            .collect::<StorageResult<Vec<_>>>()?;
        locations.sort();
        Ok(locations)
    }

    pub fn find_by_name(&self, name: &str) -> StorageResult<Vec<IndexRecord>> {
        let searcher = self.reader.searcher();
        let docs = self.search(&searcher, &self.typed(DOC_SYMBOL, self.fields.name, name))?;
        self.records(&searcher, docs)
    }

    /// Definitions whose name starts with `prefix`, ignoring case.
    pub fn find_by_prefix(&self, prefix: &str) -> StorageResult<Vec<IndexRecord>> {
        let searcher = self.reader.searcher();
        let pattern = format!("{}.*", regex::escape(&prefix.to_lowercase()));
        let regex = RegexQuery::from_pattern(&pattern, self.fields.name_lower)?;
        let query = BooleanQuery::new(vec![
            (Occur::Must, term_query(self.fields.doc_type, DOC_SYMBOL)),
            (Occur::Must, Box::new(regex)),
        ]);
        let docs = self.search(&searcher, &query)?;
        self.records(&searcher, docs)
    }

    pub fn find_references(&self, id: &SymbolId) -> StorageResult<Vec<Location>> {
        let searcher = self.reader.searcher();
        self.reference_locations(&searcher, id)
    }

    pub fn definition(&self, id: &SymbolId) -> StorageResult<Option<IndexRecord>> {
        let searcher = self.reader.searcher();
        let docs = self.search(&searcher, &self.typed(DOC_SYMBOL, self.fields.symbol_id, id.as_str()))?;
        Ok(self.records(&searcher, docs)?.into_iter().next())
    }

    pub fn list_by_file(&self, file: &str) -> StorageResult<Vec<IndexRecord>> {
        let searcher = self.reader.searcher();
        let docs = self.search(&searcher, &self.typed(DOC_SYMBOL, self.fields.file, file))?;
        self.records(&searcher, docs)
    }

    pub fn list_by_kind(&self, kind: SymbolKind) -> StorageResult<Vec<IndexRecord>> {
        let searcher = self.reader.searcher();
        let docs = self.search(&searcher, &self.typed(DOC_SYMBOL, self.fields.kind, kind.as_str()))?;
        self.records(&searcher, docs)
    }

    /// Members declared inside the type named `container`.
    pub fn list_by_container(&self, container: &str) -> StorageResult<Vec<IndexRecord>> {
        let searcher = self.reader.searcher();
        let docs = self.search(&searcher, &self.typed(DOC_SYMBOL, self.fields.container, container))?;
        self.records(&searcher, docs)
    }

    /// Every definition in the index.
    pub fn all_records(&self) -> StorageResult<Vec<IndexRecord>> {
        let searcher = self.reader.searcher();
        let docs = self.search(&searcher, term_query(self.fields.doc_type, DOC_SYMBOL).as_ref())?;
        self.records(&searcher, docs)
    }

    /// References stored for `file`, in position order.
    pub fn references_in_file(&self, file: &str) -> StorageResult<Vec<ReferenceRow>> {
        let searcher = self.reader.searcher();
        let mut rows = self
            .search(&searcher, &self.typed(DOC_REFERENCE, self.fields.file, file))?
            .iter()
            .map(|doc| self.decode_reference(doc))
            .collect::<StorageResult<Vec<_>>>()?;
        rows.sort_by(|a, b| (&a.location, &a.name).cmp(&(&b.location, &b.name)));
        Ok(rows)
    }

    /// References with no target, optionally limited to one file.
    pub fn unresolved(&self, file: Option<&str>) -> StorageResult<Vec<ReferenceRow>> {
        let searcher = self.reader.searcher();
        let mut clauses = vec![
            (Occur::Must, term_query(self.fields.doc_type, DOC_REFERENCE)),
            (Occur::Must, term_query(self.fields.target, "")),
        ];
        if let Some(file) = file {
            clauses.push((Occur::Must, term_query(self.fields.file, file)));
        }
        let mut rows = self
            .search(&searcher, &BooleanQuery::new(clauses))?
            .iter()
            .map(|doc| self.decode_reference(doc))
            .collect::<StorageResult<Vec<_>>>()?;
        rows.sort_by(|a, b| (&a.location, &a.name).cmp(&(&b.location, &b.name)));
        Ok(rows)
    }

    /// The definition whose name, or a use of it, is under the cursor.
    pub fn symbol_at(&self, file: &str, line: u32, column: u32) -> StorageResult<Option<IndexRecord>> {
        if let Some(record) = self
            .list_by_file(file)?
            .into_iter()
            .find(|record| record.definition.covers(line, column, record.name.len()))
        {
            return Ok(Some(record));
        }
        let target = self
            .references_in_file(file)?
            .into_iter()
            .find(|row| row.name_covers(line, column))
            .and_then(|row| row.target);
        match target {
            Some(id) => self.definition(&id),
            None => Ok(None),
        }
    }

    /// Indexed files with the content hash their rows were built from.
    pub fn indexed_files(&self) -> StorageResult<Vec<(CompactString, String)>> {
        let searcher = self.reader.searcher();
        let mut files: Vec<(CompactString, String)> = self
            .search(&searcher, term_query(self.fields.doc_type, DOC_FILE).as_ref())?
            .iter()
            .filter_map(|doc| {
                let file = text(doc, self.fields.file)?;
                let hash = text(doc, self.fields.content_hash).unwrap_or_default();
                Some((file.into(), hash))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    pub fn file_hash(&self, file: &str) -> StorageResult<Option<String>> {
        let searcher = self.reader.searcher();
        let docs = self.search(&searcher, &self.typed(DOC_FILE, self.fields.file, file))?;
        Ok(docs.first().and_then(|doc| text(doc, self.fields.content_hash)))
    }

    pub fn stats(&self) -> StorageResult<IndexStats> {
        let searcher = self.reader.searcher();
        let count = |query: &dyn Query| -> StorageResult<usize> {
            Ok(searcher.search(query, &DocSetCollector)?.len())
        };
        Ok(IndexStats {
            files: count(term_query(self.fields.doc_type, DOC_FILE).as_ref())?,
            symbols: count(term_query(self.fields.doc_type, DOC_SYMBOL).as_ref())?,
            references: count(term_query(self.fields.doc_type, DOC_REFERENCE).as_ref())?,
            unresolved: count(&BooleanQuery::new(vec![
                (Occur::Must, term_query(self.fields.doc_type, DOC_REFERENCE)),
                (Occur::Must, term_query(self.fields.target, "")),
            ]))?,
        })
    }

    /// Remove every document.
    pub fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        let mut writer = self.acquire_writer()?;
        writer.delete_all_documents()?;
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        debug!("index cleared");
        Ok(())
    }

    /// Number of documents of every type, mostly for diagnostics.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}
