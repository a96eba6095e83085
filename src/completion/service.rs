use super::CancellationToken;
use super::context::{CursorText, cursor_text};
use crate::ast::AstNode;
use crate::cache::{CacheEntry, CacheStore};
use crate::error::{QueryError, QueryResult};
use crate::indexing::calculate_hash;
use crate::parsing::parser::simple_type_name;
use crate::storage::{IndexRecord, SymbolIndex};
use crate::symbol::ScopeContext;
use crate::types::{CompactString, Location, SymbolId, SymbolKind};
use crate::unit::PathKeys;
use serde::Serialize;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether the index reflects the file as it is on disk now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    /// The file changed (or vanished) since it was indexed. Answers come
    /// from the last indexed version.
    Stale,
}

/// One ranked completion candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: CompactString,
    pub kind: SymbolKind,
    pub detail: String,
    pub insert_text: CompactString,
    /// 0 local, 1 enclosing member, 2 same file, 3 imported or global.
    pub tier: u8,
    pub symbol_id: SymbolId,
    pub location: Location,
}

impl CompletionItem {
    fn from_record(record: &IndexRecord, tier: u8) -> Self {
        let basename = record
            .definition
            .file
            .rsplit('/')
            .next()
            .unwrap_or(&record.definition.file);
        Self {
            label: record.name.clone(),
            kind: record.kind,
            detail: format!("{} in {basename}", record.kind),
            insert_text: record.name.clone(),
            tier,
            symbol_id: record.symbol_id.clone(),
            location: record.definition.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub file: CompactString,
    pub prefix: String,
    pub freshness: Freshness,
    pub items: Vec<CompletionItem>,
}

/// Symbol under a cursor with everything bound to it
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceSet {
    pub freshness: Freshness,
    pub symbol: IndexRecord,
}

impl ReferenceSet {
    pub fn definition(&self) -> &Location {
        &self.symbol.definition
    }

    pub fn references(&self) -> &[Location] {
        &self.symbol.references
    }
}

/// Read-only cursor queries over the symbol index and cached trees.
///
/// Nothing here builds, writes the cache or touches the index writer.
#[derive(Debug, Clone)]
pub struct CompletionService {
    index: Arc<SymbolIndex>,
    cache: Arc<CacheStore>,
    keys: PathKeys,
    max_results: usize,
}

impl CompletionService {
    pub fn new(
        index: Arc<SymbolIndex>,
        cache: Arc<CacheStore>,
        keys: PathKeys,
        max_results: usize,
    ) -> Self {
        Self {
            index,
            cache,
            keys,
            max_results,
        }
    }

    /// Indexed hash of `key` against the file on disk, plus its current text.
    fn freshness(&self, key: &str) -> QueryResult<(Freshness, Option<String>)> {
        let indexed = self
            .index
            .file_hash(key)?
            .ok_or_else(|| QueryError::NotIndexed {
                path: key.to_string(),
            })?;
        let fs_path = self.keys.resolve(key);
        let text = match std::fs::read_to_string(&fs_path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => {
                return Err(QueryError::Io {
                    path: fs_path,
                    source,
                });
            }
        };
        let freshness = match &text {
            Some(text) if calculate_hash(text) == indexed => Freshness::Fresh,
            _ => Freshness::Stale,
        };
        if freshness == Freshness::Stale {
            debug!(file = key, "index is stale for file");
        }
        Ok((freshness, text))
    }

    fn cached_entry(&self, key: &str) -> Option<Arc<CacheEntry>> {
        match self.cache.load(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(file = key, "no usable tree for completion: {e}");
                None
            }
        }
    }

    /// Ranked symbols visible at the cursor.
    pub fn complete(
        &self,
        path: &Path,
        line: u32,
        column: u32,
        token: &CancellationToken,
    ) -> QueryResult<Completion> {
        let key = self.keys.key(path);
        let (freshness, text) = self.freshness(&key)?;
        let cursor = text
            .as_deref()
            .map(|text| cursor_text(text, line, column))
            .unwrap_or_default();

        let entry = self.cached_entry(&key);
        let mut scopes: Vec<&AstNode> = Vec::new();
        if let Some(root) = entry.as_ref().and_then(|e| e.unit.as_ref()).map(|u| &u.root) {
            root.try_path_to(line, column, &mut || token.is_cancelled(), &mut scopes)
                .map_err(|()| QueryError::Cancelled)?;
        }

        let file_records = self.index.list_by_file(&key)?;
        let mut items = match &cursor.receiver {
            Some(receiver) => self.member_candidates(receiver, &file_records, token)?,
            None => self.scope_candidates(&key, &file_records, &scopes, &cursor, line, column, token)?,
        };

        let prefix = cursor.prefix.to_lowercase();
        items.retain(|item| item.label.to_lowercase().starts_with(&prefix));
        items.sort_by(|a, b| {
            (a.tier, a.label.to_lowercase(), &a.label, &a.symbol_id)
                .cmp(&(b.tier, b.label.to_lowercase(), &b.label, &b.symbol_id))
        });
        // Inner declarations shadow outer ones with the same name
        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(item.label.clone()));
        items.truncate(self.max_results);

        Ok(Completion {
            file: key,
            prefix: cursor.prefix,
            freshness,
            items,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn scope_candidates(
        &self,
        key: &str,
        file_records: &[IndexRecord],
        scopes: &[&AstNode],
        cursor: &CursorText,
        line: u32,
        column: u32,
        token: &CancellationToken,
    ) -> QueryResult<Vec<CompletionItem>> {
        let mut items = Vec::new();
        for record in file_records {
            if token.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            if let Some(tier) = same_file_tier(record, scopes, line, column) {
                items.push(CompletionItem::from_record(record, tier));
            }
        }

        let others = if cursor.prefix.is_empty() {
            self.index.all_records()?
        } else {
            self.index.find_by_prefix(&cursor.prefix)?
        };
        for record in &others {
            if token.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            if &*record.definition.file != key && is_top_level(record.scope) {
                items.push(CompletionItem::from_record(record, 3));
            }
        }
        Ok(items)
    }

    /// Members of the receiver's type, or of the receiver itself when it
    /// names a type.
    fn member_candidates(
        &self,
        receiver: &str,
        file_records: &[IndexRecord],
        token: &CancellationToken,
    ) -> QueryResult<Vec<CompletionItem>> {
        let declared = file_records
            .iter()
            .filter(|record| &*record.name == receiver)
            .find_map(|record| record.type_hint.as_deref())
            .and_then(simple_type_name);
        let container = declared.unwrap_or(receiver);

        let mut items = Vec::new();
        for record in self.index.list_by_container(container)? {
            if token.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            if record.scope == ScopeContext::ClassMember {
                items.push(CompletionItem::from_record(&record, 1));
            }
        }
        Ok(items)
    }

    /// The indexed symbol whose name, or a use of it, sits under the cursor,
    /// with its reference locations.
    pub fn references(
        &self,
        path: &Path,
        line: u32,
        column: u32,
        token: &CancellationToken,
    ) -> QueryResult<Option<ReferenceSet>> {
        let key = self.keys.key(path);
        let (freshness, _) = self.freshness(&key)?;
        if token.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        let symbol = self.index.symbol_at(&key, line, column)?;
        Ok(symbol.map(|symbol| ReferenceSet { freshness, symbol }))
    }

    /// Definition location of the symbol under the cursor.
    pub fn definition(
        &self,
        path: &Path,
        line: u32,
        column: u32,
        token: &CancellationToken,
    ) -> QueryResult<Option<(Location, Freshness)>> {
        Ok(self
            .references(path, line, column, token)?
            .map(|set| (set.symbol.definition, set.freshness)))
    }
}

fn is_top_level(scope: ScopeContext) -> bool {
    matches!(
        scope,
        ScopeContext::Module | ScopeContext::Package | ScopeContext::Global
    )
}

/// Tier of a definition from the cursor's own file, `None` when it is not
/// visible from the cursor.
fn same_file_tier(record: &IndexRecord, scopes: &[&AstNode], line: u32, column: u32) -> Option<u8> {
    if record.scope.is_local() {
        let declared_before = record.definition.line < line
            || (record.definition.line == line && record.definition.column < column);
        let in_scope = scopes
            .iter()
            .any(|node| node.kind.is_function_scope() && node.extent.encloses(&record.extent));
        return (declared_before && in_scope).then_some(0);
    }
    if record.scope == ScopeContext::ClassMember {
        let in_type = scopes
            .iter()
            .any(|node| node.kind.is_type_scope() && node.extent.encloses(&record.extent));
        return in_type.then_some(1);
    }
    is_top_level(record.scope).then_some(2)
}
