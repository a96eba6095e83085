use super::ProjectSymbolTable;
use crate::symbol::{ReferenceTarget, ScopeContext, Symbol, SymbolReference};
use crate::types::{CompactString, SymbolId};
use crate::unit::TranslationUnit;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// What one resolver run changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionDelta {
    /// Files whose definitions or resolved references changed, in path
    /// order. These are the files whose index rows must be rewritten.
    pub files: BTreeSet<CompactString>,
    /// Files dropped from the project.
    pub removed: BTreeSet<CompactString>,
    /// References (re)resolved during the run.
    pub resolved: usize,
    /// References examined that still have no target.
    pub unresolved: usize,
}

impl ResolutionDelta {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.removed.is_empty()
    }
}

/// Project-wide resolver
///
/// Runs single-threaded after a batch; [`SymbolResolver::apply`] only
/// revisits the changed files and the files that use a name whose
/// definitions changed.
#[derive(Debug, Default)]
pub struct SymbolResolver {
    table: ProjectSymbolTable,
    /// Resolved references per file, parallel to each unit's references.
    resolved: HashMap<CompactString, Vec<SymbolReference>>,
    /// Files using each name.
    users: HashMap<CompactString, BTreeSet<CompactString>>,
}

impl SymbolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &ProjectSymbolTable {
        &self.table
    }

    pub fn symbol(&self, id: &SymbolId) -> Option<&Symbol> {
        self.table.symbol(id)
    }

    pub fn unit(&self, file: &str) -> Option<&Arc<TranslationUnit>> {
        self.table.unit(file)
    }

    /// References of `file` with their targets filled in as far as possible.
    pub fn references(&self, file: &str) -> &[SymbolReference] {
        self.resolved.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    /// Load units that are already indexed, for example at session start,
    /// and resolve them without reporting a delta.
    pub fn prime(&mut self, units: impl IntoIterator<Item = Arc<TranslationUnit>>) {
        for unit in units {
            self.install(unit);
        }
        let files: Vec<CompactString> = self.table.files().cloned().collect();
        for file in files {
            self.resolve_file(&file);
        }
        debug!(files = self.table.len(), symbols = self.table.symbol_count(), "resolver primed");
    }

    /// Apply one batch: `changed` units replace their files' previous
    /// units, `removed` files leave the project.
    pub fn apply(
        &mut self,
        changed: impl IntoIterator<Item = Arc<TranslationUnit>>,
        removed: &[CompactString],
    ) -> ResolutionDelta {
        let mut delta = ResolutionDelta::default();
        let mut affected_names: HashSet<CompactString> = HashSet::new();
        let mut dirty: BTreeSet<CompactString> = BTreeSet::new();

        for file in removed {
            if let Some(old) = self.uninstall(file) {
                affected_names.extend(old.symbols.iter().map(|s| s.name.clone()));
                delta.removed.insert(file.clone());
            }
        }

        for unit in changed {
            let file = unit.path.clone();
            let previous = self.table.unit(&file).cloned();
            if previous.as_deref() == Some(&*unit) {
                continue;
            }
            if let Some(old) = previous {
                affected_names.extend(old.symbols.iter().map(|s| s.name.clone()));
            }
            affected_names.extend(unit.symbols.iter().map(|s| s.name.clone()));
            self.install(unit);
            delta.removed.remove(&file);
            delta.files.insert(file.clone());
            dirty.insert(file);
        }

        // Files whose uses may now bind differently
        for name in &affected_names {
            if let Some(users) = self.users.get(name) {
                dirty.extend(users.iter().cloned());
            }
        }

        for file in dirty {
            if self.table.unit(&file).is_none() {
                continue;
            }
            let (changed, resolved, unresolved) = self.resolve_file(&file);
            delta.resolved += resolved;
            delta.unresolved += unresolved;
            if changed {
                delta.files.insert(file);
            }
        }

        debug!(
            changed = delta.files.len(),
            removed = delta.removed.len(),
            resolved = delta.resolved,
            unresolved = delta.unresolved,
            "resolution delta"
        );
        delta
    }

    /// Re-resolve every file from scratch.
    pub fn resolve_all(&mut self) -> ResolutionDelta {
        let mut delta = ResolutionDelta::default();
        let files: Vec<CompactString> = self.table.files().cloned().collect();
        for file in files {
            let (_, resolved, unresolved) = self.resolve_file(&file);
            delta.resolved += resolved;
            delta.unresolved += unresolved;
            delta.files.insert(file);
        }
        delta
    }

    fn install(&mut self, unit: Arc<TranslationUnit>) {
        let file = unit.path.clone();
        if let Some(old) = self.table.insert(Arc::clone(&unit)) {
            self.forget_users(&old);
        }
        for reference in &unit.references {
            self.users
                .entry(reference.name.clone())
                .or_default()
                .insert(file.clone());
        }
        self.resolved.insert(file, unit.references.clone());
    }

    fn uninstall(&mut self, file: &str) -> Option<Arc<TranslationUnit>> {
        let old = self.table.remove(file)?;
        self.forget_users(&old);
        self.resolved.remove(file);
        Some(old)
    }

    fn forget_users(&mut self, unit: &TranslationUnit) {
        for reference in &unit.references {
            if let Some(users) = self.users.get_mut(&reference.name) {
                users.remove(&unit.path);
                if users.is_empty() {
                    self.users.remove(&reference.name);
                }
            }
        }
    }

    /// Returns (targets changed, resolved count, unresolved count).
    fn resolve_file(&mut self, file: &str) -> (bool, usize, usize) {
        let Some(unit) = self.table.unit(file).cloned() else {
            return (false, 0, 0);
        };
        let mut resolved = 0;
        let mut unresolved = 0;
        let references: Vec<SymbolReference> = unit
            .references
            .iter()
            .map(|reference| {
                let mut reference = reference.clone();
                reference.target = match self.resolve_reference(&unit, &reference) {
                    Some(id) => {
                        resolved += 1;
                        ReferenceTarget::Resolved(id)
                    }
                    None => {
                        unresolved += 1;
                        ReferenceTarget::Unresolved
                    }
                };
                reference
            })
            .collect();

        let changed = self.resolved.get(file) != Some(&references);
        self.resolved.insert(file.into(), references);
        (changed, resolved, unresolved)
    }

    /// Pick the definition `reference` (a use inside `unit`) binds to.
    pub fn resolve_reference(
        &self,
        unit: &TranslationUnit,
        reference: &SymbolReference,
    ) -> Option<SymbolId> {
        let file = &*unit.path;
        let mut candidates: Vec<&Symbol> = self
            .table
            .named(&reference.name)
            .filter(|symbol| reference.kind.accepts(symbol.kind))
            .filter(|symbol| self.visible_from(symbol, file, reference))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        // A known receiver type only binds to its own members.
        if let Some(receiver) = reference.receiver.as_deref() {
            candidates.retain(|symbol| symbol.container.as_deref() == Some(receiver));
            if candidates.is_empty() {
                return None;
            }
        }

        let same_file = candidates
            .iter()
            .copied()
            .filter(|symbol| &*symbol.definition.file == file)
            .min_by_key(|symbol| {
                (
                    scope_rank(symbol.scope),
                    symbol.definition.line,
                    symbol.definition.column,
                )
            });
        if let Some(symbol) = same_file {
            return Some(symbol.id.clone());
        }

        let imported = candidates
            .iter()
            .copied()
            .filter(|symbol| unit.imports_file(&symbol.definition.file))
            .min_by(|a, b| definition_order(a, b));
        if let Some(symbol) = imported {
            return Some(symbol.id.clone());
        }

        candidates
            .into_iter()
            .min_by(|a, b| definition_order(a, b))
            .map(|symbol| symbol.id.clone())
    }

    /// Locals and parameters are only visible inside the function that
    /// declares them.
    fn visible_from(&self, symbol: &Symbol, file: &str, reference: &SymbolReference) -> bool {
        if !symbol.scope.is_local() {
            return true;
        }
        if &*symbol.definition.file != file {
            return false;
        }
        match symbol.parent.as_ref().and_then(|id| self.table.symbol(id)) {
            Some(owner) => owner
                .extent
                .contains_point(reference.location.line, reference.location.column),
            None => true,
        }
    }
}

/// Innermost scopes first.
fn scope_rank(scope: ScopeContext) -> u8 {
    match scope {
        ScopeContext::Local | ScopeContext::Parameter => 0,
        ScopeContext::ClassMember => 1,
        _ => 2,
    }
}

fn definition_order(a: &Symbol, b: &Symbol) -> std::cmp::Ordering {
    (&a.definition.file, a.definition.line, a.definition.column, &a.id).cmp(&(
        &b.definition.file,
        b.definition.line,
        b.definition.column,
        &b.id,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstNode, NodeKind};
    use crate::parsing::LanguageId;
    use crate::symbol::ReferenceKind;
    use crate::types::{Extent, Location, Position, SymbolKind};
    use crate::unit::Import;

    fn extent(line: u32, end_line: u32) -> Extent {
        Extent::new(Position::new(line, 1, 0), Position::new(end_line, 80, 0))
    }

    fn symbol(file: &str, line: u32, name: &str, kind: SymbolKind) -> Symbol {
        Symbol {
            id: SymbolId::derive(file, line, 5, name),
            name: name.into(),
            kind,
            definition: Location::new(file, line, 5),
            extent: extent(line, line),
            scope: ScopeContext::Module,
            parent: None,
            container: None,
            type_hint: None,
        }
    }

    fn member(file: &str, line: u32, name: &str, class: &str) -> Symbol {
        Symbol {
            scope: ScopeContext::ClassMember,
            container: Some(class.into()),
            ..symbol(file, line, name, SymbolKind::Method)
        }
    }

    fn call(file: &str, line: u32, name: &str, receiver: Option<&str>) -> SymbolReference {
        SymbolReference::unresolved(name, ReferenceKind::Call, Location::new(file, line, 9), receiver)
    }

    fn unit(path: &str, symbols: Vec<Symbol>, references: Vec<SymbolReference>) -> Arc<TranslationUnit> {
        Arc::new(TranslationUnit {
            path: path.into(),
            language: LanguageId::new("java"),
            content_hash: format!("{path}-{}", symbols.len()),
            dependencies: Vec::new(),
            imports: Vec::new(),
            root: AstNode::new(NodeKind::TranslationUnit, "program", extent(1, 100)),
            symbols,
            references,
            diagnostics: Vec::new(),
        })
    }

    fn target(resolver: &SymbolResolver, file: &str, index: usize) -> Option<SymbolId> {
        resolver.references(file)[index].target.symbol_id().cloned()
    }

    #[test]
    fn test_cross_file_member_call() {
        let a = unit(
            "A.java",
            vec![symbol("A.java", 1, "Foo", SymbolKind::Class), member("A.java", 1, "bar", "Foo")],
            vec![],
        );
        let b = unit("B.java", vec![], vec![call("B.java", 3, "bar", Some("Foo"))]);

        let mut resolver = SymbolResolver::new();
        let delta = resolver.apply([a.clone(), b], &[]);
        assert_eq!(delta.resolved, 1);
        assert_eq!(target(&resolver, "B.java", 0), Some(a.symbols[1].id.clone()));
    }

    #[test]
    fn test_receiver_only_binds_to_its_members() {
        let a = unit("A.java", vec![member("A.java", 2, "add", "A")], vec![]);
        let set = unit("Set.java", vec![member("Set.java", 3, "add", "Set")], vec![]);
        let b = unit(
            "B.java",
            vec![member("B.java", 1, "add", "B")],
            vec![
                call("B.java", 4, "add", Some("List")),
                call("B.java", 5, "add", Some("Set")),
            ],
        );

        let mut resolver = SymbolResolver::new();
        resolver.apply([a, set.clone(), b], &[]);
        // No `List` in the table: neither A.add nor the same-file B.add
        assert_eq!(target(&resolver, "B.java", 0), None);
        assert_eq!(target(&resolver, "B.java", 1), Some(set.symbols[0].id.clone()));
    }

    #[test]
    fn test_unresolved_until_definition_arrives() {
        let mut resolver = SymbolResolver::new();
        resolver.apply([unit("B.java", vec![], vec![call("B.java", 3, "bar", None)])], &[]);
        assert_eq!(target(&resolver, "B.java", 0), None);

        let a = unit("A.java", vec![symbol("A.java", 2, "bar", SymbolKind::Function)], vec![]);
        let delta = resolver.apply([a.clone()], &[]);
        // B was not resubmitted but its use of `bar` now binds
        assert!(delta.files.contains("B.java"));
        assert_eq!(target(&resolver, "B.java", 0), Some(a.symbols[0].id.clone()));

        let delta = resolver.apply(std::iter::empty(), &["A.java".into()]);
        assert!(delta.removed.contains("A.java"));
        assert!(delta.files.contains("B.java"));
        assert_eq!(target(&resolver, "B.java", 0), None);
    }

    #[test]
    fn test_tie_break_same_file_then_imported_then_path() {
        let z = unit("z/Util.java", vec![symbol("z/Util.java", 1, "run", SymbolKind::Function)], vec![]);
        let m = unit("m/Util.java", vec![symbol("m/Util.java", 1, "run", SymbolKind::Function)], vec![]);
        let plain = unit("Main.java", vec![], vec![call("Main.java", 4, "run", None)]);

        let mut importing = (*unit("App.java", vec![], vec![call("App.java", 4, "run", None)])).clone();
        importing.imports.push(Import {
            path: "z.Util".into(),
            alias: None,
            is_glob: false,
            location: Location::new("App.java", 1, 1),
        });
        let local = unit(
            "x/Own.java",
            vec![symbol("x/Own.java", 9, "run", SymbolKind::Function)],
            vec![call("x/Own.java", 4, "run", None)],
        );

        let mut resolver = SymbolResolver::new();
        resolver.apply([z.clone(), m.clone(), plain, Arc::new(importing), local.clone()], &[]);

        assert_eq!(target(&resolver, "Main.java", 0), Some(m.symbols[0].id.clone()));
        assert_eq!(target(&resolver, "App.java", 0), Some(z.symbols[0].id.clone()));
        assert_eq!(target(&resolver, "x/Own.java", 0), Some(local.symbols[0].id.clone()));
    }

    #[test]
    fn test_locals_stay_in_their_function() {
        let mut f = symbol("a.py", 1, "f", SymbolKind::Function);
        f.extent = extent(1, 3);
        let local = Symbol {
            scope: ScopeContext::Local,
            parent: Some(f.id.clone()),
            ..symbol("a.py", 2, "x", SymbolKind::Variable)
        };
        let global = symbol("b.py", 1, "x", SymbolKind::Variable);
        let read = |line| {
            SymbolReference::unresolved("x", ReferenceKind::Read, Location::new("a.py", line, 9), None)
        };
        let a = unit("a.py", vec![f, local.clone()], vec![read(3), read(7)]);
        let b = unit("b.py", vec![global.clone()], vec![]);

        let mut resolver = SymbolResolver::new();
        resolver.apply([a, b], &[]);
        assert_eq!(target(&resolver, "a.py", 0), Some(local.id.clone()));
        assert_eq!(target(&resolver, "a.py", 1), Some(global.id.clone()));
    }

    #[test]
    fn test_kind_filter_and_unchanged_resubmit() {
        let a = unit(
            "A.java",
            vec![symbol("A.java", 1, "Foo", SymbolKind::Field)],
            vec![call("A.java", 5, "Foo", None)],
        );
        let mut resolver = SymbolResolver::new();
        resolver.apply([a.clone()], &[]);
        assert_eq!(target(&resolver, "A.java", 0), None);

        let delta = resolver.apply([a], &[]);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_prime_matches_apply() {
        let a = unit("A.java", vec![symbol("A.java", 1, "bar", SymbolKind::Function)], vec![]);
        let b = unit("B.java", vec![], vec![call("B.java", 3, "bar", None)]);

        let mut applied = SymbolResolver::new();
        applied.apply([a.clone(), b.clone()], &[]);
        let mut primed = SymbolResolver::new();
        primed.prime([b, a]);
        assert_eq!(applied.references("B.java"), primed.references("B.java"));
        assert_eq!(primed.resolve_all().files.len(), 2);
    }
}
