//! Accumulates symbols, references and imports while a front end walks
//! its native tree, then assembles the [`TranslationUnit`].

use super::{LanguageId, ParserContext};
use crate::ast::AstNode;
use crate::symbol::{ScopeContext, Symbol, SymbolReference, ReferenceKind};
use crate::types::{Diagnostic, Extent, Location, Position, SymbolId, SymbolKind};
use crate::unit::{Dependency, Import, TranslationUnit};

pub struct UnitCollector<'a> {
    path: &'a str,
    pub context: ParserContext,
    symbols: Vec<Symbol>,
    references: Vec<SymbolReference>,
    imports: Vec<Import>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> UnitCollector<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            context: ParserContext::new(),
            symbols: Vec::new(),
            references: Vec::new(),
            imports: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Emit a definition in the current scope.
    pub fn define(
        &mut self,
        name: &str,
        kind: SymbolKind,
        at: Position,
        extent: Extent,
        type_hint: Option<&str>,
    ) -> SymbolId {
        let scope = self.context.current_scope_context();
        self.define_in(name, kind, scope, at, extent, type_hint)
    }

    /// Emit a definition with an explicit scope (parameters, for instance).
    pub fn define_in(
        &mut self,
        name: &str,
        kind: SymbolKind,
        scope: ScopeContext,
        at: Position,
        extent: Extent,
        type_hint: Option<&str>,
    ) -> SymbolId {
        let parent = self.context.parent_symbol().cloned();
        let container = self.context.container().map(Into::into);
        self.push_symbol(name, kind, scope, at, extent, type_hint, parent, container)
    }

    /// Emit a member of the innermost enclosing class from anywhere inside
    /// it, e.g. `self.count = 0` in a Python method. `None` outside a class.
    pub fn define_member(
        &mut self,
        name: &str,
        kind: SymbolKind,
        at: Position,
        extent: Extent,
        type_hint: Option<&str>,
    ) -> Option<SymbolId> {
        let (class_id, class_name) = self.context.current_class_symbol()?;
        let parent = Some(class_id.clone());
        let container = Some(class_name.into());
        Some(self.push_symbol(
            name,
            kind,
            ScopeContext::ClassMember,
            at,
            extent,
            type_hint,
            parent,
            container,
        ))
    }

    /// Emit a member whose owner is not the lexically enclosing scope, such
    /// as an out-of-line C++ method definition `void Foo::bar() {}`.
    #[allow(clippy::too_many_arguments)]
    pub fn define_owned(
        &mut self,
        name: &str,
        kind: SymbolKind,
        at: Position,
        extent: Extent,
        type_hint: Option<&str>,
        parent: Option<SymbolId>,
        container: &str,
    ) -> SymbolId {
        self.push_symbol(
            name,
            kind,
            ScopeContext::ClassMember,
            at,
            extent,
            type_hint,
            parent,
            Some(container.into()),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn push_symbol(
        &mut self,
        name: &str,
        kind: SymbolKind,
        scope: ScopeContext,
        at: Position,
        extent: Extent,
        type_hint: Option<&str>,
        parent: Option<SymbolId>,
        container: Option<Box<str>>,
    ) -> SymbolId {
        let id = SymbolId::derive(self.path, at.line, at.column, name);
        self.symbols.push(Symbol {
            id: id.clone(),
            name: name.into(),
            kind,
            definition: Location::at(self.path, at),
            extent,
            scope,
            parent,
            container,
            type_hint: type_hint.map(Into::into),
        });
        id
    }

    pub fn reference(
        &mut self,
        name: &str,
        kind: ReferenceKind,
        at: Position,
        receiver: Option<&str>,
    ) {
        if name.is_empty() {
            return;
        }
        self.references.push(SymbolReference::unresolved(
            name,
            kind,
            Location::at(self.path, at),
            receiver,
        ));
    }

    pub fn import(&mut self, path: &str, alias: Option<&str>, is_glob: bool, at: Position) {
        if path.is_empty() {
            return;
        }
        self.imports.push(Import {
            path: path.into(),
            alias: alias.map(Into::into),
            is_glob,
            location: Location::at(self.path, at),
        });
    }

    pub fn diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn finish(
        self,
        language: LanguageId,
        content_hash: &str,
        root: AstNode,
        dependencies: Vec<Dependency>,
    ) -> TranslationUnit {
        TranslationUnit {
            path: self.path.into(),
            language,
            content_hash: content_hash.to_string(),
            dependencies,
            imports: self.imports,
            root,
            symbols: self.symbols,
            references: self.references,
            diagnostics: self.diagnostics,
        }
    }
}
