//! Parser context for tracking scope during AST traversal
//!
//! Front ends push a scope for every class, function and block they enter.
//! The stack answers three questions while symbols are emitted: which
//! [`ScopeContext`] a new definition gets, which definition encloses it, and
//! what static type a receiver name is bound to.

use crate::symbol::ScopeContext;
use crate::types::{CompactString, SymbolId};
use std::collections::{HashMap, HashSet};

/// Scope types that parsers track during AST traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeType {
    /// Global scope (project-wide)
    Global,
    /// Module/file scope
    Module,
    /// Function, method or lambda body
    Function,
    /// Class, struct, interface or enum body
    Class,
    /// Block scope (if/for/while/etc)
    Block,
    /// Package scope
    Package,
    /// Namespace scope (C++)
    Namespace,
}

#[derive(Debug, Clone)]
struct Scope {
    kind: ScopeType,
    owner: Option<(SymbolId, CompactString)>,
    /// Variable name to the simple name of its declared type.
    bindings: HashMap<CompactString, CompactString>,
    declared: HashSet<CompactString>,
}

impl Scope {
    fn new(kind: ScopeType, owner: Option<(SymbolId, CompactString)>) -> Self {
        Self {
            kind,
            owner,
            bindings: HashMap::new(),
            declared: HashSet::new(),
        }
    }
}

/// Parser context for tracking current scope during parsing
#[derive(Debug, Clone)]
pub struct ParserContext {
    /// Stack of current scopes (innermost last)
    scope_stack: Vec<Scope>,
}

impl Default for ParserContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserContext {
    /// Create a new parser context starting at module scope
    pub fn new() -> Self {
        Self {
            scope_stack: vec![Scope::new(ScopeType::Module, None)],
        }
    }

    /// Enter a new scope, optionally owned by the definition that opened it.
    pub fn enter_scope(&mut self, scope_type: ScopeType, owner: Option<(SymbolId, &str)>) {
        self.scope_stack
            .push(Scope::new(scope_type, owner.map(|(id, name)| (id, name.into()))));
    }

    /// Exit the current scope. The module scope is never popped.
    pub fn exit_scope(&mut self) {
        if self.scope_stack.len() > 1 {
            self.scope_stack.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scope_stack.len()
    }

    fn innermost(&self) -> ScopeType {
        self.scope_stack
            .last()
            .map(|scope| scope.kind)
            .unwrap_or(ScopeType::Module)
    }

    /// Get the current scope context for symbol creation
    pub fn current_scope_context(&self) -> ScopeContext {
        match self.innermost() {
            ScopeType::Function | ScopeType::Block => ScopeContext::Local,
            ScopeType::Class => ScopeContext::ClassMember,
            ScopeType::Package | ScopeType::Namespace => ScopeContext::Package,
            ScopeType::Global => ScopeContext::Global,
            ScopeType::Module => ScopeContext::Module,
        }
    }

    /// The closest enclosing definition.
    pub fn parent_symbol(&self) -> Option<&SymbolId> {
        self.scope_stack
            .iter()
            .rev()
            .find_map(|scope| scope.owner.as_ref().map(|(id, _)| id))
    }

    /// Name of the closest enclosing definition.
    pub fn container(&self) -> Option<&str> {
        self.scope_stack
            .iter()
            .rev()
            .find_map(|scope| scope.owner.as_ref().map(|(_, name)| &**name))
    }

    /// Innermost enclosing class scope's owner.
    pub fn current_class_symbol(&self) -> Option<(&SymbolId, &str)> {
        self.scope_stack
            .iter()
            .rev()
            .filter(|scope| scope.kind == ScopeType::Class)
            .find_map(|scope| scope.owner.as_ref().map(|(id, name)| (id, &**name)))
    }

    pub fn current_class(&self) -> Option<&str> {
        self.current_class_symbol().map(|(_, name)| name)
    }

    /// Whether the innermost scope is a class body.
    pub fn is_in_class_body(&self) -> bool {
        self.innermost() == ScopeType::Class
    }

    pub fn is_in_function(&self) -> bool {
        self.scope_stack
            .iter()
            .any(|scope| scope.kind == ScopeType::Function)
    }

    /// Record that `name` has static type `ty` in the innermost scope.
    pub fn bind(&mut self, name: &str, ty: &str) {
        if let Some(scope) = self.scope_stack.last_mut() {
            scope.bindings.insert(name.into(), ty.into());
        }
    }

    /// Record a binding on the innermost class scope (fields assigned in a method).
    pub fn bind_in_class(&mut self, name: &str, ty: &str) {
        if let Some(scope) = self
            .scope_stack
            .iter_mut()
            .rev()
            .find(|scope| scope.kind == ScopeType::Class)
        {
            scope.bindings.insert(name.into(), ty.into());
        }
    }

    /// Static type bound to `name`, searching from the innermost scope outwards.
    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.scope_stack
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name).map(|ty| &**ty))
    }

    /// Mark `name` declared in the innermost scope. Returns `false` when it
    /// already was (languages where assignment doubles as declaration).
    pub fn declare(&mut self, name: &str) -> bool {
        match self.scope_stack.last_mut() {
            Some(scope) => scope.declared.insert(name.into()),
            None => false,
        }
    }

    /// Like [`ParserContext::declare`], on the innermost class scope.
    pub fn declare_in_class(&mut self, name: &str) -> bool {
        match self
            .scope_stack
            .iter_mut()
            .rev()
            .find(|scope| scope.kind == ScopeType::Class)
        {
            Some(scope) => scope.declared.insert(name.into()),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_contexts() {
        let mut ctx = ParserContext::new();
        assert_eq!(ctx.current_scope_context(), ScopeContext::Module);

        let class_id = SymbolId::derive("a.py", 1, 7, "Foo");
        ctx.enter_scope(ScopeType::Class, Some((class_id.clone(), "Foo")));
        assert_eq!(ctx.current_scope_context(), ScopeContext::ClassMember);
        assert!(ctx.is_in_class_body());

        let method_id = SymbolId::derive("a.py", 2, 9, "bar");
        ctx.enter_scope(ScopeType::Function, Some((method_id.clone(), "bar")));
        ctx.enter_scope(ScopeType::Block, None);
        assert_eq!(ctx.current_scope_context(), ScopeContext::Local);
        assert_eq!(ctx.parent_symbol(), Some(&method_id));
        assert_eq!(ctx.container(), Some("bar"));
        assert_eq!(ctx.current_class(), Some("Foo"));
        assert!(ctx.is_in_function());

        ctx.exit_scope();
        ctx.exit_scope();
        ctx.exit_scope();
        ctx.exit_scope();
        assert_eq!(ctx.depth(), 1);
        assert_eq!(ctx.current_class(), None);
    }

    #[test]
    fn test_type_bindings_shadow_outwards() {
        let mut ctx = ParserContext::new();
        ctx.bind("x", "Foo");
        ctx.enter_scope(ScopeType::Function, None);
        assert_eq!(ctx.type_of("x"), Some("Foo"));
        ctx.bind("x", "Bar");
        assert_eq!(ctx.type_of("x"), Some("Bar"));
        ctx.exit_scope();
        assert_eq!(ctx.type_of("x"), Some("Foo"));
        assert_eq!(ctx.type_of("y"), None);
    }

    #[test]
    fn test_declare_once_per_scope() {
        let mut ctx = ParserContext::new();
        assert!(ctx.declare("total"));
        assert!(!ctx.declare("total"));
        ctx.enter_scope(ScopeType::Function, None);
        assert!(ctx.declare("total"));
        assert!(!ctx.declare_in_class("field"));
    }
}
