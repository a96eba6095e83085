//! Java language parser implementation
//!
//! Built on tree-sitter-java. Emits class, interface, enum, method, field,
//! local and parameter definitions plus call, member, read and type-use
//! references. Receiver types come from declared variable and field types,
//! `this`, `new T()` expressions and capitalised names used as static
//! receivers.

use super::JavaLanguage;
use crate::ast::{AstNode, NodeKind};
use crate::error::{ParseError, ParseResult};
use crate::parsing::parser::{
    MAX_AST_DEPTH, ast_node, check_syntax, node_extent, node_text, simple_type_name,
    start_position, text_extent,
};
use crate::parsing::{LanguageId, LanguageParser, ParseInput, ScopeType, UnitCollector};
use crate::symbol::{ReferenceKind, ScopeContext};
use crate::types::{CompactString, Diagnostic, SymbolKind};
use crate::unit::{Dependency, Import, TranslationUnit};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

pub struct JavaParser {
    parser: Parser,
}

impl std::fmt::Debug for JavaParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JavaParser")
            .field("language", &"Java")
            .finish()
    }
}

impl JavaParser {
    pub fn new() -> ParseResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ParseError::ParserUnavailable {
                language: JavaLanguage::ID,
                path: String::new(),
                reason: format!("tree-sitter error: {e}"),
            })?;
        Ok(Self { parser })
    }
}

impl LanguageParser for JavaParser {
    fn language(&self) -> LanguageId {
        JavaLanguage::ID
    }

    fn parse(&mut self, input: &ParseInput<'_>) -> ParseResult<TranslationUnit> {
        let tree = self
            .parser
            .parse(input.text, None)
            .ok_or_else(|| ParseError::ParseExecution {
                language: JavaLanguage::ID,
                path: input.path.to_string(),
                reason: "tree-sitter returned no tree".to_string(),
                diagnostics: Vec::new(),
                partial: None,
            })?;
        let root_node = tree.root_node();

        let mut walker = JavaWalker::new(input.path, input.text);
        let mut root = AstNode::new(
            NodeKind::TranslationUnit,
            root_node.kind(),
            text_extent(input.text),
        );
        walker.visit_children(root_node, 0, &mut root);
        root.normalize();

        let dependencies = resolve_imports(
            input,
            walker.collector.imports(),
            walker.package.as_deref(),
        );
        let unit = walker
            .collector
            .finish(JavaLanguage::ID, input.content_hash, root, dependencies);
        check_syntax(unit, root_node)
    }
}

struct JavaWalker<'a> {
    code: &'a str,
    collector: UnitCollector<'a>,
    package: Option<String>,
    /// Identifier nodes already accounted for as definitions or references.
    consumed: HashSet<usize>,
    truncated: bool,
}

impl<'a> JavaWalker<'a> {
    fn new(path: &'a str, code: &'a str) -> Self {
        Self {
            code,
            collector: UnitCollector::new(path),
            package: None,
            consumed: HashSet::new(),
            truncated: false,
        }
    }

    fn text(&self, node: Node) -> &'a str {
        node_text(&node, self.code)
    }

    fn visit_children(&mut self, node: Node, depth: usize, ast: &mut AstNode) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some(child_ast) = self.visit(child, depth + 1) {
                ast.children.push(child_ast);
            }
        }
    }

    fn visit(&mut self, node: Node, depth: usize) -> Option<AstNode> {
        if !node.is_named() || node.is_extra() {
            return None;
        }
        if depth > MAX_AST_DEPTH {
            if !self.truncated {
                self.truncated = true;
                let at = start_position(&node);
                self.collector.diagnostic(
                    Diagnostic::warning(self.collector.path(), "nesting too deep, subtree skipped")
                        .at(at.line, at.column),
                );
            }
            return Some(ast_node(java_node_kind(node.kind()), &node));
        }

        let ast = match node.kind() {
            "package_declaration" => self.visit_package(node),
            "import_declaration" => self.visit_import(node),
            "class_declaration"
            | "record_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "annotation_type_declaration" => self.visit_type_declaration(node, depth),
            "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                self.visit_method(node, depth)
            }
            "field_declaration" | "constant_declaration" | "local_variable_declaration" => {
                self.visit_variable_declaration(node, depth)
            }
            "variable_declarator" => self.visit_declarator(node, depth),
            "formal_parameter" | "catch_formal_parameter" | "spread_parameter" => {
                self.visit_parameter(node, depth)
            }
            "enum_constant" => self.visit_enum_constant(node, depth),
            "block" | "constructor_body" | "switch_block" | "for_statement" | "catch_clause"
            | "enhanced_for_statement" | "try_with_resources_statement" => {
                self.visit_block(node, depth)
            }
            "resource" => {
                self.define_local(node);
                self.generic(node, depth)
            }
            "lambda_expression" => self.visit_lambda(node, depth),
            "method_invocation" => self.visit_invocation(node, depth),
            "object_creation_expression" => self.visit_creation(node, depth),
            "field_access" => self.visit_field_access(node, depth),
            "identifier" => self.visit_identifier(node),
            "type_identifier" => self.visit_type_identifier(node),
            _ => self.generic(node, depth),
        };
        Some(ast)
    }

    fn generic(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(java_node_kind(node.kind()), &node);
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_package(&mut self, node: Node) -> AstNode {
        let mut ast = ast_node(NodeKind::Package, &node);
        if let Some(name_node) = qualified_name_child(node) {
            let name = self.text(name_node);
            self.package = Some(name.to_string());
            ast = ast.with_name(name, start_position(&name_node));
        }
        ast
    }

    fn visit_import(&mut self, node: Node) -> AstNode {
        let ast = ast_node(NodeKind::Import, &node);
        let Some(name_node) = qualified_name_child(node) else {
            return ast;
        };
        let mut cursor = node.walk();
        let mut is_static = false;
        let mut is_glob = false;
        for child in node.children(&mut cursor) {
            match child.kind() {
                "static" => is_static = true,
                "asterisk" => is_glob = true,
                _ => {}
            }
        }

        let written = self.text(name_node);
        // A static import names a member; the dependency is its class.
        let path = if is_static && !is_glob {
            written.rsplit_once('.').map_or(written, |(class, _)| class)
        } else {
            written
        };
        let is_glob = is_glob && !is_static;
        let at = start_position(&name_node);
        self.collector.import(path, None, is_glob, at);
        ast.with_name(path, at)
    }

    fn visit_type_declaration(&mut self, node: Node, depth: usize) -> AstNode {
        let (kind, node_kind) = match node.kind() {
            "interface_declaration" | "annotation_type_declaration" => {
                (SymbolKind::Interface, NodeKind::Interface)
            }
            "enum_declaration" => (SymbolKind::Enum, NodeKind::Enum),
            _ => (SymbolKind::Class, NodeKind::Class),
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.generic(node, depth);
        };
        let name = self.text(name_node);
        let at = start_position(&name_node);
        self.consumed.insert(name_node.id());

        let id = self
            .collector
            .define(name, kind, at, node_extent(&node), None);
        self.collector
            .context
            .enter_scope(ScopeType::Class, Some((id, name)));

        let mut ast = AstNode::new(node_kind, node.kind(), node_extent(&node)).with_name(name, at);
        self.visit_children(node, depth, &mut ast);

        self.collector.context.exit_scope();
        ast
    }

    fn visit_method(&mut self, node: Node, depth: usize) -> AstNode {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.generic(node, depth);
        };
        let name = self.text(name_node);
        let at = start_position(&name_node);
        self.consumed.insert(name_node.id());
        let return_type = node.child_by_field_name("type").map(|t| self.text(t));
        let node_kind = if node.kind() == "method_declaration" {
            NodeKind::Method
        } else {
            NodeKind::Constructor
        };

        let id = self.collector.define(
            name,
            SymbolKind::Method,
            at,
            node_extent(&node),
            return_type,
        );
        self.collector
            .context
            .enter_scope(ScopeType::Function, Some((id, name)));

        let mut ast = AstNode::new(node_kind, node.kind(), node_extent(&node))
            .with_name(name, at)
            .with_type_hint(return_type);
        self.visit_children(node, depth, &mut ast);

        self.collector.context.exit_scope();
        ast
    }

    fn visit_variable_declaration(&mut self, node: Node, depth: usize) -> AstNode {
        let declared_type = node.child_by_field_name("type").map(|t| self.text(t));
        let (base_kind, node_kind) = match node.kind() {
            "local_variable_declaration" => (SymbolKind::Variable, NodeKind::Statement),
            "constant_declaration" => (SymbolKind::Constant, NodeKind::Field),
            _ if self.has_modifiers(node, &["static", "final"]) => {
                (SymbolKind::Constant, NodeKind::Field)
            }
            _ => (SymbolKind::Field, NodeKind::Field),
        };

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();

        let mut ast = ast_node(node_kind, &node).with_type_hint(declared_type);
        for declarator in &declarators {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let name = self.text(name_node);
            let at = start_position(&name_node);
            self.consumed.insert(name_node.id());
            if ast.name.is_none() {
                ast = ast.with_name(name, at);
            }

            self.collector
                .define(name, base_kind, at, node_extent(declarator), declared_type);

            let bound = match declared_type.and_then(simple_type_name) {
                Some("var") => declarator
                    .child_by_field_name("value")
                    .and_then(|value| self.created_type(value)),
                other => other,
            };
            if let Some(ty) = bound {
                self.collector.context.bind(name, ty);
            }
        }

        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_declarator(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(NodeKind::Variable, &node);
        if let Some(name_node) = node.child_by_field_name("name") {
            let name = self.text(name_node);
            ast = ast
                .with_name(name, start_position(&name_node))
                .with_type_hint(self.collector.context.type_of(name));
        }
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_parameter(&mut self, node: Node, depth: usize) -> AstNode {
        let declared_type = node.child_by_field_name("type").map(|t| self.text(t));
        let name_node = node.child_by_field_name("name").or_else(|| {
            let mut cursor = node.walk();
            let declarator = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "variable_declarator");
            declarator.and_then(|d| d.child_by_field_name("name"))
        });

        let mut ast = ast_node(NodeKind::Parameter, &node).with_type_hint(declared_type);
        if let Some(name_node) = name_node {
            let name = self.text(name_node);
            let at = start_position(&name_node);
            self.consumed.insert(name_node.id());
            self.collector.define_in(
                name,
                SymbolKind::Parameter,
                ScopeContext::Parameter,
                at,
                node_extent(&node),
                declared_type,
            );
            if let Some(ty) = declared_type.and_then(simple_type_name) {
                self.collector.context.bind(name, ty);
            }
            ast = ast.with_name(name, at);
        }
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_enum_constant(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(NodeKind::EnumConstant, &node);
        if let Some(name_node) = node.child_by_field_name("name") {
            let name = self.text(name_node);
            let at = start_position(&name_node);
            self.consumed.insert(name_node.id());
            let enum_type = self.collector.context.current_class();
            let enum_type = enum_type.map(str::to_string);
            self.collector.define(
                name,
                SymbolKind::Constant,
                at,
                node_extent(&node),
                enum_type.as_deref(),
            );
            ast = ast.with_name(name, at);
        }
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_block(&mut self, node: Node, depth: usize) -> AstNode {
        self.collector.context.enter_scope(ScopeType::Block, None);
        if node.kind() == "enhanced_for_statement" {
            self.define_local(node);
        }
        let ast = self.generic(node, depth);
        self.collector.context.exit_scope();
        ast
    }

    /// Locals declared through `name`/`type` fields directly on the node
    /// (enhanced-for variables, try-with-resources).
    fn define_local(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let declared_type = node.child_by_field_name("type").map(|t| self.text(t));
        let name = self.text(name_node);
        self.consumed.insert(name_node.id());
        self.collector.define(
            name,
            SymbolKind::Variable,
            start_position(&name_node),
            node_extent(&node),
            declared_type,
        );
        if let Some(ty) = declared_type.and_then(simple_type_name) {
            self.collector.context.bind(name, ty);
        }
    }

    fn visit_lambda(&mut self, node: Node, depth: usize) -> AstNode {
        self.collector.context.enter_scope(ScopeType::Function, None);
        if let Some(params) = node.child_by_field_name("parameters") {
            let names: Vec<Node> = match params.kind() {
                "identifier" => vec![params],
                "inferred_parameters" => {
                    let mut cursor = params.walk();
                    params
                        .named_children(&mut cursor)
                        .filter(|c| c.kind() == "identifier")
                        .collect()
                }
                _ => Vec::new(),
            };
            for name_node in names {
                let name = self.text(name_node);
                self.consumed.insert(name_node.id());
                self.collector.define_in(
                    name,
                    SymbolKind::Parameter,
                    ScopeContext::Parameter,
                    start_position(&name_node),
                    node_extent(&name_node),
                    None,
                );
            }
        }
        let ast = self.generic(node, depth);
        self.collector.context.exit_scope();
        ast
    }

    fn visit_invocation(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(NodeKind::Call, &node);
        if let Some(name_node) = node.child_by_field_name("name") {
            let name = self.text(name_node);
            let at = start_position(&name_node);
            let receiver = node
                .child_by_field_name("object")
                .and_then(|object| self.receiver_type(object));
            self.consumed.insert(name_node.id());
            self.collector
                .reference(name, ReferenceKind::Call, at, receiver.as_deref());
            ast = ast.with_name(name, at);
        }
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_creation(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(NodeKind::Call, &node);
        if let Some(type_node) = node.child_by_field_name("type").and_then(type_name_node) {
            let name = self.text(type_node);
            let at = start_position(&type_node);
            self.consumed.insert(type_node.id());
            self.collector.reference(name, ReferenceKind::Call, at, None);
            ast = ast.with_name(name, at).with_type_hint(Some(name));
        }
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_field_access(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(NodeKind::MemberAccess, &node);
        if let Some(field) = node
            .child_by_field_name("field")
            .filter(|f| f.kind() == "identifier")
        {
            let name = self.text(field);
            let at = start_position(&field);
            let receiver = node
                .child_by_field_name("object")
                .and_then(|object| self.receiver_type(object));
            self.consumed.insert(field.id());
            self.collector
                .reference(name, ReferenceKind::MemberAccess, at, receiver.as_deref());
            ast = ast.with_name(name, at);
        }
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_identifier(&mut self, node: Node) -> AstNode {
        let name = self.text(node);
        let at = start_position(&node);
        if !self.consumed.contains(&node.id()) {
            self.collector.reference(name, ReferenceKind::Read, at, None);
        }
        ast_node(NodeKind::Identifier, &node)
            .with_name(name, at)
            .with_type_hint(self.collector.context.type_of(name))
    }

    fn visit_type_identifier(&mut self, node: Node) -> AstNode {
        let name = self.text(node);
        let at = start_position(&node);
        if !self.consumed.contains(&node.id()) && name != "var" {
            self.collector.reference(name, ReferenceKind::TypeUse, at, None);
        }
        ast_node(NodeKind::TypeRef, &node).with_name(name, at)
    }

    /// Static type of a receiver expression, when it can be read off the source.
    fn receiver_type(&self, object: Node) -> Option<String> {
        match object.kind() {
            "this" => self.collector.context.current_class().map(str::to_string),
            "identifier" => {
                let name = self.text(object);
                self.collector
                    .context
                    .type_of(name)
                    .map(str::to_string)
                    .or_else(|| starts_uppercase(name).then(|| name.to_string()))
            }
            "object_creation_expression" => self.created_type(object).map(str::to_string),
            "field_access" => {
                let target = object.child_by_field_name("object")?;
                let field = object.child_by_field_name("field")?;
                if target.kind() == "this" {
                    self.collector
                        .context
                        .type_of(self.text(field))
                        .map(str::to_string)
                } else {
                    None
                }
            }
            "cast_expression" => object
                .child_by_field_name("type")
                .and_then(|t| simple_type_name(self.text(t)))
                .map(str::to_string),
            "parenthesized_expression" => {
                let mut cursor = object.walk();
                let inner = object.named_children(&mut cursor).next();
                inner.and_then(|inner| self.receiver_type(inner))
            }
            _ => None,
        }
    }

    fn created_type(&self, node: Node) -> Option<&'a str> {
        if node.kind() != "object_creation_expression" {
            return None;
        }
        node.child_by_field_name("type")
            .and_then(|t| simple_type_name(self.text(t)))
    }

    fn has_modifiers(&self, node: Node, wanted: &[&str]) -> bool {
        let mut cursor = node.walk();
        let modifiers = node
            .children(&mut cursor)
            .find(|c| c.kind() == "modifiers");
        modifiers.is_some_and(|m| {
            let words: Vec<&str> = self.text(m).split_whitespace().collect();
            wanted.iter().all(|w| words.contains(w))
        })
    }
}

fn qualified_name_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"));
    found
}

/// The `type_identifier` naming the class in a (possibly generic or
/// qualified) type expression.
fn type_name_node(node: Node) -> Option<Node> {
    match node.kind() {
        "type_identifier" => Some(node),
        "generic_type" | "scoped_type_identifier" => {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            let candidate = if node.kind() == "generic_type" {
                children.first().copied()
            } else {
                children.last().copied()
            };
            candidate.and_then(type_name_node)
        }
        _ => None,
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn java_node_kind(kind: &str) -> NodeKind {
    match kind {
        "program" => NodeKind::TranslationUnit,
        "block" | "class_body" | "interface_body" | "enum_body" | "constructor_body"
        | "annotation_type_body" | "switch_block" => NodeKind::Block,
        "method_invocation" | "object_creation_expression" | "explicit_constructor_invocation" => {
            NodeKind::Call
        }
        "field_access" => NodeKind::MemberAccess,
        "identifier" => NodeKind::Identifier,
        "type_identifier" | "scoped_type_identifier" | "generic_type" | "array_type"
        | "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => {
            NodeKind::TypeRef
        }
        "formal_parameter" | "spread_parameter" | "catch_formal_parameter" => NodeKind::Parameter,
        "variable_declarator" => NodeKind::Variable,
        "enum_constant" => NodeKind::EnumConstant,
        "true" | "false" | "null_literal" => NodeKind::Literal,
        k if k.ends_with("_literal") => NodeKind::Literal,
        k if k.ends_with("_statement") || k == "local_variable_declaration" => NodeKind::Statement,
        k if k.ends_with("_expression") => NodeKind::Expression,
        _ => NodeKind::Other,
    }
}

/// Files named by single-type and static imports, looked up under the
/// source root implied by the package declaration, then the classpath and
/// include paths.
fn resolve_imports(
    input: &ParseInput<'_>,
    imports: &[Import],
    package: Option<&str>,
) -> Vec<Dependency> {
    let mut roots: Vec<PathBuf> = Vec::new();
    if let Some(root) = source_root(input.source_path, package) {
        roots.push(root);
    }
    roots.extend(input.context.classpath.iter().cloned());
    roots.extend(input.context.include_paths.iter().cloned());

    let mut found: BTreeMap<CompactString, Dependency> = BTreeMap::new();
    for import in imports.iter().filter(|import| !import.is_glob) {
        let segments: Vec<&str> = import.path.split('.').collect();
        'prefixes: for len in (1..=segments.len()).rev() {
            let relative = format!("{}.java", segments[..len].join("/"));
            for root in &roots {
                let candidate = root.join(&relative);
                if candidate.is_file() {
                    if let Some(dep) = Dependency::capture(input.keys, &candidate) {
                        found.insert(dep.path.clone(), dep);
                    }
                    break 'prefixes;
                }
            }
        }
    }
    found.into_values().collect()
}

fn source_root(source_path: &Path, package: Option<&str>) -> Option<PathBuf> {
    let dir = source_path.parent()?.to_path_buf();
    let Some(package) = package else {
        return Some(dir);
    };
    let mut root = dir.clone();
    for segment in package.rsplit('.') {
        if root.file_name().and_then(|n| n.to_str()) != Some(segment) {
            return Some(dir);
        }
        root.pop();
    }
    Some(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{CompileContext, PathKeys};

    fn parse(code: &str) -> ParseResult<TranslationUnit> {
        let context = CompileContext::default();
        let keys = PathKeys::default();
        let input = ParseInput {
            path: "src/Foo.java",
            source_path: Path::new("src/Foo.java"),
            text: code,
            content_hash: "hash",
            context: &context,
            keys: &keys,
        };
        JavaParser::new().unwrap().parse(&input)
    }

    #[test]
    fn test_class_members_and_scopes() {
        let unit = parse(
            "package com.acme;\n\
             public class Foo {\n\
             \x20   private int count;\n\
             \x20   public void bar(int step) {\n\
             \x20       int total = count + step;\n\
             \x20   }\n\
             }\n",
        )
        .unwrap();

        let find = |name: &str| unit.symbols.iter().find(|s| &*s.name == name).unwrap();
        let class = find("Foo");
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.id.as_str(), "src/Foo.java:2:14:Foo");

        let count = find("count");
        assert_eq!(count.kind, SymbolKind::Field);
        assert_eq!(count.scope, ScopeContext::ClassMember);
        assert_eq!(count.container.as_deref(), Some("Foo"));

        let bar = find("bar");
        assert_eq!(bar.kind, SymbolKind::Method);
        assert_eq!(bar.parent.as_ref(), Some(&class.id));

        assert_eq!(find("step").scope, ScopeContext::Parameter);
        let total = find("total");
        assert_eq!(total.scope, ScopeContext::Local);
        assert_eq!(total.parent.as_ref(), Some(&bar.id));
        assert_eq!(total.type_hint.as_deref(), Some("int"));

        assert_eq!(unit.imports.len(), 0);
        assert!(unit.root.validate().is_ok());
    }

    #[test]
    fn test_references_carry_receiver_types() {
        let unit = parse(
            "import com.acme.Foo;\n\
             class B {\n\
             \x20   void run(Foo foo) {\n\
             \x20       foo.bar();\n\
             \x20       var other = new Foo();\n\
             \x20       other.bar();\n\
             \x20       Util.help();\n\
             \x20   }\n\
             }\n",
        )
        .unwrap();

        assert_eq!(&*unit.imports[0].path, "com.acme.Foo");
        let calls: Vec<_> = unit
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Call)
            .map(|r| (&*r.name, r.receiver.as_deref(), r.location.line))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("bar", Some("Foo"), 4),
                ("Foo", None, 5),
                ("bar", Some("Foo"), 6),
                ("help", Some("Util"), 7),
            ]
        );
        assert!(unit.references.iter().all(|r| !r.target.is_resolved()));
        assert!(
            unit.references
                .iter()
                .any(|r| r.kind == ReferenceKind::TypeUse && &*r.name == "Foo")
        );
    }

    #[test]
    fn test_syntax_error_keeps_partial_unit() {
        let err = parse("class Broken {\n    void f() { int x = ; }\n}\n").unwrap_err();
        match err {
            ParseError::ParseExecution {
                path,
                diagnostics,
                partial,
                ..
            } => {
                assert_eq!(path, "src/Foo.java");
                assert!(!diagnostics.is_empty());
                let partial = partial.unwrap();
                assert!(partial.has_errors());
                assert!(partial.symbols.iter().any(|s| &*s.name == "Broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let code = "class A { int x; void f() { x = 1; } }\n";
        assert_eq!(parse(code).unwrap(), parse(code).unwrap());
    }

    #[test]
    fn test_source_root_from_package() {
        assert_eq!(
            source_root(Path::new("/p/src/com/acme/Foo.java"), Some("com.acme")),
            Some(PathBuf::from("/p/src"))
        );
        assert_eq!(
            source_root(Path::new("/p/other/Foo.java"), Some("com.acme")),
            Some(PathBuf::from("/p/other"))
        );
    }
}
