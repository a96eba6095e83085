//! Python language parser implementation
//!
//! Built on tree-sitter-python. Assignment doubles as declaration, so a
//! name becomes a definition the first time it is bound in a scope; later
//! bindings are plain writes. `self.x = ...` inside a method defines a
//! field on the enclosing class.

use super::PythonLanguage;
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
use std::path::PathBuf;
use tree_sitter::{Node, Parser};

pub struct PythonParser {
    parser: Parser,
}

impl std::fmt::Debug for PythonParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PythonParser")
            .field("language", &"Python")
            .finish()
    }
}

impl PythonParser {
    pub fn new() -> ParseResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParseError::ParserUnavailable {
                language: PythonLanguage::ID,
                path: String::new(),
                reason: format!("tree-sitter error: {e}"),
            })?;
        Ok(Self { parser })
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> LanguageId {
        PythonLanguage::ID
    }

    fn parse(&mut self, input: &ParseInput<'_>) -> ParseResult<TranslationUnit> {
        let tree = self
            .parser
            .parse(input.text, None)
            .ok_or_else(|| ParseError::ParseExecution {
                language: PythonLanguage::ID,
                path: input.path.to_string(),
                reason: "tree-sitter returned no tree".to_string(),
                diagnostics: Vec::new(),
                partial: None,
            })?;
        let root_node = tree.root_node();

        let mut walker = PythonWalker::new(input.path, input.text);
        let mut root = AstNode::new(
            NodeKind::TranslationUnit,
            root_node.kind(),
            text_extent(input.text),
        );
        walker.visit_children(root_node, 0, &mut root);
        root.normalize();

        let dependencies = resolve_imports(input, walker.collector.imports());
        let unit = walker
            .collector
            .finish(PythonLanguage::ID, input.content_hash, root, dependencies);
        check_syntax(unit, root_node)
    }
}

struct PythonWalker<'a> {
    code: &'a str,
    collector: UnitCollector<'a>,
    consumed: HashSet<usize>,
    /// Inside a type annotation, where bare names are type uses.
    in_annotation: bool,
    truncated: bool,
}

impl<'a> PythonWalker<'a> {
    fn new(path: &'a str, code: &'a str) -> Self {
        Self {
            code,
            collector: UnitCollector::new(path),
            consumed: HashSet::new(),
            in_annotation: false,
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
            return Some(ast_node(python_node_kind(node.kind()), &node));
        }

        let ast = match node.kind() {
            "import_statement" => self.visit_import(node),
            "import_from_statement" => self.visit_import_from(node),
            "class_definition" => self.visit_class(node, depth),
            "function_definition" => self.visit_function(node, depth),
            "assignment" => self.visit_assignment(node, depth),
            "for_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.define_targets(left, node, None, None);
                }
                self.generic(node, depth)
            }
            "lambda" => self.visit_lambda(node, depth),
            "call" => self.visit_call(node, depth),
            "attribute" => self.visit_attribute(node, depth),
            "keyword_argument" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.consumed.insert(name.id());
                }
                self.generic(node, depth)
            }
            "type" => {
                let outer = std::mem::replace(&mut self.in_annotation, true);
                let ast = self.generic(node, depth);
                self.in_annotation = outer;
                ast
            }
            "identifier" => self.visit_identifier(node),
            _ => self.generic(node, depth),
        };
        Some(ast)
    }

    fn generic(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(python_node_kind(node.kind()), &node);
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_import(&mut self, node: Node) -> AstNode {
        let mut ast = ast_node(NodeKind::Import, &node);
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let (module, alias) = match name.kind() {
                "aliased_import" => (
                    name.child_by_field_name("name").map(|n| self.text(n)),
                    name.child_by_field_name("alias").map(|n| self.text(n)),
                ),
                _ => (Some(self.text(name)), None),
            };
            if let Some(module) = module {
                let at = start_position(&name);
                self.collector.import(module, alias, false, at);
                if ast.name.is_none() {
                    ast = ast.with_name(module, at);
                }
            }
        }
        ast
    }

    fn visit_import_from(&mut self, node: Node) -> AstNode {
        let ast = ast_node(NodeKind::Import, &node);
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return ast;
        };
        let module = self.text(module_node);
        let at = start_position(&module_node);

        let mut cursor = node.walk();
        let is_glob = node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import");

        if !module.is_empty() && module.chars().all(|c| c == '.') {
            // `from . import helpers` names sibling modules directly
            let mut cursor = node.walk();
            let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
            for name in names {
                let (target, alias) = match name.kind() {
                    "aliased_import" => (
                        name.child_by_field_name("name").map(|n| self.text(n)),
                        name.child_by_field_name("alias").map(|n| self.text(n)),
                    ),
                    _ => (Some(self.text(name)), None),
                };
                if let Some(target) = target {
                    let path = format!("{module}{target}");
                    self.collector
                        .import(&path, alias, false, start_position(&name));
                }
            }
        } else {
            self.collector.import(module, None, is_glob, at);
        }
        ast.with_name(module, at)
    }

    fn visit_class(&mut self, node: Node, depth: usize) -> AstNode {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.generic(node, depth);
        };
        let name = self.text(name_node);
        let at = start_position(&name_node);
        self.consumed.insert(name_node.id());
        self.collector.context.declare(name);

        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            let bases: Vec<Node> = bases.named_children(&mut cursor).collect();
            for base in bases {
                let base_name = match base.kind() {
                    "identifier" => Some(base),
                    "attribute" => base.child_by_field_name("attribute"),
                    _ => None,
                };
                if let Some(base_name) = base_name {
                    self.consumed.insert(base_name.id());
                    self.collector.reference(
                        self.text(base_name),
                        ReferenceKind::TypeUse,
                        start_position(&base_name),
                        None,
                    );
                }
            }
        }

        let id = self
            .collector
            .define(name, SymbolKind::Class, at, node_extent(&node), None);
        self.collector
            .context
            .enter_scope(ScopeType::Class, Some((id, name)));

        let mut ast = ast_node(NodeKind::Class, &node).with_name(name, at);
        self.visit_children(node, depth, &mut ast);

        self.collector.context.exit_scope();
        ast
    }

    fn visit_function(&mut self, node: Node, depth: usize) -> AstNode {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.generic(node, depth);
        };
        let name = self.text(name_node);
        let at = start_position(&name_node);
        self.consumed.insert(name_node.id());
        self.collector.context.declare(name);

        let is_method = self.collector.context.is_in_class_body();
        let (kind, node_kind) = if is_method {
            (SymbolKind::Method, NodeKind::Method)
        } else {
            (SymbolKind::Function, NodeKind::Function)
        };
        let return_type = node.child_by_field_name("return_type").map(|t| self.text(t));

        let id = self
            .collector
            .define(name, kind, at, node_extent(&node), return_type);
        self.collector
            .context
            .enter_scope(ScopeType::Function, Some((id, name)));
        if let Some(params) = node.child_by_field_name("parameters") {
            self.define_parameters(params, is_method);
        }

        let mut ast = ast_node(node_kind, &node)
            .with_name(name, at)
            .with_type_hint(return_type);
        self.visit_children(node, depth, &mut ast);

        self.collector.context.exit_scope();
        ast
    }

    fn define_parameters(&mut self, params: Node, is_method: bool) {
        let mut cursor = params.walk();
        let children: Vec<Node> = params.named_children(&mut cursor).collect();
        let mut first = true;
        for child in children {
            let (name_node, annotation) = match child.kind() {
                "identifier" => (Some(child), None),
                "typed_parameter" => (
                    first_identifier(child),
                    child.child_by_field_name("type").map(|t| self.text(t)),
                ),
                "default_parameter" => (child.child_by_field_name("name"), None),
                "typed_default_parameter" => (
                    child.child_by_field_name("name"),
                    child.child_by_field_name("type").map(|t| self.text(t)),
                ),
                "list_splat_pattern" | "dictionary_splat_pattern" => (first_identifier(child), None),
                _ => (None, None),
            };
            let Some(name_node) = name_node else {
                continue;
            };
            let name = self.text(name_node);
            self.consumed.insert(name_node.id());
            self.collector.context.declare(name);

            if is_method && first && (name == "self" || name == "cls") {
                first = false;
                if let Some(class) = self.collector.context.current_class().map(str::to_string) {
                    self.collector.context.bind(name, &class);
                }
                continue;
            }
            first = false;

            self.collector.define_in(
                name,
                SymbolKind::Parameter,
                ScopeContext::Parameter,
                start_position(&name_node),
                node_extent(&child),
                annotation,
            );
            if let Some(ty) = annotation.and_then(simple_type_name) {
                self.collector.context.bind(name, ty);
            }
        }
    }

    fn visit_lambda(&mut self, node: Node, depth: usize) -> AstNode {
        self.collector.context.enter_scope(ScopeType::Function, None);
        if let Some(params) = node.child_by_field_name("parameters") {
            self.define_parameters(params, false);
        }
        let ast = self.generic(node, depth);
        self.collector.context.exit_scope();
        ast
    }

    fn visit_assignment(&mut self, node: Node, depth: usize) -> AstNode {
        let annotation = node.child_by_field_name("type").map(|t| self.text(t));
        let inferred = annotation.and_then(simple_type_name).or_else(|| {
            node.child_by_field_name("right")
                .and_then(|right| self.constructed_type(right))
        });
        if let Some(left) = node.child_by_field_name("left") {
            self.define_targets(left, node, annotation, inferred);
        }
        self.generic(node, depth)
    }

    /// Define the names bound by an assignment or loop target.
    fn define_targets(
        &mut self,
        target: Node,
        statement: Node,
        annotation: Option<&'a str>,
        inferred: Option<&'a str>,
    ) {
        match target.kind() {
            "identifier" => {
                let name = self.text(target);
                let at = start_position(&target);
                self.consumed.insert(target.id());
                if self.collector.context.declare(name) {
                    let kind = if self.collector.context.is_in_class_body() {
                        SymbolKind::Field
                    } else if !self.collector.context.is_in_function() && is_constant_name(name) {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    };
                    self.collector.define(
                        name,
                        kind,
                        at,
                        node_extent(&statement),
                        annotation.or(inferred),
                    );
                }
                if let Some(ty) = inferred {
                    self.collector.context.bind(name, ty);
                }
            }
            "attribute" => {
                let (Some(object), Some(attribute)) = (
                    target.child_by_field_name("object"),
                    target.child_by_field_name("attribute"),
                ) else {
                    return;
                };
                if object.kind() != "identifier"
                    || self.text(object) != "self"
                    || !self.collector.context.is_in_function()
                {
                    return;
                }
                let name = self.text(attribute);
                self.consumed.insert(attribute.id());
                if self.collector.context.declare_in_class(name) {
                    self.collector.define_member(
                        name,
                        SymbolKind::Field,
                        start_position(&attribute),
                        node_extent(&statement),
                        annotation.or(inferred),
                    );
                }
                if let Some(ty) = inferred {
                    self.collector.context.bind_in_class(name, ty);
                }
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" => {
                let mut cursor = target.walk();
                let parts: Vec<Node> = target.named_children(&mut cursor).collect();
                for part in parts {
                    self.define_targets(part, statement, None, None);
                }
            }
            _ => {}
        }
    }

    fn visit_call(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(NodeKind::Call, &node);
        if let Some(function) = node.child_by_field_name("function") {
            let callee = match function.kind() {
                "identifier" => Some((function, None)),
                "attribute" => function.child_by_field_name("attribute").map(|attribute| {
                    let receiver = function
                        .child_by_field_name("object")
                        .and_then(|object| self.receiver_type(object));
                    (attribute, receiver)
                }),
                _ => None,
            };
            if let Some((name_node, receiver)) = callee {
                let name = self.text(name_node);
                let at = start_position(&name_node);
                self.consumed.insert(name_node.id());
                self.collector
                    .reference(name, ReferenceKind::Call, at, receiver.as_deref());
                ast = ast.with_name(name, at);
            }
        }
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_attribute(&mut self, node: Node, depth: usize) -> AstNode {
        let mut ast = ast_node(NodeKind::MemberAccess, &node);
        if let Some(attribute) = node.child_by_field_name("attribute") {
            let name = self.text(attribute);
            let at = start_position(&attribute);
            if self.consumed.insert(attribute.id()) {
                let receiver = node
                    .child_by_field_name("object")
                    .and_then(|object| self.receiver_type(object));
                self.collector
                    .reference(name, ReferenceKind::MemberAccess, at, receiver.as_deref());
            }
            ast = ast.with_name(name, at);
        }
        self.visit_children(node, depth, &mut ast);
        ast
    }

    fn visit_identifier(&mut self, node: Node) -> AstNode {
        let name = self.text(node);
        let at = start_position(&node);
        if !self.consumed.contains(&node.id()) && name != "self" && name != "cls" {
            let kind = if self.in_annotation {
                ReferenceKind::TypeUse
            } else {
                ReferenceKind::Read
            };
            self.collector.reference(name, kind, at, None);
        }
        ast_node(NodeKind::Identifier, &node)
            .with_name(name, at)
            .with_type_hint(self.collector.context.type_of(name))
    }

    fn receiver_type(&self, object: Node) -> Option<String> {
        match object.kind() {
            "identifier" => {
                let name = self.text(object);
                self.collector
                    .context
                    .type_of(name)
                    .map(str::to_string)
                    .or_else(|| is_class_name(name).then(|| name.to_string()))
            }
            "call" => self.constructed_type(object).map(str::to_string),
            "attribute" => {
                let target = object.child_by_field_name("object")?;
                let attribute = object.child_by_field_name("attribute")?;
                if target.kind() == "identifier" && self.text(target) == "self" {
                    self.collector
                        .context
                        .type_of(self.text(attribute))
                        .map(str::to_string)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// `Foo(...)` or `module.Foo(...)`: the class being instantiated.
    fn constructed_type(&self, node: Node) -> Option<&'a str> {
        if node.kind() != "call" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        let name = match function.kind() {
            "identifier" => self.text(function),
            "attribute" => self.text(function.child_by_field_name("attribute")?),
            _ => return None,
        };
        is_class_name(name).then_some(name)
    }
}

fn first_identifier(node: Node) -> Option<Node> {
    if node.kind() == "identifier" {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(first_identifier)
}

fn is_class_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase) && !is_constant_name(name)
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn python_node_kind(kind: &str) -> NodeKind {
    match kind {
        "module" => NodeKind::TranslationUnit,
        "block" => NodeKind::Block,
        "call" => NodeKind::Call,
        "attribute" => NodeKind::MemberAccess,
        "identifier" => NodeKind::Identifier,
        "type" => NodeKind::TypeRef,
        "typed_parameter" | "default_parameter" | "typed_default_parameter" => NodeKind::Parameter,
        "string" | "concatenated_string" | "integer" | "float" | "true" | "false" | "none" => {
            NodeKind::Literal
        }
        "assignment" | "augmented_assignment" | "lambda" | "subscript" | "list" | "dictionary"
        | "tuple" | "set" | "conditional_expression" | "parenthesized_expression"
        | "list_comprehension" | "dictionary_comprehension" | "set_comprehension"
        | "generator_expression" | "await" => NodeKind::Expression,
        k if k.ends_with("_operator") => NodeKind::Expression,
        k if k.ends_with("_statement") || k.ends_with("_clause") => NodeKind::Statement,
        _ => NodeKind::Other,
    }
}

/// Module files named by imports. Relative imports resolve against the
/// importing file's package; absolute ones against the file's directory,
/// its ancestors inside the workspace, then the include paths.
fn resolve_imports(input: &ParseInput<'_>, imports: &[Import]) -> Vec<Dependency> {
    let Some(dir) = input.source_path.parent() else {
        return Vec::new();
    };

    let mut found: BTreeMap<CompactString, Dependency> = BTreeMap::new();
    for import in imports {
        let dots = import.path.chars().take_while(|c| *c == '.').count();
        let module = &import.path[dots..];
        if module.is_empty() {
            continue;
        }
        let bases: Vec<PathBuf> = if dots > 0 {
            let mut base = dir.to_path_buf();
            for _ in 1..dots {
                base.pop();
            }
            vec![base]
        } else {
            let mut bases: Vec<PathBuf> = dir
                .ancestors()
                .take_while(|a| input.keys.root().is_none_or(|root| a.starts_with(root)))
                .map(|a| a.to_path_buf())
                .collect();
            bases.extend(input.context.include_paths.iter().cloned());
            bases
        };

        let relative = module.replace('.', "/");
        let candidate = bases.iter().find_map(|base| {
            [
                base.join(format!("{relative}.py")),
                base.join(&relative).join("__init__.py"),
            ]
            .into_iter()
            .find(|path| path.is_file())
        });
        if let Some(dep) = candidate.and_then(|path| Dependency::capture(input.keys, &path)) {
            found.insert(dep.path.clone(), dep);
        }
    }
    found.into_values().collect()
}
