//! C and C++ front end driven by clang's JSON AST dump.
//!
//! clang runs once per file with `-fsyntax-only -Xclang -ast-dump=json`.
//! Only nodes located in the main file become part of the unit; every
//! header a declaration came from is recorded as a dependency so the
//! builder re-parses when an include changes. Function and record
//! symbols are emitted for definitions only, prototypes and forward
//! declarations stay in the tree without a symbol.

use super::nodes::{Clang, DeclData, Node, RefExprData, resolve_loc};
use super::{CLanguage, CppLanguage};
use crate::ast::{AstNode, NodeKind};
use crate::error::{ParseError, ParseResult};
use crate::parsing::parser::{MAX_AST_DEPTH, simple_type_name, text_extent};
use crate::parsing::{LanguageId, LanguageParser, ParseInput, ScopeType, UnitCollector};
use crate::symbol::{ReferenceKind, ScopeContext};
use crate::types::{Diagnostic, Extent, Position, Severity, SymbolId, SymbolKind};
use crate::unit::{Dependency, TranslationUnit};
use clang_ast::{BareSourceLocation, Id, SourceRange};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::LazyLock;
use tracing::{debug, warn};

static DIAGNOSTIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?):(\d+):(\d+): (fatal error|error|warning|note): (.+)$")
        .expect("static regex")
});

static INCLUDE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#).expect("static regex")
});

/// Headers under these prefixes belong to the toolchain and are not tracked
/// as dependencies.
const SYSTEM_PREFIXES: &[&str] = &["/usr/", "/Library/", "/Applications/", "/opt/homebrew/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    C,
    Cpp,
}

impl Dialect {
    pub fn language(&self) -> LanguageId {
        match self {
            Dialect::C => CLanguage::ID,
            Dialect::Cpp => CppLanguage::ID,
        }
    }

    /// Argument for clang's `-x` flag.
    fn clang_language(&self) -> &'static str {
        match self {
            Dialect::C => "c",
            Dialect::Cpp => "c++",
        }
    }
}

#[derive(Debug)]
pub struct ClangParser {
    dialect: Dialect,
    clang_path: PathBuf,
    default_std: Option<String>,
}

impl ClangParser {
    pub fn new(dialect: Dialect, clang_path: impl Into<PathBuf>, default_std: Option<String>) -> Self {
        Self {
            dialect,
            clang_path: clang_path.into(),
            default_std,
        }
    }

    /// Reads `clang_path` and `std` from `languages.<id>.parser_options`.
    pub fn from_settings(dialect: Dialect, settings: &crate::Settings) -> Self {
        let config = settings.language(dialect.language().as_str());
        let clang_path = config
            .and_then(|c| c.option_str("clang_path"))
            .unwrap_or("clang");
        let std = config.and_then(|c| c.option_str("std")).map(str::to_string);
        Self::new(dialect, clang_path, std)
    }

    fn command_args(&self, input: &ParseInput<'_>) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-x".into(),
            self.dialect.clang_language().into(),
            "-fsyntax-only".into(),
            "-Xclang".into(),
            "-ast-dump=json".into(),
            "-fno-color-diagnostics".into(),
        ];
        let std = input
            .context
            .language_version
            .as_deref()
            .or(self.default_std.as_deref());
        if let Some(std) = std {
            args.push(format!("-std={std}"));
        }
        for include in &input.context.include_paths {
            args.push("-I".into());
            args.push(input.keys.resolve(&include.to_string_lossy()).to_string_lossy().into_owned());
        }
        args.extend(input.context.flags.iter().cloned());
        args.push(input.source_path.to_string_lossy().into_owned());
        args
    }

    fn run(&self, input: &ParseInput<'_>) -> ParseResult<Output> {
        let args = self.command_args(input);
        debug!(clang = %self.clang_path.display(), ?args, "running clang");
        Command::new(&self.clang_path)
            .args(&args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => ParseError::ParserUnavailable {
                    language: self.dialect.language(),
                    path: input.path.to_string(),
                    reason: format!("cannot run '{}': {e}", self.clang_path.display()),
                },
                _ => ParseError::ParseExecution {
                    language: self.dialect.language(),
                    path: input.path.to_string(),
                    reason: format!("failed to run clang: {e}"),
                    diagnostics: Vec::new(),
                    partial: None,
                },
            })
    }
}

impl LanguageParser for ClangParser {
    fn language(&self) -> LanguageId {
        self.dialect.language()
    }

    fn parse(&mut self, input: &ParseInput<'_>) -> ParseResult<TranslationUnit> {
        let output = self.run(input)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = parse_diagnostics(&stderr, input);
        for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
            warn!(file = input.path, "clang: {diagnostic}");
        }

        // A failing compile can still print a usable AST
        let root = if output.stdout.first() == Some(&b'{') {
            match serde_json::from_slice::<Node>(&output.stdout) {
                Ok(root) => Some(root),
                Err(e) => {
                    debug!(file = input.path, "unreadable clang AST: {e}");
                    None
                }
            }
        } else {
            None
        };
        let unit = root.map(|root| convert_unit(&root, input, self.dialect, diagnostics.clone()));

        let first_error = diagnostics.iter().find(|d| d.is_error());
        if first_error.is_some() || !output.status.success() {
            let reason = match first_error {
                Some(d) => d.message.clone(),
                None => format!("clang exited with {}", output.status),
            };
            return Err(ParseError::ParseExecution {
                language: self.dialect.language(),
                path: input.path.to_string(),
                reason,
                diagnostics,
                partial: unit.map(Box::new),
            });
        }

        unit.ok_or_else(|| ParseError::ParseExecution {
            language: self.dialect.language(),
            path: input.path.to_string(),
            reason: "clang produced no AST".to_string(),
            diagnostics: Vec::new(),
            partial: None,
        })
    }
}

/// Diagnostics from clang's stderr, located in the file they concern.
pub fn parse_diagnostics(stderr: &str, input: &ParseInput<'_>) -> Vec<Diagnostic> {
    let main_file = input.source_path.to_string_lossy();
    stderr
        .lines()
        .filter_map(|line| DIAGNOSTIC_LINE.captures(line))
        .map(|caps| {
            let file = &caps[1];
            let key = if file == main_file {
                input.path.into()
            } else {
                input.keys.key(Path::new(file))
            };
            let severity = match &caps[4] {
                "note" => Severity::Note,
                "warning" => Severity::Warning,
                _ => Severity::Error,
            };
            let line = caps[2].parse().unwrap_or(0);
            let column = caps[3].parse().unwrap_or(0);
            Diagnostic::new(severity, &key, &caps[5]).at(line, column)
        })
        .collect()
}

/// Build the unit for `input` from an already deserialized clang AST.
pub fn convert_unit(
    root: &Node,
    input: &ParseInput<'_>,
    dialect: Dialect,
    diagnostics: Vec<Diagnostic>,
) -> TranslationUnit {
    let main_file = input.source_path.to_string_lossy().into_owned();
    let mut converter = Converter {
        main_file: &main_file,
        collector: UnitCollector::new(input.path),
        records: HashMap::new(),
        headers: BTreeSet::new(),
        callee_next: false,
        depth: 0,
    };

    for (line_no, line) in input.text.lines().enumerate() {
        if let Some(caps) = INCLUDE_LINE.captures(line) {
            let at = Position::new(line_no as u32 + 1, 1, 0);
            converter.collector.import(&caps[1], None, false, at);
        }
    }

    let mut unit_root = AstNode::new(NodeKind::TranslationUnit, "TranslationUnitDecl", text_extent(input.text));
    for child in &root.inner {
        unit_root.children.extend(converter.convert(child));
    }
    unit_root.normalize();

    let Converter {
        mut collector,
        headers,
        ..
    } = converter;
    for diagnostic in diagnostics {
        collector.diagnostic(diagnostic);
    }
    let dependencies = headers
        .iter()
        .filter(|h| !SYSTEM_PREFIXES.iter().any(|p| h.starts_with(p)))
        .filter_map(|h| Dependency::capture(input.keys, Path::new(h)))
        .collect();
    collector.finish(dialect.language(), input.content_hash, unit_root, dependencies)
}

struct Converter<'a> {
    main_file: &'a str,
    collector: UnitCollector<'a>,
    /// Records seen anywhere in the dump, for out-of-line member definitions.
    records: HashMap<Id, (String, Option<SymbolId>)>,
    headers: BTreeSet<String>,
    /// Set while descending into the callee of a call expression.
    callee_next: bool,
    depth: usize,
}

fn position(loc: &BareSourceLocation) -> Position {
    Position::new(loc.line as u32, loc.col as u32, loc.offset as u32)
}

impl<'a> Converter<'a> {
    fn is_main(&self, loc: &BareSourceLocation) -> bool {
        &*loc.file == self.main_file
    }

    /// File of a node, taken from its location or the start of its range.
    fn node_file<'n>(&self, node: &'n Node) -> Option<&'n BareSourceLocation> {
        let (loc, range) = node.kind.locations();
        loc.and_then(resolve_loc)
            .or_else(|| range.and_then(|r| resolve_loc(&r.begin)))
    }

    fn extent(&self, range: &SourceRange) -> Option<Extent> {
        let begin = resolve_loc(&range.begin)?;
        let end = resolve_loc(&range.end)?;
        if !self.is_main(begin) || !self.is_main(end) {
            return None;
        }
        let start = position(begin);
        let end = Position::new(
            end.line as u32,
            (end.col + end.tok_len) as u32,
            (end.offset + end.tok_len) as u32,
        );
        (end >= start).then(|| Extent::new(start, end))
    }

    fn convert_children(&mut self, node: &Node) -> Vec<AstNode> {
        let mut children = Vec::new();
        for child in &node.inner {
            children.extend(self.convert(child));
        }
        children
    }

    /// Convert one clang node. Returns nothing for nodes outside the main
    /// file and the converted children for nodes without a usable range.
    fn convert(&mut self, node: &Node) -> Vec<AstNode> {
        if let Some(loc) = self.node_file(node) {
            if !self.is_main(loc) {
                let file = loc.file.to_string();
                if !file.is_empty() && !file.starts_with('<') {
                    self.headers.insert(file);
                }
                self.note_external(node);
                return Vec::new();
            }
        }
        if is_implicit(&node.kind) {
            return Vec::new();
        }
        let (_, range) = node.kind.locations();
        let Some(extent) = range.and_then(|r| self.extent(r)) else {
            return self.convert_children(node);
        };
        if self.depth >= MAX_AST_DEPTH {
            return vec![AstNode::new(NodeKind::Other, &node.kind.kind_name(), extent)];
        }

        self.depth += 1;
        let converted = match &node.kind {
            Clang::FunctionDecl(d)
            | Clang::CXXMethodDecl(d)
            | Clang::CXXConstructorDecl(d)
            | Clang::CXXDestructorDecl(d) => self.convert_function(node, d, extent),
            Clang::RecordDecl(d) | Clang::CXXRecordDecl(d) => self.convert_record(node, d, extent),
            Clang::NamespaceDecl(d) => self.convert_namespace(node, d, extent),
            Clang::EnumDecl(d) => self.convert_enum(node, d, extent),
            Clang::VarDecl(d)
            | Clang::FieldDecl(d)
            | Clang::ParmVarDecl(d)
            | Clang::TypedefDecl(d)
            | Clang::TypeAliasDecl(d)
            | Clang::EnumConstantDecl(d) => self.convert_value_decl(node, d, extent),
            Clang::CompoundStmt(_) => {
                self.collector.context.enter_scope(ScopeType::Block, None);
                let mut block = AstNode::new(NodeKind::Block, "CompoundStmt", extent);
                block.children = self.convert_children(node);
                self.collector.context.exit_scope();
                block
            }
            Clang::CallExpr(_) | Clang::CXXMemberCallExpr(_) => {
                let mut call = AstNode::new(NodeKind::Call, &node.kind.kind_name(), extent)
                    .with_type_hint(node.kind.type_name());
                for (i, child) in node.inner.iter().enumerate() {
                    self.callee_next = i == 0;
                    call.children.extend(self.convert(child));
                }
                self.callee_next = false;
                call
            }
            Clang::DeclRefExpr(r) => self.convert_decl_ref(node, r, extent),
            Clang::MemberExpr(r) => self.convert_member(node, r, extent),
            Clang::FunctionTemplateDecl(_) | Clang::ClassTemplateDecl(_) | Clang::Other { .. } => {
                let kind_name = node.kind.kind_name();
                let mut other = AstNode::new(generic_kind(&kind_name), &kind_name, extent)
                    .with_type_hint(node.kind.type_name());
                other.children = self.convert_children(node);
                other
            }
        };
        self.depth -= 1;
        vec![converted]
    }

    /// Remember record names declared in headers so that `Foo::bar`
    /// definitions in the main file can find their owner.
    fn note_external(&mut self, node: &Node) {
        match &node.kind {
            Clang::RecordDecl(d) | Clang::CXXRecordDecl(d) => {
                if let Some(name) = d.name.as_deref().filter(|n| !n.is_empty()) {
                    self.records.entry(node.id).or_insert_with(|| (name.to_string(), None));
                }
                for child in &node.inner {
                    self.note_external(child);
                }
            }
            Clang::NamespaceDecl(_) | Clang::ClassTemplateDecl(_) => {
                for child in &node.inner {
                    self.note_external(child);
                }
            }
            _ => {}
        }
    }

    fn convert_function(&mut self, node: &Node, decl: &DeclData, extent: Extent) -> AstNode {
        let native = node.kind.kind_name();
        let node_kind = match node.kind {
            Clang::CXXConstructorDecl(_) | Clang::CXXDestructorDecl(_) => NodeKind::Constructor,
            Clang::CXXMethodDecl(_) => NodeKind::Method,
            _ if self.collector.context.is_in_class_body() => NodeKind::Method,
            _ => NodeKind::Function,
        };
        let name = decl.name.as_deref().unwrap_or_default();
        let at = decl.loc.as_ref().and_then(resolve_loc).map(position);
        let signature = decl.ty.as_ref().map(|t| t.qual_type.as_str());
        let mut function = AstNode::new(node_kind, &native, extent).with_type_hint(signature);
        if let Some(at) = at.filter(|_| !name.is_empty()) {
            function = function.with_name(name, at);
        }

        let is_definition = node
            .inner
            .iter()
            .any(|c| matches!(c.kind, Clang::CompoundStmt(_)));
        if !is_definition {
            return function;
        }

        let symbol_kind = if node_kind == NodeKind::Function {
            SymbolKind::Function
        } else {
            SymbolKind::Method
        };
        let owner = decl
            .parent_decl_context_id
            .and_then(|id| self.records.get(&id))
            .cloned();
        let at = at.filter(|_| !name.is_empty());
        let id = match (at, owner) {
            (Some(at), Some((container, parent))) if !self.collector.context.is_in_class_body() => {
                Some(self.collector.define_owned(
                    name,
                    SymbolKind::Method,
                    at,
                    extent,
                    signature,
                    parent,
                    &container,
                ))
            }
            (Some(at), _) => Some(self.collector.define(name, symbol_kind, at, extent, signature)),
            (None, _) => None,
        };

        let owner = id.map(|id| (id, name));
        self.collector.context.enter_scope(ScopeType::Function, owner);
        function.children = self.convert_children(node);
        self.collector.context.exit_scope();
        function
    }

    fn convert_record(&mut self, node: &Node, decl: &DeclData, extent: Extent) -> AstNode {
        let native = node.kind.kind_name();
        let name = decl.name.as_deref().unwrap_or_default();
        let at = decl.loc.as_ref().and_then(resolve_loc).map(position);
        let mut record = AstNode::new(NodeKind::Class, &native, extent);
        if let Some(at) = at.filter(|_| !name.is_empty()) {
            record = record.with_name(name, at);
        }
        if !decl.complete_definition {
            if !name.is_empty() {
                self.records.entry(node.id).or_insert_with(|| (name.to_string(), None));
            }
            return record;
        }

        let kind = match decl.tag_used.as_deref() {
            Some("class") => SymbolKind::Class,
            _ => SymbolKind::Struct,
        };
        let id = match at {
            Some(at) if !name.is_empty() => Some(self.collector.define(name, kind, at, extent, None)),
            _ => None,
        };
        if !name.is_empty() {
            self.records.insert(node.id, (name.to_string(), id.clone()));
        }

        self.collector
            .context
            .enter_scope(ScopeType::Class, id.map(|id| (id, name)));
        record.children = self.convert_children(node);
        self.collector.context.exit_scope();
        record
    }

    fn convert_namespace(&mut self, node: &Node, decl: &DeclData, extent: Extent) -> AstNode {
        let name = decl.name.as_deref().unwrap_or_default();
        let at = decl.loc.as_ref().and_then(resolve_loc).map(position);
        let mut namespace = AstNode::new(NodeKind::Namespace, "NamespaceDecl", extent);
        let id = match at {
            Some(at) if !name.is_empty() => {
                namespace = namespace.with_name(name, at);
                Some(self.collector.define(name, SymbolKind::Module, at, extent, None))
            }
            _ => None,
        };
        self.collector
            .context
            .enter_scope(ScopeType::Namespace, id.map(|id| (id, name)));
        namespace.children = self.convert_children(node);
        self.collector.context.exit_scope();
        namespace
    }

    fn convert_enum(&mut self, node: &Node, decl: &DeclData, extent: Extent) -> AstNode {
        let name = decl.name.as_deref().unwrap_or_default();
        let at = decl.loc.as_ref().and_then(resolve_loc).map(position);
        let mut enumeration = AstNode::new(NodeKind::Enum, "EnumDecl", extent);
        let id = match at {
            Some(at) if !name.is_empty() => {
                enumeration = enumeration.with_name(name, at);
                Some(self.collector.define(name, SymbolKind::Enum, at, extent, None))
            }
            _ => None,
        };
        match id {
            Some(id) => {
                self.collector
                    .context
                    .enter_scope(ScopeType::Class, Some((id, name)));
                enumeration.children = self.convert_children(node);
                self.collector.context.exit_scope();
            }
            // Anonymous enum constants belong to the enclosing scope
            None => enumeration.children = self.convert_children(node),
        }
        enumeration
    }

    fn convert_value_decl(&mut self, node: &Node, decl: &DeclData, extent: Extent) -> AstNode {
        let (node_kind, symbol_kind) = match node.kind {
            Clang::FieldDecl(_) => (NodeKind::Field, SymbolKind::Field),
            Clang::ParmVarDecl(_) => (NodeKind::Parameter, SymbolKind::Parameter),
            Clang::TypedefDecl(_) | Clang::TypeAliasDecl(_) => {
                (NodeKind::TypeAlias, SymbolKind::TypeAlias)
            }
            Clang::EnumConstantDecl(_) => (NodeKind::EnumConstant, SymbolKind::Constant),
            _ if self.collector.context.is_in_class_body() => (NodeKind::Field, SymbolKind::Field),
            _ => (NodeKind::Variable, SymbolKind::Variable),
        };
        let name = decl.name.as_deref().unwrap_or_default();
        let written = decl.ty.as_ref().map(|t| t.qual_type.as_str());
        let mut value = AstNode::new(node_kind, &node.kind.kind_name(), extent).with_type_hint(written);

        if let Some(at) = decl.loc.as_ref().and_then(resolve_loc).map(position) {
            if !name.is_empty() {
                value = value.with_name(name, at);
                if symbol_kind == SymbolKind::Parameter {
                    self.collector
                        .define_in(name, symbol_kind, ScopeContext::Parameter, at, extent, written);
                } else {
                    self.collector.define(name, symbol_kind, at, extent, written);
                }
                if let Some(ty) = written.and_then(simple_type_name) {
                    if symbol_kind == SymbolKind::Field {
                        self.collector.context.bind_in_class(name, ty);
                    } else if symbol_kind != SymbolKind::TypeAlias {
                        self.collector.context.bind(name, ty);
                    }
                }
            }
        }

        value.children = self.convert_children(node);
        value
    }

    fn convert_decl_ref(&mut self, node: &Node, data: &RefExprData, extent: Extent) -> AstNode {
        let callee = std::mem::take(&mut self.callee_next);
        let referenced = data.referenced_decl.as_ref();
        let name = referenced
            .and_then(|r| r.name.as_deref())
            .unwrap_or_default();
        let kind = match referenced.and_then(|r| r.kind.as_deref()) {
            _ if callee => ReferenceKind::Call,
            Some("CXXRecordDecl" | "RecordDecl" | "TypedefDecl" | "TypeAliasDecl" | "EnumDecl") => {
                ReferenceKind::TypeUse
            }
            _ => ReferenceKind::Read,
        };
        let mut identifier = AstNode::new(NodeKind::Identifier, "DeclRefExpr", extent)
            .with_type_hint(node.kind.type_name());
        // The name is the last token of the range (`ns::value`)
        if let Some(at) = data.range.as_ref().and_then(|r| resolve_loc(&r.end)).map(position) {
            if !name.is_empty() {
                identifier = identifier.with_name(name, at);
                self.collector.reference(name, kind, at, None);
            }
        }
        identifier.children = self.convert_children(node);
        identifier
    }

    fn convert_member(&mut self, node: &Node, data: &RefExprData, extent: Extent) -> AstNode {
        let callee = std::mem::take(&mut self.callee_next);
        let name = data.name.as_deref().unwrap_or_default();
        let receiver = node
            .inner
            .first()
            .and_then(|base| base.kind.type_name())
            .and_then(simple_type_name)
            .map(str::to_string);
        let kind = if callee {
            ReferenceKind::Call
        } else {
            ReferenceKind::MemberAccess
        };
        let mut member = AstNode::new(NodeKind::MemberAccess, "MemberExpr", extent)
            .with_type_hint(node.kind.type_name());
        if let Some(at) = data.range.as_ref().and_then(|r| resolve_loc(&r.end)).map(position) {
            if !name.is_empty() && !data.is_implicit {
                member = member.with_name(name, at);
                self.collector.reference(name, kind, at, receiver.as_deref());
            }
        }
        member.children = self.convert_children(node);
        member
    }
}

fn is_implicit(kind: &Clang) -> bool {
    match kind {
        Clang::FunctionDecl(d)
        | Clang::CXXMethodDecl(d)
        | Clang::CXXConstructorDecl(d)
        | Clang::CXXDestructorDecl(d)
        | Clang::RecordDecl(d)
        | Clang::CXXRecordDecl(d)
        | Clang::VarDecl(d)
        | Clang::FieldDecl(d)
        | Clang::ParmVarDecl(d)
        | Clang::TypedefDecl(d)
        | Clang::TypeAliasDecl(d)
        | Clang::EnumDecl(d)
        | Clang::EnumConstantDecl(d)
        | Clang::NamespaceDecl(d)
        | Clang::FunctionTemplateDecl(d)
        | Clang::ClassTemplateDecl(d) => d.is_implicit,
        Clang::DeclRefExpr(r) => r.is_implicit,
        _ => false,
    }
}

fn generic_kind(kind_name: &str) -> NodeKind {
    if kind_name.ends_with("Literal") {
        NodeKind::Literal
    } else if kind_name.ends_with("Stmt") {
        NodeKind::Statement
    } else if kind_name.ends_with("Expr") || kind_name.ends_with("Operator") {
        NodeKind::Expression
    } else {
        NodeKind::Other
    }
}
