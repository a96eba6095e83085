//! Language parser trait
//!
//! This module defines the common interface that all language parsers
//! implement, plus small helpers shared by the tree-sitter front ends.

use crate::ast::{AstNode, NodeKind};
use crate::error::{ParseError, ParseResult};
use crate::parsing::LanguageId;
use crate::types::{Diagnostic, Extent, Position};
use crate::unit::{CompileContext, PathKeys, TranslationUnit};
use std::path::Path;
use tree_sitter::Node;

/// Deepest syntax nesting a front end descends into before flattening.
pub const MAX_AST_DEPTH: usize = 400;

const MAX_SYNTAX_DIAGNOSTICS: usize = 20;

/// Everything a parser gets for one file
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    /// Stable key of the file, used in locations and symbol ids.
    pub path: &'a str,
    /// Where the file lives on disk, for toolchains that read it themselves.
    pub source_path: &'a Path,
    pub text: &'a str,
    pub content_hash: &'a str,
    pub context: &'a CompileContext,
    pub keys: &'a PathKeys,
}

/// Common interface for all language parsers
///
/// Parsers never look beyond the file they are given (plus whatever the
/// toolchain itself reads, such as headers); references come back carrying
/// only their name so cross-file resolution stays in one place.
pub trait LanguageParser: Send {
    fn language(&self) -> LanguageId;

    /// Produce the translation unit for one file.
    ///
    /// Fails with `ParserUnavailable` when the toolchain is missing and with
    /// `ParseExecution` (carrying any partial unit) when it rejects the input.
    fn parse(&mut self, input: &ParseInput<'_>) -> ParseResult<TranslationUnit>;
}

/// 1-based position of a tree-sitter node's start.
pub fn start_position(node: &Node) -> Position {
    let point = node.start_position();
    Position::new(
        point.row as u32 + 1,
        point.column as u32 + 1,
        node.start_byte() as u32,
    )
}

pub fn node_extent(node: &Node) -> Extent {
    let end = node.end_position();
    Extent::new(
        start_position(node),
        Position::new(end.row as u32 + 1, end.column as u32 + 1, node.end_byte() as u32),
    )
}

pub fn node_text<'a>(node: &Node, code: &'a str) -> &'a str {
    code.get(node.byte_range()).unwrap_or("")
}

pub fn ast_node(kind: NodeKind, node: &Node) -> AstNode {
    AstNode::new(kind, node.kind(), node_extent(node))
}

/// Turn a finished unit into the parse outcome: syntax errors anywhere in
/// the tree make it a `ParseExecution` failure carrying the unit as partial.
pub fn check_syntax(mut unit: TranslationUnit, root: Node) -> ParseResult<TranslationUnit> {
    if !root.has_error() {
        return Ok(unit);
    }
    let diagnostics = syntax_diagnostics(root, &unit.path);
    unit.diagnostics.extend(diagnostics.iter().cloned());
    let reason = match diagnostics.first() {
        Some(first) => format!(
            "{} syntax error(s), first at line {}",
            diagnostics.len(),
            first.line.unwrap_or(0)
        ),
        None => "syntax errors".to_string(),
    };
    Err(ParseError::ParseExecution {
        language: unit.language,
        path: unit.path.to_string(),
        reason,
        diagnostics,
        partial: Some(Box::new(unit)),
    })
}

/// Extent covering the whole of `text`.
pub fn text_extent(text: &str) -> Extent {
    let mut line = 1u32;
    let mut column = 1u32;
    for ch in text.chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += ch.len_utf8() as u32;
        }
    }
    Extent::new(Position::new(1, 1, 0), Position::new(line, column, text.len() as u32))
}

/// Error diagnostics for ERROR and MISSING nodes in a tree-sitter tree.
pub fn syntax_diagnostics(root: Node, path: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if diagnostics.len() >= MAX_SYNTAX_DIAGNOSTICS {
            break;
        }
        if node.is_missing() {
            let at = start_position(&node);
            diagnostics.push(
                Diagnostic::error(path, format!("missing '{}'", node.kind())).at(at.line, at.column),
            );
            continue;
        }
        if node.is_error() {
            let at = start_position(&node);
            diagnostics.push(Diagnostic::error(path, "syntax error").at(at.line, at.column));
            continue;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    diagnostics.sort_by_key(|d| (d.line, d.column));
    diagnostics
}

/// Reduce a written type to the bare name used for member lookups:
/// `java.util.List<String>[]` becomes `List`, `const Foo *` becomes `Foo`.
pub fn simple_type_name(written: &str) -> Option<&str> {
    let base = written.split('<').next().unwrap_or(written);
    let base = base.split('[').next().unwrap_or(base);
    let base = base
        .trim()
        .trim_end_matches(['*', '&', ' '])
        .trim_start_matches("const ")
        .trim_start_matches("struct ")
        .trim_start_matches("class ")
        .trim();
    let base = base.rsplit(['.', ':']).next().unwrap_or(base).trim();
    if base.is_empty() || !base.chars().all(|c| c.is_alphanumeric() || c == '_') {
        None
    } else {
        Some(base)
    }
}
