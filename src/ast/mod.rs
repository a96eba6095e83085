//! Universal syntax tree shared by every language front end
//!
//! Nodes own their children exclusively. Children are ordered, do not
//! overlap and sit inside the parent's extent; [`AstNode::normalize`]
//! restores that shape for front ends whose native tree does not
//! guarantee it.

pub mod printer;

pub use printer::{AstPrinter, PrintOptions};

use crate::types::{CompactString, Extent, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Syntactic category of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    TranslationUnit,
    Package,
    Namespace,
    Import,
    Class,
    Interface,
    Enum,
    Function,
    Method,
    Constructor,
    Field,
    Variable,
    Parameter,
    EnumConstant,
    TypeAlias,
    Block,
    Call,
    MemberAccess,
    Identifier,
    TypeRef,
    Literal,
    Statement,
    Expression,
    Other,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::TranslationUnit => "TranslationUnit",
            NodeKind::Package => "Package",
            NodeKind::Namespace => "Namespace",
            NodeKind::Import => "Import",
            NodeKind::Class => "Class",
            NodeKind::Interface => "Interface",
            NodeKind::Enum => "Enum",
            NodeKind::Function => "Function",
            NodeKind::Method => "Method",
            NodeKind::Constructor => "Constructor",
            NodeKind::Field => "Field",
            NodeKind::Variable => "Variable",
            NodeKind::Parameter => "Parameter",
            NodeKind::EnumConstant => "EnumConstant",
            NodeKind::TypeAlias => "TypeAlias",
            NodeKind::Block => "Block",
            NodeKind::Call => "Call",
            NodeKind::MemberAccess => "MemberAccess",
            NodeKind::Identifier => "Identifier",
            NodeKind::TypeRef => "TypeRef",
            NodeKind::Literal => "Literal",
            NodeKind::Statement => "Statement",
            NodeKind::Expression => "Expression",
            NodeKind::Other => "Other",
        }
    }

    /// Kinds that open a scope holding type members.
    pub fn is_type_scope(&self) -> bool {
        matches!(self, NodeKind::Class | NodeKind::Interface | NodeKind::Enum)
    }

    /// Kinds that open a scope holding locals.
    pub fn is_function_scope(&self) -> bool {
        matches!(
            self,
            NodeKind::Function | NodeKind::Method | NodeKind::Constructor
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub kind: NodeKind,
    /// Node type as named by the native parser (tree-sitter kind, clang kind).
    pub native_kind: CompactString,
    pub name: Option<CompactString>,
    /// Position of the name token for named nodes, of the first token otherwise.
    /// The file is the owning translation unit's path.
    pub location: Position,
    pub extent: Extent,
    pub type_hint: Option<CompactString>,
    pub children: Vec<AstNode>,
}

/// What a [`Visitor`] wants after entering a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
    Stop,
}

/// Depth-first pre/post order visitor
pub trait Visitor {
    fn enter(&mut self, node: &AstNode, depth: usize) -> Walk;

    fn leave(&mut self, _node: &AstNode, _depth: usize) {}
}

/// Reported when the extent invariant does not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentViolation {
    pub parent: Position,
    pub child: Position,
    pub reason: &'static str,
}

impl AstNode {
    pub fn new(kind: NodeKind, native_kind: &str, extent: Extent) -> Self {
        Self {
            kind,
            native_kind: native_kind.into(),
            name: None,
            location: extent.start,
            extent,
            type_hint: None,
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str, location: Position) -> Self {
        self.name = Some(name.into());
        self.location = location;
        self
    }

    pub fn with_type_hint(mut self, type_hint: Option<&str>) -> Self {
        self.type_hint = type_hint.map(Into::into);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Walk the tree depth-first. Returns `false` when the visitor stopped early.
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) -> bool {
        self.walk_at(visitor, 0)
    }

    fn walk_at<V: Visitor + ?Sized>(&self, visitor: &mut V, depth: usize) -> bool {
        match visitor.enter(self, depth) {
            Walk::Stop => return false,
            Walk::SkipChildren => {}
            Walk::Continue => {
                for child in &self.children {
                    if !child.walk_at(visitor, depth + 1) {
                        return false;
                    }
                }
            }
        }
        visitor.leave(self, depth);
        true
    }

    /// Chain of nodes from this node down to the innermost one containing
    /// the cursor. Empty when the cursor lies outside this node.
    pub fn path_to(&self, line: u32, column: u32) -> Vec<&AstNode> {
        let mut path = Vec::new();
        let _ = self.try_path_to(line, column, &mut || false, &mut path);
        path
    }

    /// Like [`AstNode::path_to`], but asks `interrupted` before every child
    /// it inspects and gives up with `Err(())` as soon as it answers `true`.
    pub fn try_path_to<'a>(
        &'a self,
        line: u32,
        column: u32,
        interrupted: &mut dyn FnMut() -> bool,
        path: &mut Vec<&'a AstNode>,
    ) -> Result<(), ()> {
        if !self.extent.contains_point(line, column) {
            return Ok(());
        }
        let mut current = self;
        path.push(current);
        'descend: loop {
            for child in &current.children {
                if interrupted() {
                    return Err(());
                }
                if child.extent.contains_point(line, column) {
                    path.push(child);
                    current = child;
                    continue 'descend;
                }
                if child.extent.start.cmp_point(line, column).is_gt() {
                    break;
                }
            }
            return Ok(());
        }
    }

    pub fn innermost_at(&self, line: u32, column: u32) -> Option<&AstNode> {
        self.path_to(line, column).pop()
    }

    /// Innermost node whose extent contains the byte offset.
    pub fn innermost_at_offset(&self, offset: u32) -> Option<&AstNode> {
        if !self.extent.contains_offset(offset) {
            return None;
        }
        let mut current = self;
        while let Some(child) = current
            .children
            .iter()
            .find(|child| child.extent.contains_offset(offset))
        {
            current = child;
        }
        Some(current)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(AstNode::node_count).sum::<usize>()
    }

    /// Check that children are ordered, disjoint and contained, recursively.
    pub fn validate(&self) -> Result<(), ExtentViolation> {
        let mut previous_end: Option<Position> = None;
        for child in &self.children {
            if !self.extent.encloses(&child.extent) {
                return Err(ExtentViolation {
                    parent: self.extent.start,
                    child: child.extent.start,
                    reason: "child outside parent",
                });
            }
            if let Some(end) = previous_end {
                if child.extent.start.offset < end.offset {
                    return Err(ExtentViolation {
                        parent: self.extent.start,
                        child: child.extent.start,
                        reason: "overlapping siblings",
                    });
                }
            }
            previous_end = Some(child.extent.end);
            child.validate()?;
        }
        Ok(())
    }

    /// Enforce the extent invariant in place: children are clamped into the
    /// parent, sorted by start, and a child overlapping its predecessor is
    /// dropped.
    pub fn normalize(&mut self) {
        let parent = self.extent;
        for child in &mut self.children {
            child.clamp_into(&parent);
            child.normalize();
        }
        self.children
            .sort_by_key(|child| (child.extent.start.offset, child.extent.end.offset));
        let mut last_end = parent.start.offset;
        self.children.retain(|child| {
            if child.extent.start.offset < last_end {
                return false;
            }
            last_end = child.extent.end.offset;
            true
        });
    }

    fn clamp_into(&mut self, parent: &Extent) {
        if self.extent.start.offset < parent.start.offset {
            self.extent.start = parent.start;
        }
        if self.extent.end.offset > parent.end.offset {
            self.extent.end = parent.end;
        }
        if self.extent.end.offset < self.extent.start.offset {
            self.extent.end = self.extent.start;
        }
    }
}
