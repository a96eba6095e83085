//! Symbols and references as emitted by the language parsers.
//!
//! Both hold plain [`Location`] values and never point into a syntax tree,
//! so the symbol index can outlive any parsed unit.

use crate::types::{CompactString, Extent, Location, SymbolId, SymbolKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a definition lives relative to the file's scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeContext {
    /// Inside a function body or block.
    Local,
    /// A function or method parameter.
    Parameter,
    /// Directly inside a class, interface, struct or enum.
    ClassMember,
    /// Top level of the file.
    Module,
    /// Inside a package or namespace declaration.
    Package,
    /// Visible project-wide.
    Global,
}

impl ScopeContext {
    pub fn is_local(&self) -> bool {
        matches!(self, ScopeContext::Local | ScopeContext::Parameter)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeContext::Local => "local",
            ScopeContext::Parameter => "parameter",
            ScopeContext::ClassMember => "member",
            ScopeContext::Module => "module",
            ScopeContext::Package => "package",
            ScopeContext::Global => "global",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(ScopeContext::Local),
            "parameter" => Some(ScopeContext::Parameter),
            "member" => Some(ScopeContext::ClassMember),
            "module" => Some(ScopeContext::Module),
            "package" => Some(ScopeContext::Package),
            "global" => Some(ScopeContext::Global),
            _ => None,
        }
    }
}

/// A named definition found in one translation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: CompactString,
    pub kind: SymbolKind,
    /// Position of the defining name token.
    pub definition: Location,
    /// Span of the whole defining construct.
    pub extent: Extent,
    pub scope: ScopeContext,
    /// Enclosing definition, if any.
    pub parent: Option<SymbolId>,
    /// Name of the enclosing class (for members) or function (for locals).
    pub container: Option<CompactString>,
    pub type_hint: Option<CompactString>,
}

impl Symbol {
    /// Whether the cursor sits on this symbol's name token.
    pub fn name_covers(&self, line: u32, column: u32) -> bool {
        self.definition.covers(line, column, self.name.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceKind {
    Call,
    MemberAccess,
    Read,
    TypeUse,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Call => "call",
            ReferenceKind::MemberAccess => "member",
            ReferenceKind::Read => "read",
            ReferenceKind::TypeUse => "type",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "call" => Some(ReferenceKind::Call),
            "member" => Some(ReferenceKind::MemberAccess),
            "read" => Some(ReferenceKind::Read),
            "type" => Some(ReferenceKind::TypeUse),
            _ => None,
        }
    }

    /// Whether a definition of `kind` can be the target of this use.
    pub fn accepts(&self, kind: SymbolKind) -> bool {
        match self {
            ReferenceKind::Call => kind.is_callable(),
            ReferenceKind::TypeUse => kind.is_type(),
            ReferenceKind::MemberAccess => kind.is_member(),
            ReferenceKind::Read => !matches!(kind, SymbolKind::Method),
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution state of a reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferenceTarget {
    /// Only the name tag is known.
    #[default]
    Unresolved,
    Resolved(SymbolId),
}

impl ReferenceTarget {
    pub fn symbol_id(&self) -> Option<&SymbolId> {
        match self {
            ReferenceTarget::Resolved(id) => Some(id),
            ReferenceTarget::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ReferenceTarget::Resolved(_))
    }
}

/// A use of a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolReference {
    pub name: CompactString,
    pub kind: ReferenceKind,
    pub location: Location,
    /// Static type of the receiver for `x.name` uses, when the parser knows it.
    pub receiver: Option<CompactString>,
    pub target: ReferenceTarget,
}

impl SymbolReference {
    pub fn unresolved(
        name: &str,
        kind: ReferenceKind,
        location: Location,
        receiver: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            location,
            receiver: receiver.map(Into::into),
            target: ReferenceTarget::Unresolved,
        }
    }

    pub fn name_covers(&self, line: u32, column: u32) -> bool {
        self.location.covers(line, column, self.name.len())
    }
}
