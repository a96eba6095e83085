mod diagnostic;

pub use diagnostic::{Diagnostic, Severity};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

/// Project-unique identifier of a defined symbol.
///
/// Derived only from the defining file, position and name, so re-parsing
/// identical text always yields identical ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(CompactString);

impl SymbolId {
    pub fn derive(file: &str, line: u32, column: u32, name: &str) -> Self {
        Self(format!("{file}:{line}:{column}:{name}").into())
    }

    /// Wrap an id previously produced by [`SymbolId::derive`], e.g. read back from storage.
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point in a source file. Lines and columns are 1-based, columns and
/// offsets count bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Compare against a line/column pair, ignoring the byte offset.
    pub fn cmp_point(&self, line: u32, column: u32) -> std::cmp::Ordering {
        (self.line, self.column).cmp(&(line, column))
    }
}

/// Source span of a construct, start inclusive and end exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub start: Position,
    pub end: Position,
}

impl Extent {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `other` lies entirely within this extent.
    pub fn encloses(&self, other: &Extent) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    /// Point containment used for cursor lookups.
    ///
    /// The end is inclusive so a cursor placed right after the last character
    /// of an identifier still lands on that identifier.
    pub fn contains_point(&self, line: u32, column: u32) -> bool {
        self.start.cmp_point(line, column).is_le() && self.end.cmp_point(line, column).is_ge()
    }

    pub fn contains_offset(&self, offset: u32) -> bool {
        self.start.offset <= offset && offset < self.end.offset
    }

    pub fn len(&self) -> u32 {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A location held by value: file plus line/column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: CompactString,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    pub fn at(file: &str, position: Position) -> Self {
        Self::new(file, position.line, position.column)
    }

    /// True when the cursor sits on the token of `width` bytes starting here.
    pub fn covers(&self, line: u32, column: u32, width: usize) -> bool {
        self.line == line && column >= self.column && column <= self.column + width as u32
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Struct,
    Enum,
    Trait,
    Interface,
    Class,
    Module,
    Variable,
    Constant,
    Field,
    Parameter,
    TypeAlias,
    Macro,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 14] = [
        SymbolKind::Function,
        SymbolKind::Method,
        SymbolKind::Struct,
        SymbolKind::Enum,
        SymbolKind::Trait,
        SymbolKind::Interface,
        SymbolKind::Class,
        SymbolKind::Module,
        SymbolKind::Variable,
        SymbolKind::Constant,
        SymbolKind::Field,
        SymbolKind::Parameter,
        SymbolKind::TypeAlias,
        SymbolKind::Macro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "Function",
            SymbolKind::Method => "Method",
            SymbolKind::Struct => "Struct",
            SymbolKind::Enum => "Enum",
            SymbolKind::Trait => "Trait",
            SymbolKind::Interface => "Interface",
            SymbolKind::Class => "Class",
            SymbolKind::Module => "Module",
            SymbolKind::Variable => "Variable",
            SymbolKind::Constant => "Constant",
            SymbolKind::Field => "Field",
            SymbolKind::Parameter => "Parameter",
            SymbolKind::TypeAlias => "TypeAlias",
            SymbolKind::Macro => "Macro",
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            SymbolKind::Struct
                | SymbolKind::Enum
                | SymbolKind::Trait
                | SymbolKind::Interface
                | SymbolKind::Class
                | SymbolKind::TypeAlias
        )
    }

    pub fn is_callable(&self) -> bool {
        // Classes are callable in Python and constructors share the class name elsewhere.
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Macro | SymbolKind::Class
        )
    }

    pub fn is_member(&self) -> bool {
        matches!(
            self,
            SymbolKind::Method | SymbolKind::Field | SymbolKind::Constant | SymbolKind::Variable
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymbolKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or("Unknown symbol kind")
    }
}
