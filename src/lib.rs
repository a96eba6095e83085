//! Translation-unit intelligence: parses Java, Python, C and C++ sources
//! into one syntax tree model, caches every parse by content and dependency
//! hashes, resolves names across files and keeps the result in a queryable
//! symbol index that serves completion and reference lookups.

pub mod ast;
pub mod cache;
pub mod completion;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod resolution;
pub mod storage;
pub mod symbol;
pub mod types;
pub mod unit;

pub use config::Settings;
pub use engine::{BuildReport, Engine, QueryFilter};
pub use error::{
    CacheError, CacheResult, ParseError, ParseResult, QueryError, QueryResult, TuError, TuResult,
};
pub use indexing::calculate_hash;
pub use storage::{IndexRecord, StorageError, StorageResult};
pub use symbol::{ReferenceKind, ReferenceTarget, ScopeContext, Symbol, SymbolReference};
pub use types::{
    CompactString, Diagnostic, Extent, Location, Position, Severity, SymbolId, SymbolKind,
    compact_string,
};
pub use unit::{CompileContext, SourceFile, TranslationUnit};
