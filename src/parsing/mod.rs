pub mod clang;
pub mod collector;
pub mod context;
pub mod java;
pub mod parser;
pub mod python;
pub mod registry;

pub use clang::{ClangParser, Dialect};
pub use collector::UnitCollector;
pub use context::{ParserContext, ScopeType};
pub use java::JavaParser;
pub use parser::{LanguageParser, ParseInput};
pub use python::PythonParser;
pub use registry::{LanguageDefinition, LanguageId, LanguageRegistry, RegistryError, get_registry};
