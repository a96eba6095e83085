//! C and C++ front end built on clang's JSON AST dump

pub mod definition;
pub mod nodes;
pub mod parser;

pub use definition::{CLanguage, CppLanguage};
pub use parser::{ClangParser, Dialect};

// Re-export for registry registration
pub(crate) use definition::register;
