//! Java language parser implementation

pub mod definition;
pub mod parser;

pub use definition::JavaLanguage;
pub use parser::JavaParser;

// Re-export for registry registration
pub(crate) use definition::register;
