//! Python language parser implementation

pub mod definition;
pub mod parser;

pub use definition::PythonLanguage;
pub use parser::PythonParser;

// Re-export for registry registration
pub(crate) use definition::register;
