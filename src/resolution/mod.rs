//! Cross-file symbol resolution
//!
//! Parsers leave every reference tagged with a name only. The resolver
//! keeps the current unit of every file in a [`ProjectSymbolTable`] and
//! binds each reference to one definition:
//!
//! 1. definitions whose kind fits the use (calls need callables, type uses
//!    need types) and that are visible from the use site
//! 2. members of the receiver's type, when the parser knew it
//! 3. a definition in the same file (enclosing locals first)
//! 4. a definition in a file reached through the file's imports or includes
//! 5. the lexicographically first defining file
//!
//! References that match nothing stay unresolved and are retried whenever
//! a later batch defines their name.

mod resolver;
mod table;

pub use resolver::{ResolutionDelta, SymbolResolver};
pub use table::ProjectSymbolTable;
