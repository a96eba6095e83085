//! Persistent symbol index
//!
//! A tantivy index holding one document per definition, one per reference
//! and one per indexed file. Writes replace whole files inside a single
//! commit; readers search the last committed snapshot.

pub mod error;
pub mod index;

pub use error::{StorageError, StorageResult};
pub use index::{FileRows, IndexBatch, IndexRecord, IndexStats, ReferenceRow, SymbolIndex};
