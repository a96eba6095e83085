//! On-disk parse cache, one entry per source file
//!
//! Entries are bincode-encoded, lz4-compressed and written atomically, so
//! a crash mid-write leaves either the old entry or the new one. Anything
//! that fails to decode is reported as [`CacheError::Corruption`] and the
//! builder treats it as missing.
//!
//! [`CacheError::Corruption`]: crate::error::CacheError::Corruption

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, CacheState};
pub use store::{CacheStats, CacheStore};
