//! Incremental building of translation units
//!
//! [`IncrementalBuilder`] turns [`SourceFile`]s into cached
//! [`TranslationUnit`]s; [`FileWalker`] expands directories into the files
//! enabled languages can parse.
//!
//! [`SourceFile`]: crate::unit::SourceFile
//! [`TranslationUnit`]: crate::unit::TranslationUnit

pub mod builder;
pub mod file_info;
pub mod progress;
pub mod walker;

pub use builder::{BatchResult, BuildOptions, BuildStatus, FileOutcome, IncrementalBuilder};
pub use file_info::{calculate_hash, get_utc_timestamp, hash_file};
pub use progress::BuildStats;
pub use walker::FileWalker;
