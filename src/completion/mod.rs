//! Cursor queries: completion, references and go-to-definition
//!
//! Completion ranks visible symbols by scope proximity, then by name:
//! locals of enclosing functions, members of enclosing types, other
//! definitions of the same file, then definitions from other files.
//! Every query reports whether the index is stale for the file instead of
//! rebuilding it.

mod context;
mod service;

pub use service::{Completion, CompletionItem, CompletionService, Freshness, ReferenceSet};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between a query and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
