// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Incremental, viewport-driven highlighting.
//!
//! Each code block owns a [`HighlightScheduler`] that tokenizes just enough
//! lines to cover what the viewport shows. Tokenizer calls run on a shared
//! [`Spawner`] and come back tagged with an epoch; results from superseded
//! requests are dropped when they arrive.

pub mod cache;
pub mod debounce;
pub mod scheduler;
pub mod worker;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use cache::HighlightCache;
pub use debounce::Debouncer;
pub use scheduler::{HighlightScheduler, TickOutcome};
pub use worker::{InlineSpawner, Spawner, TokenizeJob, TokenizeOutcome, WorkerPool, run_job};

static NEXT_CALLER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one code block instance.
///
/// Namespaces highlight results and row measurements so that blocks showing
/// identical text never share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerId(u64);

impl CallerId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CALLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_ids_are_unique() {
        let a = CallerId::next();
        let b = CallerId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
        assert_eq!(a.to_string(), format!("code-{}", a.get()));
    }
}
