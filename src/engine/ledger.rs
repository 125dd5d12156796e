//! In-memory set of source files that already have a destination copy.
//!
//! Identity is the full source path string, never content. Entries are never removed and nothing is
//! persisted; a restart starts empty and the backlog scan rebuilds it.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Concurrency-safe ledger shared by the backlog scan and every live watcher.
///
/// A single mutex guards the whole set. Callers that must make "check, copy, insert" atomic per path
/// hold a [`LedgerGuard`] from [`ProcessedLedger::lock`] for the whole sequence; this serializes
/// copies across lines as well.
#[derive(Debug, Default)]
pub struct ProcessedLedger {
    paths: Mutex<HashSet<String>>,
}

/// Exclusive access to the ledger for one check-and-copy sequence.
pub struct LedgerGuard<'a> {
    paths: MutexGuard<'a, HashSet<String>>,
}

pub fn ledger_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl ProcessedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the ledger lock. A panic in another holder leaves the set valid, so poisoning is ignored.
    pub fn lock(&self) -> LedgerGuard<'_> {
        LedgerGuard {
            paths: self.paths.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// Returns false when the path was already present.
    pub fn insert(&self, path: &Path) -> bool {
        self.lock().insert(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the recorded paths.
    pub fn snapshot(&self) -> Vec<String> {
        let guard = self.lock();
        let mut out: Vec<String> = guard.paths.iter().cloned().collect();
        out.sort();
        out
    }
}

impl LedgerGuard<'_> {
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(&ledger_key(path))
    }

    pub fn insert(&mut self, path: &Path) -> bool {
        self.paths.insert(ledger_key(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
