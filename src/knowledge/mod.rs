//! Knowledge base of question/answer pairs.
//!
//! The store hands out immutable snapshots. A reload parses the source into a
//! fresh snapshot first and only then swaps the shared reference, so readers
//! always see one whole generation.

mod loader;
mod samples;

pub use loader::{load, parse_csv};
pub use samples::sample_entries;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::info;

/// A single question and its canned answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
}

impl KnowledgeEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Where a snapshot's entries came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Parsed from a CSV file.
    File(PathBuf),
    /// Built-in sample set, used when the source is unusable.
    Samples,
}

impl std::fmt::Display for SnapshotOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotOrigin::File(path) => write!(f, "{}", path.display()),
            SnapshotOrigin::Samples => write!(f, "built-in samples"),
        }
    }
}

/// An ordered, immutable generation of the knowledge base.
#[derive(Debug, Clone)]
pub struct KnowledgeSnapshot {
    entries: Vec<KnowledgeEntry>,
    origin: SnapshotOrigin,
    loaded_at: DateTime<Utc>,
    generation: u64,
}

impl KnowledgeSnapshot {
    pub fn new(entries: Vec<KnowledgeEntry>, origin: SnapshotOrigin) -> Self {
        Self {
            entries,
            origin,
            loaded_at: Utc::now(),
            generation: 0,
        }
    }

    /// A snapshot with no entries.
    pub fn empty() -> Self {
        Self::new(Vec::new(), SnapshotOrigin::Samples)
    }

    /// The built-in sample snapshot.
    pub fn samples() -> Self {
        Self::new(sample_entries(), SnapshotOrigin::Samples)
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn origin(&self) -> &SnapshotOrigin {
        &self.origin
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Monotonic counter assigned when the store installs the snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Holds the current knowledge snapshot and swaps it on reload.
pub struct KnowledgeStore {
    source: Option<PathBuf>,
    current: RwLock<Arc<KnowledgeSnapshot>>,
}

impl KnowledgeStore {
    /// Open a store backed by a CSV file. Never fails; an unusable source
    /// yields the sample set.
    pub fn open(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let snapshot = load(&source);
        Self::with_source(Some(source), snapshot)
    }

    /// Create a store around a fixed snapshot with no backing file.
    pub fn from_snapshot(snapshot: KnowledgeSnapshot) -> Self {
        Self::with_source(None, snapshot)
    }

    fn with_source(source: Option<PathBuf>, mut snapshot: KnowledgeSnapshot) -> Self {
        snapshot.generation = 1;
        info!(
            "Knowledge base ready: {} entries from {}",
            snapshot.len(),
            snapshot.origin()
        );
        Self {
            source,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The configured source file, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The latest snapshot. Holding the returned `Arc` pins that generation.
    pub fn current(&self) -> Arc<KnowledgeSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Re-read the backing source and install the result.
    ///
    /// Stores without a source reinstall the current entries under a new
    /// generation.
    pub fn reload(&self) -> Arc<KnowledgeSnapshot> {
        let snapshot = match &self.source {
            Some(path) => load(path),
            None => {
                let current = self.current();
                KnowledgeSnapshot::new(current.entries.clone(), current.origin.clone())
            }
        };
        self.install(snapshot)
    }

    /// Swap in a prebuilt snapshot, returning the installed generation.
    pub fn install(&self, mut snapshot: KnowledgeSnapshot) -> Arc<KnowledgeSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        snapshot.generation = guard.generation + 1;
        let installed = Arc::new(snapshot);
        *guard = Arc::clone(&installed);
        drop(guard);

        info!(
            "Installed knowledge generation {} ({} entries from {})",
            installed.generation(),
            installed.len(),
            installed.origin()
        );
        installed
    }
}
