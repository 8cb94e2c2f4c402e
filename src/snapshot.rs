//! Read-only view of one commit's file tree.
//!
//! The [`Snapshot`] trait is the seam between fetching a repository and
//! reading a keg out of it. [`connector_git`](crate::connector_git)
//! produces snapshots backed by a transient clone; [`MemorySnapshot`]
//! holds files in a map and is used for fixtures and tests.
//!
//! Paths are repository-relative and `/`-separated, without a leading
//! slash (`docs/keg`, `42/README.md`).

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

/// A queryable file tree of a single commit.
///
/// Implementations must be `Send + Sync`; a snapshot is owned by one
/// request and dropped when the request completes.
#[async_trait]
pub trait Snapshot: Send + Sync {
    /// Hash of the commit this tree belongs to.
    fn commit(&self) -> &str;

    /// Contents of the file at `path`, or `None` if no file exists there.
    ///
    /// Directories are reported as absent.
    async fn read_file(&self, path: &str) -> Result<Option<String>>;

    /// Whether a file exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.read_file(path).await?.is_some())
    }
}

/// In-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    commit: String,
    files: HashMap<String, String>,
}

impl MemorySnapshot {
    pub fn new(commit: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            files: HashMap::new(),
        }
    }

    /// Adds (or replaces) a file, returning `self` for chaining.
    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

#[async_trait]
impl Snapshot for MemorySnapshot {
    fn commit(&self) -> &str {
        &self.commit
    }

    async fn read_file(&self, path: &str) -> Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }
}
