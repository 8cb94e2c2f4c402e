//! Entry content lookup.
//!
//! Each keg entry lives in a directory named after its id, with its
//! content in `README.md`.

use crate::error::{KegError, Result};
use crate::locate::keg_path;
use crate::models::NodeId;
use crate::snapshot::Snapshot;

/// Repository-relative path of an entry's Markdown file.
pub fn entry_path(base: &str, id: NodeId) -> String {
    keg_path(base, &format!("{}/README.md", id))
}

/// Reads the Markdown of entry `id` from the keg rooted at `base`.
pub async fn resolve_entry(snapshot: &dyn Snapshot, base: &str, id: NodeId) -> Result<String> {
    let path = entry_path(base, id);
    snapshot
        .read_file(&path)
        .await?
        .ok_or(KegError::EntryNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MemorySnapshot;

    #[test]
    fn test_entry_path_at_root() {
        assert_eq!(entry_path("", 42), "42/README.md");
    }

    #[test]
    fn test_entry_path_under_docs() {
        assert_eq!(entry_path("docs", 42), "docs/42/README.md");
    }

    #[tokio::test]
    async fn test_resolve_existing_entry() {
        let snap = MemorySnapshot::new("abc").with_file("docs/3/README.md", "# Three\n");
        let md = resolve_entry(&snap, "docs", 3).await.unwrap();
        assert_eq!(md, "# Three\n");
    }

    #[tokio::test]
    async fn test_resolve_missing_entry() {
        let snap = MemorySnapshot::new("abc").with_file("3/README.md", "# Three\n");
        let err = resolve_entry(&snap, "docs", 3).await.unwrap_err();
        assert!(matches!(err, KegError::EntryNotFound(3)));
    }
}
