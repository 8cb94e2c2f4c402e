//! Keg root discovery.
//!
//! A keg is marked by a file named `keg` in its base directory. Candidate
//! base directories are tried in order and the first one holding the
//! marker wins. The default order puts the repository root ahead of
//! `docs/`.

use crate::error::{KegError, Result};
use crate::snapshot::Snapshot;

/// Name of the keg root marker (and descriptor) file.
pub const KEG_MARKER: &str = "keg";

/// Default candidate base directories, in priority order.
pub fn default_search_paths() -> Vec<String> {
    vec![String::new(), "docs".to_string()]
}

/// Joins a keg-relative path onto a base directory.
///
/// An empty base means the keg lives at the repository root.
pub fn keg_path(base: &str, relative: &str) -> String {
    if base.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", base, relative)
    }
}

/// Returns the first candidate whose `keg` marker exists.
///
/// `Ok("")` means the repository root, which is distinct from
/// [`KegError::NoKegFound`].
pub async fn locate(snapshot: &dyn Snapshot, search_paths: &[String]) -> Result<String> {
    for candidate in search_paths {
        let base = candidate.trim_matches('/');
        let marker = keg_path(base, KEG_MARKER);

        tracing::debug!(candidate = %base, path = %marker, "searching for keg");
        if snapshot.exists(&marker).await? {
            tracing::debug!(base = %base, "keg found");
            return Ok(base.to_string());
        }
    }

    Err(KegError::NoKegFound)
}
