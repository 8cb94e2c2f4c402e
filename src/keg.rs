//! A keg opened from one commit snapshot.
//!
//! [`Keg::open`] runs the locator once; the descriptor, dex and entries
//! are then read relative to the base directory it found. A `Keg` owns its
//! snapshot, so dropping it releases the clone.

use crate::descriptor::{parse_descriptor, KegDescriptor};
use crate::dex::{load_dex, Dex};
use crate::entry::resolve_entry;
use crate::error::{KegError, Result};
use crate::locate::{keg_path, locate, KEG_MARKER};
use crate::models::NodeId;
use crate::snapshot::Snapshot;

pub struct Keg {
    snapshot: Box<dyn Snapshot>,
    base: String,
}

impl Keg {
    /// Locates the keg inside `snapshot`, trying `search_paths` in order.
    pub async fn open(snapshot: Box<dyn Snapshot>, search_paths: &[String]) -> Result<Self> {
        let base = locate(snapshot.as_ref(), search_paths).await?;
        tracing::debug!(commit = %snapshot.commit(), base = %base, "opened keg");
        Ok(Self { snapshot, base })
    }

    /// Base directory of the keg; empty at the repository root.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn commit(&self) -> &str {
        self.snapshot.commit()
    }

    pub async fn descriptor(&self) -> Result<KegDescriptor> {
        let path = keg_path(&self.base, KEG_MARKER);
        let contents = self
            .snapshot
            .read_file(&path)
            .await?
            .ok_or(KegError::NoKegFound)?;
        Ok(parse_descriptor(&contents)?)
    }

    pub async fn dex(&self) -> Result<Dex> {
        load_dex(self.snapshot.as_ref(), &self.base).await
    }

    /// Markdown of entry `id`, whether or not the dex lists it.
    pub async fn entry(&self, id: NodeId) -> Result<String> {
        resolve_entry(self.snapshot.as_ref(), &self.base, id).await
    }

    /// Markdown of entry `id`, requiring it to be listed in the dex first.
    pub async fn indexed_entry(&self, id: NodeId) -> Result<String> {
        let dex = self.dex().await?;
        if dex.lookup(id).is_none() {
            return Err(KegError::EntryNotFound(id));
        }
        self.entry(id).await
    }
}
