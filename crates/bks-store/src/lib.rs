//! bks-store
//!
//! Persistence for the reconciled snapshot between sync cycles.
//!
//! # Contract
//! - Absent file → empty snapshot (first run).
//! - Malformed file → [`StoreError::Malformed`]. Never treated as empty:
//!   losing history would make every listed item look "changed" next cycle.
//! - Writes go to `<file>.tmp`, are fsynced, then renamed over the target.
//!   Readers observe either the old or the new file, never a partial one.

mod codec;
mod file;
mod memory;

pub use codec::{decode_snapshot, encode_snapshot};
pub use file::{FileSnapshotStore, StagedSnapshot};
pub use memory::MemorySnapshotStore;

use std::path::PathBuf;

use bks_schemas::SnapshotState;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot {op} failed for {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot file {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("snapshot encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreError::Malformed { .. })
    }
}

/// Load/save seam used by the orchestrator.
pub trait SnapshotStore: Send + Sync {
    /// Last persisted snapshot, or an empty one if nothing was ever saved.
    fn load(&self) -> Result<SnapshotState, StoreError>;

    /// Replace the persisted snapshot atomically.
    fn save(&self, snapshot: &SnapshotState) -> Result<(), StoreError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}
