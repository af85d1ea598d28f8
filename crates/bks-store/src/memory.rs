use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use bks_schemas::SnapshotState;

use crate::{SnapshotStore, StoreError};

/// In-process store for tests and dry runs.
///
/// Holds `None` until the first save so "never saved" stays distinguishable.
/// Saves can be forced to fail to exercise persistence error paths.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    state: Mutex<Option<SnapshotState>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: SnapshotState) -> Self {
        Self {
            state: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<SnapshotState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<SnapshotState, StoreError> {
        Ok(self.current().unwrap_or_default())
    }

    fn save(&self, snapshot: &SnapshotState) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                op: "write_temp",
                path: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::Other, "injected save failure"),
            });
        }
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
