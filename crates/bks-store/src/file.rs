use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bks_schemas::SnapshotState;
use tracing::{debug, info, warn};

use crate::{decode_snapshot, encode_snapshot, SnapshotStore, StoreError};

/// Snapshot persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling temp file the next write goes through.
    pub fn temp_path(&self) -> PathBuf {
        let mut s: OsString = self.path.as_os_str().to_owned();
        s.push(".tmp");
        PathBuf::from(s)
    }

    /// First half of an atomic save: write + fsync the temp file.
    ///
    /// The target file is untouched until [`StagedSnapshot::commit`].
    pub fn stage(&self, snapshot: &SnapshotState) -> Result<StagedSnapshot, StoreError> {
        let bytes = encode_snapshot(snapshot)?;
        let tmp = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err("create_dir", parent, e))?;
        }

        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| io_err("open_temp", &tmp, e))?;
        f.write_all(&bytes).map_err(|e| io_err("write_temp", &tmp, e))?;
        f.sync_all().map_err(|e| io_err("fsync_temp", &tmp, e))?;

        Ok(StagedSnapshot {
            temp_path: tmp,
            target: self.path.clone(),
            entries: snapshot.len(),
        })
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<SnapshotState, StoreError> {
        let tmp = self.temp_path();
        if tmp.exists() {
            warn!(
                path = %tmp.display(),
                "ignoring leftover snapshot temp file from an interrupted write"
            );
        }

        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no snapshot yet; starting from empty state");
                return Ok(SnapshotState::empty());
            }
            Err(e) => return Err(io_err("read", &self.path, e)),
        };

        let snap = decode_snapshot(&bytes, &self.path)?;
        debug!(path = %self.path.display(), entries = snap.len(), "snapshot loaded");
        Ok(snap)
    }

    fn save(&self, snapshot: &SnapshotState) -> Result<(), StoreError> {
        self.stage(snapshot)?.commit()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A fully written, fsynced temp file waiting to replace the target.
///
/// Dropping it without calling [`commit`](StagedSnapshot::commit) leaves the
/// target untouched, which is exactly the state a crash at this point leaves
/// behind.
#[must_use = "a staged snapshot is not persisted until commit() is called"]
#[derive(Debug)]
pub struct StagedSnapshot {
    temp_path: PathBuf,
    target: PathBuf,
    entries: usize,
}

impl StagedSnapshot {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Rename the temp file over the target and fsync the directory.
    pub fn commit(self) -> Result<(), StoreError> {
        fs::rename(&self.temp_path, &self.target)
            .map_err(|e| io_err("rename", &self.target, e))?;
        sync_parent_dir(&self.target);
        debug!(
            path = %self.target.display(),
            entries = self.entries,
            "snapshot committed"
        );
        Ok(())
    }

    /// Remove the temp file without touching the target.
    pub fn abort(self) -> Result<(), StoreError> {
        fs::remove_file(&self.temp_path).map_err(|e| io_err("remove_temp", &self.temp_path, e))
    }
}

fn io_err(op: &'static str, path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        op,
        path: path.to_path_buf(),
        source,
    }
}

/// Best effort: directory fsync is not supported on every platform.
fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    if let Err(e) = File::open(parent).and_then(|d| d.sync_all()) {
        debug!(dir = %parent.display(), error = %e, "directory fsync skipped");
    }
}
