//! bks-journal
//!
//! Append-only record of sync cycles. JSON Lines, one entry per line.
//!
//! Every cycle writes `cycle_started`, one `action_result` per action and
//! then `cycle_finished` or `cycle_failed`. With the hash chain enabled each
//! entry carries `hash_prev` (the previous entry's `hash_self`) and its own
//! `hash_self`, so edits to earlier lines are detectable with
//! [`verify_hash_chain`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const EVENT_CYCLE_STARTED: &str = "cycle_started";
pub const EVENT_ACTION_RESULT: &str = "action_result";
pub const EVENT_CYCLE_FINISHED: &str = "cycle_finished";
pub const EVENT_CYCLE_FAILED: &str = "cycle_failed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub cycle_id: Uuid,
    pub seq: u64,
    pub ts_utc: DateTime<Utc>,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

pub struct JournalWriter {
    path: PathBuf,
    hash_chain: bool,
    last_hash: Option<String>,
    seq: u64,
}

impl JournalWriter {
    /// Creates the writer and ensures parent dirs exist.
    ///
    /// If the file already holds entries, the sequence counter and chain head
    /// resume from its last line so appends continue the same chain.
    pub fn open(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create_dir_all {:?}", parent))?;
            }
        }

        let mut w = Self {
            path,
            hash_chain,
            last_hash: None,
            seq: 0,
        };

        if w.path.exists() {
            let entries = read_entries(&w.path)?;
            w.seq = entries.last().map(|e| e.seq + 1).unwrap_or(0);
            w.last_hash = entries.last().and_then(|e| e.hash_self.clone());
        }

        Ok(w)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    /// Sequence number the next entry will get.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn append(
        &mut self,
        cycle_id: Uuid,
        event_type: &str,
        payload: Value,
    ) -> Result<JournalEntry> {
        let mut entry = JournalEntry {
            entry_id: Uuid::new_v4(),
            cycle_id,
            seq: self.seq,
            ts_utc: Utc::now(),
            event_type: event_type.to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            entry.hash_prev = self.last_hash.clone();
            entry.hash_self = Some(compute_entry_hash(&entry)?);
        }

        let line = canonical_json_line(&entry)?;
        append_line(&self.path, &line)?;

        self.seq += 1;
        if self.hash_chain {
            self.last_hash = entry.hash_self.clone();
        }
        Ok(entry)
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open journal {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write journal line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Compact JSON with object keys sorted at every depth.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize journal entry failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sort_keys(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// SHA-256 over the canonical line of the entry with `hash_self` cleared.
pub fn compute_entry_hash(entry: &JournalEntry) -> Result<String> {
    let mut unsigned = entry.clone();
    unsigned.hash_self = None;

    let canonical = canonical_json_line(&unsigned)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Parse every non-blank line of a journal file.
pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<JournalEntry>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read journal {:?}", path.as_ref()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            serde_json::from_str(l.trim())
                .with_context(|| format!("parse journal entry at line {}", i + 1))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}

pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read journal {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Same as [`verify_hash_chain`] over in-memory JSONL.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut lines = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let entry: JournalEntry = serde_json::from_str(trimmed)
            .with_context(|| format!("parse journal entry at line {}", i + 1))?;
        lines += 1;

        if entry.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, entry.hash_prev
                ),
            });
        }

        if let Some(claimed) = &entry.hash_self {
            let recomputed = compute_entry_hash(&entry)?;
            if *claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {}, recomputed {}",
                        claimed, recomputed
                    ),
                });
            }
        }

        prev_hash = entry.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_line_sorts_nested_keys() {
        let v = json!({"b": 1, "a": {"z": 0, "y": [{"d": 1, "c": 2}]}});
        assert_eq!(
            canonical_json_line(&v).unwrap(),
            r#"{"a":{"y":[{"c":2,"d":1}],"z":0},"b":1}"#
        );
    }

    #[test]
    fn unchained_entries_carry_no_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = JournalWriter::open(dir.path().join("j.jsonl"), false).unwrap();
        let e = w
            .append(Uuid::new_v4(), EVENT_CYCLE_STARTED, json!({}))
            .unwrap();
        assert!(e.hash_prev.is_none() && e.hash_self.is_none());
        assert_eq!(w.seq(), 1);
    }
}
