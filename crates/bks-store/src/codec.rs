use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use bks_schemas::{ItemKey, SnapshotState};
use serde::de::{Deserialize, Deserializer, Error as _, MapAccess, Visitor};
use serde_json::Value;

use crate::StoreError;

/// Canonical persisted bytes: pretty JSON object keyed by `"catalog:color"`,
/// sorted by key string, trailing newline.
///
/// Identical snapshots always encode to identical bytes.
pub fn encode_snapshot(snapshot: &SnapshotState) -> Result<Vec<u8>, StoreError> {
    let wire: BTreeMap<String, u32> = snapshot
        .iter()
        .map(|(k, v)| (k.to_storage_key(), v))
        .collect();
    let mut out = serde_json::to_vec_pretty(&wire).map_err(StoreError::Encode)?;
    out.push(b'\n');
    Ok(out)
}

/// Top-level object entries in file order. A repeated raw key is an error,
/// not last-wins.
struct WireEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for WireEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = WireEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of \"catalog:color\" keys to quantities")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<WireEntries, A::Error> {
                let mut seen = BTreeSet::new();
                let mut entries = Vec::new();
                while let Some((key, qty)) = map.next_entry::<String, serde_json::Value>()? {
                    if !seen.insert(key.clone()) {
                        return Err(A::Error::custom(format!("key '{key}' appears more than once")));
                    }
                    entries.push((key, qty));
                }
                Ok(WireEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parse persisted bytes. `path` is only used for error context.
pub fn decode_snapshot(bytes: &[u8], path: &Path) -> Result<SnapshotState, StoreError> {
    let malformed = |reason: String| StoreError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let WireEntries(wire) =
        serde_json::from_slice(bytes).map_err(|e| malformed(format!("invalid snapshot: {e}")))?;

    let mut entries: BTreeMap<ItemKey, u32> = BTreeMap::new();
    for (raw_key, raw_qty) in wire {
        let key = ItemKey::from_storage_key(&raw_key).map_err(|e| malformed(e.to_string()))?;

        let qty = raw_qty
            .as_u64()
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| {
                malformed(format!(
                    "quantity for '{raw_key}' is not a non-negative integer: {raw_qty}"
                ))
            })?;

        if entries.insert(key.clone(), qty).is_some() {
            return Err(malformed(format!(
                "'{raw_key}' duplicates item key {key}"
            )));
        }
    }

    Ok(entries.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> &'static Path {
        Path::new("state.json")
    }

    #[test]
    fn encode_is_sorted_pretty_with_newline() {
        let snap: SnapshotState = [
            (ItemKey::new("3003", 1), 2),
            (ItemKey::new("3001", 5), 8),
        ]
        .into_iter()
        .collect();

        let bytes = encode_snapshot(&snap).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "{\n  \"3001:5\": 8,\n  \"3003:1\": 2\n}\n");
    }

    #[test]
    fn decode_accepts_empty_object() {
        let snap = decode_snapshot(b"{}", p()).unwrap();
        assert!(snap.is_empty());
    }

    #[test]
    fn decode_rejects_non_object() {
        let err = decode_snapshot(b"[1,2]", p()).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn decode_rejects_negative_and_fractional_quantities() {
        assert!(decode_snapshot(br#"{"3001:5": -1}"#, p()).unwrap_err().is_malformed());
        assert!(decode_snapshot(br#"{"3001:5": 1.5}"#, p()).unwrap_err().is_malformed());
        assert!(decode_snapshot(br#"{"3001:5": "4"}"#, p()).unwrap_err().is_malformed());
    }

    #[test]
    fn decode_rejects_keys_that_collide_after_parsing() {
        let err = decode_snapshot(br#"{"3001:5": 1, "3001:05": 2}"#, p()).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("duplicates"));
    }

    #[test]
    fn decode_rejects_repeated_raw_key() {
        let err = decode_snapshot(br#"{"3001:5": 1, "3001:5": 9}"#, p()).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("'3001:5' appears more than once"), "{err}");
    }

    #[test]
    fn decode_rejects_truncated_file() {
        let err = decode_snapshot(b"{\n  \"3001:5\": 8,\n  \"30", p()).unwrap_err();
        assert!(err.is_malformed());
    }
}
