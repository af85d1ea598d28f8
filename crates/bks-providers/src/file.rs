//! Offline provider backed by a JSON file in the provider's own payload
//! format.
//!
//! Fetch decodes the file with [`parse_inventory`]. Updates rewrite the
//! `quantity` field of the matching listing and replace the file via a temp
//! file + rename, leaving every other field as it was.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bks_schemas::{ExternalId, Inventory};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::wire::RawId;
use crate::{parse_inventory, InventoryReader, InventoryWriter, ProviderError, WireFormat};

#[derive(Debug)]
pub struct JsonFileProvider {
    name: String,
    path: PathBuf,
    format: WireFormat,
    write_lock: Mutex<()>,
}

impl JsonFileProvider {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, format: WireFormat) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            format,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_raw(&self) -> Result<String, ProviderError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ProviderError::Transport(format!("read {}: {e}", self.path.display())))
    }
}

fn id_matches(entry: &Value, field: &str, id: &ExternalId) -> bool {
    entry
        .get(field)
        .cloned()
        .and_then(|v| serde_json::from_value::<RawId>(v).ok())
        .map(|raw| raw.into_string() == id.as_str())
        .unwrap_or(false)
}

#[async_trait]
impl InventoryReader for JsonFileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_inventory(&self) -> Result<Inventory, ProviderError> {
        let raw = self.read_raw().await?;
        parse_inventory(self.format, &raw)
    }
}

#[async_trait]
impl InventoryWriter for JsonFileProvider {
    async fn update_quantity(&self, id: &ExternalId, quantity: u32) -> Result<(), ProviderError> {
        let _guard = self.write_lock.lock().await;

        let raw = self.read_raw().await?;
        let mut doc: Value = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::Decode(format!("{}: {e}", self.path.display())))?;

        let list_field = self.format.list_field();
        let id_field = self.format.id_field();
        let entries = doc
            .get_mut(list_field)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| {
                ProviderError::Decode(format!(
                    "{}: missing '{list_field}' array",
                    self.path.display()
                ))
            })?;

        let entry = entries
            .iter_mut()
            .find(|e| id_matches(e, id_field, id))
            .ok_or_else(|| ProviderError::UnknownListing(id.clone()))?;
        entry["quantity"] = Value::from(quantity);

        let mut out = serde_json::to_vec_pretty(&doc)
            .map_err(|e| ProviderError::Decode(format!("encode: {e}")))?;
        out.push(b'\n');

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &out)
            .await
            .map_err(|e| ProviderError::Transport(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ProviderError::Transport(format!("rename {}: {e}", self.path.display())))?;

        debug!(provider = %self.name, id = %id, quantity, "listing quantity written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bks_schemas::ItemKey;
    use tempfile::TempDir;

    const BO: &str = r#"{"items": [
        {"item_id": "7781", "part_num": "3001", "colour_id": 5, "quantity": 3, "price": "0.12"}
    ]}"#;

    #[tokio::test]
    async fn update_rewrites_quantity_and_keeps_other_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brickowl.json");
        std::fs::write(&path, BO).unwrap();

        let p = JsonFileProvider::new("brickowl", &path, WireFormat::BrickOwl);
        p.update_quantity(&ExternalId::new("7781"), 9).await.unwrap();

        let inv = p.fetch_inventory().await.unwrap();
        assert_eq!(inv[&ItemKey::new("3001", 5)].quantity, 9);

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["items"][0]["price"], "0.12");
    }

    #[tokio::test]
    async fn update_unknown_listing_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brickowl.json");
        std::fs::write(&path, BO).unwrap();

        let p = JsonFileProvider::new("brickowl", &path, WireFormat::BrickOwl);
        let err = p.update_quantity(&ExternalId::new("1"), 9).await.unwrap_err();

        assert_eq!(err, ProviderError::UnknownListing(ExternalId::new("1")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), BO);
    }

    #[tokio::test]
    async fn missing_file_is_transport_error() {
        let dir = TempDir::new().unwrap();
        let p = JsonFileProvider::new("bricklink", dir.path().join("absent.json"), WireFormat::BrickLink);
        assert!(matches!(
            p.fetch_inventory().await.unwrap_err(),
            ProviderError::Transport(_)
        ));
    }
}
