//! Wire adapters: provider inventory payloads → [`Inventory`].
//!
//! Pure, deterministic conversion. No IO.
//!
//! Side A payloads follow the BrickLink store API shape
//! (`data[].{inventory_id, item.no, color_id, quantity}`); side B payloads
//! follow the BrickOwl shape (`items[].{item_id, part_num, colour_id,
//! quantity}`). Unknown fields are ignored so provider API additions do not
//! break decoding.

use std::fmt;
use std::str::FromStr;

use bks_schemas::{Inventory, InventoryRecord, ItemKey};
use serde::{Deserialize, Serialize};

use crate::ProviderError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("listing '{external_id}' has an empty catalog number")]
    EmptyCatalogNumber { external_id: String },

    #[error("listing for item '{catalog_number}' has an empty id")]
    EmptyExternalId { catalog_number: String },

    #[error("listing '{external_id}' has color id {color_id} outside 0..=u32::MAX")]
    InvalidColorId { external_id: String, color_id: i64 },

    #[error("listing '{external_id}' has quantity {quantity} outside 0..=u32::MAX")]
    InvalidQuantity { external_id: String, quantity: i64 },

    #[error("item {key} is listed twice (ids '{first}' and '{second}')")]
    DuplicateKey {
        key: ItemKey,
        first: String,
        second: String,
    },
}

// ---------------------------------------------------------------------------
// Raw payloads
// ---------------------------------------------------------------------------

/// Listing ids arrive as JSON numbers from one provider and strings from the
/// other; both are kept as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawId {
    Num(u64),
    Str(String),
}

impl RawId {
    pub fn into_string(self) -> String {
        match self {
            RawId::Num(n) => n.to_string(),
            RawId::Str(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBrickLinkItem {
    pub no: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBrickLinkEntry {
    pub inventory_id: RawId,
    pub item: RawBrickLinkItem,
    pub color_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBrickLinkInventory {
    pub data: Vec<RawBrickLinkEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBrickOwlEntry {
    pub item_id: RawId,
    pub part_num: String,
    pub colour_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBrickOwlInventory {
    pub items: Vec<RawBrickOwlEntry>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn insert_listing(
    out: &mut Inventory,
    external_id: String,
    catalog_number: &str,
    color_id: i64,
    quantity: i64,
) -> Result<(), AdapterError> {
    let catalog_number = catalog_number.trim();
    if catalog_number.is_empty() {
        return Err(AdapterError::EmptyCatalogNumber { external_id });
    }
    if external_id.is_empty() {
        return Err(AdapterError::EmptyExternalId {
            catalog_number: catalog_number.to_string(),
        });
    }
    let color_id = u32::try_from(color_id).map_err(|_| AdapterError::InvalidColorId {
        external_id: external_id.clone(),
        color_id,
    })?;
    let quantity = u32::try_from(quantity).map_err(|_| AdapterError::InvalidQuantity {
        external_id: external_id.clone(),
        quantity,
    })?;

    let key = ItemKey::new(catalog_number, color_id);
    if let Some(existing) = out.get(&key) {
        return Err(AdapterError::DuplicateKey {
            key,
            first: existing.external_id.to_string(),
            second: external_id,
        });
    }
    out.insert(key, InventoryRecord::new(external_id, quantity));
    Ok(())
}

pub fn normalize_bricklink(raw: RawBrickLinkInventory) -> Result<Inventory, AdapterError> {
    let mut out = Inventory::new();
    for e in raw.data {
        insert_listing(
            &mut out,
            e.inventory_id.into_string(),
            &e.item.no,
            e.color_id,
            e.quantity,
        )?;
    }
    Ok(out)
}

pub fn normalize_brickowl(raw: RawBrickOwlInventory) -> Result<Inventory, AdapterError> {
    let mut out = Inventory::new();
    for e in raw.items {
        insert_listing(
            &mut out,
            e.item_id.into_string(),
            &e.part_num,
            e.colour_id,
            e.quantity,
        )?;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Format selection
// ---------------------------------------------------------------------------

/// Which payload shape a source speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    BrickLink,
    BrickOwl,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::BrickLink => "bricklink",
            WireFormat::BrickOwl => "brickowl",
        }
    }

    /// JSON array holding the listings.
    pub(crate) fn list_field(&self) -> &'static str {
        match self {
            WireFormat::BrickLink => "data",
            WireFormat::BrickOwl => "items",
        }
    }

    /// Listing id field inside each entry.
    pub(crate) fn id_field(&self) -> &'static str {
        match self {
            WireFormat::BrickLink => "inventory_id",
            WireFormat::BrickOwl => "item_id",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bricklink" | "bl" => Ok(WireFormat::BrickLink),
            "brickowl" | "bo" => Ok(WireFormat::BrickOwl),
            other => Err(format!(
                "unknown wire format '{other}'; expected one of: bricklink | brickowl"
            )),
        }
    }
}

/// Decode a full inventory payload in the given format.
pub fn parse_inventory(format: WireFormat, raw: &str) -> Result<Inventory, ProviderError> {
    let inv = match format {
        WireFormat::BrickLink => {
            let payload: RawBrickLinkInventory = serde_json::from_str(raw)
                .map_err(|e| ProviderError::Decode(format!("bricklink payload: {e}")))?;
            normalize_bricklink(payload)?
        }
        WireFormat::BrickOwl => {
            let payload: RawBrickOwlInventory = serde_json::from_str(raw)
                .map_err(|e| ProviderError::Decode(format!("brickowl payload: {e}")))?;
            normalize_brickowl(payload)?
        }
    };
    Ok(inv)
}
