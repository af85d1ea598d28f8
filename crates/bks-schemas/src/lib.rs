//! bks-schemas
//!
//! Shared value types for both inventory sides, the reconciliation engine
//! and the snapshot store. No IO, no provider logic.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ItemKey
// ---------------------------------------------------------------------------

/// Logical item identity shared by both providers: catalog number + color.
///
/// Ordering is (catalog_number, color_id), which is the iteration order used
/// everywhere a deterministic walk over items is required.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub catalog_number: String,
    pub color_id: u32,
}

impl ItemKey {
    pub fn new(catalog_number: impl Into<String>, color_id: u32) -> Self {
        Self {
            catalog_number: catalog_number.into(),
            color_id,
        }
    }

    /// Stable persisted form: `"catalog_number:color_id"`.
    pub fn to_storage_key(&self) -> String {
        self.to_string()
    }

    /// Inverse of [`ItemKey::to_storage_key`].
    ///
    /// Splits on the last `:` so catalog numbers that themselves contain a
    /// colon still round-trip.
    pub fn from_storage_key(raw: &str) -> Result<Self, ItemKeyParseError> {
        let (catalog, color) = raw
            .rsplit_once(':')
            .ok_or_else(|| ItemKeyParseError::MissingSeparator(raw.to_string()))?;
        if catalog.is_empty() {
            return Err(ItemKeyParseError::EmptyCatalogNumber(raw.to_string()));
        }
        let color_id = color
            .parse::<u32>()
            .map_err(|_| ItemKeyParseError::InvalidColorId(raw.to_string()))?;
        Ok(Self::new(catalog, color_id))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.catalog_number, self.color_id)
    }
}

impl FromStr for ItemKey {
    type Err = ItemKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_storage_key(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemKeyParseError {
    #[error("item key '{0}' has no ':' separator")]
    MissingSeparator(String),
    #[error("item key '{0}' has an empty catalog number")]
    EmptyCatalogNumber(String),
    #[error("item key '{0}' has a non-integer color id")]
    InvalidColorId(String),
}

// ---------------------------------------------------------------------------
// Provider-side records
// ---------------------------------------------------------------------------

/// Provider-specific listing identifier, opaque to the core.
///
/// Only ever passed back to the provider that issued it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One listing as currently reported by a provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub external_id: ExternalId,
    pub quantity: u32,
}

impl InventoryRecord {
    pub fn new(external_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            external_id: ExternalId::new(external_id),
            quantity,
        }
    }
}

/// Full current inventory of one side, keyed by logical item.
pub type Inventory = BTreeMap<ItemKey, InventoryRecord>;

/// Quantity of `key` on a side, `0` when the side does not list it.
pub fn quantity_of(inv: &Inventory, key: &ItemKey) -> u32 {
    inv.get(key).map(|r| r.quantity).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which of the two providers an inventory or action belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::A => "side_a",
            Side::B => "side_b",
        }
    }

    pub fn other(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Snapshot state
// ---------------------------------------------------------------------------

/// Reconciled quantities as of the end of the last successful cycle.
///
/// A missing key means "quantity 0 as of last cycle", not "unknown item".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotState {
    entries: BTreeMap<ItemKey, u32>,
}

impl SnapshotState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ItemKey) -> u32 {
        self.entries.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: ItemKey, quantity: u32) {
        self.entries.insert(key, quantity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemKey, u32)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }
}

impl FromIterator<(ItemKey, u32)> for SnapshotState {
    fn from_iter<T: IntoIterator<Item = (ItemKey, u32)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
