//! bks-testkit
//!
//! Fixture builders and a paper-provider harness for cross-crate scenarios.

use std::sync::Arc;
use std::time::Duration;

use bks_providers::PaperProvider;
use bks_reconcile::ConflictStrategy;
use bks_runtime::{CycleError, CycleReport, SideHandle, SyncOrchestrator, SyncSettings};
use bks_schemas::{Inventory, InventoryRecord, ItemKey, SnapshotState};
use bks_store::{MemorySnapshotStore, SnapshotStore};

/// Fluent inventory builder.
///
/// ```
/// use bks_testkit::InventoryBuilder;
/// let inv = InventoryBuilder::new("bl").item("3001", 5, 8).build();
/// assert_eq!(inv.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct InventoryBuilder {
    id_prefix: String,
    inv: Inventory,
}

impl InventoryBuilder {
    /// Listing ids are generated as `<prefix>-<catalog>-<color>`.
    pub fn new(id_prefix: &str) -> Self {
        Self {
            id_prefix: id_prefix.to_string(),
            inv: Inventory::new(),
        }
    }

    pub fn item(mut self, catalog: &str, color: u32, quantity: u32) -> Self {
        let id = format!("{}-{}-{}", self.id_prefix, catalog, color);
        self.inv
            .insert(ItemKey::new(catalog, color), InventoryRecord::new(id, quantity));
        self
    }

    pub fn build(self) -> Inventory {
        self.inv
    }
}

/// Snapshot from `(catalog, color, quantity)` triples.
pub fn snapshot(entries: &[(&str, u32, u32)]) -> SnapshotState {
    entries
        .iter()
        .map(|(cat, color, qty)| (ItemKey::new(*cat, *color), *qty))
        .collect()
}

pub fn key(catalog: &str, color: u32) -> ItemKey {
    ItemKey::new(catalog, color)
}

/// Two paper providers, a store and an orchestrator wired together.
pub struct Harness {
    pub side_a: Arc<PaperProvider>,
    pub side_b: Arc<PaperProvider>,
    pub store: Arc<dyn SnapshotStore>,
    pub orchestrator: SyncOrchestrator,
}

impl Harness {
    /// Harness over an in-memory store seeded with `previous`.
    pub fn new(
        side_a: Inventory,
        side_b: Inventory,
        previous: SnapshotState,
        strategy: ConflictStrategy,
    ) -> Self {
        Self::with_store(
            side_a,
            side_b,
            Arc::new(MemorySnapshotStore::with_snapshot(previous)),
            strategy,
        )
    }

    pub fn with_store(
        side_a: Inventory,
        side_b: Inventory,
        store: Arc<dyn SnapshotStore>,
        strategy: ConflictStrategy,
    ) -> Self {
        let side_a = Arc::new(PaperProvider::new("side_a", side_a));
        let side_b = Arc::new(PaperProvider::new("side_b", side_b));
        let orchestrator = SyncOrchestrator::new(
            SideHandle::new(side_a.clone()),
            SideHandle::new(side_b.clone()),
            store.clone(),
            SyncSettings {
                strategy,
                interval: Duration::from_secs(900),
            },
        );
        Self {
            side_a,
            side_b,
            store,
            orchestrator,
        }
    }

    pub async fn cycle(&self) -> Result<CycleReport, CycleError> {
        self.orchestrator.run_cycle().await
    }

    /// Quantities of `key` on (side A, side B); `None` when not listed.
    pub fn quantities(&self, key: &ItemKey) -> (Option<u32>, Option<u32>) {
        (self.side_a.quantity(key), self.side_b.quantity(key))
    }

    pub fn stored_snapshot(&self) -> SnapshotState {
        self.store.load().unwrap_or_default()
    }
}
