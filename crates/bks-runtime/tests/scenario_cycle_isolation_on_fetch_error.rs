//! Scenario: a failed fetch is contained to its cycle
//!
//! GREEN when:
//! - Side B's fetch fails: the cycle returns `CycleError::Fetch { side: B }`.
//! - Nothing was written: no update calls on either side, no snapshot save,
//!   and the stored snapshot is the one from before the cycle.
//! - Once side B recovers, the next cycle reconciles normally.

use std::sync::Arc;
use std::time::Duration;

use bks_providers::PaperProvider;
use bks_reconcile::ConflictStrategy;
use bks_runtime::{CycleError, SideHandle, SyncOrchestrator, SyncSettings};
use bks_schemas::{Inventory, InventoryRecord, ItemKey, Side, SnapshotState};
use bks_store::MemorySnapshotStore;

fn inv(id: &str, qty: u32) -> Inventory {
    let mut inv = Inventory::new();
    inv.insert(ItemKey::new("3001", 5), InventoryRecord::new(id, qty));
    inv
}

#[tokio::test]
async fn side_b_fetch_error_leaves_everything_untouched() {
    let key = ItemKey::new("3001", 5);
    let previous: SnapshotState = [(key.clone(), 5)].into_iter().collect();

    let a = Arc::new(PaperProvider::new("side-a", inv("a-1", 8)));
    let b = Arc::new(PaperProvider::new("side-b", inv("b-1", 5)));
    b.set_fail_fetch(Some("503 from upstream"));
    let store = Arc::new(MemorySnapshotStore::with_snapshot(previous.clone()));

    let orch = SyncOrchestrator::new(
        SideHandle::new(a.clone()),
        SideHandle::new(b.clone()),
        store.clone(),
        SyncSettings {
            strategy: ConflictStrategy::Higher,
            interval: Duration::from_secs(900),
        },
    );

    let err = orch.run_cycle().await.unwrap_err();
    match err {
        CycleError::Fetch { side, source } => {
            assert_eq!(side, Side::B);
            assert!(source.to_string().contains("503 from upstream"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }

    assert!(a.update_calls().is_empty());
    assert!(b.update_calls().is_empty());
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.current(), Some(previous));

    b.set_fail_fetch(None);
    let report = orch.run_cycle().await.unwrap();
    assert_eq!(report.execution.applied(), 1);
    assert_eq!(b.quantity(&key), Some(8));
    assert_eq!(store.current().unwrap().get(&key), 8);
}
