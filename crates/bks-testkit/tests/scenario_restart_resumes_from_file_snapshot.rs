//! Scenario: restart picks up where the last cycle left off
//!
//! GREEN when:
//! - A cycle against a file-backed store writes the snapshot.
//! - A fresh harness (simulated restart) over the same file sees the saved
//!   quantities as "previous", so a later sale on side B is detected as a
//!   one-sided change and mirrored to side A.
//! - The journal written across both runs is one valid chain.

use std::sync::Arc;

use bks_journal::{verify_hash_chain, JournalWriter, VerifyResult};
use bks_reconcile::{ActionReason, ConflictStrategy};
use bks_runtime::{SideHandle, SyncOrchestrator, SyncSettings};
use bks_schemas::Side;
use bks_store::FileSnapshotStore;
use bks_testkit::{key, Harness, InventoryBuilder};

#[tokio::test]
async fn second_process_uses_persisted_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let snap_path = dir.path().join("inventory_state.json");
    let journal_path = dir.path().join("journal.jsonl");

    // First process: empty snapshot, sides disagree → both count as changed.
    let first = Harness::with_store(
        InventoryBuilder::new("bl").item("3001", 5, 9).build(),
        InventoryBuilder::new("bo").item("3001", 5, 4).build(),
        Arc::new(FileSnapshotStore::new(&snap_path)),
        ConflictStrategy::Higher,
    );
    let orch = SyncOrchestrator::new(
        SideHandle::new(first.side_a.clone()),
        SideHandle::new(first.side_b.clone()),
        first.store.clone(),
        SyncSettings {
            strategy: ConflictStrategy::Higher,
            interval: std::time::Duration::from_secs(900),
        },
    )
    .with_journal(JournalWriter::open(&journal_path, true).unwrap());
    orch.run_cycle().await.unwrap();
    assert_eq!(first.quantities(&key("3001", 5)), (Some(9), Some(9)));

    // Second process: side B sold 2 while we were down.
    let second = Harness::with_store(
        first.side_a.inventory(),
        InventoryBuilder::new("bo").item("3001", 5, 7).build(),
        Arc::new(FileSnapshotStore::new(&snap_path)),
        ConflictStrategy::Higher,
    );
    let orch = SyncOrchestrator::new(
        SideHandle::new(second.side_a.clone()),
        SideHandle::new(second.side_b.clone()),
        second.store.clone(),
        SyncSettings {
            strategy: ConflictStrategy::Higher,
            interval: std::time::Duration::from_secs(900),
        },
    )
    .with_journal(JournalWriter::open(&journal_path, true).unwrap());

    let report = orch.run_cycle().await.unwrap();
    assert_eq!(report.outcome.actions.len(), 1);
    assert_eq!(report.outcome.actions[0].target, Side::A);
    assert_eq!(
        report.outcome.actions[0].reason,
        ActionReason::Propagate { from: Side::B }
    );
    assert_eq!(second.quantities(&key("3001", 5)), (Some(7), Some(7)));

    assert_eq!(
        verify_hash_chain(&journal_path).unwrap(),
        VerifyResult::Valid { lines: 6 }
    );
}
