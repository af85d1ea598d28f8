//! Scenario: item listed on only one side
//!
//! GREEN when:
//! - The engine emits an action for the side that lacks the listing, tagged
//!   `RequiresCreate`.
//! - The executor skips it: no `update_quantity` call reaches that side.
//! - The batch is still clean and the result says `SkippedNeedsCreate`.

use bks_execution::{apply, ActionOutcome, SideWriters};
use bks_providers::PaperProvider;
use bks_reconcile::{reconcile, ConflictStrategy, Executability};
use bks_schemas::{Inventory, InventoryRecord, ItemKey, Side, SnapshotState};

#[tokio::test]
async fn new_item_on_one_side_is_skipped_without_remote_call() {
    let key = ItemKey::new("3001", 5);
    let mut a_inv = Inventory::new();
    a_inv.insert(key.clone(), InventoryRecord::new("bl-1", 4));
    let b_inv = Inventory::new();

    let outcome = reconcile(&a_inv, &b_inv, &SnapshotState::empty(), ConflictStrategy::Higher);
    assert_eq!(outcome.actions.len(), 1);
    assert_eq!(outcome.actions[0].target, Side::B);
    assert_eq!(outcome.actions[0].executability, Executability::RequiresCreate);

    let a = PaperProvider::new("side-a", a_inv.clone());
    let b = PaperProvider::new("side-b", b_inv.clone());
    let report = apply(&outcome.actions, &a_inv, &b_inv, SideWriters::new(&a, &b)).await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].outcome, ActionOutcome::SkippedNeedsCreate);
    assert_eq!(report.skipped_needs_create(), 1);
    assert!(report.is_clean());
    assert!(b.update_calls().is_empty(), "no update may reach side B");
    assert!(a.update_calls().is_empty());
}
