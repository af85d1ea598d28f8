//! Scenario: one failing update does not stop the batch
//!
//! GREEN when:
//! - Three actions target side B; the provider rejects the middle one.
//! - The first and third are applied; the second is `Failed` with the
//!   provider's error.
//! - Results come back in action order.

use bks_execution::{apply, ActionOutcome, SideWriters};
use bks_providers::{PaperProvider, ProviderError};
use bks_reconcile::{reconcile, ConflictStrategy};
use bks_schemas::{Inventory, InventoryRecord, ItemKey, SnapshotState};

fn inv(side: &str, qty: [u32; 3]) -> Inventory {
    ["3001", "3002", "3003"]
        .iter()
        .zip(qty)
        .map(|(cat, q)| {
            (
                ItemKey::new(*cat, 1),
                InventoryRecord::new(format!("{side}-{cat}"), q),
            )
        })
        .collect()
}

#[tokio::test]
async fn middle_failure_is_isolated() {
    let previous: SnapshotState = ["3001", "3002", "3003"]
        .iter()
        .map(|c| (ItemKey::new(*c, 1), 5))
        .collect();
    let a_inv = inv("a", [2, 3, 4]);
    let b_inv = inv("b", [5, 5, 5]);

    let outcome = reconcile(&a_inv, &b_inv, &previous, ConflictStrategy::Higher);
    assert_eq!(outcome.actions.len(), 3);

    let a = PaperProvider::new("side-a", a_inv.clone());
    let b = PaperProvider::new("side-b", b_inv.clone());
    b.fail_updates_for("b-3002");

    let report = apply(&outcome.actions, &a_inv, &b_inv, SideWriters::new(&a, &b)).await;

    let outcomes: Vec<&str> = report.results.iter().map(|r| r.outcome.as_str()).collect();
    assert_eq!(outcomes, vec!["applied", "failed", "applied"]);
    assert!(matches!(
        report.results[1].outcome,
        ActionOutcome::Failed {
            error: ProviderError::Api { status: Some(500), .. }
        }
    ));
    assert_eq!(report.failed(), 1);
    assert!(!report.is_clean());

    assert_eq!(b.quantity(&ItemKey::new("3001", 1)), Some(2));
    assert_eq!(b.quantity(&ItemKey::new("3002", 1)), Some(5));
    assert_eq!(b.quantity(&ItemKey::new("3003", 1)), Some(4));
    assert_eq!(b.update_calls().len(), 3);
}
