//! Scenario: only one side moved since the snapshot
//!
//! GREEN when:
//! - A restock on side A is mirrored to side B.
//! - A sale on side B is mirrored to side A.
//! - The conflict strategy plays no part.

use bks_reconcile::*;
use bks_schemas::{Inventory, InventoryRecord, ItemKey, Side, SnapshotState};

fn x() -> ItemKey {
    ItemKey::new("3001", 5)
}

fn one(id: &str, qty: u32) -> Inventory {
    let mut inv = Inventory::new();
    inv.insert(x(), InventoryRecord::new(id, qty));
    inv
}

#[test]
fn scenario_side_a_restock_is_mirrored_to_side_b() {
    let prev: SnapshotState = [(x(), 5)].into_iter().collect();

    let out = reconcile(&one("bl-1", 8), &one("bo-1", 5), &prev, ConflictStrategy::Higher);

    assert_eq!(out.actions.len(), 1);
    let a = &out.actions[0];
    assert_eq!(a.target, Side::B);
    assert_eq!(a.key, x());
    assert_eq!(a.quantity, 8);
    assert_eq!(a.executability, Executability::Update);
    assert_eq!(a.reason, ActionReason::Propagate { from: Side::A });
    assert_eq!(out.snapshot.get(&x()), 8);
    assert_eq!(out.summary.propagated, 1);
}

#[test]
fn scenario_side_b_sale_is_mirrored_to_side_a() {
    let prev: SnapshotState = [(x(), 5)].into_iter().collect();

    let out = reconcile(&one("bl-1", 5), &one("bo-1", 4), &prev, ConflictStrategy::Lower);

    assert_eq!(out.actions.len(), 1);
    assert_eq!(out.actions[0].target, Side::A);
    assert_eq!(out.actions[0].quantity, 4);
    // Snapshot records the higher observation, not the propagated value.
    assert_eq!(out.snapshot.get(&x()), 5);
}

#[test]
fn scenario_strategy_is_ignored_when_only_one_side_moved() {
    let prev: SnapshotState = [(x(), 5)].into_iter().collect();

    let higher = reconcile(&one("bl-1", 2), &one("bo-1", 5), &prev, ConflictStrategy::Higher);
    let lower = reconcile(&one("bl-1", 2), &one("bo-1", 5), &prev, ConflictStrategy::Lower);

    assert_eq!(higher.actions, lower.actions);
    assert_eq!(higher.actions[0].target, Side::B);
    assert_eq!(higher.actions[0].quantity, 2);
}
