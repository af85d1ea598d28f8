//! Scenario: reconcile is deterministic and converges
//!
//! GREEN when:
//! - Running reconcile twice on the same input gives the same outcome.
//! - Agreeing sides emit no action whatever the snapshot holds.
//! - The new snapshot covers every key seen on either side or before.
//! - Actions are emitted only for keys whose sides disagree.

use bks_reconcile::*;
use bks_schemas::{Inventory, InventoryRecord, ItemKey, SnapshotState};

fn sample() -> (Inventory, Inventory, SnapshotState) {
    let mut a = Inventory::new();
    a.insert(ItemKey::new("3001", 5), InventoryRecord::new("bl-1", 8));
    a.insert(ItemKey::new("3003", 1), InventoryRecord::new("bl-2", 2));
    a.insert(ItemKey::new("973pb1", 11), InventoryRecord::new("bl-3", 4));

    let mut b = Inventory::new();
    b.insert(ItemKey::new("3001", 5), InventoryRecord::new("bo-1", 3));
    b.insert(ItemKey::new("3003", 1), InventoryRecord::new("bo-2", 2));
    b.insert(ItemKey::new("3622", 0), InventoryRecord::new("bo-3", 6));

    let prev: SnapshotState = [
        (ItemKey::new("3001", 5), 5),
        (ItemKey::new("3003", 1), 7),
        (ItemKey::new("4070", 3), 1),
    ]
    .into_iter()
    .collect();

    (a, b, prev)
}

#[test]
fn scenario_reconcile_is_idempotent() {
    let (a, b, prev) = sample();

    let first = reconcile(&a, &b, &prev, ConflictStrategy::Higher);
    let second = reconcile(&a, &b, &prev, ConflictStrategy::Higher);

    assert_eq!(first, second);
}

#[test]
fn scenario_agreeing_sides_emit_nothing_regardless_of_snapshot() {
    let mut a = Inventory::new();
    let mut b = Inventory::new();
    for (i, qty) in [0u32, 1, 5, 40].iter().enumerate() {
        let key = ItemKey::new(format!("300{i}"), 5);
        a.insert(key.clone(), InventoryRecord::new(format!("bl-{i}"), *qty));
        b.insert(key, InventoryRecord::new(format!("bo-{i}"), *qty));
    }

    for prev in [
        SnapshotState::empty(),
        [(ItemKey::new("3000", 5), 99), (ItemKey::new("3003", 5), 1)]
            .into_iter()
            .collect::<SnapshotState>(),
    ] {
        let out = reconcile(&a, &b, &prev, ConflictStrategy::Lower);
        assert!(out.actions.is_empty(), "no actions expected for {prev:?}");
    }
}

#[test]
fn scenario_new_snapshot_covers_the_whole_universe() {
    let (a, b, prev) = sample();

    let out = reconcile(&a, &b, &prev, ConflictStrategy::Higher);

    let keys: Vec<String> = out.snapshot.keys().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        vec!["3001:5", "3003:1", "3622:0", "4070:3", "973pb1:11"]
    );
    assert_eq!(out.summary.universe, 5);
    // Key only present in the previous snapshot decays to 0.
    assert_eq!(out.snapshot.get(&ItemKey::new("4070", 3)), 0);
    assert!(out.snapshot.contains(&ItemKey::new("4070", 3)));
}

#[test]
fn scenario_actions_only_for_disagreeing_keys() {
    let (a, b, prev) = sample();

    let out = reconcile(&a, &b, &prev, ConflictStrategy::Higher);

    for action in &out.actions {
        let qa = bks_schemas::quantity_of(&a, &action.key);
        let qb = bks_schemas::quantity_of(&b, &action.key);
        assert_ne!(qa, qb, "action emitted for agreeing key {}", action.key);
    }
    // 3003:1 agrees at 2 even though the snapshot says 7.
    assert!(out.actions.iter().all(|a| a.key != ItemKey::new("3003", 1)));
}
