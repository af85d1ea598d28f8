use std::collections::BTreeSet;

use bks_schemas::{quantity_of, Inventory, ItemKey, Side, SnapshotState};

use crate::{
    Action, ActionReason, ConflictStrategy, Executability, KeyClass, ReconcileOutcome,
    ReconcileSummary,
};

fn executability(side_inv: &Inventory, key: &ItemKey) -> Executability {
    if side_inv.contains_key(key) {
        Executability::Update
    } else {
        Executability::RequiresCreate
    }
}

/// Classify a single key given both current quantities and the snapshot value.
pub fn reconcile_key(qty_a: u32, qty_b: u32, prev: u32) -> KeyClass {
    if qty_a == qty_b {
        return KeyClass::InSync;
    }

    let changed_a = qty_a != prev;
    let changed_b = qty_b != prev;

    match (changed_a, changed_b) {
        (true, false) => KeyClass::Propagate { from: Side::A },
        (false, true) => KeyClass::Propagate { from: Side::B },
        (true, true) => KeyClass::Conflict,
        // Unreachable with qty_a != qty_b (both equal to prev would make them
        // equal), kept so a stale snapshot can never stall a key.
        (false, false) => KeyClass::StaleSnapshot,
    }
}

/// Deterministic three-way reconcile.
///
/// Keys are walked in `ItemKey` order; when a key yields two actions the
/// side A action comes first.
pub fn reconcile(
    side_a: &Inventory,
    side_b: &Inventory,
    previous: &SnapshotState,
    strategy: ConflictStrategy,
) -> ReconcileOutcome {
    let mut universe: BTreeSet<&ItemKey> = BTreeSet::new();
    universe.extend(side_a.keys());
    universe.extend(side_b.keys());
    universe.extend(previous.keys());

    let mut snapshot = SnapshotState::empty();
    let mut actions: Vec<Action> = Vec::new();
    let mut summary = ReconcileSummary::default();

    for key in universe {
        let qty_a = quantity_of(side_a, key);
        let qty_b = quantity_of(side_b, key);
        let prev = previous.get(key);

        snapshot.insert(key.clone(), qty_a.max(qty_b));

        let class = reconcile_key(qty_a, qty_b, prev);
        summary.record(class);

        match class {
            KeyClass::InSync => {}

            KeyClass::Propagate { from } => {
                let (target, quantity, target_inv) = match from {
                    Side::A => (Side::B, qty_a, side_b),
                    Side::B => (Side::A, qty_b, side_a),
                };
                actions.push(Action {
                    target,
                    key: key.clone(),
                    quantity,
                    executability: executability(target_inv, key),
                    reason: ActionReason::Propagate { from },
                });
            }

            KeyClass::Conflict | KeyClass::StaleSnapshot => {
                let reason = if class == KeyClass::Conflict {
                    ActionReason::Conflict
                } else {
                    ActionReason::StaleSnapshot
                };
                let chosen = strategy.choose(qty_a, qty_b);
                for (target, current, target_inv) in
                    [(Side::A, qty_a, side_a), (Side::B, qty_b, side_b)]
                {
                    if current != chosen {
                        actions.push(Action {
                            target,
                            key: key.clone(),
                            quantity: chosen,
                            executability: executability(target_inv, key),
                            reason,
                        });
                    }
                }
            }
        }
    }

    summary.requires_create = actions
        .iter()
        .filter(|a| a.executability == Executability::RequiresCreate)
        .count();

    ReconcileOutcome {
        snapshot,
        actions,
        summary,
    }
}
