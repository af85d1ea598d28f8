use bks_providers::{InventoryWriter, ProviderError};
use bks_reconcile::{Action, Executability};
use bks_schemas::{Inventory, Side};
use tracing::{error, info, warn};

use crate::{ActionOutcome, ActionResult, ExecutionReport};

/// Write interfaces for both sides.
#[derive(Clone, Copy)]
pub struct SideWriters<'a> {
    pub a: &'a dyn InventoryWriter,
    pub b: &'a dyn InventoryWriter,
}

impl<'a> SideWriters<'a> {
    pub fn new(a: &'a dyn InventoryWriter, b: &'a dyn InventoryWriter) -> Self {
        Self { a, b }
    }

    pub fn for_side(&self, side: Side) -> &'a dyn InventoryWriter {
        match side {
            Side::A => self.a,
            Side::B => self.b,
        }
    }
}

/// Apply `actions` in order and report one result per action.
///
/// `side_a` / `side_b` are the inventories the actions were computed from;
/// they supply the listing id for each target.
pub async fn apply(
    actions: &[Action],
    side_a: &Inventory,
    side_b: &Inventory,
    writers: SideWriters<'_>,
) -> ExecutionReport {
    let mut results = Vec::with_capacity(actions.len());

    for action in actions {
        let target_inv = match action.target {
            Side::A => side_a,
            Side::B => side_b,
        };

        let record = match (action.executability, target_inv.get(&action.key)) {
            (Executability::Update, Some(record)) => record,
            _ => {
                warn!(
                    side = %action.target,
                    key = %action.key,
                    quantity = action.quantity,
                    "no listing on target side; needs a new listing, skipped"
                );
                results.push(ActionResult {
                    action: action.clone(),
                    outcome: ActionOutcome::SkippedNeedsCreate,
                });
                continue;
            }
        };

        let outcome = match writers
            .for_side(action.target)
            .update_quantity(&record.external_id, action.quantity)
            .await
        {
            Ok(()) => {
                info!(
                    side = %action.target,
                    key = %action.key,
                    external_id = %record.external_id,
                    quantity = action.quantity,
                    "quantity updated"
                );
                ActionOutcome::Applied
            }
            Err(e) => {
                log_failure(action, &e);
                ActionOutcome::Failed { error: e }
            }
        };

        results.push(ActionResult {
            action: action.clone(),
            outcome,
        });
    }

    ExecutionReport { results }
}

fn log_failure(action: &Action, e: &ProviderError) {
    error!(
        side = %action.target,
        key = %action.key,
        quantity = action.quantity,
        error = %e,
        "quantity update failed"
    );
}
