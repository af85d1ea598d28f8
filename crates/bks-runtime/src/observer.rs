use bks_execution::ExecutionReport;
use bks_reconcile::{Action, ReconcileOutcome};
use bks_schemas::{Inventory, SnapshotState};
use uuid::Uuid;

use crate::status::{render_status, StatusInput};

/// Read-only view of a completed cycle, handed to every observer after the
/// new snapshot has been saved.
#[derive(Debug, Clone, Copy)]
pub struct CycleView<'a> {
    pub cycle_id: Uuid,
    pub side_a_name: &'a str,
    pub side_b_name: &'a str,
    pub side_a: &'a Inventory,
    pub side_b: &'a Inventory,
    pub previous: &'a SnapshotState,
    pub outcome: &'a ReconcileOutcome,
    pub execution: &'a ExecutionReport,
}

impl<'a> CycleView<'a> {
    pub fn actions(&self) -> &'a [Action] {
        &self.outcome.actions
    }

    pub fn render_status(&self) -> String {
        render_status(&StatusInput {
            side_a_name: self.side_a_name,
            side_b_name: self.side_b_name,
            side_a_items: self.side_a.len(),
            side_b_items: self.side_b.len(),
            last_state_items: self.previous.len(),
            actions: self.actions(),
        })
    }
}

/// Called once per successful cycle, in registration order.
///
/// Observers run inline on the cycle task and must not block.
pub trait CycleObserver: Send + Sync {
    fn on_cycle(&self, view: &CycleView<'_>);
}
