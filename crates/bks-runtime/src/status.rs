//! Plain-text status summary.

use std::fmt::Write;

use bks_reconcile::{Action, Executability};
use bks_schemas::Side;
use tracing::info;

use crate::{CycleObserver, CycleView};

/// Proposed changes listed before the rest are folded into "... and N more".
pub const MAX_LISTED_CHANGES: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct StatusInput<'a> {
    pub side_a_name: &'a str,
    pub side_b_name: &'a str,
    pub side_a_items: usize,
    pub side_b_items: usize,
    pub last_state_items: usize,
    pub actions: &'a [Action],
}

pub fn render_status(input: &StatusInput<'_>) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{} items: {}", input.side_a_name, input.side_a_items);
    let _ = writeln!(out, "{} items: {}", input.side_b_name, input.side_b_items);
    let _ = writeln!(out, "Items in last state: {}", input.last_state_items);
    out.push('\n');
    out.push_str("Proposed changes:\n");

    if input.actions.is_empty() {
        out.push_str(" (none)\n");
    }
    for a in input.actions.iter().take(MAX_LISTED_CHANGES) {
        let target = match a.target {
            Side::A => input.side_a_name,
            Side::B => input.side_b_name,
        };
        let _ = write!(out, " - set {} on {} to {}", a.key, target, a.quantity);
        if a.executability == Executability::RequiresCreate {
            out.push_str(" (requires new listing)");
        }
        out.push('\n');
    }
    if input.actions.len() > MAX_LISTED_CHANGES {
        let _ = writeln!(
            out,
            " ... and {} more",
            input.actions.len() - MAX_LISTED_CHANGES
        );
    }
    out
}

/// Observer that logs the rendered status after every cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusPrinter;

impl CycleObserver for StatusPrinter {
    fn on_cycle(&self, view: &CycleView<'_>) {
        info!(cycle_id = %view.cycle_id, "sync status\n{}", view.render_status());
    }
}
