use bks_providers::ProviderError;
use bks_reconcile::Action;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Failed { error: ProviderError },
    /// Target side has no listing for the item; nothing was sent.
    SkippedNeedsCreate,
}

impl ActionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionOutcome::Applied => "applied",
            ActionOutcome::Failed { .. } => "failed",
            ActionOutcome::SkippedNeedsCreate => "skipped_needs_create",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionResult {
    pub action: Action,
    pub outcome: ActionOutcome,
}

/// Per-batch counts, in the shape written to logs and the cycle journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionCounts {
    pub applied: usize,
    pub failed: usize,
    pub skipped_needs_create: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub results: Vec<ActionResult>,
}

impl ExecutionReport {
    pub fn counts(&self) -> ExecutionCounts {
        let mut c = ExecutionCounts::default();
        for r in &self.results {
            match r.outcome {
                ActionOutcome::Applied => c.applied += 1,
                ActionOutcome::Failed { .. } => c.failed += 1,
                ActionOutcome::SkippedNeedsCreate => c.skipped_needs_create += 1,
            }
        }
        c
    }

    pub fn applied(&self) -> usize {
        self.counts().applied
    }

    pub fn failed(&self) -> usize {
        self.counts().failed
    }

    pub fn skipped_needs_create(&self) -> usize {
        self.counts().skipped_needs_create
    }

    /// True when nothing failed. Skipped creates do not count as failures.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ActionOutcome::Failed { .. }))
    }
}
