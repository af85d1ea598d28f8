use std::fmt;
use std::str::FromStr;

use bks_schemas::{ItemKey, Side, SnapshotState};
use serde::{Deserialize, Serialize};

/// Tie-break applied when both sides moved (or the snapshot is stale).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    #[default]
    Higher,
    Lower,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::Higher => "higher",
            ConflictStrategy::Lower => "lower",
        }
    }

    /// The quantity both sides should converge to.
    pub fn choose(&self, qty_a: u32, qty_b: u32) -> u32 {
        match self {
            ConflictStrategy::Higher => qty_a.max(qty_b),
            ConflictStrategy::Lower => qty_a.min(qty_b),
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`ConflictStrategy::from_str`] for anything but higher/lower.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown conflict strategy '{}'; expected one of: higher | lower",
            self.0
        )
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for ConflictStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "higher" => Ok(ConflictStrategy::Higher),
            "lower" => Ok(ConflictStrategy::Lower),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Whether the target side can apply an action with a plain quantity update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Executability {
    /// Target side lists the item; update its quantity in place.
    Update,
    /// Target side has no listing for the item. Creating one needs listing
    /// metadata the core does not have, so this is never sent as an update.
    RequiresCreate,
}

/// Why the engine emitted an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionReason {
    /// Only `from` moved since the last snapshot; mirror it.
    Propagate { from: Side },
    /// Both sides moved since the last snapshot.
    Conflict,
    /// Neither side matches the snapshot's view, yet they disagree.
    StaleSnapshot,
}

/// Set one side's quantity for one item.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    pub target: Side,
    pub key: ItemKey,
    pub quantity: u32,
    pub executability: Executability,
    pub reason: ActionReason,
}

impl Action {
    pub fn is_update(&self) -> bool {
        self.executability == Executability::Update
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set {} on {} to {}", self.key, self.target, self.quantity)?;
        if self.executability == Executability::RequiresCreate {
            f.write_str(" (requires new listing)")?;
        }
        Ok(())
    }
}

/// Per-key classification, before actions are derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyClass {
    InSync,
    Propagate { from: Side },
    Conflict,
    StaleSnapshot,
}

/// Counts over one reconcile pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Keys considered (union of both sides and the previous snapshot).
    pub universe: usize,
    pub in_sync: usize,
    pub propagated: usize,
    pub conflicts: usize,
    pub stale: usize,
    /// Actions tagged [`Executability::RequiresCreate`].
    pub requires_create: usize,
}

impl ReconcileSummary {
    pub(crate) fn record(&mut self, class: KeyClass) {
        self.universe += 1;
        match class {
            KeyClass::InSync => self.in_sync += 1,
            KeyClass::Propagate { .. } => self.propagated += 1,
            KeyClass::Conflict => self.conflicts += 1,
            KeyClass::StaleSnapshot => self.stale += 1,
        }
    }
}

/// Result of [`crate::reconcile`]: the snapshot to persist after this cycle
/// and the actions to apply before persisting it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub snapshot: SnapshotState,
    pub actions: Vec<Action>,
    pub summary: ReconcileSummary,
}

impl ReconcileOutcome {
    pub fn is_converged(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn executable(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.is_update())
    }

    pub fn requires_create(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| !a.is_update())
    }
}
