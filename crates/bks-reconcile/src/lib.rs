//! bks-reconcile
//!
//! Three-way reconciliation between two inventory sides and the snapshot of
//! the last completed cycle.
//!
//! - A key is in the universe if either side lists it or the snapshot has it.
//! - The new snapshot records the higher of the two observed quantities.
//! - A side that moved away from the snapshot wins over one that did not.
//! - Both moved (or neither, but they disagree): the configured strategy picks.
//! - Actions against a side with no listing are tagged `RequiresCreate`.
//!
//! Deterministic, pure logic. No IO. No provider calls.

mod engine;
mod types;

pub use engine::{reconcile, reconcile_key};
pub use types::*;
