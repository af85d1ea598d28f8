//! bks-execution
//!
//! Applies reconcile actions against the two providers' write interfaces.
//!
//! - Actions run sequentially, in the order the engine emitted them.
//! - Each action succeeds or fails on its own; a failed update never stops
//!   the rest of the batch.
//! - An action whose target side has no listing for the item is skipped
//!   without any remote call.

mod executor;
mod types;

pub use executor::{apply, SideWriters};
pub use types::{ActionOutcome, ActionResult, ExecutionCounts, ExecutionReport};
