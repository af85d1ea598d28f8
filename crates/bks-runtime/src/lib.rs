//! bks-runtime
//!
//! Drives sync cycles: fetch both sides, reconcile against the stored
//! snapshot, apply the actions, persist the new snapshot, notify observers.
//!
//! - At most one cycle runs at a time per orchestrator.
//! - A failed fetch aborts the cycle before reconcile; the snapshot is left
//!   as it was and the next tick retries.
//! - Per-action failures are recorded and never abort the cycle.
//! - The periodic loop only observes a stop request between cycles.

mod error;
mod observer;
mod orchestrator;
mod status;

pub use error::CycleError;
pub use observer::{CycleObserver, CycleView};
pub use orchestrator::{
    CycleReport, Plan, RunSummary, SideHandle, SyncHandle, SyncOrchestrator, SyncSettings,
    SyncState,
};
pub use status::{render_status, StatusInput, StatusPrinter, MAX_LISTED_CHANGES};
