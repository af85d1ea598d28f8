use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bks_config::SyncConfig;
use bks_execution::{apply, ActionOutcome, ExecutionReport, SideWriters};
use bks_journal::{
    JournalWriter, EVENT_ACTION_RESULT, EVENT_CYCLE_FAILED, EVENT_CYCLE_FINISHED,
    EVENT_CYCLE_STARTED,
};
use bks_providers::{InventoryReader, InventoryWriter, ProviderError};
use bks_reconcile::{reconcile, ConflictStrategy, ReconcileOutcome};
use bks_schemas::{Inventory, Side, SnapshotState};
use bks_store::SnapshotStore;
use serde_json::{json, Value};
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::status::{render_status, StatusInput};
use crate::{CycleError, CycleObserver, CycleView};

// ---------------------------------------------------------------------------
// Settings and handles
// ---------------------------------------------------------------------------

/// The two knobs the orchestrator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub strategy: ConflictStrategy,
    pub interval: Duration,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            strategy: cfg.strategy,
            interval: cfg.interval(),
        }
    }
}

/// Read and write access to one provider.
#[derive(Clone)]
pub struct SideHandle {
    reader: Arc<dyn InventoryReader>,
    writer: Arc<dyn InventoryWriter>,
}

impl SideHandle {
    pub fn new<P>(provider: Arc<P>) -> Self
    where
        P: InventoryReader + InventoryWriter + 'static,
    {
        Self {
            reader: provider.clone(),
            writer: provider,
        }
    }

    pub fn name(&self) -> &str {
        self.reader.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Cycling,
}

/// Controls a running [`SyncOrchestrator::run`] loop. Cheap to clone.
#[derive(Clone)]
pub struct SyncHandle {
    stop: Arc<watch::Sender<bool>>,
    trigger: Arc<Notify>,
}

impl SyncHandle {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            stop: Arc::new(stop),
            trigger: Arc::new(Notify::new()),
        }
    }

    /// Ask the loop to exit. A cycle in progress runs to completion first.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Run a cycle now instead of waiting for the next tick.
    ///
    /// Triggers while a cycle is running collapse into one follow-up cycle.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }
}

impl Default for SyncHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles_ok: u64,
    pub cycles_failed: u64,
}

/// What one successful cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub outcome: ReconcileOutcome,
    pub execution: ExecutionReport,
}

/// A reconcile pass that was computed but not applied.
#[derive(Debug, Clone)]
pub struct Plan {
    pub side_a_name: String,
    pub side_b_name: String,
    pub side_a: Inventory,
    pub side_b: Inventory,
    pub previous: SnapshotState,
    pub outcome: ReconcileOutcome,
}

impl Plan {
    pub fn render_status(&self) -> String {
        render_status(&StatusInput {
            side_a_name: &self.side_a_name,
            side_b_name: &self.side_b_name,
            side_a_items: self.side_a.len(),
            side_b_items: self.side_b.len(),
            last_state_items: self.previous.len(),
            actions: &self.outcome.actions,
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct SyncOrchestrator {
    side_a: SideHandle,
    side_b: SideHandle,
    store: Arc<dyn SnapshotStore>,
    settings: SyncSettings,
    observers: Vec<Arc<dyn CycleObserver>>,
    journal: Option<Mutex<JournalWriter>>,
    cycling: AtomicBool,
}

/// Clears the cycling flag on every exit path, including early `?` returns.
struct CyclingGuard<'a>(&'a AtomicBool);

impl Drop for CyclingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncOrchestrator {
    pub fn new(
        side_a: SideHandle,
        side_b: SideHandle,
        store: Arc<dyn SnapshotStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            side_a,
            side_b,
            store,
            settings,
            observers: Vec::new(),
            journal: None,
            cycling: AtomicBool::new(false),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_journal(mut self, journal: JournalWriter) -> Self {
        self.journal = Some(Mutex::new(journal));
        self
    }

    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    pub fn state(&self) -> SyncState {
        if self.cycling.load(Ordering::SeqCst) {
            SyncState::Cycling
        } else {
            SyncState::Idle
        }
    }

    /// Startup check: the stored snapshot must be loadable. A malformed
    /// snapshot is fatal here.
    pub fn preflight(&self) -> Result<SnapshotState, CycleError> {
        let snapshot = self.store.load()?;
        info!(
            store = %self.store.describe(),
            entries = snapshot.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    async fn fetch_both(&self) -> Result<(Inventory, Inventory), CycleError> {
        let (a, b) = tokio::join!(
            self.side_a.reader.fetch_inventory(),
            self.side_b.reader.fetch_inventory()
        );
        let fetch_err = |side: Side| move |source: ProviderError| CycleError::Fetch { side, source };
        Ok((a.map_err(fetch_err(Side::A))?, b.map_err(fetch_err(Side::B))?))
    }

    /// Fetch, load and reconcile without applying anything or saving.
    pub async fn plan(&self) -> Result<Plan, CycleError> {
        let (side_a, side_b) = self.fetch_both().await?;
        let previous = self.store.load()?;
        let outcome = reconcile(&side_a, &side_b, &previous, self.settings.strategy);
        Ok(Plan {
            side_a_name: self.side_a.name().to_string(),
            side_b_name: self.side_b.name().to_string(),
            side_a,
            side_b,
            previous,
            outcome,
        })
    }

    /// Run exactly one cycle.
    ///
    /// Returns [`CycleError::AlreadyCycling`] without doing anything if
    /// another cycle on this orchestrator is still in progress.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        if self
            .cycling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("cycle requested while another is in progress; refused");
            return Err(CycleError::AlreadyCycling);
        }
        let _guard = CyclingGuard(&self.cycling);

        let cycle_id = Uuid::new_v4();
        info!(%cycle_id, strategy = %self.settings.strategy, "cycle started");
        self.journal(
            cycle_id,
            EVENT_CYCLE_STARTED,
            json!({ "strategy": self.settings.strategy.as_str() }),
        );

        match self.cycle_inner(cycle_id).await {
            Ok(report) => {
                let counts = report.execution.counts();
                info!(
                    %cycle_id,
                    actions = report.outcome.actions.len(),
                    applied = counts.applied,
                    failed = counts.failed,
                    skipped_needs_create = counts.skipped_needs_create,
                    "cycle finished"
                );
                self.journal(
                    cycle_id,
                    EVENT_CYCLE_FINISHED,
                    json!({
                        "summary": report.outcome.summary,
                        "execution": counts,
                        "snapshot_entries": report.outcome.snapshot.len(),
                    }),
                );
                Ok(report)
            }
            Err(e) => {
                match &e {
                    CycleError::Persistence(_) => {
                        error!(%cycle_id, store = %self.store.describe(), error = %e, "cycle failed")
                    }
                    _ => error!(%cycle_id, stage = e.stage(), error = %e, "cycle failed"),
                }
                self.journal(
                    cycle_id,
                    EVENT_CYCLE_FAILED,
                    json!({ "stage": e.stage(), "error": e.to_string() }),
                );
                Err(e)
            }
        }
    }

    async fn cycle_inner(&self, cycle_id: Uuid) -> Result<CycleReport, CycleError> {
        let (side_a, side_b) = self.fetch_both().await?;
        let previous = self.store.load()?;

        let outcome = reconcile(&side_a, &side_b, &previous, self.settings.strategy);
        info!(
            %cycle_id,
            universe = outcome.summary.universe,
            in_sync = outcome.summary.in_sync,
            propagated = outcome.summary.propagated,
            conflicts = outcome.summary.conflicts,
            stale = outcome.summary.stale,
            "reconciled"
        );

        let writers = SideWriters::new(&*self.side_a.writer, &*self.side_b.writer);
        let execution = apply(&outcome.actions, &side_a, &side_b, writers).await;
        for r in &execution.results {
            self.journal(cycle_id, EVENT_ACTION_RESULT, action_payload(r));
        }

        self.store.save(&outcome.snapshot)?;

        let view = CycleView {
            cycle_id,
            side_a_name: self.side_a.name(),
            side_b_name: self.side_b.name(),
            side_a: &side_a,
            side_b: &side_b,
            previous: &previous,
            outcome: &outcome,
            execution: &execution,
        };
        for obs in &self.observers {
            obs.on_cycle(&view);
        }

        Ok(CycleReport {
            cycle_id,
            outcome,
            execution,
        })
    }

    /// Journal failures are logged and never fail the cycle.
    fn journal(&self, cycle_id: Uuid, event_type: &str, payload: Value) {
        let Some(journal) = &self.journal else {
            return;
        };
        let mut w = journal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = w.append(cycle_id, event_type, payload) {
            warn!(%cycle_id, event_type, error = %format!("{e:#}"), "journal append failed");
        }
    }

    /// Periodic loop.
    ///
    /// Runs the first cycle immediately, then one per interval tick or per
    /// [`SyncHandle::trigger`], until [`SyncHandle::stop`]. Cycle errors are
    /// contained; only a failed [`SyncOrchestrator::preflight`] ends the loop
    /// with an error.
    pub async fn run(&self, handle: SyncHandle) -> Result<RunSummary, CycleError> {
        self.preflight()?;

        let mut stop = handle.stop.subscribe();
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = RunSummary::default();
        info!(
            side_a = self.side_a.name(),
            side_b = self.side_b.name(),
            interval_secs = self.settings.interval.as_secs(),
            "sync loop started"
        );

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = handle.trigger.notified() => {
                    info!("cycle triggered");
                    ticker.reset();
                }
                _ = ticker.tick() => {}
            }

            match self.run_cycle().await {
                Ok(_) => summary.cycles_ok += 1,
                Err(_) => summary.cycles_failed += 1,
            }
        }

        info!(
            cycles_ok = summary.cycles_ok,
            cycles_failed = summary.cycles_failed,
            "sync loop stopped"
        );
        Ok(summary)
    }
}

fn action_payload(r: &bks_execution::ActionResult) -> Value {
    let mut v = json!({
        "side": r.action.target.as_str(),
        "key": r.action.key.to_storage_key(),
        "quantity": r.action.quantity,
        "reason": r.action.reason,
        "executability": r.action.executability,
        "outcome": r.outcome.as_str(),
    });
    if let ActionOutcome::Failed { error } = &r.outcome {
        v["error"] = Value::String(error.to_string());
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use bks_providers::PaperProvider;
    use bks_schemas::{InventoryRecord, ItemKey};
    use bks_store::MemorySnapshotStore;

    fn settings() -> SyncSettings {
        SyncSettings {
            strategy: ConflictStrategy::Higher,
            interval: Duration::from_secs(3600),
        }
    }

    fn one_item(id: &str, qty: u32) -> Inventory {
        let mut inv = Inventory::new();
        inv.insert(ItemKey::new("3001", 5), InventoryRecord::new(id, qty));
        inv
    }

    #[tokio::test]
    async fn plan_writes_nothing() {
        let a = Arc::new(PaperProvider::new("a", one_item("a-1", 8)));
        let b = Arc::new(PaperProvider::new("b", one_item("b-1", 5)));
        let store = Arc::new(MemorySnapshotStore::new());
        let orch = SyncOrchestrator::new(
            SideHandle::new(a),
            SideHandle::new(b.clone()),
            store.clone(),
            settings(),
        );

        let plan = orch.plan().await.unwrap();
        assert_eq!(plan.outcome.actions.len(), 1);
        assert!(b.update_calls().is_empty());
        assert_eq!(store.save_count(), 0);
        assert!(plan.render_status().contains(" - set 3001:5 on b to 8"));
    }

    #[tokio::test]
    async fn state_returns_to_idle_after_failed_cycle() {
        let a = Arc::new(PaperProvider::new("a", one_item("a-1", 8)));
        a.set_fail_fetch(Some("down"));
        let b = Arc::new(PaperProvider::new("b", one_item("b-1", 5)));
        let orch = SyncOrchestrator::new(
            SideHandle::new(a),
            SideHandle::new(b),
            Arc::new(MemorySnapshotStore::new()),
            settings(),
        );

        let err = orch.run_cycle().await.unwrap_err();
        assert!(matches!(err, CycleError::Fetch { side: Side::A, .. }));
        assert_eq!(orch.state(), SyncState::Idle);
    }

    #[test]
    fn handle_stop_is_sticky() {
        let h = SyncHandle::new();
        assert!(!h.is_stopped());
        h.clone().stop();
        assert!(h.is_stopped());
    }
}
