//! Deterministic in-memory provider.
//!
//! - Fetch returns a clone of the current inventory.
//! - Updates set the quantity of the listing with the given id; an unknown
//!   id is [`ProviderError::UnknownListing`].
//! - Every update call is recorded (successful or not) in call order.
//! - Fetch and individual updates can be made to fail on demand.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use bks_schemas::{ExternalId, Inventory, ItemKey};

use crate::{InventoryReader, InventoryWriter, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub id: ExternalId,
    pub quantity: u32,
}

#[derive(Debug, Default)]
struct PaperState {
    inventory: Inventory,
    fail_fetch: Option<String>,
    fail_updates: BTreeSet<ExternalId>,
    calls: Vec<UpdateCall>,
    fetches: usize,
}

#[derive(Debug)]
pub struct PaperProvider {
    name: String,
    state: Mutex<PaperState>,
}

impl PaperProvider {
    pub fn new(name: impl Into<String>, inventory: Inventory) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(PaperState {
                inventory,
                ..PaperState::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PaperState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every fetch fail with a transport error until cleared with `None`.
    pub fn set_fail_fetch(&self, message: Option<&str>) {
        self.lock().fail_fetch = message.map(str::to_string);
    }

    /// Make updates to `id` fail with an api error.
    pub fn fail_updates_for(&self, id: impl Into<String>) {
        self.lock().fail_updates.insert(ExternalId::new(id));
    }

    /// Simulate an out-of-band change at the provider (a sale or restock).
    pub fn set_quantity(&self, key: &ItemKey, quantity: u32) {
        if let Some(r) = self.lock().inventory.get_mut(key) {
            r.quantity = quantity;
        }
    }

    pub fn inventory(&self) -> Inventory {
        self.lock().inventory.clone()
    }

    pub fn quantity(&self, key: &ItemKey) -> Option<u32> {
        self.lock().inventory.get(key).map(|r| r.quantity)
    }

    pub fn update_calls(&self) -> Vec<UpdateCall> {
        self.lock().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }
}

#[async_trait]
impl InventoryReader for PaperProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_inventory(&self) -> Result<Inventory, ProviderError> {
        let mut st = self.lock();
        st.fetches += 1;
        if let Some(msg) = &st.fail_fetch {
            return Err(ProviderError::Transport(msg.clone()));
        }
        Ok(st.inventory.clone())
    }
}

#[async_trait]
impl InventoryWriter for PaperProvider {
    async fn update_quantity(&self, id: &ExternalId, quantity: u32) -> Result<(), ProviderError> {
        let mut st = self.lock();
        st.calls.push(UpdateCall {
            id: id.clone(),
            quantity,
        });

        if st.fail_updates.contains(id) {
            return Err(ProviderError::Api {
                status: Some(500),
                message: format!("injected failure for {id}"),
            });
        }

        let record = st
            .inventory
            .values_mut()
            .find(|r| &r.external_id == id)
            .ok_or_else(|| ProviderError::UnknownListing(id.clone()))?;
        record.quantity = quantity;
        Ok(())
    }
}
