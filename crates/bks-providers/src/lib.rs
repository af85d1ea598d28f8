//! bks-providers
//!
//! Boundary between the sync core and the two inventory providers.
//!
//! This crate owns the read/write traits, the provider error type and the
//! wire adapters that turn provider inventory payloads into [`Inventory`]
//! maps. Network clients and authentication live outside the core; the
//! implementations here are the deterministic [`PaperProvider`] and the
//! offline [`JsonFileProvider`].

pub mod file;
pub mod paper;
pub mod wire;

pub use file::JsonFileProvider;
pub use paper::PaperProvider;
pub use wire::{parse_inventory, AdapterError, WireFormat};

use async_trait::async_trait;
use bks_schemas::{ExternalId, Inventory};

/// Errors a provider read or write may return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Network, filesystem or other transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with an application-level error.
    #[error("provider api error{}: {message}", status_suffix(.status))]
    Api { status: Option<u16>, message: String },

    /// A payload could not be decoded into an inventory.
    #[error("decode error: {0}")]
    Decode(String),

    /// The listing named by an update does not exist at the provider.
    #[error("unknown listing {0}")]
    UnknownListing(ExternalId),
}

impl From<AdapterError> for ProviderError {
    fn from(e: AdapterError) -> Self {
        ProviderError::Decode(e.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" status={s}")).unwrap_or_default()
}

/// Read side of a provider: the full current inventory, or an error.
///
/// Partial results are never returned.
#[async_trait]
pub trait InventoryReader: Send + Sync {
    /// Short provider name for logs (e.g. `"bricklink"`).
    fn name(&self) -> &str;

    async fn fetch_inventory(&self) -> Result<Inventory, ProviderError>;
}

/// Write side of a provider: set one listing's quantity.
///
/// Implementations must be idempotent; repeating an update yields the same
/// end state.
#[async_trait]
pub trait InventoryWriter: Send + Sync {
    async fn update_quantity(&self, id: &ExternalId, quantity: u32) -> Result<(), ProviderError>;
}

/// A provider that can both read and write.
pub trait InventoryProvider: InventoryReader + InventoryWriter {}

impl<T: InventoryReader + InventoryWriter> InventoryProvider for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_with_and_without_status() {
        let with = ProviderError::Api {
            status: Some(429),
            message: "rate limited".to_string(),
        };
        assert_eq!(with.to_string(), "provider api error status=429: rate limited");

        let without = ProviderError::Api {
            status: None,
            message: "bad token".to_string(),
        };
        assert_eq!(without.to_string(), "provider api error: bad token");
    }

    #[test]
    fn providers_are_object_safe() {
        let _p: Box<dyn InventoryProvider> = Box::new(PaperProvider::new("paper", Inventory::new()));
    }
}
