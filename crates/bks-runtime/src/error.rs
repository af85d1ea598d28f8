use bks_providers::ProviderError;
use bks_schemas::Side;
use bks_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// A side could not be read. Nothing was reconciled or written.
    #[error("fetch from {side} failed: {source}")]
    Fetch {
        side: Side,
        #[source]
        source: ProviderError,
    },

    #[error("snapshot persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("a sync cycle is already in progress")]
    AlreadyCycling,
}

impl CycleError {
    /// Short stage name for logs and the journal.
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::Fetch { .. } => "fetch",
            CycleError::Persistence(_) => "persistence",
            CycleError::AlreadyCycling => "admission",
        }
    }
}
