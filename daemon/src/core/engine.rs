use super::{config::EngineConfig, storage::Storage};
use log::info;

/// Settlement engine over a storage backend
///
/// Every operation is a method on the engine; the ones that mutate several
/// rows delegate to a single storage transaction so concurrent callers can
/// never double-apply a payment, a payout or a distribution credit.
pub struct Engine<S: Storage> {
    storage: S,
    config: EngineConfig,
}

impl<S: Storage> Engine<S> {
    pub fn new(storage: S, config: EngineConfig) -> Self {
        info!(
            "Engine started (min withdrawal: {}, monthly threshold: {}, max sponsor depth: {})",
            config.min_withdrawal, config.monthly_purchase_threshold, config.max_sponsor_depth
        );
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Flush pending writes before the process exits
    pub async fn stop(&self) -> Result<(), super::error::EngineError> {
        info!("Stopping engine...");
        self.storage.stop().await?;
        info!("Engine stopped");
        Ok(())
    }
}
