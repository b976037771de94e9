mod column;
mod providers;

pub mod sled;

pub use self::{column::*, providers::*, sled::SledStorage};

use crate::core::error::EngineError;
use async_trait::async_trait;
use log::{debug, trace};

#[async_trait]
pub trait Storage:
    UserProvider
    + ReferralProvider
    + OrderProvider
    + LedgerProvider
    + PayoutProvider
    + PoolProvider
    + WithdrawalProvider
    + Sync
    + Send
    + 'static
{
    // Flush pending writes
    async fn flush(&self) -> Result<usize, EngineError>;

    // Stop the storage and wait for it to finish
    async fn stop(&self) -> Result<(), EngineError> {
        trace!("stop storage");
        let flushed = self.flush().await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!("{} bytes flushed on stop", flushed);
        }
        Ok(())
    }
}
