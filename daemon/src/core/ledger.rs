use super::{engine::Engine, error::EngineError, storage::Storage};
use commission_common::{
    account::UserId,
    ledger::{ledger_sum, LedgerPage},
};
use log::error;
use serde::Serialize;

/// Cached wallet balance checked against the sum of the user's ledger entries
#[derive(Debug, Clone, Serialize)]
pub struct BalanceReconciliation {
    pub user_id: UserId,
    pub cached_balance: u64,
    pub ledger_sum: i128,
    pub entries: u64,
    pub consistent: bool,
}

impl<S: Storage> Engine<S> {
    pub async fn ledger_history(
        &self,
        user: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<LedgerPage, EngineError> {
        self.storage().get_ledger_page(user, offset, limit).await
    }

    pub async fn reconcile_balance(
        &self,
        user: UserId,
    ) -> Result<BalanceReconciliation, EngineError> {
        let record = self.storage().get_user_or_err(user).await?;
        let entries = self.storage().get_ledger_entries(user).await?;
        let sum = ledger_sum(&entries);
        let consistent = sum == record.wallet_balance as i128;
        if !consistent {
            error!(
                "Wallet of user {} holds {} but its ledger sums to {}",
                user, record.wallet_balance, sum
            );
        }

        Ok(BalanceReconciliation {
            user_id: user,
            cached_balance: record.wallet_balance,
            ledger_sum: sum,
            entries: entries.len() as u64,
            consistent,
        })
    }
}
