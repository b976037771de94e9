use super::{engine::Engine, error::EngineError, storage::Storage};
use commission_common::{
    account::UserId,
    time::TimestampSeconds,
    withdrawal::{BankDetails, WithdrawalId, WithdrawalRequest, WithdrawalStatus},
};
use log::{debug, info};
use metrics::counter;

fn record_outcome(outcome: &'static str) {
    counter!("commission_withdrawals", "outcome" => outcome).increment(1);
}

impl<S: Storage> Engine<S> {
    /// Validate and store a withdrawal request. The wallet is only debited on approval.
    pub async fn request_withdrawal(
        &self,
        user: UserId,
        amount: u64,
        bank_details: BankDetails,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError> {
        let rules = self.config().withdrawal_rules();
        match self
            .storage()
            .create_withdrawal(user, amount, bank_details, &rules, now)
            .await
        {
            Ok(request) => {
                record_outcome("requested");
                Ok(request)
            }
            Err(e) => {
                if let EngineError::Withdrawal(reason) = &e {
                    record_outcome("refused");
                    debug!("Withdrawal of {} by user {} refused: {}", amount, user, reason);
                }
                Err(e)
            }
        }
    }

    /// Approve a requested withdrawal and debit the wallet, re-checking the balance
    pub async fn approve_withdrawal(
        &self,
        id: WithdrawalId,
        notes: Option<String>,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError> {
        let rules = self.config().withdrawal_rules();
        let request = self
            .storage()
            .approve_withdrawal(id, &rules, notes, now)
            .await?;
        record_outcome("approved");
        info!(
            "Withdrawal {} of {} approved for user {}",
            id, request.amount, request.user
        );
        Ok(request)
    }

    pub async fn reject_withdrawal(
        &self,
        id: WithdrawalId,
        notes: String,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError> {
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(EngineError::InvalidInput(
                "rejecting a withdrawal requires notes".to_owned(),
            ));
        }
        let request = self
            .storage()
            .resolve_withdrawal(id, WithdrawalStatus::Rejected, Some(notes.to_owned()), now)
            .await?;
        record_outcome("rejected");
        info!("Withdrawal {} rejected: {}", id, notes);
        Ok(request)
    }

    /// Confirm that an approved withdrawal was paid out by the bank
    pub async fn complete_withdrawal(
        &self,
        id: WithdrawalId,
        notes: Option<String>,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError> {
        let request = self
            .storage()
            .resolve_withdrawal(id, WithdrawalStatus::Completed, notes, now)
            .await?;
        record_outcome("completed");
        info!("Withdrawal {} completed", id);
        Ok(request)
    }

    pub async fn get_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest, EngineError> {
        self.storage()
            .get_withdrawal(id)
            .await?
            .ok_or(EngineError::WithdrawalNotFound(id))
    }

    pub async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
    ) -> Result<Vec<WithdrawalRequest>, EngineError> {
        self.storage().get_withdrawals(status).await
    }
}
