use crate::core::error::EngineError;
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    time::TimestampSeconds,
    withdrawal::{BankDetails, WithdrawalId, WithdrawalRequest, WithdrawalRules, WithdrawalStatus},
};

#[async_trait]
pub trait WithdrawalProvider {
    /// Validate and store a new request in `requested`.
    /// Nothing is written if validation fails.
    async fn create_withdrawal(
        &self,
        user: UserId,
        amount: u64,
        bank_details: BankDetails,
        rules: &WithdrawalRules,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError>;

    async fn get_withdrawal(&self, id: WithdrawalId)
        -> Result<Option<WithdrawalRequest>, EngineError>;

    /// All requests, optionally filtered by status, oldest first
    async fn get_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
    ) -> Result<Vec<WithdrawalRequest>, EngineError>;

    /// Re-validate, debit the wallet, write the ledger entry and mark approved, atomically
    async fn approve_withdrawal(
        &self,
        id: WithdrawalId,
        rules: &WithdrawalRules,
        notes: Option<String>,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError>;

    /// Transition without balance change (reject or complete)
    async fn resolve_withdrawal(
        &self,
        id: WithdrawalId,
        status: WithdrawalStatus,
        notes: Option<String>,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError>;
}
