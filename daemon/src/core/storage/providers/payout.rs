use crate::core::error::EngineError;
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    order::OrderId,
    payout::{PayoutId, PayoutTotals, SelfPayoutSchedule},
    time::TimestampSeconds,
};

/// Outcome of releasing one installment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutRelease {
    /// Wallet credited and ledger entry written
    Paid(SelfPayoutSchedule),
    /// User inactive, nothing credited
    Skipped(SelfPayoutSchedule),
    /// Another run already resolved it
    AlreadyResolved(SelfPayoutSchedule),
    /// Not due yet
    NotDue(SelfPayoutSchedule),
}

impl PayoutRelease {
    pub fn payout(&self) -> &SelfPayoutSchedule {
        match self {
            PayoutRelease::Paid(p)
            | PayoutRelease::Skipped(p)
            | PayoutRelease::AlreadyResolved(p)
            | PayoutRelease::NotDue(p) => p,
        }
    }
}

#[async_trait]
pub trait PayoutProvider {
    async fn get_payout(&self, id: PayoutId) -> Result<Option<SelfPayoutSchedule>, EngineError>;

    async fn get_payouts_for_order(
        &self,
        order: OrderId,
    ) -> Result<Vec<SelfPayoutSchedule>, EngineError>;

    async fn get_payouts_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<SelfPayoutSchedule>, EngineError>;

    /// Per-status count and amount over every payout
    async fn get_payout_totals(&self) -> Result<PayoutTotals, EngineError>;

    /// Scheduled payouts with a due date at or before `now`, oldest first
    async fn get_due_payouts(&self, now: TimestampSeconds) -> Result<Vec<PayoutId>, EngineError>;

    /// Same range as `get_due_payouts` up to `horizon`, with the payouts loaded
    async fn get_scheduled_payouts_until(
        &self,
        horizon: TimestampSeconds,
    ) -> Result<Vec<SelfPayoutSchedule>, EngineError>;

    /// Release one installment in its own transaction.
    /// The status is re-read inside the transaction so a payout is credited at most once.
    async fn release_payout(
        &self,
        id: PayoutId,
        now: TimestampSeconds,
    ) -> Result<PayoutRelease, EngineError>;
}
