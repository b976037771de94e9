use crate::core::error::EngineError;
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    level::Level,
    pool::{DistributionCredit, DistributionRun, PoolState},
    time::TimestampSeconds,
};
use std::collections::BTreeMap;

#[async_trait]
pub trait PoolProvider {
    async fn get_pool(&self) -> Result<PoolState, EngineError>;

    async fn get_distribution_run(&self, key: &str)
        -> Result<Option<DistributionRun>, EngineError>;

    async fn get_distribution_runs(&self) -> Result<Vec<DistributionRun>, EngineError>;

    /// Record a distribution run before any credit is applied:
    /// the plan is computed on the pool balance read inside the transaction,
    /// one pending credit row is written per recipient and the pool is debited
    /// by the planned total.
    ///
    /// If a run with this key exists it is returned unchanged.
    async fn start_distribution_run(
        &self,
        key: &str,
        recipients: &BTreeMap<Level, Vec<UserId>>,
        now: TimestampSeconds,
    ) -> Result<DistributionRun, EngineError>;

    async fn get_distribution_credits(
        &self,
        key: &str,
    ) -> Result<Vec<DistributionCredit>, EngineError>;

    /// Apply one pending credit in its own transaction.
    /// Inactive recipients get nothing and their amount goes back to the pool.
    async fn apply_distribution_credit(
        &self,
        key: &str,
        user: UserId,
        now: TimestampSeconds,
    ) -> Result<DistributionCredit, EngineError>;

    /// Mark a run whose credits are all applied as completed
    async fn complete_distribution_run(
        &self,
        key: &str,
        now: TimestampSeconds,
    ) -> Result<DistributionRun, EngineError>;
}
