//! Turnover pool
//!
//! The pool accumulates the `pool_topup` of every order. A distribution run
//! splits the current balance between levels L1..L5 by fixed weights, then
//! equally between the users holding each level.
//!
//! Level and per-user amounts are rounded down. Whatever is not handed out
//! (rounding residue, or the share of a level nobody holds) stays in the pool
//! for the next run.

use crate::{
    account::UserId,
    config::LEVEL_WEIGHTS_BPS,
    error::BalanceError,
    level::Level,
    split::basis_points_of,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolState {
    pub balance: u64,
    /// Lifetime sum of top-ups
    pub total_contributed: u64,
    /// Lifetime sum of amounts credited to users
    pub total_distributed: u64,
    pub last_distribution_at: Option<TimestampSeconds>,
}

impl PoolState {
    pub fn contribute(&mut self, amount: u64) -> Result<(), BalanceError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        self.total_contributed = self.total_contributed.saturating_add(amount);
        Ok(())
    }

    /// Reserve an amount for a distribution run
    pub fn withdraw(&mut self, amount: u64) -> Result<(), BalanceError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(BalanceError::Insufficient {
                need: amount,
                have: self.balance,
            })?;
        Ok(())
    }

    /// Give back a reserved amount that could not be credited
    pub fn restore(&mut self, amount: u64) -> Result<(), BalanceError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        Ok(())
    }

    pub fn record_distributed(&mut self, amount: u64) {
        self.total_distributed = self.total_distributed.saturating_add(amount);
    }
}

/// Share of one level in a distribution
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelAllocation {
    pub level: Level,
    pub weight_bps: u64,
    pub level_amount: u64,
    pub recipients: u64,
    pub per_user: u64,
}

impl LevelAllocation {
    pub fn distributed(&self) -> u64 {
        self.per_user.saturating_mul(self.recipients)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DistributionPlan {
    pub pool_balance: u64,
    pub allocations: Vec<LevelAllocation>,
    /// Sum of all per-user credits
    pub total_distributed: u64,
    /// Stays in the pool
    pub remainder: u64,
}

impl DistributionPlan {
    pub fn per_user(&self, level: Level) -> u64 {
        self.allocations
            .iter()
            .find(|a| a.level == level)
            .map(|a| a.per_user)
            .unwrap_or(0)
    }
}

/// Compute a distribution from the pool balance and the number of users per level
pub fn plan_distribution(pool_balance: u64, level_counts: &BTreeMap<Level, u64>) -> DistributionPlan {
    let mut allocations = Vec::with_capacity(LEVEL_WEIGHTS_BPS.len());
    let mut total_distributed: u64 = 0;

    for (level, weight_bps) in LEVEL_WEIGHTS_BPS {
        let level_amount = basis_points_of(pool_balance, weight_bps);
        let recipients = level_counts.get(&level).copied().unwrap_or(0);
        let per_user = if recipients == 0 {
            0
        } else {
            level_amount / recipients
        };

        let allocation = LevelAllocation {
            level,
            weight_bps,
            level_amount,
            recipients,
            per_user,
        };
        total_distributed = total_distributed.saturating_add(allocation.distributed());
        allocations.push(allocation);
    }

    DistributionPlan {
        pool_balance,
        allocations,
        total_distributed,
        remainder: pool_balance - total_distributed,
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// Plan written and pool debited, credits still being applied
    InProgress,
    Completed,
}

/// A distribution run, identified by its idempotency key
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DistributionRun {
    pub key: String,
    pub plan: DistributionPlan,
    pub status: RunStatus,
    pub started_at: TimestampSeconds,
    pub completed_at: Option<TimestampSeconds>,
    pub credited: u64,
    /// Returned to the pool because the recipient was inactive when credited
    pub returned: u64,
}

impl DistributionRun {
    pub fn new(key: String, plan: DistributionPlan, started_at: TimestampSeconds) -> Self {
        Self {
            key,
            plan,
            status: RunStatus::InProgress,
            started_at,
            completed_at: None,
            credited: 0,
            returned: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CreditStatus {
    Pending,
    Credited,
    /// Recipient inactive, amount returned to the pool
    Returned,
}

/// One planned credit of a run
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DistributionCredit {
    pub run: String,
    pub user: UserId,
    pub level: Level,
    pub amount: u64,
    pub status: CreditStatus,
}
