// Append-only wallet ledger entries

use crate::{
    account::UserId, error::BalanceError, payout::PayoutId, time::TimestampSeconds,
    withdrawal::WithdrawalId,
};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    SelfJoiningInstalment,
    TurnoverDistribution,
    WithdrawalDebit,
}

/// What caused a ledger entry.
/// Each reference can be booked at most once per user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReference {
    Payout(PayoutId),
    DistributionRun(String),
    Withdrawal(WithdrawalId),
}

impl LedgerReference {
    /// Stable key used to refuse a second entry for the same cause
    pub fn dedupe_key(&self) -> String {
        match self {
            LedgerReference::Payout(id) => format!("payout:{}", id),
            LedgerReference::DistributionRun(key) => format!("run:{}", key),
            LedgerReference::Withdrawal(id) => format!("withdrawal:{}", id),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            LedgerReference::Payout(_) => EntryKind::SelfJoiningInstalment,
            LedgerReference::DistributionRun(_) => EntryKind::TurnoverDistribution,
            LedgerReference::Withdrawal(_) => EntryKind::WithdrawalDebit,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user: UserId,
    /// Position in the user's ledger, starts at 0
    pub sequence: u64,
    pub kind: EntryKind,
    /// Signed, debits are negative
    pub amount: i64,
    pub reference: LedgerReference,
    pub balance_after: u64,
    pub created_at: TimestampSeconds,
}

impl LedgerEntry {
    /// Fails with `Overflow` if the amount does not fit a signed entry
    pub fn credit(
        user: UserId,
        sequence: u64,
        amount: u64,
        reference: LedgerReference,
        balance_after: u64,
        created_at: TimestampSeconds,
    ) -> Result<Self, BalanceError> {
        Ok(Self {
            user,
            sequence,
            kind: reference.kind(),
            amount: i64::try_from(amount).map_err(|_| BalanceError::Overflow)?,
            reference,
            balance_after,
            created_at,
        })
    }

    pub fn debit(
        user: UserId,
        sequence: u64,
        amount: u64,
        reference: LedgerReference,
        balance_after: u64,
        created_at: TimestampSeconds,
    ) -> Result<Self, BalanceError> {
        let mut entry = Self::credit(user, sequence, amount, reference, balance_after, created_at)?;
        entry.amount = -entry.amount;
        Ok(entry)
    }
}

/// Sum of signed entry amounts, used to reconcile the cached wallet balance
pub fn ledger_sum<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> i128 {
    entries.into_iter().map(|e| e.amount as i128).sum()
}

/// One page of a user's ledger, newest first
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerPage {
    pub entries: Vec<LedgerEntry>,
    pub total_count: u64,
    pub offset: u64,
    pub has_more: bool,
}

impl LedgerPage {
    pub fn new(entries: Vec<LedgerEntry>, total_count: u64, offset: u64) -> Self {
        let has_more = offset.saturating_add(entries.len() as u64) < total_count;
        Self {
            entries,
            total_count,
            offset,
            has_more,
        }
    }
}
