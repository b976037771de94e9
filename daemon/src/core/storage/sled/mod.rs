mod migrations;
mod providers;

use crate::core::{
    error::EngineError,
    storage::{Column, Storage},
};
use async_trait::async_trait;
use commission_common::{
    account::{User, UserId},
    ledger::{LedgerEntry, LedgerReference},
    payout::PayoutId,
    time::{MonthKey, TimestampSeconds},
    withdrawal::{WithdrawalId, WithdrawalStatus},
};
use log::{debug, info, trace};
use serde::{de::DeserializeOwned, Serialize};
use sled::{
    transaction::{
        ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
        TransactionalTree,
    },
    Db, IVec, Tree,
};

pub(super) const DB_VERSION: &[u8; 10] = b"db_version";
pub(super) const POOL_STATE: &[u8; 4] = b"pool";
pub(super) const PAYOUT_TOTALS: &[u8; 13] = b"payout_totals";

// Value of index-only rows
const EMPTY: &[u8] = &[];

pub(super) type TxResult<T> = ConflictableTransactionResult<T, EngineError>;

pub struct SledStorage {
    db: Db,
    pub(super) users: Tree,
    pub(super) referral_codes: Tree,
    pub(super) direct_referrals: Tree,
    pub(super) downline_progress: Tree,
    pub(super) teams: Tree,
    pub(super) orders: Tree,
    pub(super) user_orders: Tree,
    pub(super) monthly_totals: Tree,
    pub(super) ledger: Tree,
    pub(super) ledger_references: Tree,
    pub(super) payouts: Tree,
    pub(super) payouts_due: Tree,
    pub(super) distribution_runs: Tree,
    pub(super) distribution_credits: Tree,
    pub(super) withdrawals: Tree,
    pub(super) withdrawals_by_status: Tree,
    pub(super) common: Tree,
}

fn open_tree(db: &Db, column: Column) -> Result<Tree, EngineError> {
    if log::log_enabled!(log::Level::Trace) {
        trace!("open tree {}", column);
    }
    Ok(db.open_tree(column.as_ref())?)
}

impl SledStorage {
    /// Open or create the database at `dir`
    pub fn new(dir: &str) -> Result<Self, EngineError> {
        info!("Opening database at {}", dir);
        Self::from_db(sled::open(dir)?)
    }

    /// In-memory database removed on drop
    pub fn temporary() -> Result<Self, EngineError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, EngineError> {
        let storage = Self {
            users: open_tree(&db, Column::Users)?,
            referral_codes: open_tree(&db, Column::ReferralCodes)?,
            direct_referrals: open_tree(&db, Column::DirectReferrals)?,
            downline_progress: open_tree(&db, Column::DownlineProgress)?,
            teams: open_tree(&db, Column::Teams)?,
            orders: open_tree(&db, Column::Orders)?,
            user_orders: open_tree(&db, Column::UserOrders)?,
            monthly_totals: open_tree(&db, Column::MonthlyTotals)?,
            ledger: open_tree(&db, Column::Ledger)?,
            ledger_references: open_tree(&db, Column::LedgerReferences)?,
            payouts: open_tree(&db, Column::Payouts)?,
            payouts_due: open_tree(&db, Column::PayoutsDue)?,
            distribution_runs: open_tree(&db, Column::DistributionRuns)?,
            distribution_credits: open_tree(&db, Column::DistributionCredits)?,
            withdrawals: open_tree(&db, Column::Withdrawals)?,
            withdrawals_by_status: open_tree(&db, Column::WithdrawalsByStatus)?,
            common: open_tree(&db, Column::Common)?,
            db,
        };
        storage.handle_migrations()?;

        Ok(storage)
    }

    /// Unique monotonic id, used for withdrawal requests
    pub(super) fn generate_id(&self) -> Result<u64, EngineError> {
        Ok(self.db.generate_id()?)
    }

    pub(super) fn load_optional_from_disk<K: AsRef<[u8]> + ?Sized, V: DeserializeOwned>(
        &self,
        tree: &Tree,
        key: &K,
    ) -> Result<Option<V>, EngineError> {
        match tree.get(key.as_ref())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(super) fn insert_into_disk<K: AsRef<[u8]> + ?Sized, V: Serialize + ?Sized>(
        &self,
        tree: &Tree,
        key: &K,
        value: &V,
    ) -> Result<(), EngineError> {
        tree.insert(key.as_ref(), bincode::serialize(value)?)?;
        Ok(())
    }

    pub(super) fn contains_data<K: AsRef<[u8]> + ?Sized>(
        &self,
        tree: &Tree,
        key: &K,
    ) -> Result<bool, EngineError> {
        Ok(tree.contains_key(key.as_ref())?)
    }

    /// Decode every value stored under a key prefix, in key order
    pub(super) fn scan_prefix_values<V: DeserializeOwned>(
        &self,
        tree: &Tree,
        prefix: &[u8],
    ) -> Result<Vec<V>, EngineError> {
        tree.scan_prefix(prefix)
            .map(|res| {
                let (_, value) = res?;
                Ok(bincode::deserialize(&value)?)
            })
            .collect()
    }

    /// Decode every value of a tree, in key order
    pub(super) fn iter_values<V: DeserializeOwned>(
        &self,
        tree: &Tree,
    ) -> Result<Vec<V>, EngineError> {
        tree.iter()
            .map(|res| {
                let (_, value) = res?;
                Ok(bincode::deserialize(&value)?)
            })
            .collect()
    }
}

#[async_trait]
impl Storage for SledStorage {
    async fn flush(&self) -> Result<usize, EngineError> {
        trace!("flush DB");
        let flushed = self.db.flush_async().await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!("flushed {} bytes", flushed);
        }
        Ok(flushed)
    }
}

// Keys

pub(super) fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub(super) fn pair_key(prefix: u64, id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&prefix.to_be_bytes());
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

pub(super) fn payout_key(id: &PayoutId) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[..8].copy_from_slice(&id.order.to_be_bytes());
    key[8] = id.installment;
    key
}

pub(super) fn payout_due_key(due_at: TimestampSeconds, id: &PayoutId) -> [u8; 17] {
    let mut key = [0u8; 17];
    key[..8].copy_from_slice(&due_at.to_be_bytes());
    key[8..].copy_from_slice(&payout_key(id));
    key
}

pub(super) fn month_total_key(user: UserId, month: MonthKey) -> [u8; 12] {
    let mut key = [0u8; 12];
    key[..8].copy_from_slice(&user.to_be_bytes());
    key[8..].copy_from_slice(&month.to_be_bytes());
    key
}

pub(super) fn withdrawal_status_prefix(status: WithdrawalStatus) -> [u8; 1] {
    [match status {
        WithdrawalStatus::Requested => 0,
        WithdrawalStatus::Approved => 1,
        WithdrawalStatus::Rejected => 2,
        WithdrawalStatus::Completed => 3,
    }]
}

pub(super) fn withdrawal_status_key(status: WithdrawalStatus, id: WithdrawalId) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[..1].copy_from_slice(&withdrawal_status_prefix(status));
    key[1..].copy_from_slice(&id.to_be_bytes());
    key
}

pub(super) fn ledger_reference_key(user: UserId, reference: &LedgerReference) -> Vec<u8> {
    let dedupe = reference.dedupe_key();
    let mut key = Vec::with_capacity(8 + dedupe.len());
    key.extend_from_slice(&user.to_be_bytes());
    key.extend_from_slice(dedupe.as_bytes());
    key
}

// Length prefixed so that a run key is never the prefix of another one
pub(super) fn credit_prefix(run: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + run.len() + 8);
    key.extend_from_slice(&(run.len() as u16).to_be_bytes());
    key.extend_from_slice(run.as_bytes());
    key
}

pub(super) fn credit_key(run: &str, user: UserId) -> Vec<u8> {
    let mut key = credit_prefix(run);
    key.extend_from_slice(&user.to_be_bytes());
    key
}

pub(super) fn corrupted(what: &str) -> EngineError {
    EngineError::Serialization(Box::new(bincode::ErrorKind::Custom(format!(
        "invalid {} key",
        what
    ))))
}

/// Read a big-endian id at `offset` of a stored key
pub(super) fn read_id(key: &IVec, offset: usize) -> Result<u64, EngineError> {
    key.get(offset..offset + 8)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| corrupted("id"))
}

pub(super) fn read_payout_id(key: &[u8]) -> Result<PayoutId, EngineError> {
    let order = key
        .get(..8)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| corrupted("payout"))?;
    let installment = *key.get(8).ok_or_else(|| corrupted("payout"))?;
    Ok(PayoutId::new(order, installment))
}

// Transactions
// Everything a transaction reads is re-read inside the closure, which sled may run several times

pub(super) fn abort(e: impl Into<EngineError>) -> ConflictableTransactionError<EngineError> {
    ConflictableTransactionError::Abort(e.into())
}

pub(super) fn map_tx(e: TransactionError<EngineError>) -> EngineError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => EngineError::Storage(e),
    }
}

pub(super) fn tx_load<V: DeserializeOwned>(
    tree: &TransactionalTree,
    key: &[u8],
) -> TxResult<Option<V>> {
    match tree.get(key)? {
        Some(bytes) => bincode::deserialize(&bytes).map(Some).map_err(abort),
        None => Ok(None),
    }
}

pub(super) fn tx_load_user(users: &TransactionalTree, id: UserId) -> TxResult<User> {
    tx_load(users, &id_key(id))?.ok_or_else(|| abort(EngineError::UserNotFound(id)))
}

pub(super) fn tx_store<V: Serialize + ?Sized>(
    tree: &TransactionalTree,
    key: &[u8],
    value: &V,
) -> TxResult<()> {
    let bytes = bincode::serialize(value).map_err(abort)?;
    tree.insert(key, bytes)?;
    Ok(())
}

pub(super) fn tx_mark(tree: &TransactionalTree, key: &[u8]) -> TxResult<()> {
    tree.insert(key, EMPTY)?;
    Ok(())
}

fn tx_append_entry(
    ledger: &TransactionalTree,
    references: &TransactionalTree,
    entry: &LedgerEntry,
) -> TxResult<()> {
    tx_store(ledger, &pair_key(entry.user, entry.sequence), entry)?;
    tx_store(
        references,
        &ledger_reference_key(entry.user, &entry.reference),
        &entry.sequence,
    )
}

/// Credit a wallet and append the matching ledger entry.
/// Returns None if this reference was already booked for the user.
/// The caller stores the updated user row.
pub(super) fn tx_book_credit(
    ledger: &TransactionalTree,
    references: &TransactionalTree,
    user: &mut User,
    amount: u64,
    reference: LedgerReference,
    now: TimestampSeconds,
) -> TxResult<Option<LedgerEntry>> {
    if references
        .get(ledger_reference_key(user.id, &reference))?
        .is_some()
    {
        return Ok(None);
    }

    let balance = user.credit(amount).map_err(abort)?;
    let sequence = user.next_ledger_sequence();
    let entry =
        LedgerEntry::credit(user.id, sequence, amount, reference, balance, now).map_err(abort)?;
    tx_append_entry(ledger, references, &entry)?;

    Ok(Some(entry))
}

/// Debit a wallet and append the matching ledger entry, see `tx_book_credit`
pub(super) fn tx_book_debit(
    ledger: &TransactionalTree,
    references: &TransactionalTree,
    user: &mut User,
    amount: u64,
    reference: LedgerReference,
    now: TimestampSeconds,
) -> TxResult<Option<LedgerEntry>> {
    if references
        .get(ledger_reference_key(user.id, &reference))?
        .is_some()
    {
        return Ok(None);
    }

    let balance = user.debit(amount).map_err(abort)?;
    let sequence = user.next_ledger_sequence();
    let entry =
        LedgerEntry::debit(user.id, sequence, amount, reference, balance, now).map_err(abort)?;
    tx_append_entry(ledger, references, &entry)?;

    Ok(Some(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_order_follows_ids() {
        assert!(pair_key(1, u64::MAX) < pair_key(2, 0));
        assert!(payout_due_key(10, &PayoutId::new(99, 4)) < payout_due_key(11, &PayoutId::new(1, 1)));
        assert!(month_total_key(1, 202412) < month_total_key(1, 202501));
        assert!(
            withdrawal_status_key(WithdrawalStatus::Requested, u64::MAX)
                < withdrawal_status_key(WithdrawalStatus::Approved, 0)
        );
    }

    #[test]
    fn test_credit_prefix_is_not_shared() {
        let short = credit_prefix("2024-02-01");
        let long = credit_key("2024-02-01-retry", 1);
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn test_read_ids() {
        let key = IVec::from(&pair_key(7, 42)[..]);
        assert_eq!(read_id(&key, 0).unwrap(), 7);
        assert_eq!(read_id(&key, 8).unwrap(), 42);
        assert!(read_id(&key, 9).is_err());

        let key = IVec::from(&withdrawal_status_key(WithdrawalStatus::Rejected, 9)[..]);
        assert_eq!(read_id(&key, 1).unwrap(), 9);

        let id = PayoutId::new(12, 3);
        assert_eq!(read_payout_id(&payout_key(&id)).unwrap(), id);
        assert_eq!(read_payout_id(&payout_due_key(5, &id)[8..]).unwrap(), id);
    }
}
