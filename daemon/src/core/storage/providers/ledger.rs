use crate::core::error::EngineError;
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    ledger::{LedgerEntry, LedgerPage, LedgerReference},
};

/// Read access to the append-only wallet ledger.
/// Entries are only written by the transactional operations of the other providers.
#[async_trait]
pub trait LedgerProvider {
    /// One page of a user's entries, newest first
    async fn get_ledger_page(
        &self,
        user: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<LedgerPage, EngineError>;

    /// All entries of a user, oldest first
    async fn get_ledger_entries(&self, user: UserId) -> Result<Vec<LedgerEntry>, EngineError>;

    /// Check if an entry with this reference was booked for the user
    async fn has_ledger_reference(
        &self,
        user: UserId,
        reference: &LedgerReference,
    ) -> Result<bool, EngineError>;
}
