use crate::{
    config::MAX_LEDGER_PAGE_SIZE,
    core::{
        error::EngineError,
        storage::{
            sled::{id_key, ledger_reference_key},
            LedgerProvider, SledStorage, UserProvider,
        },
    },
};
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    ledger::{LedgerEntry, LedgerPage, LedgerReference},
};
use log::trace;

#[async_trait]
impl LedgerProvider for SledStorage {
    async fn get_ledger_page(
        &self,
        user: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<LedgerPage, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "get ledger of {} (offset: {}, limit: {})",
                user,
                offset,
                limit
            );
        }
        if limit > MAX_LEDGER_PAGE_SIZE {
            return Err(EngineError::InvalidInput(format!(
                "page size {} exceeds maximum {}",
                limit, MAX_LEDGER_PAGE_SIZE
            )));
        }

        let total = self.get_user_or_err(user).await?.ledger_sequence;
        let entries = self
            .ledger
            .scan_prefix(id_key(user))
            .values()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|value| Ok(bincode::deserialize(&value?)?))
            .collect::<Result<Vec<LedgerEntry>, EngineError>>()?;

        Ok(LedgerPage::new(entries, total, offset))
    }

    async fn get_ledger_entries(&self, user: UserId) -> Result<Vec<LedgerEntry>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get all ledger entries of {}", user);
        }
        self.scan_prefix_values(&self.ledger, &id_key(user))
    }

    async fn has_ledger_reference(
        &self,
        user: UserId,
        reference: &LedgerReference,
    ) -> Result<bool, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("has ledger reference {} for {}", reference.dedupe_key(), user);
        }
        self.contains_data(
            &self.ledger_references,
            &ledger_reference_key(user, reference),
        )
    }
}
