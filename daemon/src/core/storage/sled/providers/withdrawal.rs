use crate::core::{
    error::EngineError,
    storage::{
        sled::{
            abort, id_key, map_tx, read_id, tx_book_debit, tx_load, tx_load_user, tx_mark,
            tx_store, withdrawal_status_key, withdrawal_status_prefix, TxResult,
        },
        SledStorage, UserProvider, WithdrawalProvider,
    },
};
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    ledger::LedgerReference,
    time::TimestampSeconds,
    withdrawal::{
        validate_withdrawal, BankDetails, WithdrawalId, WithdrawalRequest, WithdrawalRules,
        WithdrawalStatus,
    },
};
use log::{debug, trace};
use sled::{transaction::TransactionalTree, Transactional};

// Store the request and move its status index row from `previous`
fn tx_store_request(
    withdrawals: &TransactionalTree,
    by_status: &TransactionalTree,
    request: &WithdrawalRequest,
    previous: Option<WithdrawalStatus>,
) -> TxResult<()> {
    if let Some(previous) = previous {
        by_status.remove(&withdrawal_status_key(previous, request.id)[..])?;
    }
    tx_mark(by_status, &withdrawal_status_key(request.status, request.id))?;
    tx_store(withdrawals, &id_key(request.id), request)
}

#[async_trait]
impl WithdrawalProvider for SledStorage {
    async fn create_withdrawal(
        &self,
        user_id: UserId,
        amount: u64,
        bank_details: BankDetails,
        rules: &WithdrawalRules,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("create withdrawal of {} for user {}", amount, user_id);
        }

        let user = self.get_user_or_err(user_id).await?;
        validate_withdrawal(amount, user.wallet_balance, &user.kyc_status, rules)?;

        let request =
            WithdrawalRequest::new(self.generate_id()?, user_id, amount, bank_details, now);
        (&self.withdrawals, &self.withdrawals_by_status)
            .transaction(|(withdrawals, by_status)| -> TxResult<()> {
                tx_store_request(withdrawals, by_status, &request, None)
            })
            .map_err(map_tx)?;

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Withdrawal {} of {} requested by user {}",
                request.id, amount, user_id
            );
        }
        Ok(request)
    }

    async fn get_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<WithdrawalRequest>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get withdrawal {}", id);
        }
        self.load_optional_from_disk(&self.withdrawals, &id_key(id))
    }

    async fn get_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
    ) -> Result<Vec<WithdrawalRequest>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get withdrawals with status {:?}", status);
        }
        let Some(status) = status else {
            return self.iter_values(&self.withdrawals);
        };

        let mut requests = Vec::new();
        for key in self
            .withdrawals_by_status
            .scan_prefix(withdrawal_status_prefix(status))
            .keys()
        {
            let id = read_id(&key?, 1)?;
            if let Some(request) = self.load_optional_from_disk(&self.withdrawals, &id_key(id))? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    async fn approve_withdrawal(
        &self,
        id: WithdrawalId,
        rules: &WithdrawalRules,
        notes: Option<String>,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("approve withdrawal {}", id);
        }

        let key = id_key(id);
        (
            &self.withdrawals,
            &self.withdrawals_by_status,
            &self.users,
            &self.ledger,
            &self.ledger_references,
        )
            .transaction(
                |(withdrawals, by_status, users, ledger, references)|
                 -> TxResult<WithdrawalRequest> {
                    let mut request: WithdrawalRequest = tx_load(withdrawals, &key)?
                        .ok_or_else(|| abort(EngineError::WithdrawalNotFound(id)))?;
                    let previous = request.status;
                    request
                        .transition(WithdrawalStatus::Approved, now, notes.clone())
                        .map_err(abort)?;

                    // Balance may have changed since the request was created
                    let mut user = tx_load_user(users, request.user)?;
                    validate_withdrawal(request.amount, user.wallet_balance, &user.kyc_status, rules)
                        .map_err(abort)?;
                    tx_book_debit(
                        ledger,
                        references,
                        &mut user,
                        request.amount,
                        LedgerReference::Withdrawal(id),
                        now,
                    )?;

                    tx_store(users, &id_key(user.id), &user)?;
                    tx_store_request(withdrawals, by_status, &request, Some(previous))?;
                    Ok(request)
                },
            )
            .map_err(map_tx)
    }

    async fn resolve_withdrawal(
        &self,
        id: WithdrawalId,
        status: WithdrawalStatus,
        notes: Option<String>,
        now: TimestampSeconds,
    ) -> Result<WithdrawalRequest, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("resolve withdrawal {} as {}", id, status);
        }
        if status == WithdrawalStatus::Approved {
            return Err(EngineError::InvalidInput(
                "approval must debit the wallet".to_owned(),
            ));
        }

        let key = id_key(id);
        (&self.withdrawals, &self.withdrawals_by_status)
            .transaction(|(withdrawals, by_status)| -> TxResult<WithdrawalRequest> {
                let mut request: WithdrawalRequest = tx_load(withdrawals, &key)?
                    .ok_or_else(|| abort(EngineError::WithdrawalNotFound(id)))?;
                let previous = request.status;
                request
                    .transition(status, now, notes.clone())
                    .map_err(abort)?;
                tx_store_request(withdrawals, by_status, &request, Some(previous))?;
                Ok(request)
            })
            .map_err(map_tx)
    }
}
