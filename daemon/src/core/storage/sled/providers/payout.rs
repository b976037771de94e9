use crate::core::{
    error::EngineError,
    storage::{
        sled::{
            abort, corrupted, id_key, map_tx, payout_due_key, payout_key, read_id,
            read_payout_id, tx_book_credit, tx_load, tx_load_user, tx_store, TxResult,
            PAYOUT_TOTALS,
        },
        PayoutProvider, PayoutRelease, SledStorage,
    },
};
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    ledger::LedgerReference,
    order::OrderId,
    payout::{PayoutId, PayoutStatus, PayoutTotals, SelfPayoutSchedule},
    time::TimestampSeconds,
};
use log::{debug, trace};
use sled::Transactional;

#[async_trait]
impl PayoutProvider for SledStorage {
    async fn get_payout(&self, id: PayoutId) -> Result<Option<SelfPayoutSchedule>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get payout {}", id);
        }
        self.load_optional_from_disk(&self.payouts, &payout_key(&id))
    }

    async fn get_payouts_for_order(
        &self,
        order: OrderId,
    ) -> Result<Vec<SelfPayoutSchedule>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get payouts of order {}", order);
        }
        self.scan_prefix_values(&self.payouts, &id_key(order))
    }

    async fn get_payouts_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<SelfPayoutSchedule>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get payouts of user {}", user);
        }
        let mut payouts = Vec::new();
        for key in self.user_orders.scan_prefix(id_key(user)).keys() {
            let order = read_id(&key?, 8)?;
            payouts.extend(self.get_payouts_for_order(order).await?);
        }
        Ok(payouts)
    }

    async fn get_payout_totals(&self) -> Result<PayoutTotals, EngineError> {
        trace!("get payout totals");
        Ok(self
            .load_optional_from_disk(&self.common, PAYOUT_TOTALS)?
            .unwrap_or_default())
    }

    async fn get_due_payouts(&self, now: TimestampSeconds) -> Result<Vec<PayoutId>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get payouts due at {}", now);
        }
        self.scan_due_index(now)
    }

    async fn get_scheduled_payouts_until(
        &self,
        horizon: TimestampSeconds,
    ) -> Result<Vec<SelfPayoutSchedule>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get scheduled payouts until {}", horizon);
        }

        let mut payouts = Vec::new();
        for id in self.scan_due_index(horizon)? {
            match self.load_optional_from_disk(&self.payouts, &payout_key(&id))? {
                Some(payout) => payouts.push(payout),
                None => return Err(corrupted("payout due")),
            }
        }
        Ok(payouts)
    }

    async fn release_payout(
        &self,
        id: PayoutId,
        now: TimestampSeconds,
    ) -> Result<PayoutRelease, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("release payout {} at {}", id, now);
        }

        let key = payout_key(&id);
        let release = (
            &self.payouts,
            &self.payouts_due,
            &self.users,
            &self.ledger,
            &self.ledger_references,
            &self.common,
        )
            .transaction(
                |(payouts, payouts_due, users, ledger, references, common)|
                 -> TxResult<PayoutRelease> {
                    let mut payout: SelfPayoutSchedule = tx_load(payouts, &key)?
                        .ok_or_else(|| abort(EngineError::PayoutNotFound(id)))?;
                    let due_key = payout_due_key(payout.due_at, &id);

                    if payout.status.is_resolved() {
                        payouts_due.remove(&due_key[..])?;
                        return Ok(PayoutRelease::AlreadyResolved(payout));
                    }
                    if !payout.is_due(now) {
                        return Ok(PayoutRelease::NotDue(payout));
                    }

                    let mut user = tx_load_user(users, payout.user)?;
                    let paid = user.is_active;
                    if paid {
                        if payout.amount > 0 {
                            tx_book_credit(
                                ledger,
                                references,
                                &mut user,
                                payout.amount,
                                LedgerReference::Payout(id),
                                now,
                            )?;
                            tx_store(users, &id_key(user.id), &user)?;
                        }
                        payout.mark_paid(now).map_err(abort)?;
                    } else {
                        payout.mark_skipped(now).map_err(abort)?;
                    }

                    tx_store(payouts, &key, &payout)?;
                    payouts_due.remove(&due_key[..])?;

                    let mut totals: PayoutTotals =
                        tx_load(common, PAYOUT_TOTALS)?.unwrap_or_default();
                    totals.moved(PayoutStatus::Scheduled, &payout);
                    tx_store(common, PAYOUT_TOTALS, &totals)?;

                    Ok(if paid {
                        PayoutRelease::Paid(payout)
                    } else {
                        PayoutRelease::Skipped(payout)
                    })
                },
            )
            .map_err(map_tx)?;

        if log::log_enabled!(log::Level::Debug) {
            if let PayoutRelease::Paid(payout) | PayoutRelease::Skipped(payout) = &release {
                debug!(
                    "Payout {} of user {} resolved as {} ({})",
                    payout.id, payout.user, payout.status, payout.amount
                );
            }
        }

        Ok(release)
    }
}

impl SledStorage {
    // Ids from the due index up to `horizon` inclusive, by due date then id
    fn scan_due_index(&self, horizon: TimestampSeconds) -> Result<Vec<PayoutId>, EngineError> {
        let keys = match horizon.checked_add(1) {
            Some(end) => self.payouts_due.range(..&id_key(end)[..]),
            None => self.payouts_due.range::<&[u8], _>(..),
        };
        keys.keys()
            .map(|key| {
                let key = key?;
                key.get(8..)
                    .ok_or_else(|| corrupted("payout due"))
                    .and_then(read_payout_id)
            })
            .collect()
    }
}
