use crate::core::{
    error::EngineError,
    storage::{
        sled::{
            abort, id_key, map_tx, month_total_key, pair_key, payout_due_key, payout_key, read_id,
            tx_load, tx_load_user, tx_mark, tx_store, TxResult, PAYOUT_TOTALS, POOL_STATE,
        },
        OrderBooking, OrderProvider, SledStorage,
    },
};
use async_trait::async_trait;
use commission_common::{
    account::{User, UserId},
    order::{Order, OrderId, PaymentEvent, PurchaseKind, TeamFormationState},
    payout::{build_schedule, PayoutTotals},
    pool::PoolState,
    referral::{
        propagate_completion, CascadeError, CascadeReport, DownlineProgress, SponsorChainState,
        Team,
    },
    split::split_price,
    time::{month_key, MonthKey, TimestampSeconds},
};
use log::{debug, trace};
use sled::{
    transaction::{ConflictableTransactionError, TransactionalTree},
    Transactional,
};

/// Sponsor chain rows seen through an open transaction
struct TxChainState<'a> {
    users: &'a TransactionalTree,
    progress: &'a TransactionalTree,
    teams: &'a TransactionalTree,
}

impl SponsorChainState for TxChainState<'_> {
    type Error = ConflictableTransactionError<EngineError>;

    fn load_user(&self, id: UserId) -> Result<Option<User>, Self::Error> {
        tx_load(self.users, &id_key(id))
    }

    fn store_user(&self, user: &User) -> Result<(), Self::Error> {
        tx_store(self.users, &id_key(user.id), user)
    }

    fn load_progress(&self, id: UserId) -> Result<DownlineProgress, Self::Error> {
        Ok(tx_load(self.progress, &id_key(id))?.unwrap_or_default())
    }

    fn store_progress(&self, id: UserId, progress: &DownlineProgress) -> Result<(), Self::Error> {
        tx_store(self.progress, &id_key(id), progress)
    }

    fn store_team(&self, team: &Team) -> Result<(), Self::Error> {
        tx_store(self.teams, &pair_key(team.leader, team.id.sequence), team)
    }
}

#[async_trait]
impl OrderProvider for SledStorage {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get order {}", id);
        }
        self.load_optional_from_disk(&self.orders, &id_key(id))
    }

    async fn get_orders_for_user(&self, user: UserId) -> Result<Vec<Order>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get orders of user {}", user);
        }
        let mut orders = Vec::new();
        for key in self.user_orders.scan_prefix(id_key(user)).keys() {
            let id = read_id(&key?, 8)?;
            if let Some(order) = self.get_order(id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn book_order(&self, event: &PaymentEvent) -> Result<OrderBooking, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "book order {} of user {} for {}",
                event.order_id,
                event.user_id,
                event.amount
            );
        }

        let order_key = id_key(event.order_id);
        let user_key = id_key(event.user_id);
        let booking = (
            &self.users,
            &self.orders,
            &self.user_orders,
            &self.monthly_totals,
            &self.payouts,
            &self.payouts_due,
            &self.common,
            &self.referral_codes,
        )
            .transaction(
                |(users, orders, user_orders, monthly_totals, payouts, payouts_due, common, codes)|
                 -> TxResult<OrderBooking> {
                    if let Some(order) = tx_load::<Order>(orders, &order_key)? {
                        return Ok(OrderBooking::Existing(order));
                    }

                    let mut user = tx_load_user(users, event.user_id)?;
                    let kind = PurchaseKind::classify(user.has_purchased());
                    let split = split_price(event.amount, kind);
                    let order = Order::new(event, kind, split);

                    let mut pool: PoolState = tx_load(common, POOL_STATE)?.unwrap_or_default();
                    pool.contribute(split.pool_topup).map_err(abort)?;
                    tx_store(common, POOL_STATE, &pool)?;

                    let total_key = month_total_key(user.id, month_key(event.paid_at));
                    let total: u64 = tx_load(monthly_totals, &total_key)?.unwrap_or(0);
                    tx_store(monthly_totals, &total_key, &total.saturating_add(event.amount))?;

                    let mut schedule = Vec::new();
                    if order.is_qualifying() {
                        user.record_first_purchase(event.paid_at);
                        if let Some(code) = user.referral_code.as_ref() {
                            tx_store(codes, code.as_bytes(), &user.id)?;
                        }
                        tx_store(users, &user_key, &user)?;

                        schedule = build_schedule(user.id, order.id, split.self_income, event.paid_at);
                        let mut totals: PayoutTotals =
                            tx_load(common, PAYOUT_TOTALS)?.unwrap_or_default();
                        for payout in &schedule {
                            tx_store(payouts, &payout_key(&payout.id), payout)?;
                            tx_mark(payouts_due, &payout_due_key(payout.due_at, &payout.id))?;
                            totals.record(payout);
                        }
                        tx_store(common, PAYOUT_TOTALS, &totals)?;
                    }

                    tx_store(orders, &order_key, &order)?;
                    tx_mark(user_orders, &pair_key(user.id, order.id))?;

                    Ok(OrderBooking::Booked {
                        order,
                        payouts: schedule,
                    })
                },
            )
            .map_err(map_tx)?;

        if let OrderBooking::Booked { order, payouts } = &booking {
            if log::log_enabled!(log::Level::Debug) {
                debug!(
                    "Order {} booked as {} purchase: company {}, pool top-up {}, self income {} in {} installments",
                    order.id,
                    order.kind,
                    order.split.company_share,
                    order.split.pool_topup,
                    order.split.self_income,
                    payouts.len()
                );
            }
        }

        Ok(booking)
    }

    async fn apply_team_formation(
        &self,
        order_id: OrderId,
        max_depth: u32,
        now: TimestampSeconds,
    ) -> Result<Option<CascadeReport>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("apply team formation of order {}", order_id);
        }

        let order_key = id_key(order_id);
        (
            &self.orders,
            &self.users,
            &self.downline_progress,
            &self.teams,
        )
            .transaction(
                |(orders, users, progress, teams)| -> TxResult<Option<CascadeReport>> {
                    let mut order: Order = tx_load(orders, &order_key)?
                        .ok_or_else(|| abort(EngineError::OrderNotFound(order_id)))?;
                    if !order.team_formation.is_pending() {
                        return Ok(None);
                    }

                    let state = TxChainState {
                        users,
                        progress,
                        teams,
                    };
                    let report = match propagate_completion(&state, order.user, max_depth, now) {
                        Ok(report) => report,
                        Err(CascadeError::Referral(e)) => return Err(abort(e)),
                        Err(CascadeError::State(e)) => return Err(e),
                    };

                    order.team_formation = TeamFormationState::Applied {
                        teams_formed: report.teams.len() as u32,
                    };
                    tx_store(orders, &order_key, &order)?;

                    Ok(Some(report))
                },
            )
            .map_err(map_tx)
    }

    async fn mark_team_formation_failed(
        &self,
        order_id: OrderId,
        reason: String,
    ) -> Result<Order, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("mark team formation of order {} as failed", order_id);
        }

        let order_key = id_key(order_id);
        self.orders
            .transaction(|orders| -> TxResult<Order> {
                let mut order: Order = tx_load(orders, &order_key)?
                    .ok_or_else(|| abort(EngineError::OrderNotFound(order_id)))?;
                if order.team_formation.is_pending() {
                    order.team_formation = TeamFormationState::Failed {
                        reason: reason.clone(),
                    };
                    tx_store(orders, &order_key, &order)?;
                }
                Ok(order)
            })
            .map_err(map_tx)
    }

    async fn get_month_purchase_total(
        &self,
        user: UserId,
        month: MonthKey,
    ) -> Result<u64, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get purchase total of user {} for {}", user, month);
        }
        Ok(self
            .load_optional_from_disk(&self.monthly_totals, &month_total_key(user, month))?
            .unwrap_or(0))
    }
}
