use super::{
    engine::Engine,
    error::{EngineError, ErrorKind},
    storage::{OrderBooking, Storage},
};
use commission_common::{
    account::UserId,
    order::{Order, OrderId, PaymentEvent},
    referral::CascadeReport,
    time::TimestampSeconds,
};
use log::{debug, error, info, trace};
use metrics::counter;
use serde::Serialize;

/// Outcome of a verified payment event
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub order: Order,
    /// The order id was already booked by an earlier event
    pub duplicate: bool,
    pub payouts_scheduled: usize,
    /// Team formation committed by this call, if any
    pub cascade: Option<CascadeReport>,
    /// Set when the cascade hit broken sponsor data
    pub failure: Option<String>,
}

impl<S: Storage> Engine<S> {
    /// Settle a verified payment.
    ///
    /// The booking (order, pool top-up, monthly total, payout schedule) and
    /// the team formation cascade are two transactions: a crash in between
    /// leaves the order `Pending`, and replaying the event runs the cascade.
    pub async fn process_payment(
        &self,
        event: PaymentEvent,
        now: TimestampSeconds,
    ) -> Result<PaymentReceipt, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "process payment of order {} for user {} ({})",
                event.order_id,
                event.user_id,
                event.amount
            );
        }

        let (order, duplicate, payouts_scheduled) =
            match self.storage().book_order(&event).await? {
                OrderBooking::Booked { order, payouts } => {
                    counter!("commission_payments_processed").increment(1);
                    (order, false, payouts.len())
                }
                OrderBooking::Existing(order) => {
                    if order.user != event.user_id {
                        return Err(EngineError::OrderOwnerMismatch {
                            order: order.id,
                            owner: order.user,
                            user: event.user_id,
                        });
                    }
                    counter!("commission_payments_duplicated").increment(1);
                    debug!("Payment event for order {} was already processed", order.id);
                    (order, true, 0)
                }
            };

        let mut receipt = PaymentReceipt {
            order,
            duplicate,
            payouts_scheduled,
            cascade: None,
            failure: None,
        };
        if !receipt.order.team_formation.is_pending() {
            return Ok(receipt);
        }

        let order_id = receipt.order.id;
        match self
            .storage()
            .apply_team_formation(order_id, self.config().max_sponsor_depth, now)
            .await
        {
            Ok(cascade) => {
                if let Some(report) = &cascade {
                    counter!("commission_teams_formed").increment(report.teams.len() as u64);
                    counter!("commission_promotions").increment(report.promotions.len() as u64);
                    for promotion in &report.promotions {
                        info!(
                            "User {} promoted from {} to {}",
                            promotion.user, promotion.from, promotion.to
                        );
                    }
                    if log::log_enabled!(log::Level::Debug) {
                        debug!(
                            "Order {} formed {} teams in {} hops ({})",
                            order_id,
                            report.teams.len(),
                            report.hops,
                            report.stop
                        );
                    }
                }
                receipt.order = self.get_order(order_id).await?;
                receipt.cascade = cascade;
            }
            Err(e) if e.kind() == ErrorKind::DataIntegrity => {
                error!("Team formation of order {} failed: {}", order_id, e);
                counter!("commission_team_formation_failures").increment(1);
                let reason = e.to_string();
                receipt.order = self
                    .storage()
                    .mark_team_formation_failed(order_id, reason.clone())
                    .await?;
                receipt.failure = Some(reason);
            }
            Err(e) => return Err(e),
        }

        Ok(receipt)
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, EngineError> {
        self.storage()
            .get_order(id)
            .await?
            .ok_or(EngineError::OrderNotFound(id))
    }

    pub async fn get_orders_for_user(&self, user: UserId) -> Result<Vec<Order>, EngineError> {
        self.storage().get_user_or_err(user).await?;
        self.storage().get_orders_for_user(user).await
    }
}
