use crate::core::error::EngineError;
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    order::{Order, OrderId, PaymentEvent},
    payout::SelfPayoutSchedule,
    referral::CascadeReport,
    time::{MonthKey, TimestampSeconds},
};

/// Result of booking a verified payment
#[derive(Debug, Clone)]
pub enum OrderBooking {
    /// First delivery of the event
    Booked {
        order: Order,
        payouts: Vec<SelfPayoutSchedule>,
    },
    /// The order was already booked by a previous delivery
    Existing(Order),
}

impl OrderBooking {
    pub fn order(&self) -> &Order {
        match self {
            OrderBooking::Booked { order, .. } => order,
            OrderBooking::Existing(order) => order,
        }
    }
}

#[async_trait]
pub trait OrderProvider {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, EngineError>;

    /// Orders of a user, by order id
    async fn get_orders_for_user(&self, user: UserId) -> Result<Vec<Order>, EngineError>;

    /// Book a verified payment in a single transaction:
    /// order row, pool top-up, monthly purchase total and, for a qualifying
    /// first purchase, the referral code and the 4 self payout installments.
    ///
    /// An order id that is already stored is returned untouched.
    async fn book_order(&self, event: &PaymentEvent) -> Result<OrderBooking, EngineError>;

    /// Run the sponsor-chain cascade of a first purchase and mark the order as applied,
    /// all in one transaction.
    ///
    /// Returns None if the order's cascade is not pending anymore.
    async fn apply_team_formation(
        &self,
        order: OrderId,
        max_depth: u32,
        now: TimestampSeconds,
    ) -> Result<Option<CascadeReport>, EngineError>;

    /// Keep a pending cascade for manual review after a data integrity failure
    async fn mark_team_formation_failed(
        &self,
        order: OrderId,
        reason: String,
    ) -> Result<Order, EngineError>;

    /// Sum of a user's order amounts for a calendar month
    async fn get_month_purchase_total(
        &self,
        user: UserId,
        month: MonthKey,
    ) -> Result<u64, EngineError>;
}
