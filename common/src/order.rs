// Orders as seen by the engine: only verified payments ever reach it

use crate::{account::UserId, split::PriceSplit, time::TimestampSeconds};
use serde::{Deserialize, Serialize};
use strum::Display;

pub type OrderId = u64;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PurchaseKind {
    First,
    Repurchase,
}

impl PurchaseKind {
    /// Classify an order from the buyer's purchase history
    pub fn classify(has_purchased: bool) -> Self {
        if has_purchased {
            PurchaseKind::Repurchase
        } else {
            PurchaseKind::First
        }
    }
}

/// A "payment verified" event emitted by the payment gateway integration.
/// May be delivered more than once for the same order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaymentEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: u64,
    pub paid_at: TimestampSeconds,
}

/// Progress of the sponsor-chain cascade triggered by an order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamFormationState {
    /// Repurchases and zero-amount orders do not trigger a cascade
    NotApplicable,
    /// Order booked, cascade not committed yet
    Pending,
    Applied { teams_formed: u32 },
    /// Data integrity failure, kept for manual review
    Failed { reason: String },
}

impl TeamFormationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TeamFormationState::Pending)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    pub amount: u64,
    pub kind: PurchaseKind,
    pub split: PriceSplit,
    pub verified_at: TimestampSeconds,
    pub team_formation: TeamFormationState,
}

impl Order {
    pub fn new(event: &PaymentEvent, kind: PurchaseKind, split: PriceSplit) -> Self {
        let team_formation = if kind == PurchaseKind::First && event.amount > 0 {
            TeamFormationState::Pending
        } else {
            TeamFormationState::NotApplicable
        };

        Self {
            id: event.order_id,
            user: event.user_id,
            amount: event.amount,
            kind,
            split,
            verified_at: event.paid_at,
            team_formation,
        }
    }

    /// Immutable once the order is booked
    pub fn is_first_purchase(&self) -> bool {
        self.kind == PurchaseKind::First
    }

    /// First purchases with a positive amount schedule self income and feed the sponsor chain
    pub fn is_qualifying(&self) -> bool {
        self.is_first_purchase() && self.amount > 0
    }
}
