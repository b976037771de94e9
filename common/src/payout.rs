// Deferred self income installments

use crate::{
    account::UserId,
    config::{INSTALLMENT_COUNT, PAYOUT_INTERVAL_SECS},
    error::TransitionError,
    order::OrderId,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;

/// A payout is identified by its order and its installment number (1..=4)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PayoutId {
    pub order: OrderId,
    pub installment: u8,
}

impl PayoutId {
    pub fn new(order: OrderId, installment: u8) -> Self {
        Self { order, installment }
    }
}

impl fmt::Display for PayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.order, self.installment)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayoutStatus {
    Scheduled,
    Paid,
    Skipped,
}

impl PayoutStatus {
    /// scheduled -> paid | skipped, nothing else
    pub fn can_transition_to(self, next: PayoutStatus) -> bool {
        matches!(
            (self, next),
            (PayoutStatus::Scheduled, PayoutStatus::Paid)
                | (PayoutStatus::Scheduled, PayoutStatus::Skipped)
        )
    }

    pub fn is_resolved(self) -> bool {
        self != PayoutStatus::Scheduled
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SelfPayoutSchedule {
    pub id: PayoutId,
    pub user: UserId,
    pub amount: u64,
    pub due_at: TimestampSeconds,
    pub status: PayoutStatus,
    pub created_at: TimestampSeconds,
    pub resolved_at: Option<TimestampSeconds>,
}

impl SelfPayoutSchedule {
    pub fn is_due(&self, now: TimestampSeconds) -> bool {
        self.due_at <= now
    }

    fn transition(
        &mut self,
        next: PayoutStatus,
        at: TimestampSeconds,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::new("payout", self.status, next));
        }
        self.status = next;
        self.resolved_at = Some(at);
        Ok(())
    }

    pub fn mark_paid(&mut self, at: TimestampSeconds) -> Result<(), TransitionError> {
        self.transition(PayoutStatus::Paid, at)
    }

    pub fn mark_skipped(&mut self, at: TimestampSeconds) -> Result<(), TransitionError> {
        self.transition(PayoutStatus::Skipped, at)
    }
}

/// Split self income into equal installments.
/// The remainder of the division goes to the last installment.
pub fn installment_amounts(self_income: u64) -> [u64; INSTALLMENT_COUNT] {
    let count = INSTALLMENT_COUNT as u64;
    let base = self_income / count;
    let mut amounts = [base; INSTALLMENT_COUNT];
    amounts[INSTALLMENT_COUNT - 1] += self_income % count;
    amounts
}

/// Build the installments of a first purchase, due every 7 days after the purchase
pub fn build_schedule(
    user: UserId,
    order: OrderId,
    self_income: u64,
    purchased_at: TimestampSeconds,
) -> Vec<SelfPayoutSchedule> {
    installment_amounts(self_income)
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let k = i as u64 + 1;
            SelfPayoutSchedule {
                id: PayoutId::new(order, k as u8),
                user,
                amount: *amount,
                due_at: purchased_at.saturating_add(PAYOUT_INTERVAL_SECS * k),
                status: PayoutStatus::Scheduled,
                created_at: purchased_at,
                resolved_at: None,
            }
        })
        .collect()
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusTotals {
    pub count: u64,
    pub amount: u64,
}

impl StatusTotals {
    fn add(&mut self, amount: u64) {
        self.count += 1;
        self.amount = self.amount.saturating_add(amount);
    }

    fn remove(&mut self, amount: u64) {
        self.count = self.count.saturating_sub(1);
        self.amount = self.amount.saturating_sub(amount);
    }
}

/// Running totals per payout status, kept in step with every status change
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PayoutTotals {
    pub scheduled: StatusTotals,
    pub paid: StatusTotals,
    pub skipped: StatusTotals,
}

impl PayoutTotals {
    pub fn tally<'a>(payouts: impl IntoIterator<Item = &'a SelfPayoutSchedule>) -> Self {
        let mut totals = PayoutTotals::default();
        for payout in payouts {
            totals.record(payout);
        }
        totals
    }

    fn status_mut(&mut self, status: PayoutStatus) -> &mut StatusTotals {
        match status {
            PayoutStatus::Scheduled => &mut self.scheduled,
            PayoutStatus::Paid => &mut self.paid,
            PayoutStatus::Skipped => &mut self.skipped,
        }
    }

    /// Count a new payout under its current status
    pub fn record(&mut self, payout: &SelfPayoutSchedule) {
        self.status_mut(payout.status).add(payout.amount);
    }

    /// Move a payout from `previous` to its current status
    pub fn moved(&mut self, previous: PayoutStatus, payout: &SelfPayoutSchedule) {
        if previous != payout.status {
            self.status_mut(previous).remove(payout.amount);
            self.status_mut(payout.status).add(payout.amount);
        }
    }
}

/// Read model over payouts: what falls due soon, what is overdue, and per-status totals
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PayoutOverview {
    pub generated_at: TimestampSeconds,
    /// Scheduled payouts due within the window
    pub upcoming: Vec<SelfPayoutSchedule>,
    /// Scheduled payouts already due
    pub overdue: Vec<SelfPayoutSchedule>,
    pub scheduled: StatusTotals,
    pub paid: StatusTotals,
    pub skipped: StatusTotals,
}

impl PayoutOverview {
    /// `due` holds the scheduled payouts due at or before `now + window`
    pub fn build(
        due: impl IntoIterator<Item = SelfPayoutSchedule>,
        totals: PayoutTotals,
        now: TimestampSeconds,
        window: u64,
    ) -> Self {
        let horizon = now.saturating_add(window);
        let mut overview = PayoutOverview {
            generated_at: now,
            scheduled: totals.scheduled,
            paid: totals.paid,
            skipped: totals.skipped,
            ..Default::default()
        };

        for payout in due {
            if payout.status != PayoutStatus::Scheduled {
                continue;
            }
            if payout.due_at <= now {
                overview.overdue.push(payout);
            } else if payout.due_at <= horizon {
                overview.upcoming.push(payout);
            }
        }

        overview.upcoming.sort_by_key(|p| (p.due_at, p.id));
        overview.overdue.sort_by_key(|p| (p.due_at, p.id));
        overview
    }
}
