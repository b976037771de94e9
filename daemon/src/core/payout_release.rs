use super::{
    engine::Engine,
    error::EngineError,
    storage::{PayoutRelease, Storage},
};
use commission_common::{
    account::UserId,
    payout::{PayoutId, PayoutOverview, SelfPayoutSchedule},
    time::TimestampSeconds,
};
use log::{debug, error, info, trace};
use metrics::{counter, histogram};
use serde::Serialize;
use std::time::Instant;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReleaseOutcome {
    Paid,
    Skipped,
    /// Resolved by a concurrent run
    Conflict,
    NotDue,
    Failed,
}

/// Result of releasing a single installment
#[derive(Debug, Clone, Serialize)]
pub struct PayoutResult {
    pub id: PayoutId,
    pub user: Option<UserId>,
    pub amount: u64,
    pub outcome: ReleaseOutcome,
    /// Error message if failed
    pub error: Option<String>,
}

/// Result of one release job
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleaseSummary {
    pub run_at: TimestampSeconds,
    pub processed: u64,
    pub paid: u64,
    pub skipped: u64,
    pub conflicts: u64,
    pub failed: u64,
    /// Amount credited to wallets by this run
    pub total_amount: u64,
    pub execution_ms: u64,
    pub results: Vec<PayoutResult>,
}

impl ReleaseSummary {
    fn push(&mut self, payout: &SelfPayoutSchedule, outcome: ReleaseOutcome) {
        self.results.push(PayoutResult {
            id: payout.id,
            user: Some(payout.user),
            amount: payout.amount,
            outcome,
            error: None,
        });
    }
}

impl<S: Storage> Engine<S> {
    /// Release every installment due at `now`.
    ///
    /// Each installment is its own transaction: a failure is recorded and the
    /// job moves on. Running the job twice, or twice concurrently, never pays
    /// an installment more than once. Only a storage failure aborts the run.
    pub async fn release_due_payouts(
        &self,
        now: TimestampSeconds,
    ) -> Result<ReleaseSummary, EngineError> {
        let start = Instant::now();
        let due = self.storage().get_due_payouts(now).await?;
        info!("Releasing {} due payouts at {}", due.len(), now);

        let mut summary = ReleaseSummary {
            run_at: now,
            ..Default::default()
        };

        for id in due {
            summary.processed += 1;
            match self.storage().release_payout(id, now).await {
                Ok(PayoutRelease::Paid(payout)) => {
                    summary.paid += 1;
                    summary.total_amount = summary.total_amount.saturating_add(payout.amount);
                    counter!("commission_payouts_paid").increment(1);
                    counter!("commission_payout_amount_released").increment(payout.amount);
                    summary.push(&payout, ReleaseOutcome::Paid);
                }
                Ok(PayoutRelease::Skipped(payout)) => {
                    summary.skipped += 1;
                    counter!("commission_payouts_skipped").increment(1);
                    debug!("Payout {} skipped, user {} is inactive", payout.id, payout.user);
                    summary.push(&payout, ReleaseOutcome::Skipped);
                }
                Ok(PayoutRelease::AlreadyResolved(payout)) => {
                    summary.conflicts += 1;
                    debug!("Payout {} already {}", payout.id, payout.status);
                    summary.push(&payout, ReleaseOutcome::Conflict);
                }
                Ok(PayoutRelease::NotDue(payout)) => {
                    if log::log_enabled!(log::Level::Trace) {
                        trace!("Payout {} is due at {}", payout.id, payout.due_at);
                    }
                    summary.push(&payout, ReleaseOutcome::NotDue);
                }
                Err(e) if e.aborts_batch() => {
                    error!("Payout release aborted at {}: {}", id, e);
                    return Err(e);
                }
                Err(e) if e.is_conflict() => {
                    summary.conflicts += 1;
                    debug!("Payout {} conflict: {}", id, e);
                    summary.results.push(PayoutResult {
                        id,
                        user: None,
                        amount: 0,
                        outcome: ReleaseOutcome::Conflict,
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => {
                    summary.failed += 1;
                    counter!("commission_payouts_failed").increment(1);
                    error!("Failed to release payout {}: {}", id, e);
                    summary.results.push(PayoutResult {
                        id,
                        user: None,
                        amount: 0,
                        outcome: ReleaseOutcome::Failed,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        summary.execution_ms = start.elapsed().as_millis() as u64;
        histogram!("commission_payout_release_ms").record(summary.execution_ms as f64);
        info!(
            "Payout release done: {} processed, {} paid ({}), {} skipped, {} conflicts, {} failed in {}ms",
            summary.processed,
            summary.paid,
            summary.total_amount,
            summary.skipped,
            summary.conflicts,
            summary.failed,
            summary.execution_ms
        );

        Ok(summary)
    }

    /// Read-only view of upcoming and overdue installments
    pub async fn payout_overview(
        &self,
        now: TimestampSeconds,
    ) -> Result<PayoutOverview, EngineError> {
        let window = self.config().upcoming_window_secs;
        let due = self
            .storage()
            .get_scheduled_payouts_until(now.saturating_add(window))
            .await?;
        let totals = self.storage().get_payout_totals().await?;
        Ok(PayoutOverview::build(due, totals, now, window))
    }

    pub async fn get_user_payouts(
        &self,
        user: UserId,
    ) -> Result<Vec<SelfPayoutSchedule>, EngineError> {
        self.storage().get_user_or_err(user).await?;
        self.storage().get_payouts_for_user(user).await
    }
}
