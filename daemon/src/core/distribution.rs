use super::{engine::Engine, error::EngineError, storage::Storage};
use crate::config::MAX_RUN_KEY_LEN;
use commission_common::{
    account::UserId,
    level::Level,
    pool::{CreditStatus, DistributionRun, PoolState},
    time::{date_label, TimestampSeconds},
};
use log::{debug, error, info, warn};
use metrics::{counter, histogram};
use serde::Serialize;
use std::time::Instant;

/// A credit left pending by a failure, retried on the next trigger of the run
#[derive(Debug, Clone, Serialize)]
pub struct CreditFailure {
    pub user: UserId,
    pub level: Level,
    pub amount: u64,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionSummary {
    pub run: DistributionRun,
    /// The key was already known and the run was picked up where it stopped
    pub resumed: bool,
    pub credited_count: u64,
    pub returned_count: u64,
    pub failures: Vec<CreditFailure>,
    pub pool: PoolState,
    pub execution_ms: u64,
}

fn check_run_key(key: &str) -> Result<(), EngineError> {
    if key.is_empty() || key.len() > MAX_RUN_KEY_LEN {
        return Err(EngineError::InvalidInput(format!(
            "distribution key must be 1 to {} characters",
            MAX_RUN_KEY_LEN
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        return Err(EngineError::InvalidInput(format!(
            "distribution key {:?} contains unsupported characters",
            key
        )));
    }
    Ok(())
}

impl<S: Storage> Engine<S> {
    /// Distribute the turnover pool to active users by level.
    ///
    /// The plan is computed and the pool debited once per key. Credits are
    /// then applied one transaction each; triggering a key again resumes the
    /// pending credits or returns the completed run.
    pub async fn distribute_pool(
        &self,
        key: Option<String>,
        now: TimestampSeconds,
    ) -> Result<DistributionSummary, EngineError> {
        let start = Instant::now();
        let key = match key {
            Some(key) => key.trim().to_owned(),
            None => date_label(now),
        };
        check_run_key(&key)?;

        let (run, resumed) = match self.storage().get_distribution_run(&key).await? {
            Some(run) => {
                info!("Resuming distribution run {} ({})", key, run.status);
                (run, true)
            }
            None => {
                let recipients = self.storage().get_active_users_by_level().await?;
                let run = self
                    .storage()
                    .start_distribution_run(&key, &recipients, now)
                    .await?;
                info!(
                    "Distribution run {} started: {} of {} to distribute",
                    key, run.plan.total_distributed, run.plan.pool_balance
                );
                (run, false)
            }
        };

        let mut summary = DistributionSummary {
            run,
            resumed,
            credited_count: 0,
            returned_count: 0,
            failures: Vec::new(),
            pool: PoolState::default(),
            execution_ms: 0,
        };

        if !summary.run.is_completed() {
            let credits = self.storage().get_distribution_credits(&key).await?;
            for credit in credits
                .into_iter()
                .filter(|credit| credit.status == CreditStatus::Pending)
            {
                match self
                    .storage()
                    .apply_distribution_credit(&key, credit.user, now)
                    .await
                {
                    Ok(applied) => match applied.status {
                        CreditStatus::Credited => {
                            summary.credited_count += 1;
                            counter!("commission_distribution_credits", "status" => "credited")
                                .increment(1);
                        }
                        CreditStatus::Returned => {
                            summary.returned_count += 1;
                            counter!("commission_distribution_credits", "status" => "returned")
                                .increment(1);
                            debug!(
                                "Share of {} returned to the pool, user {} is inactive",
                                applied.amount, applied.user
                            );
                        }
                        CreditStatus::Pending => {}
                    },
                    Err(e) if e.aborts_batch() => {
                        error!("Distribution run {} aborted: {}", key, e);
                        return Err(e);
                    }
                    Err(e) if e.is_conflict() => {
                        debug!("Credit of user {} in run {} already applied", credit.user, key);
                    }
                    Err(e) => {
                        error!(
                            "Failed to credit user {} in distribution run {}: {}",
                            credit.user, key, e
                        );
                        counter!("commission_distribution_credits", "status" => "failed")
                            .increment(1);
                        summary.failures.push(CreditFailure {
                            user: credit.user,
                            level: credit.level,
                            amount: credit.amount,
                            error: e.to_string(),
                        });
                    }
                }
            }

            summary.run = if summary.failures.is_empty() {
                self.storage().complete_distribution_run(&key, now).await?
            } else {
                warn!(
                    "Distribution run {} left in progress with {} failed credits",
                    key,
                    summary.failures.len()
                );
                self.storage()
                    .get_distribution_run(&key)
                    .await?
                    .ok_or_else(|| EngineError::DistributionRunNotFound(key.clone()))?
            };
        }

        summary.pool = self.storage().get_pool().await?;
        summary.execution_ms = start.elapsed().as_millis() as u64;
        histogram!("commission_distribution_ms").record(summary.execution_ms as f64);
        info!(
            "Distribution run {} is {}: {} credited, {} returned, pool balance {}",
            key, summary.run.status, summary.run.credited, summary.run.returned, summary.pool.balance
        );

        Ok(summary)
    }

    pub async fn get_pool(&self) -> Result<PoolState, EngineError> {
        self.storage().get_pool().await
    }

    pub async fn get_distribution_runs(&self) -> Result<Vec<DistributionRun>, EngineError> {
        self.storage().get_distribution_runs().await
    }

    pub async fn get_distribution_run(&self, key: &str) -> Result<DistributionRun, EngineError> {
        self.storage()
            .get_distribution_run(key)
            .await?
            .ok_or_else(|| EngineError::DistributionRunNotFound(key.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_key() {
        assert!(check_run_key("2024-03-31").is_ok());
        assert!(check_run_key("monthly:2024_03").is_ok());
        assert!(check_run_key("").is_err());
        assert!(check_run_key("with space").is_err());
        assert!(check_run_key(&"k".repeat(MAX_RUN_KEY_LEN + 1)).is_err());
    }
}
