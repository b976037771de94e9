use crate::core::{
    error::EngineError,
    storage::{
        sled::{
            abort, credit_key, credit_prefix, id_key, map_tx, tx_book_credit, tx_load,
            tx_load_user, tx_store, TxResult, POOL_STATE,
        },
        PoolProvider, SledStorage,
    },
};
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    error::TransitionError,
    ledger::LedgerReference,
    level::Level,
    pool::{
        plan_distribution, CreditStatus, DistributionCredit, DistributionRun, PoolState, RunStatus,
    },
    time::TimestampSeconds,
};
use log::{debug, trace};
use sled::Transactional;
use std::collections::BTreeMap;

fn tx_load_run(runs: &sled::transaction::TransactionalTree, key: &str) -> TxResult<DistributionRun> {
    tx_load(runs, key.as_bytes())?
        .ok_or_else(|| abort(EngineError::DistributionRunNotFound(key.to_owned())))
}

#[async_trait]
impl PoolProvider for SledStorage {
    async fn get_pool(&self) -> Result<PoolState, EngineError> {
        trace!("get pool");
        Ok(self
            .load_optional_from_disk(&self.common, POOL_STATE)?
            .unwrap_or_default())
    }

    async fn get_distribution_run(
        &self,
        key: &str,
    ) -> Result<Option<DistributionRun>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get distribution run {}", key);
        }
        self.load_optional_from_disk(&self.distribution_runs, key.as_bytes())
    }

    async fn get_distribution_runs(&self) -> Result<Vec<DistributionRun>, EngineError> {
        trace!("get distribution runs");
        let mut runs: Vec<DistributionRun> = self.iter_values(&self.distribution_runs)?;
        runs.sort_by_key(|run| run.started_at);
        Ok(runs)
    }

    async fn start_distribution_run(
        &self,
        key: &str,
        recipients: &BTreeMap<Level, Vec<UserId>>,
        now: TimestampSeconds,
    ) -> Result<DistributionRun, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("start distribution run {}", key);
        }

        let counts: BTreeMap<Level, u64> = recipients
            .iter()
            .map(|(level, users)| (*level, users.len() as u64))
            .collect();

        let run = (
            &self.common,
            &self.distribution_runs,
            &self.distribution_credits,
        )
            .transaction(|(common, runs, credits)| -> TxResult<DistributionRun> {
                if let Some(run) = tx_load::<DistributionRun>(runs, key.as_bytes())? {
                    return Ok(run);
                }

                let mut pool: PoolState = tx_load(common, POOL_STATE)?.unwrap_or_default();
                let plan = plan_distribution(pool.balance, &counts);

                for (level, users) in recipients {
                    let amount = plan.per_user(*level);
                    if amount == 0 {
                        continue;
                    }
                    for user in users {
                        let credit = DistributionCredit {
                            run: key.to_owned(),
                            user: *user,
                            level: *level,
                            amount,
                            status: CreditStatus::Pending,
                        };
                        tx_store(credits, &credit_key(key, *user), &credit)?;
                    }
                }

                pool.withdraw(plan.total_distributed).map_err(abort)?;
                tx_store(common, POOL_STATE, &pool)?;

                let run = DistributionRun::new(key.to_owned(), plan, now);
                tx_store(runs, key.as_bytes(), &run)?;
                Ok(run)
            })
            .map_err(map_tx)?;

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Distribution run {} planned {} of {} (remainder {})",
                run.key, run.plan.total_distributed, run.plan.pool_balance, run.plan.remainder
            );
        }
        Ok(run)
    }

    async fn get_distribution_credits(
        &self,
        key: &str,
    ) -> Result<Vec<DistributionCredit>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get credits of distribution run {}", key);
        }
        self.scan_prefix_values(&self.distribution_credits, &credit_prefix(key))
    }

    async fn apply_distribution_credit(
        &self,
        key: &str,
        user_id: UserId,
        now: TimestampSeconds,
    ) -> Result<DistributionCredit, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("apply credit of {} for run {}", user_id, key);
        }

        let credit_row = credit_key(key, user_id);
        (
            &self.common,
            &self.distribution_runs,
            &self.distribution_credits,
            &self.users,
            &self.ledger,
            &self.ledger_references,
        )
            .transaction(
                |(common, runs, credits, users, ledger, references)| -> TxResult<DistributionCredit> {
                    let mut credit: DistributionCredit = tx_load(credits, &credit_row)?
                        .ok_or_else(|| {
                            abort(EngineError::DistributionCreditNotFound {
                                run: key.to_owned(),
                                user: user_id,
                            })
                        })?;
                    if credit.status != CreditStatus::Pending {
                        return Err(abort(TransitionError::new(
                            "distribution credit",
                            credit.status,
                            CreditStatus::Credited,
                        )));
                    }

                    let mut run = tx_load_run(runs, key)?;
                    let mut pool: PoolState = tx_load(common, POOL_STATE)?.unwrap_or_default();
                    let mut user = tx_load_user(users, user_id)?;

                    if user.is_active {
                        tx_book_credit(
                            ledger,
                            references,
                            &mut user,
                            credit.amount,
                            LedgerReference::DistributionRun(key.to_owned()),
                            now,
                        )?;
                        tx_store(users, &id_key(user_id), &user)?;
                        pool.record_distributed(credit.amount);
                        run.credited = run.credited.saturating_add(credit.amount);
                        credit.status = CreditStatus::Credited;
                    } else {
                        pool.restore(credit.amount).map_err(abort)?;
                        run.returned = run.returned.saturating_add(credit.amount);
                        credit.status = CreditStatus::Returned;
                    }

                    tx_store(common, POOL_STATE, &pool)?;
                    tx_store(runs, key.as_bytes(), &run)?;
                    tx_store(credits, &credit_row, &credit)?;
                    Ok(credit)
                },
            )
            .map_err(map_tx)
    }

    async fn complete_distribution_run(
        &self,
        key: &str,
        now: TimestampSeconds,
    ) -> Result<DistributionRun, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("complete distribution run {}", key);
        }

        (&self.common, &self.distribution_runs)
            .transaction(|(common, runs)| -> TxResult<DistributionRun> {
                let mut run = tx_load_run(runs, key)?;
                if run.is_completed() {
                    return Ok(run);
                }

                run.status = RunStatus::Completed;
                run.completed_at = Some(now);
                let mut pool: PoolState = tx_load(common, POOL_STATE)?.unwrap_or_default();
                pool.last_distribution_at = Some(now);

                tx_store(common, POOL_STATE, &pool)?;
                tx_store(runs, key.as_bytes(), &run)?;
                Ok(run)
            })
            .map_err(map_tx)
    }
}
