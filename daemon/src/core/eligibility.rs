use super::{engine::Engine, error::EngineError, storage::Storage};
use commission_common::{
    account::UserId,
    eligibility::{evaluate, Eligibility, EligibilityInputs},
    time::{month_key, MonthKey, TimestampSeconds},
};
use log::trace;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EligibilityReport {
    pub user_id: UserId,
    pub month: MonthKey,
    pub inputs: EligibilityInputs,
    #[serde(flatten)]
    pub eligibility: Eligibility,
}

impl<S: Storage> Engine<S> {
    /// Evaluate joining and repurchase eligibility against the calendar month of `now`.
    /// Pure read, nothing is persisted.
    pub async fn evaluate_eligibility(
        &self,
        user: UserId,
        now: TimestampSeconds,
    ) -> Result<EligibilityReport, EngineError> {
        let record = self.storage().get_user_or_err(user).await?;

        let directs = self.storage().get_all_direct_referrals(user).await?;
        let mut referrals_of_directs = Vec::with_capacity(directs.len());
        for direct in &directs {
            referrals_of_directs.push(self.storage().get_direct_referrals_count(*direct).await?);
        }

        let month = month_key(now);
        let inputs = EligibilityInputs {
            kyc_status: record.kyc_status,
            direct_referrals: directs.len() as u32,
            referrals_of_directs,
            month_purchase_total: self
                .storage()
                .get_month_purchase_total(user, month)
                .await?,
        };
        let eligibility = evaluate(&inputs, &self.config().eligibility_rules());

        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "eligibility of {} for {}: joining {}, repurchase {}",
                user,
                month,
                eligibility.joining_eligible,
                eligibility.repurchase_eligible
            );
        }

        Ok(EligibilityReport {
            user_id: user,
            month,
            inputs,
            eligibility,
        })
    }
}
