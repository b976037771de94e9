use super::{withdrawal_status_key, SledStorage, DB_VERSION, EMPTY, PAYOUT_TOTALS};
use crate::core::error::EngineError;
use commission_common::{
    config::VERSION,
    payout::{PayoutTotals, SelfPayoutSchedule},
    withdrawal::WithdrawalRequest,
};
use log::{debug, info};

impl SledStorage {
    pub(super) fn handle_migrations(&self) -> Result<(), EngineError> {
        self.rebuild_read_indexes()?;

        let stored: Option<String> = self.load_optional_from_disk(&self.common, DB_VERSION)?;
        match stored {
            Some(version) if version == VERSION => return Ok(()),
            Some(version) => info!("upgrading DB from version {} to {}", version, VERSION),
            None => debug!("set DB version to {}", VERSION),
        }

        self.insert_into_disk(&self.common, DB_VERSION, VERSION)?;

        Ok(())
    }

    // Databases written before the payout totals row and the withdrawal status index existed
    fn rebuild_read_indexes(&self) -> Result<(), EngineError> {
        if !self.contains_data(&self.common, PAYOUT_TOTALS)? && !self.payouts.is_empty() {
            let payouts: Vec<SelfPayoutSchedule> = self.iter_values(&self.payouts)?;
            let totals = PayoutTotals::tally(&payouts);
            self.insert_into_disk(&self.common, PAYOUT_TOTALS, &totals)?;
            info!("rebuilt payout totals over {} payouts", payouts.len());
        }

        if self.withdrawals_by_status.is_empty() && !self.withdrawals.is_empty() {
            let requests: Vec<WithdrawalRequest> = self.iter_values(&self.withdrawals)?;
            for request in &requests {
                self.withdrawals_by_status
                    .insert(withdrawal_status_key(request.status, request.id), EMPTY)?;
            }
            info!("indexed {} withdrawals by status", requests.len());
        }

        Ok(())
    }
}
