use super::{
    engine::Engine,
    error::EngineError,
    storage::Storage,
};
use commission_common::{
    account::{KycStatus, User, UserId},
    level::Level,
    referral::{DirectReferralsResult, DownlineProgress, ReferralError, Team, UplineResult},
    time::TimestampSeconds,
};
use log::{debug, info};
use metrics::counter;
use serde::{Deserialize, Serialize};

/// Sponsor given at registration or binding time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorRef {
    Id(UserId),
    Code(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: UserId,
    #[serde(default)]
    pub sponsor: Option<SponsorRef>,
    #[serde(default)]
    pub kyc_status: KycStatus,
}

/// Referral position of a user: sponsor chain, downline and teams
#[derive(Debug, Clone, Serialize)]
pub struct ReferralSummary {
    pub user_id: UserId,
    pub sponsor: Option<UserId>,
    pub referral_code: Option<String>,
    pub level: Level,
    pub team_count: u64,
    pub uplines: UplineResult,
    pub direct_referrals: DirectReferralsResult,
    pub progress: DownlineProgress,
    pub teams: Vec<Team>,
}

impl<S: Storage> Engine<S> {
    async fn resolve_sponsor(&self, sponsor: &SponsorRef) -> Result<UserId, EngineError> {
        match sponsor {
            SponsorRef::Id(id) => Ok(*id),
            SponsorRef::Code(code) => {
                let code = code.trim().to_ascii_uppercase();
                self.storage()
                    .resolve_referral_code(&code)
                    .await?
                    .ok_or(EngineError::Referral(ReferralError::SponsorNotFound))
            }
        }
    }

    pub async fn register_user(
        &self,
        registration: Registration,
        now: TimestampSeconds,
    ) -> Result<User, EngineError> {
        let sponsor = match &registration.sponsor {
            Some(sponsor) => Some(self.resolve_sponsor(sponsor).await?),
            None => None,
        };

        let user = User::new(registration.id, sponsor, registration.kyc_status, now);
        self.storage().register_user(user.clone()).await?;
        counter!("commission_users_registered").increment(1);

        if log::log_enabled!(log::Level::Debug) {
            debug!("Registered user {} with sponsor {:?}", user.id, user.sponsor);
        }
        Ok(user)
    }

    /// One-time sponsor binding for a user registered without one
    pub async fn bind_sponsor(&self, user: UserId, sponsor: SponsorRef) -> Result<User, EngineError> {
        let sponsor = self.resolve_sponsor(&sponsor).await?;
        let user = self.storage().bind_sponsor(user, sponsor).await?;
        info!("User {} bound to sponsor {}", user.id, sponsor);
        Ok(user)
    }

    pub async fn update_kyc(&self, user: UserId, status: KycStatus) -> Result<User, EngineError> {
        let user = self.storage().set_kyc_status(user, status).await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!("KYC of user {} is now {}", user.id, user.kyc_status.as_str());
        }
        Ok(user)
    }

    /// Deactivated users stop receiving payouts and pool shares
    pub async fn set_user_active(&self, user: UserId, active: bool) -> Result<User, EngineError> {
        let user = self.storage().set_active(user, active).await?;
        info!(
            "User {} {}",
            user.id,
            if active { "reactivated" } else { "deactivated" }
        );
        Ok(user)
    }

    pub async fn get_user(&self, user: UserId) -> Result<User, EngineError> {
        self.storage().get_user_or_err(user).await
    }

    pub async fn referral_summary(
        &self,
        user: UserId,
        levels: u8,
        offset: u32,
        limit: u32,
    ) -> Result<ReferralSummary, EngineError> {
        let record = self.storage().get_user_or_err(user).await?;
        let uplines = self.storage().get_uplines(user, levels).await?;
        let direct_referrals = self
            .storage()
            .get_direct_referrals(user, offset, limit)
            .await?;
        let progress = self.storage().get_downline_progress(user).await?;
        let teams = self.storage().get_teams_led_by(user).await?;

        Ok(ReferralSummary {
            user_id: record.id,
            sponsor: record.sponsor,
            referral_code: record.referral_code,
            level: record.level,
            team_count: record.team_count,
            uplines,
            direct_referrals,
            progress,
            teams,
        })
    }
}
