// Referral system storage provider trait

use crate::core::error::EngineError;
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    referral::{DirectReferralsResult, DownlineProgress, Team, UplineResult},
};

/// Storage provider for sponsor relationships and teams
#[async_trait]
pub trait ReferralProvider {
    // ===== Upline Queries =====

    /// Get N levels of uplines for a user
    ///
    /// # Returns
    /// Vector of upline ids, ordered from immediate sponsor to higher levels.
    /// May return fewer than `levels` if the chain is shorter.
    async fn get_uplines(&self, user: UserId, levels: u8) -> Result<UplineResult, EngineError>;

    // ===== Direct Referrals (Downline) Queries =====

    /// Get direct referrals (users who have this user as their sponsor)
    ///
    /// # Arguments
    /// * `user` - The sponsor to query
    /// * `offset` - Pagination offset
    /// * `limit` - Maximum number of results to return (max 1000)
    async fn get_direct_referrals(
        &self,
        user: UserId,
        offset: u32,
        limit: u32,
    ) -> Result<DirectReferralsResult, EngineError>;

    /// Get every direct referral of a user
    async fn get_all_direct_referrals(&self, user: UserId) -> Result<Vec<UserId>, EngineError>;

    /// Get the count of direct referrals
    async fn get_direct_referrals_count(&self, user: UserId) -> Result<u32, EngineError>;

    // ===== Teams =====

    /// Teams led by a user, in formation order
    async fn get_teams_led_by(&self, leader: UserId) -> Result<Vec<Team>, EngineError>;

    /// Downline completion counter of a user
    async fn get_downline_progress(&self, user: UserId) -> Result<DownlineProgress, EngineError>;

    async fn count_teams(&self) -> Result<u64, EngineError>;
}
