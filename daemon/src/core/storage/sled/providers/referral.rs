// ReferralProvider implementation for sled storage

use crate::core::{
    error::EngineError,
    storage::{
        sled::{id_key, read_id},
        ReferralProvider, SledStorage, UserProvider,
    },
};
use async_trait::async_trait;
use commission_common::{
    account::UserId,
    referral::{
        check_page, check_upline_levels, DirectReferralsResult, DownlineProgress, ReferralError,
        Team, UplineResult,
    },
};
use log::trace;
use std::collections::HashSet;

#[async_trait]
impl ReferralProvider for SledStorage {
    async fn get_uplines(&self, user: UserId, levels: u8) -> Result<UplineResult, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("getting {} uplines for user {}", levels, user);
        }
        check_upline_levels(levels)?;

        let mut uplines = Vec::with_capacity(levels as usize);
        let mut visited = HashSet::from([user]);
        let mut current = self.get_user_or_err(user).await?;

        while uplines.len() < levels as usize {
            let Some(sponsor) = current.sponsor else {
                break;
            };
            if !visited.insert(sponsor) {
                return Err(ReferralError::CircularReference { user: sponsor }.into());
            }
            let child = current.id;
            current = self.get_user(sponsor).await?.ok_or(ReferralError::MissingAncestor {
                user: child,
                sponsor,
            })?;
            uplines.push(sponsor);
        }

        Ok(UplineResult::new(uplines))
    }

    async fn get_direct_referrals(
        &self,
        user: UserId,
        offset: u32,
        limit: u32,
    ) -> Result<DirectReferralsResult, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "getting direct referrals for user {} (offset: {}, limit: {})",
                user,
                offset,
                limit
            );
        }

        let total = self.get_direct_referrals_count(user).await?;
        check_page(offset, limit, total)?;

        let referrals = self
            .direct_referrals
            .scan_prefix(id_key(user))
            .keys()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|key| read_id(&key?, 8))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DirectReferralsResult::new(referrals, total, offset))
    }

    async fn get_all_direct_referrals(&self, user: UserId) -> Result<Vec<UserId>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("getting all direct referrals for user {}", user);
        }
        self.direct_referrals
            .scan_prefix(id_key(user))
            .keys()
            .map(|key| read_id(&key?, 8))
            .collect()
    }

    async fn get_direct_referrals_count(&self, user: UserId) -> Result<u32, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("getting direct referrals count for user {}", user);
        }
        Ok(self.get_user_or_err(user).await?.direct_referrals_count)
    }

    async fn get_teams_led_by(&self, leader: UserId) -> Result<Vec<Team>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("getting teams led by {}", leader);
        }
        self.scan_prefix_values(&self.teams, &id_key(leader))
    }

    async fn get_downline_progress(&self, user: UserId) -> Result<DownlineProgress, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("getting downline progress of {}", user);
        }
        Ok(self
            .load_optional_from_disk(&self.downline_progress, &id_key(user))?
            .unwrap_or_default())
    }

    async fn count_teams(&self) -> Result<u64, EngineError> {
        Ok(self.teams.len() as u64)
    }
}
