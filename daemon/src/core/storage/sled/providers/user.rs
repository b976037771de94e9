use crate::core::{
    error::EngineError,
    storage::{
        sled::{abort, id_key, map_tx, pair_key, tx_load, tx_load_user, tx_mark, tx_store, TxResult},
        SledStorage, UserProvider,
    },
};
use async_trait::async_trait;
use commission_common::{
    account::{KycStatus, User, UserId},
    level::Level,
    referral::ReferralError,
};
use log::{debug, trace};
use sled::Transactional;
use std::collections::{BTreeMap, HashSet};

impl SledStorage {
    /// Apply a change to a single user row atomically
    fn update_user<F>(&self, id: UserId, apply: F) -> Result<User, EngineError>
    where
        F: Fn(&mut User),
    {
        self.users
            .transaction(|users| -> TxResult<User> {
                let mut user = tx_load_user(users, id)?;
                apply(&mut user);
                tx_store(users, &id_key(id), &user)?;
                Ok(user)
            })
            .map_err(map_tx)
    }
}

#[async_trait]
impl UserProvider for SledStorage {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get user {}", id);
        }
        self.load_optional_from_disk(&self.users, &id_key(id))
    }

    async fn register_user(&self, user: User) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("register user {} with sponsor {:?}", user.id, user.sponsor);
        }

        let key = id_key(user.id);
        (&self.users, &self.direct_referrals)
            .transaction(|(users, directs)| -> TxResult<()> {
                if users.get(key)?.is_some() {
                    return Err(abort(ReferralError::AlreadyRegistered(user.id)));
                }

                if let Some(sponsor_id) = user.sponsor {
                    if sponsor_id == user.id {
                        return Err(abort(ReferralError::SelfReferral));
                    }
                    let mut sponsor: User = tx_load(users, &id_key(sponsor_id))?
                        .ok_or_else(|| abort(ReferralError::SponsorNotFound))?;
                    sponsor.increment_direct_count();
                    tx_store(users, &id_key(sponsor_id), &sponsor)?;
                    tx_mark(directs, &pair_key(sponsor_id, user.id))?;
                }

                tx_store(users, &key, &user)
            })
            .map_err(map_tx)
    }

    async fn bind_sponsor(&self, user_id: UserId, sponsor_id: UserId) -> Result<User, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("bind sponsor {} to user {}", sponsor_id, user_id);
        }

        let user = (&self.users, &self.direct_referrals)
            .transaction(|(users, directs)| -> TxResult<User> {
                let mut user = tx_load_user(users, user_id)?;
                if user.has_sponsor() {
                    return Err(abort(ReferralError::AlreadyBound));
                }
                if user.has_purchased() {
                    return Err(abort(ReferralError::AlreadyPurchased));
                }
                if sponsor_id == user_id {
                    return Err(abort(ReferralError::SelfReferral));
                }

                let mut sponsor: User = tx_load(users, &id_key(sponsor_id))?
                    .ok_or_else(|| abort(ReferralError::SponsorNotFound))?;

                // The new edge must not close a loop anywhere up the sponsor's chain.
                // The walk ends at the root or at the first repeated ancestor.
                let mut visited = HashSet::new();
                let mut current = sponsor.clone();
                while let Some(ancestor_id) = current.sponsor {
                    if ancestor_id == user_id || !visited.insert(ancestor_id) {
                        return Err(abort(ReferralError::CircularReference { user: ancestor_id }));
                    }
                    let child = current.id;
                    current = tx_load(users, &id_key(ancestor_id))?.ok_or_else(|| {
                        abort(ReferralError::MissingAncestor {
                            user: child,
                            sponsor: ancestor_id,
                        })
                    })?;
                }

                user.sponsor = Some(sponsor_id);
                sponsor.increment_direct_count();
                tx_store(users, &id_key(user_id), &user)?;
                tx_store(users, &id_key(sponsor_id), &sponsor)?;
                tx_mark(directs, &pair_key(sponsor_id, user_id))?;

                Ok(user)
            })
            .map_err(map_tx)?;

        if log::log_enabled!(log::Level::Debug) {
            debug!("User {} bound to sponsor {}", user_id, sponsor_id);
        }
        Ok(user)
    }

    async fn resolve_referral_code(&self, code: &str) -> Result<Option<UserId>, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("resolve referral code {}", code);
        }
        self.load_optional_from_disk(&self.referral_codes, code.as_bytes())
    }

    async fn set_kyc_status(&self, id: UserId, status: KycStatus) -> Result<User, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("set kyc status of {} to {}", id, status);
        }
        self.update_user(id, |user| user.kyc_status = status.clone())
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<User, EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("set user {} active: {}", id, active);
        }
        self.update_user(id, |user| user.is_active = active)
    }

    async fn get_active_users_by_level(
        &self,
    ) -> Result<BTreeMap<Level, Vec<UserId>>, EngineError> {
        trace!("get active users by level");
        let mut by_level: BTreeMap<Level, Vec<UserId>> = BTreeMap::new();
        for user in self.iter_values::<User>(&self.users)? {
            if user.is_active && user.level != Level::L0 {
                by_level.entry(user.level).or_default().push(user.id);
            }
        }
        Ok(by_level)
    }
}
