// User registry storage provider trait

use crate::core::error::EngineError;
use async_trait::async_trait;
use commission_common::{
    account::{KycStatus, User, UserId},
    level::Level,
};
use std::collections::BTreeMap;

#[async_trait]
pub trait UserProvider {
    /// Get a user, None if not registered
    async fn get_user(&self, id: UserId) -> Result<Option<User>, EngineError>;

    /// Get a user, failing with `UserNotFound` if not registered
    async fn get_user_or_err(&self, id: UserId) -> Result<User, EngineError> {
        self.get_user(id)
            .await?
            .ok_or(EngineError::UserNotFound(id))
    }

    /// Register a new user.
    /// When a sponsor is set, the sponsor's direct referral count and the
    /// adjacency index are updated in the same transaction.
    ///
    /// # Errors
    /// * `AlreadyRegistered` - A user with this id exists
    /// * `SelfReferral` - The user names itself as sponsor
    /// * `SponsorNotFound` - The sponsor is not registered
    async fn register_user(&self, user: User) -> Result<(), EngineError>;

    /// Bind a sponsor to a user registered without one.
    /// This operation is one-time only and only allowed before the first purchase.
    ///
    /// # Errors
    /// * `AlreadyBound` - User already has a sponsor
    /// * `AlreadyPurchased` - User already made a first purchase
    /// * `SelfReferral` - Cannot set self as sponsor
    /// * `CircularReference` - The user is an ancestor of the sponsor, at any depth
    async fn bind_sponsor(&self, user: UserId, sponsor: UserId) -> Result<User, EngineError>;

    /// Resolve an issued referral code to its owner
    async fn resolve_referral_code(&self, code: &str) -> Result<Option<UserId>, EngineError>;

    /// Store the status reported by the KYC subsystem
    async fn set_kyc_status(&self, id: UserId, status: KycStatus) -> Result<User, EngineError>;

    /// Activate or deactivate a user
    async fn set_active(&self, id: UserId, active: bool) -> Result<User, EngineError>;

    /// Active users grouped by level, L0 excluded
    async fn get_active_users_by_level(&self) -> Result<BTreeMap<Level, Vec<UserId>>, EngineError>;
}
