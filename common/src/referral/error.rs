// Referral system error types

use crate::account::UserId;
use thiserror::Error;

/// Errors that can occur in the referral system
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferralError {
    /// User has already bound a sponsor
    #[error("User has already bound a sponsor")]
    AlreadyBound,

    /// Sponsor id or referral code does not resolve to a user
    #[error("Sponsor not found")]
    SponsorNotFound,

    /// Attempted to set self as sponsor
    #[error("Cannot set self as sponsor")]
    SelfReferral,

    /// Detected circular reference in sponsor chain
    #[error("Circular reference detected in sponsor chain at user {user}")]
    CircularReference { user: UserId },

    /// A sponsor id points to a user that does not exist
    #[error("User {user} references missing sponsor {sponsor}")]
    MissingAncestor { user: UserId, sponsor: UserId },

    /// Binding is only allowed before the first purchase
    #[error("Sponsor cannot be changed after the first purchase")]
    AlreadyPurchased,

    /// Requested level exceeds maximum allowed
    #[error("Requested {requested} levels exceeds maximum {max}")]
    LevelsTooDeep { max: u8, requested: u8 },

    /// User not found in referral system
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// User id already registered
    #[error("User {0} is already registered")]
    AlreadyRegistered(UserId),

    /// Pagination offset exceeds total count
    #[error("Offset {offset} exceeds total count {total}")]
    InvalidOffset { offset: u32, total: u32 },

    /// Page size exceeds maximum allowed
    #[error("Page size {requested} exceeds maximum {max}")]
    PageSizeTooLarge { max: u32, requested: u32 },
}

impl ReferralError {
    /// Broken sponsor data, as opposed to a rejected request
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            ReferralError::CircularReference { .. } | ReferralError::MissingAncestor { .. }
        )
    }
}

/// Result type for referral operations
pub type ReferralResult<T> = Result<T, ReferralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReferralError::AlreadyBound;
        assert_eq!(err.to_string(), "User has already bound a sponsor");

        let err = ReferralError::LevelsTooDeep {
            max: 100,
            requested: 150,
        };
        assert_eq!(err.to_string(), "Requested 150 levels exceeds maximum 100");

        let err = ReferralError::MissingAncestor { user: 4, sponsor: 9 };
        assert_eq!(err.to_string(), "User 4 references missing sponsor 9");
        assert!(err.is_data_integrity());
        assert!(!ReferralError::SelfReferral.is_data_integrity());
    }
}
