use commission_common::{
    account::UserId,
    error::{BalanceError, TransitionError},
    order::OrderId,
    payout::PayoutId,
    referral::ReferralError,
    withdrawal::{WithdrawalError, WithdrawalId},
};
use serde::Serialize;
use strum::Display;
use thiserror::Error;

/// How an error must be handled by callers and batch jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input, surfaced immediately and never retried
    Validation,
    /// Unknown entity
    NotFound,
    /// Row already transitioned by someone else, benign
    Conflict,
    /// Broken stored data (sponsor cycle, missing ancestor), fatal for one event only
    DataIntegrity,
    /// Storage unavailable, the whole operation is safe to retry
    ExternalDependency,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error(transparent)]
    Withdrawal(#[from] WithdrawalError),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Payout {0} not found")]
    PayoutNotFound(PayoutId),

    #[error("Withdrawal {0} not found")]
    WithdrawalNotFound(WithdrawalId),

    #[error("Distribution run {0} not found")]
    DistributionRunNotFound(String),

    #[error("No credit for user {user} in distribution run {run}")]
    DistributionCreditNotFound { run: String, user: UserId },

    #[error("Order {order} belongs to user {owner}, payment event names user {user}")]
    OrderOwnerMismatch {
        order: OrderId,
        owner: UserId,
        user: UserId,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Storage(_) => ErrorKind::ExternalDependency,
            // Undecodable rows are corrupted data
            EngineError::Serialization(_) => ErrorKind::DataIntegrity,
            EngineError::Referral(e) => match e {
                ReferralError::CircularReference { .. } | ReferralError::MissingAncestor { .. } => {
                    ErrorKind::DataIntegrity
                }
                ReferralError::UserNotFound(_) | ReferralError::SponsorNotFound => {
                    ErrorKind::NotFound
                }
                ReferralError::AlreadyRegistered(_) => ErrorKind::Conflict,
                _ => ErrorKind::Validation,
            },
            EngineError::Withdrawal(e) => match e {
                WithdrawalError::AlreadyResolved(_) | WithdrawalError::InvalidTransition(_) => {
                    ErrorKind::Conflict
                }
                _ => ErrorKind::Validation,
            },
            EngineError::Balance(BalanceError::Overflow) => ErrorKind::DataIntegrity,
            EngineError::Balance(BalanceError::Insufficient { .. }) => ErrorKind::Validation,
            EngineError::Transition(_) => ErrorKind::Conflict,
            EngineError::UserNotFound(_)
            | EngineError::OrderNotFound(_)
            | EngineError::PayoutNotFound(_)
            | EngineError::WithdrawalNotFound(_)
            | EngineError::DistributionRunNotFound(_)
            | EngineError::DistributionCreditNotFound { .. } => ErrorKind::NotFound,
            EngineError::OrderOwnerMismatch { .. } | EngineError::InvalidInput(_) => {
                ErrorKind::Validation
            }
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Storage errors abort a whole batch, anything else only fails its unit of work
    pub fn aborts_batch(&self) -> bool {
        self.kind() == ErrorKind::ExternalDependency
    }
}
