// Withdrawal requests and their validation rules

use crate::{
    account::{KycStatus, UserId},
    config::DEFAULT_MIN_WITHDRAWAL,
    error::TransitionError,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

pub type WithdrawalId = u64;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WithdrawalStatus {
    Requested,
    Approved,
    Rejected,
    Completed,
}

impl WithdrawalStatus {
    /// requested -> approved | rejected, approved -> completed
    pub fn can_transition_to(self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Requested, Approved) | (Requested, Rejected) | (Approved, Completed)
        )
    }

    pub fn is_open(self) -> bool {
        self == WithdrawalStatus::Requested
    }
}

/// Destination account, opaque to the engine
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct BankDetails {
    pub account_holder: String,
    pub account_number: String,
    pub bank_code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub user: UserId,
    pub amount: u64,
    pub bank_details: BankDetails,
    pub status: WithdrawalStatus,
    pub requested_at: TimestampSeconds,
    pub resolved_at: Option<TimestampSeconds>,
    pub admin_notes: Option<String>,
}

impl WithdrawalRequest {
    pub fn new(
        id: WithdrawalId,
        user: UserId,
        amount: u64,
        bank_details: BankDetails,
        requested_at: TimestampSeconds,
    ) -> Self {
        Self {
            id,
            user,
            amount,
            bank_details,
            status: WithdrawalStatus::Requested,
            requested_at,
            resolved_at: None,
            admin_notes: None,
        }
    }

    pub fn transition(
        &mut self,
        next: WithdrawalStatus,
        at: TimestampSeconds,
        notes: Option<String>,
    ) -> Result<(), WithdrawalError> {
        if !self.status.can_transition_to(next) {
            // Approve/reject on a request that was already acted on
            if !self.status.is_open() && next != WithdrawalStatus::Completed {
                return Err(WithdrawalError::AlreadyResolved(self.status));
            }
            return Err(TransitionError::new("withdrawal", self.status, next).into());
        }
        self.status = next;
        self.resolved_at = Some(at);
        if notes.is_some() {
            self.admin_notes = notes;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithdrawalRules {
    pub min_amount: u64,
}

impl Default for WithdrawalRules {
    fn default() -> Self {
        Self {
            min_amount: DEFAULT_MIN_WITHDRAWAL,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WithdrawalError {
    #[error("Withdrawal amount must be positive")]
    ZeroAmount,

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("Amount {amount} is below the minimum withdrawal of {min}")]
    BelowMinimum { amount: u64, min: u64 },

    #[error("KYC must be approved before withdrawing, current status: {0}")]
    KycRequired(String),

    #[error("Withdrawal request was already resolved as {0}")]
    AlreadyResolved(WithdrawalStatus),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

/// Check a withdrawal against the user's wallet and KYC state.
/// Checks run in a fixed order and the first failure is reported.
pub fn validate_withdrawal(
    amount: u64,
    wallet_balance: u64,
    kyc_status: &KycStatus,
    rules: &WithdrawalRules,
) -> Result<(), WithdrawalError> {
    if amount == 0 {
        return Err(WithdrawalError::ZeroAmount);
    }

    if amount > wallet_balance {
        return Err(WithdrawalError::InsufficientBalance {
            requested: amount,
            available: wallet_balance,
        });
    }

    if amount < rules.min_amount {
        return Err(WithdrawalError::BelowMinimum {
            amount,
            min: rules.min_amount,
        });
    }

    if !kyc_status.is_approved() {
        return Err(WithdrawalError::KycRequired(kyc_status.to_string()));
    }

    Ok(())
}
