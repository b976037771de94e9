// KYC status as reported by the external KYC subsystem
// The engine only reads it (eligibility and withdrawals).

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    /// No documents submitted yet
    #[default]
    NotSubmitted,

    /// Documents submitted, waiting for review
    Pending,

    /// Verified, unlocks commissions and withdrawals
    Approved,

    /// Review failed, the reason is shown to the user
    Rejected(String),
}

impl KycStatus {
    #[inline]
    pub fn is_approved(&self) -> bool {
        matches!(self, KycStatus::Approved)
    }

    /// Get human-readable status name
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::NotSubmitted => "not_submitted",
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected(_) => "rejected",
        }
    }

    /// Persisted reason of a rejection, if any
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            KycStatus::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for KycStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KycStatus::Rejected(reason) => write!(f, "rejected ({})", reason),
            status => write!(f, "{}", status.as_str()),
        }
    }
}
