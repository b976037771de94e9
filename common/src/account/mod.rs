mod kyc;

pub use kyc::KycStatus;

use crate::{
    config::REFERRAL_CODE_PREFIX,
    error::BalanceError,
    level::{promote, Level, Promotion},
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};

pub type UserId = u64;

/// A platform user as tracked by the commission engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,

    /// Weak back-reference to the referrer (None = top-level user)
    pub sponsor: Option<UserId>,

    /// Issued on first purchase only
    pub referral_code: Option<String>,

    /// Monotonic, only ever raised by the level promoter
    pub level: Level,

    /// Number of teams this user leads, monotonic
    pub team_count: u64,

    /// Cached sum of the user's ledger entries
    pub wallet_balance: u64,

    pub is_active: bool,

    pub kyc_status: KycStatus,

    pub registered_at: TimestampSeconds,

    pub first_purchase_at: Option<TimestampSeconds>,

    /// Cached count of users having this user as sponsor
    pub direct_referrals_count: u32,

    /// Number of ledger entries written, also the sequence of the next one
    pub ledger_sequence: u64,
}

impl User {
    pub fn new(
        id: UserId,
        sponsor: Option<UserId>,
        kyc_status: KycStatus,
        registered_at: TimestampSeconds,
    ) -> Self {
        Self {
            id,
            sponsor,
            referral_code: None,
            level: Level::L0,
            team_count: 0,
            wallet_balance: 0,
            is_active: true,
            kyc_status,
            registered_at,
            first_purchase_at: None,
            direct_referrals_count: 0,
            ledger_sequence: 0,
        }
    }

    pub fn has_sponsor(&self) -> bool {
        self.sponsor.is_some()
    }

    pub fn has_purchased(&self) -> bool {
        self.first_purchase_at.is_some()
    }

    /// Mark the first purchase and issue the referral code
    pub fn record_first_purchase(&mut self, at: TimestampSeconds) {
        if self.first_purchase_at.is_none() {
            self.first_purchase_at = Some(at);
        }
        if self.referral_code.is_none() {
            self.referral_code = Some(referral_code_for(self.id));
        }
    }

    pub fn increment_direct_count(&mut self) {
        self.direct_referrals_count = self.direct_referrals_count.saturating_add(1);
    }

    pub fn credit(&mut self, amount: u64) -> Result<u64, BalanceError> {
        self.wallet_balance = self
            .wallet_balance
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        Ok(self.wallet_balance)
    }

    pub fn debit(&mut self, amount: u64) -> Result<u64, BalanceError> {
        self.wallet_balance =
            self.wallet_balance
                .checked_sub(amount)
                .ok_or(BalanceError::Insufficient {
                    need: amount,
                    have: self.wallet_balance,
                })?;
        Ok(self.wallet_balance)
    }

    /// Reserve the sequence of the next ledger entry
    pub fn next_ledger_sequence(&mut self) -> u64 {
        let sequence = self.ledger_sequence;
        self.ledger_sequence += 1;
        sequence
    }

    /// Count a newly formed team and run the level check.
    /// Returns the promotion if the level changed.
    pub fn record_team_formed(&mut self) -> Option<Promotion> {
        self.team_count = self.team_count.saturating_add(1);
        let from = self.level;
        self.level = promote(self.level, self.team_count);
        (self.level != from).then_some(Promotion {
            user: self.id,
            from,
            to: self.level,
        })
    }
}

const CODE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Deterministic referral code of a user: prefix + base-36 id, padded to 6 chars
pub fn referral_code_for(user: UserId) -> String {
    let mut digits = Vec::new();
    let mut value = user;
    loop {
        digits.push(CODE_ALPHABET[(value % 36) as usize] as char);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    while digits.len() < 6 {
        digits.push('0');
    }
    let encoded: String = digits.into_iter().rev().collect();
    format!("{}{}", REFERRAL_CODE_PREFIX, encoded)
}
