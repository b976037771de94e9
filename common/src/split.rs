//! Price splitting
//!
//! Pure mapping from (price, purchase kind) to the four shares booked for an
//! order. All arithmetic is integer math on minor currency units.
//!
//! # Rounding
//!
//! Percentages are always rounded down (floor). The rounded-down value is the
//! one that is *computed*; its counterpart is derived by subtraction, so no
//! unit is ever created or lost:
//!
//! - `company_share = floor(price * 30 / 100)`, `pool_share = price - company_share`
//! - `self_income = floor(pool_share * 20 / 100)`, `pool_topup = pool_share - self_income`
//!
//! Any rounding residue therefore ends up in the pool.

use crate::{
    config::{BASIS_POINTS, COMPANY_SHARE_PERCENT, SELF_INCOME_PERCENT},
    order::PurchaseKind,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceSplit {
    pub price: u64,
    pub company_share: u64,
    pub pool_share: u64,
    pub self_income: u64,
    pub pool_topup: u64,
}

/// floor(amount * percent / 100), computed without overflow
#[inline]
pub fn percent_of(amount: u64, percent: u64) -> u64 {
    ((amount as u128 * percent as u128) / 100) as u64
}

/// floor(amount * bps / 10_000), computed without overflow
#[inline]
pub fn basis_points_of(amount: u64, bps: u64) -> u64 {
    ((amount as u128 * bps as u128) / BASIS_POINTS as u128) as u64
}

pub fn split_price(price: u64, kind: PurchaseKind) -> PriceSplit {
    let company_share = percent_of(price, COMPANY_SHARE_PERCENT);
    let pool_share = price - company_share;

    let self_income = match kind {
        PurchaseKind::First => percent_of(pool_share, SELF_INCOME_PERCENT),
        PurchaseKind::Repurchase => 0,
    };

    PriceSplit {
        price,
        company_share,
        pool_share,
        self_income,
        pool_topup: pool_share - self_income,
    }
}
