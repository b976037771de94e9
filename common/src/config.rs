use crate::level::Level;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// All monetary values are integer minor currency units (1.00 = 100)
pub const MINOR_UNITS_PER_MAJOR: u64 = 100;

// Basis points, 10_000 = 100%
pub const BASIS_POINTS: u64 = 10_000;

// Price split rules
// Company keeps 30% of every price, the rest goes to the incentive pool share
pub const COMPANY_SHARE_PERCENT: u64 = 30;
// On a first purchase 20% of the pool share is paid back to the buyer as self income
pub const SELF_INCOME_PERCENT: u64 = 20;

// Self income is paid in weekly installments
pub const SECONDS_PER_DAY: u64 = 86_400;
pub const PAYOUT_INTERVAL_DAYS: u64 = 7;
pub const PAYOUT_INTERVAL_SECS: u64 = PAYOUT_INTERVAL_DAYS * SECONDS_PER_DAY;
pub const INSTALLMENT_COUNT: usize = 4;

// Read path for payouts reports what falls due in the next 7 days
pub const UPCOMING_PAYOUT_WINDOW_SECS: u64 = 7 * SECONDS_PER_DAY;

// A team is formed every time a downline counter reaches a multiple of this
pub const TEAM_SIZE: usize = 3;

// Team count required to reach each level, each threshold is 3x the previous one
pub const LEVEL_THRESHOLDS: [(Level, u64); 5] = [
    (Level::L1, 1),
    (Level::L2, 9),
    (Level::L3, 27),
    (Level::L4, 81),
    (Level::L5, 243),
];

// Turnover pool weights per level (basis points)
pub const LEVEL_WEIGHTS_BPS: [(Level, u64); 5] = [
    (Level::L1, 3_000),
    (Level::L2, 2_000),
    (Level::L3, 2_000),
    (Level::L4, 1_500),
    (Level::L5, 1_500),
];

const _: () = {
    let mut total = 0;
    let mut i = 0;
    while i < LEVEL_WEIGHTS_BPS.len() {
        total += LEVEL_WEIGHTS_BPS[i].1;
        i += 1;
    }
    assert!(total == BASIS_POINTS, "level weights must sum to 100%");
};

// Withdrawal and eligibility defaults
// 300.00
pub const DEFAULT_MIN_WITHDRAWAL: u64 = 300 * MINOR_UNITS_PER_MAJOR;
// 500.00 of purchases in the current calendar month
pub const DEFAULT_MONTHLY_PURCHASE_THRESHOLD: u64 = 500 * MINOR_UNITS_PER_MAJOR;
pub const DEFAULT_REQUIRED_DIRECT_REFERRALS: u32 = 3;
pub const DEFAULT_REQUIRED_REFERRALS_PER_DIRECT: u32 = 3;

// Sponsor chain walks stop after this many hops
pub const DEFAULT_MAX_SPONSOR_DEPTH: u32 = 100;

// Maximum number of uplines returned by a single query
pub const MAX_UPLINE_LEVELS: u8 = 100;

// Maximum number of direct referrals returned per page
pub const MAX_DIRECT_REFERRALS_PER_PAGE: u32 = 1000;

// Prefix of issued referral codes
pub const REFERRAL_CODE_PREFIX: &str = "REF";
