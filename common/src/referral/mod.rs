// Sponsor relationships and team formation
//
// Key Features:
// - One-time sponsor binding, checked against cycles
// - Upline queries (up to 100 levels)
// - Direct referral list with pagination
// - Downline completion counters and cascading team formation

mod cascade;
mod error;
mod record;

pub use cascade::*;
pub use error::*;
pub use record::*;

use crate::config::{MAX_DIRECT_REFERRALS_PER_PAGE, MAX_UPLINE_LEVELS};

/// Validate an upline query depth
pub fn check_upline_levels(levels: u8) -> ReferralResult<()> {
    if levels > MAX_UPLINE_LEVELS {
        return Err(ReferralError::LevelsTooDeep {
            max: MAX_UPLINE_LEVELS,
            requested: levels,
        });
    }
    Ok(())
}

/// Validate a direct referrals page request against the total count
pub fn check_page(offset: u32, limit: u32, total: u32) -> ReferralResult<()> {
    if limit > MAX_DIRECT_REFERRALS_PER_PAGE {
        return Err(ReferralError::PageSizeTooLarge {
            max: MAX_DIRECT_REFERRALS_PER_PAGE,
            requested: limit,
        });
    }
    if offset > 0 && offset >= total {
        return Err(ReferralError::InvalidOffset { offset, total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_upline_levels() {
        assert!(check_upline_levels(100).is_ok());
        assert_eq!(
            check_upline_levels(101),
            Err(ReferralError::LevelsTooDeep {
                max: 100,
                requested: 101
            })
        );
    }

    #[test]
    fn test_check_page() {
        assert!(check_page(0, 10, 0).is_ok());
        assert!(check_page(5, 10, 6).is_ok());
        assert_eq!(
            check_page(6, 10, 6),
            Err(ReferralError::InvalidOffset { offset: 6, total: 6 })
        );
        assert!(matches!(
            check_page(0, 1001, 5),
            Err(ReferralError::PageSizeTooLarge { .. })
        ));
    }
}
