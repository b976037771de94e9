// Permanent level ladder unlocked by cumulative team count

use crate::{account::UserId, config::LEVEL_THRESHOLDS};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// Level of a user, L0 is the entry level and L5 the highest.
/// Ordering follows the ladder so `max` keeps the highest reached level.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
)]
pub enum Level {
    #[default]
    L0,
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl Level {
    /// Team count needed to hold this level
    pub fn threshold(self) -> u64 {
        LEVEL_THRESHOLDS
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, threshold)| *threshold)
            .unwrap_or(0)
    }

    /// Highest level whose threshold is reached by `team_count`
    pub fn for_team_count(team_count: u64) -> Self {
        LEVEL_THRESHOLDS
            .iter()
            .rev()
            .find(|(_, threshold)| team_count >= *threshold)
            .map(|(level, _)| *level)
            .unwrap_or(Level::L0)
    }

    pub fn next(self) -> Option<Self> {
        Level::iter().find(|level| *level > self)
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Levels that take part in turnover pool distribution
    pub fn rewarded() -> impl Iterator<Item = Level> {
        Level::iter().filter(|level| *level != Level::L0)
    }
}

/// Resulting level after a team count change. Never lower than `current`.
#[inline]
pub fn promote(current: Level, team_count: u64) -> Level {
    current.max(Level::for_team_count(team_count))
}

/// A level change applied to a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Promotion {
    pub user: UserId,
    pub from: Level,
    pub to: Level,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(Level::L0.threshold(), 0);
        assert_eq!(Level::L1.threshold(), 1);
        assert_eq!(Level::L2.threshold(), 9);
        assert_eq!(Level::L3.threshold(), 27);
        assert_eq!(Level::L4.threshold(), 81);
        assert_eq!(Level::L5.threshold(), 243);
    }

    #[test]
    fn test_for_team_count() {
        assert_eq!(Level::for_team_count(0), Level::L0);
        assert_eq!(Level::for_team_count(1), Level::L1);
        assert_eq!(Level::for_team_count(8), Level::L1);
        assert_eq!(Level::for_team_count(9), Level::L2);
        assert_eq!(Level::for_team_count(26), Level::L2);
        assert_eq!(Level::for_team_count(27), Level::L3);
        assert_eq!(Level::for_team_count(81), Level::L4);
        assert_eq!(Level::for_team_count(242), Level::L4);
        assert_eq!(Level::for_team_count(243), Level::L5);
        assert_eq!(Level::for_team_count(u64::MAX), Level::L5);
    }

    #[test]
    fn test_promote_never_demotes() {
        assert_eq!(promote(Level::L0, 1), Level::L1);
        assert_eq!(promote(Level::L3, 1), Level::L3);
        assert_eq!(promote(Level::L2, 0), Level::L2);
        assert_eq!(promote(Level::L2, 27), Level::L3);
    }

    #[test]
    fn test_next_and_rewarded() {
        assert_eq!(Level::L0.next(), Some(Level::L1));
        assert_eq!(Level::L4.next(), Some(Level::L5));
        assert_eq!(Level::L5.next(), None);
        assert_eq!(Level::rewarded().count(), 5);
        assert!(Level::rewarded().all(|level| level != Level::L0));
    }
}
