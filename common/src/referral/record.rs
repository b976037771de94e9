// Referral record data structures

use crate::{
    account::UserId, config::TEAM_SIZE, level::Level, time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A team is identified by its leader and the leader's team sequence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamId {
    pub leader: UserId,
    pub sequence: u64,
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.leader, self.sequence)
    }
}

/// A group of 3 downline completions credited to a leader. Immutable once formed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,

    pub leader: UserId,

    /// The completions that formed the team, oldest first
    pub members: [UserId; TEAM_SIZE],

    /// Leader level when the team was formed, before any promotion it triggers
    pub level_at_formation: Level,

    pub formed_at: TimestampSeconds,
}

impl Team {
    pub fn new(
        leader: UserId,
        sequence: u64,
        members: [UserId; TEAM_SIZE],
        level_at_formation: Level,
        formed_at: TimestampSeconds,
    ) -> Self {
        Self {
            id: TeamId { leader, sequence },
            leader,
            members,
            level_at_formation,
            formed_at,
        }
    }
}

/// Downline completion counter of a user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownlineProgress {
    /// Total completions ever received, monotonic
    pub completions: u64,

    /// Completions not yet grouped into a team (always fewer than 3)
    pub pending: Vec<UserId>,
}

impl DownlineProgress {
    /// Record a completion coming from `member`.
    /// Returns the team members when the counter reaches a multiple of 3.
    pub fn record_completion(&mut self, member: UserId) -> Option<[UserId; TEAM_SIZE]> {
        self.completions = self.completions.saturating_add(1);
        self.pending.push(member);

        if self.completions % TEAM_SIZE as u64 != 0 {
            return None;
        }

        let start = self.pending.len().saturating_sub(TEAM_SIZE);
        let members: Vec<UserId> = self.pending.drain(start..).collect();
        self.pending.clear();
        members.try_into().ok()
    }
}

/// Result of upline query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UplineResult {
    /// List of uplines, ordered from immediate sponsor to higher levels
    pub uplines: Vec<UserId>,

    /// Number of levels actually returned (may be less than requested if chain is shorter)
    pub levels_returned: u8,
}

impl UplineResult {
    pub fn new(uplines: Vec<UserId>) -> Self {
        let levels_returned = uplines.len() as u8;
        Self {
            uplines,
            levels_returned,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.uplines.is_empty()
    }
}

/// Result of direct referrals query with pagination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectReferralsResult {
    pub referrals: Vec<UserId>,

    /// Total count of direct referrals
    pub total_count: u32,

    /// Current offset
    pub offset: u32,

    /// Whether there are more results
    pub has_more: bool,
}

impl DirectReferralsResult {
    pub fn new(referrals: Vec<UserId>, total_count: u32, offset: u32) -> Self {
        let referrals_len = referrals.len() as u32;
        let has_more = offset.saturating_add(referrals_len) < total_count;
        Self {
            referrals,
            total_count,
            offset,
            has_more,
        }
    }
}
