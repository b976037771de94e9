//! Sponsor-chain team formation
//!
//! A qualifying first purchase is a completion credited to the buyer's
//! sponsor. Every third completion received by a user forms a team led by
//! that user, raises their team count (running the level promoter) and is in
//! turn credited as a completion to the leader's own sponsor. The walk stops
//! when a counter is not on a multiple of 3, at a user without sponsor, or
//! after `max_depth` hops.
//!
//! The walk only goes from leaf to root, so concurrent cascades converging on
//! a shared ancestor always touch rows in the same order.

use super::{DownlineProgress, ReferralError, Team};
use crate::{
    account::{User, UserId},
    level::Promotion,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::Display;
use thiserror::Error;

/// Rows read and written by a cascade.
/// Implementations are expected to run inside a single transaction.
pub trait SponsorChainState {
    type Error;

    fn load_user(&self, id: UserId) -> Result<Option<User>, Self::Error>;

    fn store_user(&self, user: &User) -> Result<(), Self::Error>;

    /// Missing progress rows read as empty
    fn load_progress(&self, id: UserId) -> Result<DownlineProgress, Self::Error>;

    fn store_progress(&self, id: UserId, progress: &DownlineProgress) -> Result<(), Self::Error>;

    fn store_team(&self, team: &Team) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum CascadeError<E> {
    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error("{0}")]
    State(E),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CascadeStop {
    /// Reached a user without sponsor
    RootReached,
    /// A counter did not reach a multiple of 3
    CounterPending,
    /// Depth limit reached before the chain ended
    MaxDepth,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CascadeReport {
    pub teams: Vec<Team>,
    pub promotions: Vec<Promotion>,
    /// Number of ancestors whose counter was incremented
    pub hops: u32,
    pub stop: CascadeStop,
}

/// Credit a completion from `buyer` to its sponsor chain
pub fn propagate_completion<S: SponsorChainState>(
    state: &S,
    buyer: UserId,
    max_depth: u32,
    now: TimestampSeconds,
) -> Result<CascadeReport, CascadeError<S::Error>> {
    let mut visited = HashSet::new();
    visited.insert(buyer);

    let mut teams = Vec::new();
    let mut promotions = Vec::new();
    let mut hops = 0;
    let mut member = state
        .load_user(buyer)
        .map_err(CascadeError::State)?
        .ok_or(ReferralError::UserNotFound(buyer))?;

    let stop = loop {
        let Some(sponsor_id) = member.sponsor else {
            break CascadeStop::RootReached;
        };

        if hops >= max_depth {
            break CascadeStop::MaxDepth;
        }

        if !visited.insert(sponsor_id) {
            return Err(ReferralError::CircularReference { user: sponsor_id }.into());
        }

        let mut sponsor = state
            .load_user(sponsor_id)
            .map_err(CascadeError::State)?
            .ok_or(ReferralError::MissingAncestor {
                user: member.id,
                sponsor: sponsor_id,
            })?;
        hops += 1;

        let mut progress = state
            .load_progress(sponsor_id)
            .map_err(CascadeError::State)?;
        let formed = progress.record_completion(member.id);
        state
            .store_progress(sponsor_id, &progress)
            .map_err(CascadeError::State)?;

        let Some(members) = formed else {
            break CascadeStop::CounterPending;
        };

        let team = Team::new(sponsor_id, sponsor.team_count, members, sponsor.level, now);
        if let Some(promotion) = sponsor.record_team_formed() {
            if log::log_enabled!(log::Level::Debug) {
                log::debug!(
                    "User {} promoted from {} to {} at team count {}",
                    promotion.user,
                    promotion.from,
                    promotion.to,
                    sponsor.team_count
                );
            }
            promotions.push(promotion);
        }
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Team {} formed with members {:?}", team.id, team.members);
        }
        state.store_team(&team).map_err(CascadeError::State)?;
        state.store_user(&sponsor).map_err(CascadeError::State)?;
        teams.push(team);

        member = sponsor;
    };

    Ok(CascadeReport {
        teams,
        promotions,
        hops,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::KycStatus, level::Level};
    use std::{cell::RefCell, collections::HashMap, convert::Infallible};

    #[derive(Default)]
    struct MemoryChain {
        users: RefCell<HashMap<UserId, User>>,
        progress: RefCell<HashMap<UserId, DownlineProgress>>,
        teams: RefCell<Vec<Team>>,
    }

    impl MemoryChain {
        fn add(&self, id: UserId, sponsor: Option<UserId>) {
            self.users
                .borrow_mut()
                .insert(id, User::new(id, sponsor, KycStatus::Approved, 0));
        }

        fn user(&self, id: UserId) -> User {
            self.users.borrow()[&id].clone()
        }

        fn completions(&self, id: UserId) -> u64 {
            self.progress
                .borrow()
                .get(&id)
                .map(|p| p.completions)
                .unwrap_or(0)
        }
    }

    impl SponsorChainState for MemoryChain {
        type Error = Infallible;

        fn load_user(&self, id: UserId) -> Result<Option<User>, Infallible> {
            Ok(self.users.borrow().get(&id).cloned())
        }

        fn store_user(&self, user: &User) -> Result<(), Infallible> {
            self.users.borrow_mut().insert(user.id, user.clone());
            Ok(())
        }

        fn load_progress(&self, id: UserId) -> Result<DownlineProgress, Infallible> {
            Ok(self.progress.borrow().get(&id).cloned().unwrap_or_default())
        }

        fn store_progress(&self, id: UserId, progress: &DownlineProgress) -> Result<(), Infallible> {
            self.progress.borrow_mut().insert(id, progress.clone());
            Ok(())
        }

        fn store_team(&self, team: &Team) -> Result<(), Infallible> {
            self.teams.borrow_mut().push(team.clone());
            Ok(())
        }
    }

    #[test]
    fn test_three_purchases_form_one_team() {
        let chain = MemoryChain::default();
        // 1 <- 2 (leader) <- 10, 11, 12
        chain.add(1, None);
        chain.add(2, Some(1));
        for buyer in 10..13 {
            chain.add(buyer, Some(2));
        }

        let first = propagate_completion(&chain, 10, 100, 5).unwrap();
        assert_eq!(first.stop, CascadeStop::CounterPending);
        assert!(first.teams.is_empty());
        propagate_completion(&chain, 11, 100, 6).unwrap();
        let report = propagate_completion(&chain, 12, 100, 7).unwrap();

        assert_eq!(report.teams.len(), 1);
        let team = &report.teams[0];
        assert_eq!(team.leader, 2);
        assert_eq!(team.members, [10, 11, 12]);
        assert_eq!(team.level_at_formation, Level::L0);
        assert_eq!(team.formed_at, 7);

        let leader = chain.user(2);
        assert_eq!(leader.team_count, 1);
        assert_eq!(leader.level, Level::L1);
        assert_eq!(
            report.promotions,
            vec![Promotion {
                user: 2,
                from: Level::L0,
                to: Level::L1
            }]
        );

        // the formation is credited one hop further up
        assert_eq!(chain.completions(1), 1);
        assert_eq!(chain.user(1).team_count, 0);
        assert_eq!(report.hops, 2);
        assert_eq!(report.stop, CascadeStop::CounterPending);
    }

    #[test]
    fn test_cascade_reaches_grandparent_team() {
        let chain = MemoryChain::default();
        // root 1 has three leaders 2, 3, 4, each with three buyers
        chain.add(1, None);
        let mut next_id = 100;
        for leader in 2..5 {
            chain.add(leader, Some(1));
            for _ in 0..3 {
                chain.add(next_id, Some(leader));
                propagate_completion(&chain, next_id, 100, 0).unwrap();
                next_id += 1;
            }
        }

        let root = chain.user(1);
        assert_eq!(root.team_count, 1);
        assert_eq!(root.level, Level::L1);
        assert_eq!(chain.teams.borrow().len(), 4);
        let root_team = chain.teams.borrow().iter().find(|t| t.leader == 1).cloned();
        assert_eq!(root_team.map(|t| t.members), Some([2, 3, 4]));
    }

    #[test]
    fn test_buyer_without_sponsor() {
        let chain = MemoryChain::default();
        chain.add(1, None);
        let report = propagate_completion(&chain, 1, 100, 0).unwrap();
        assert_eq!(report.stop, CascadeStop::RootReached);
        assert_eq!(report.hops, 0);
    }

    #[test]
    fn test_cycle_is_an_error() {
        let chain = MemoryChain::default();
        chain.add(1, Some(3));
        chain.add(2, Some(1));
        chain.add(3, Some(2));
        // force every hop to form a team so the walk keeps going
        for id in 1..4 {
            chain.progress.borrow_mut().insert(
                id,
                DownlineProgress {
                    completions: 2,
                    pending: vec![90, 91],
                },
            );
        }
        let err = propagate_completion(&chain, 1, 100, 0).unwrap_err();
        assert!(matches!(
            err,
            CascadeError::Referral(ReferralError::CircularReference { user: 1 })
        ));
    }

    #[test]
    fn test_missing_ancestor() {
        let chain = MemoryChain::default();
        chain.add(5, Some(99));
        let err = propagate_completion(&chain, 5, 100, 0).unwrap_err();
        assert!(matches!(
            err,
            CascadeError::Referral(ReferralError::MissingAncestor { user: 5, sponsor: 99 })
        ));
    }

    #[test]
    fn test_max_depth() {
        let chain = MemoryChain::default();
        chain.add(1, None);
        chain.add(2, Some(1));
        chain.add(3, Some(2));
        chain.progress.borrow_mut().insert(
            2,
            DownlineProgress {
                completions: 2,
                pending: vec![90, 91],
            },
        );
        let report = propagate_completion(&chain, 3, 1, 0).unwrap();
        assert_eq!(report.hops, 1);
        assert_eq!(report.teams.len(), 1);
        assert_eq!(report.stop, CascadeStop::MaxDepth);
        assert_eq!(chain.completions(1), 0);
    }
}
