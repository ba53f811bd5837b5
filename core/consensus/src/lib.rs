// Copyright 2024 The Skein Project
// SPDX-License-Identifier: BSD-3-Clause

//! Single-decree Snowball finalizer: a state machine fed by `(tick,
//! sample_reply, cancel)` events, per the design note in §9. Round state
//! is tagged by a monotonic round id so a reply belonging to a cancelled
//! or superseded round is silently ignored rather than corrupting the
//! active tally.

use std::collections::HashMap;

use log::{debug, info};
use skein_types::BlockID;

const LOG_TARGET: &str = "skein::consensus";

/// `K` (sample size), `α` (quorum threshold fraction), `β₁` (early
/// decision threshold).
#[derive(Debug, Clone, Copy)]
pub struct SnowballConfig {
    pub k: usize,
    pub alpha: f64,
    pub beta1: u32,
}

impl Default for SnowballConfig {
    fn default() -> Self {
        Self { k: 10, alpha: 0.8, beta1: 3 }
    }
}

impl SnowballConfig {
    fn quorum_threshold(&self) -> usize {
        (self.alpha * self.k as f64).ceil() as usize
    }
}

/// Identifies a sampled peer. Left abstract since no transport is
/// implemented here; a real peer sampler would key this by node identity.
pub type PeerId = u64;

/// Snowball state for a single block index. Construct a fresh instance (or
/// call [`Snowball::advance`]) once a decision is reached, to begin voting
/// on the next index.
pub struct Snowball {
    config: SnowballConfig,
    round_id: u64,
    preferred: Option<BlockID>,
    last: Option<BlockID>,
    count: u32,
    votes: HashMap<PeerId, BlockID>,
    decided: Option<BlockID>,
}

impl Snowball {
    pub fn new(config: SnowballConfig) -> Self {
        Self { config, round_id: 0, preferred: None, last: None, count: 0, votes: HashMap::new(), decided: None }
    }

    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn decided(&self) -> Option<BlockID> {
        self.decided
    }

    pub fn preferred(&self) -> Option<BlockID> {
        self.preferred
    }

    /// Starts a fresh sampling round: clears collected votes and returns
    /// the new round id that replies must be tagged with.
    pub fn begin_round(&mut self) -> u64 {
        self.round_id += 1;
        self.votes.clear();
        self.round_id
    }

    /// Aborts the current round without deciding; in-flight replies tagged
    /// with the now-stale round id will be rejected by
    /// [`Snowball::submit_reply`].
    pub fn cancel(&mut self) {
        self.round_id += 1;
        self.votes.clear();
    }

    /// Records a peer's vote for `round_id`. Returns `false` (and does
    /// nothing) if `round_id` does not match the active round -- this is
    /// how a late reply from a cancelled round is discarded.
    pub fn submit_reply(&mut self, round_id: u64, peer: PeerId, value: BlockID) -> bool {
        if round_id != self.round_id {
            return false;
        }
        self.votes.insert(peer, value);
        true
    }

    /// Tallies the current round's votes. If one candidate value has
    /// reached the `α·K` quorum threshold, applies the Snowball preference
    /// update and, once `count ≥ β₁`, records a decision. Returns the
    /// quorum winner, if any, regardless of whether it triggered a
    /// decision.
    pub fn tally(&mut self) -> Option<BlockID> {
        if self.decided.is_some() {
            return self.decided;
        }

        let mut tallies: HashMap<BlockID, usize> = HashMap::new();
        for value in self.votes.values() {
            *tallies.entry(*value).or_insert(0) += 1;
        }

        let threshold = self.config.quorum_threshold();
        let winner = tallies.into_iter().find(|(_, count)| *count >= threshold).map(|(value, _)| value)?;

        if Some(winner) == self.preferred {
            self.count += 1;
        } else {
            self.preferred = Some(winner);
            self.last = Some(winner);
            self.count = 1;
        }

        debug!(target: LOG_TARGET, "round {} quorum winner {} (count={})", self.round_id, winner, self.count);

        if self.count >= self.config.beta1 {
            info!(target: LOG_TARGET, "decided block {} after {} consecutive rounds", winner, self.count);
            self.decided = Some(winner);
        }

        Some(winner)
    }

    /// Resets all round state to vote on the next block index.
    pub fn advance(&mut self) {
        self.round_id += 1;
        self.preferred = None;
        self.last = None;
        self.count = 0;
        self.votes.clear();
        self.decided = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SnowballConfig {
        SnowballConfig { k: 10, alpha: 0.8, beta1: 3 }
    }

    #[test]
    fn unanimous_votes_decide_after_beta1_rounds() {
        let mut sb = Snowball::new(config());
        let winner = BlockID([1; 32]);

        for _ in 0..3 {
            let round = sb.begin_round();
            for peer in 0..10u64 {
                sb.submit_reply(round, peer, winner);
            }
            sb.tally();
        }

        assert_eq!(sb.decided(), Some(winner));
    }

    #[test]
    fn below_quorum_does_not_move_preference() {
        let mut sb = Snowball::new(config());
        let candidate = BlockID([2; 32]);

        let round = sb.begin_round();
        for peer in 0..5u64 {
            sb.submit_reply(round, peer, candidate);
        }
        let winner = sb.tally();

        assert_eq!(winner, None);
        assert_eq!(sb.decided(), None);
        assert_eq!(sb.preferred(), None);
    }

    #[test]
    fn stale_round_replies_are_discarded() {
        let mut sb = Snowball::new(config());
        let round = sb.begin_round();
        sb.cancel();

        let accepted = sb.submit_reply(round, 0, BlockID([3; 32]));
        assert!(!accepted);
    }

    #[test]
    fn switching_preference_resets_count_to_one() {
        let mut sb = Snowball::new(config());
        let a = BlockID([1; 32]);
        let b = BlockID([2; 32]);

        let round = sb.begin_round();
        for peer in 0..10u64 {
            sb.submit_reply(round, peer, a);
        }
        sb.tally();
        assert_eq!(sb.preferred(), Some(a));

        let round = sb.begin_round();
        for peer in 0..10u64 {
            sb.submit_reply(round, peer, b);
        }
        sb.tally();

        assert_eq!(sb.preferred(), Some(b));
        assert_eq!(sb.decided(), None);
    }

    #[test]
    fn advance_clears_decision_for_next_index() {
        let mut sb = Snowball::new(config());
        let winner = BlockID([9; 32]);
        for _ in 0..3 {
            let round = sb.begin_round();
            for peer in 0..10u64 {
                sb.submit_reply(round, peer, winner);
            }
            sb.tally();
        }
        assert!(sb.decided().is_some());

        sb.advance();
        assert_eq!(sb.decided(), None);
        assert_eq!(sb.preferred(), None);
    }
}
