use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::{Dice, Outcome};
use crate::{MatchId, PlayerId};

/// Lifecycle of a round. Only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    Open,
    Closed,
    Settled,
}

impl RoundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundState::Open => "open",
            RoundState::Closed => "closed",
            RoundState::Settled => "settled",
        }
    }

    /// The only state this one may advance to.
    pub fn next(&self) -> Option<RoundState> {
        match self {
            RoundState::Open => Some(RoundState::Closed),
            RoundState::Closed => Some(RoundState::Settled),
            RoundState::Settled => None,
        }
    }
}

/// Stakes placed on one outcome, by player.
pub type BetBucket = BTreeMap<PlayerId, u64>;

/// One betting round: open, close, roll, settle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub match_id: MatchId,
    state: RoundState,
    bets: BTreeMap<Outcome, BetBucket>,
    participants: BTreeSet<PlayerId>,
    result: Option<Dice>,
    pub created_at_ms: u64,
}

impl Round {
    pub fn new(match_id: MatchId, created_at_ms: u64) -> Self {
        Self {
            match_id,
            state: RoundState::Open,
            bets: BTreeMap::new(),
            participants: BTreeSet::new(),
            result: None,
            created_at_ms,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == RoundState::Open
    }

    pub fn result(&self) -> Option<Dice> {
        self.result
    }

    pub fn participants(&self) -> &BTreeSet<PlayerId> {
        &self.participants
    }

    pub fn bucket(&self, outcome: Outcome) -> Option<&BetBucket> {
        self.bets.get(&outcome)
    }

    /// Open → Closed. Returns false (and changes nothing) from any other state.
    pub fn close(&mut self) -> bool {
        self.advance(RoundState::Open)
    }

    /// Closed → Settled with the given roll. Returns false from any other state.
    pub fn settle(&mut self, dice: Dice) -> bool {
        if !self.advance(RoundState::Closed) {
            return false;
        }
        self.result = Some(dice);
        true
    }

    fn advance(&mut self, from: RoundState) -> bool {
        if self.state != from {
            return false;
        }
        match self.state.next() {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Add `amount` to the player's stake on `outcome` and return the new
    /// cumulative stake on that outcome.
    ///
    /// Callers are responsible for funds and state checks.
    pub fn add_stake(&mut self, outcome: Outcome, player: PlayerId, amount: u64) -> u64 {
        let entry = self
            .bets
            .entry(outcome)
            .or_default()
            .entry(player)
            .or_insert(0);
        *entry = entry.saturating_add(amount);
        self.participants.insert(player);
        *entry
    }

    /// Total staked by one player across every outcome.
    pub fn stake_of(&self, player: PlayerId) -> u64 {
        self.bets
            .values()
            .filter_map(|bucket| bucket.get(&player))
            .fold(0u64, |acc, amount| acc.saturating_add(*amount))
    }

    /// Per-player totals across every outcome.
    pub fn stakes_by_player(&self) -> BTreeMap<PlayerId, u64> {
        let mut totals = BTreeMap::new();
        for bucket in self.bets.values() {
            for (player, amount) in bucket {
                let entry = totals.entry(*player).or_insert(0u64);
                *entry = entry.saturating_add(*amount);
            }
        }
        totals
    }

    /// Total staked on one outcome.
    pub fn outcome_total(&self, outcome: Outcome) -> u64 {
        self.bucket(outcome)
            .map(|bucket| bucket.values().fold(0u64, |acc, v| acc.saturating_add(*v)))
            .unwrap_or(0)
    }

    /// Total staked on the round.
    pub fn total_staked(&self) -> u64 {
        Outcome::ALL
            .iter()
            .fold(0u64, |acc, outcome| acc.saturating_add(self.outcome_total(*outcome)))
    }

    pub fn has_stakes(&self) -> bool {
        self.bets.values().any(|bucket| !bucket.is_empty())
    }
}

/// Immutable record of a settled round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchHistoryEntry {
    pub match_id: MatchId,
    pub dice: Dice,
    pub result: u8,
    pub winning_outcome: Outcome,
    pub participant_count: usize,
    pub timestamp_ms: u64,
}
