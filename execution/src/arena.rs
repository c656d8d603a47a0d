//! Per-chat container for everything a round touches.

use std::collections::VecDeque;

use dicearena_types::{ChatId, MatchHistoryEntry, MatchId, Round, SequenceProgress};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::ledger::PlayerLedger;
use crate::scheduler::{TimerHandle, TimerKind};

/// A multi-round run started by an administrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceState {
    pub id: u64,
    pub total: u32,
    /// Rounds settled so far.
    pub completed: u32,
}

impl SequenceState {
    pub fn progress(&self) -> SequenceProgress {
        SequenceProgress {
            sequence_id: self.id,
            completed: self.completed,
            total: self.total,
        }
    }
}

/// State of one chat: ledger, current round, history, sequencing and the
/// timers scheduled on its behalf.
///
/// Mutated only through [`RoundEngine`](crate::RoundEngine).
#[derive(Debug)]
pub struct ChatArena {
    chat_id: ChatId,
    generation: u64,
    pub(crate) ledger: PlayerLedger,
    pub(crate) match_counter: MatchId,
    pub(crate) history: VecDeque<MatchHistoryEntry>,
    pub(crate) current_round: Option<Round>,
    pub(crate) idle_streak: u32,
    pub(crate) sequence: Option<SequenceState>,
    pub(crate) sequence_counter: u64,
    pub(crate) pending_timers: Vec<(TimerHandle, TimerKind)>,
    pub(crate) fallback_rng: StdRng,
}

impl ChatArena {
    /// `fallback_seed` seeds the RNG used only when the die source fails.
    pub fn new(chat_id: ChatId, fallback_seed: u64) -> Self {
        Self {
            chat_id,
            generation: 0,
            ledger: PlayerLedger::new(),
            match_counter: 1,
            history: VecDeque::new(),
            current_round: None,
            idle_streak: 0,
            sequence: None,
            sequence_counter: 0,
            pending_timers: Vec::new(),
            fallback_rng: StdRng::seed_from_u64(fallback_seed),
        }
    }

    /// Tag the arena with a registry-unique generation, carried by every
    /// timer it schedules.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ledger(&self) -> &PlayerLedger {
        &self.ledger
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.current_round.as_ref()
    }

    /// Settled rounds, oldest first.
    pub fn history(
        &self,
    ) -> impl DoubleEndedIterator<Item = &MatchHistoryEntry> + ExactSizeIterator {
        self.history.iter()
    }

    pub fn idle_streak(&self) -> u32 {
        self.idle_streak
    }

    pub fn sequence(&self) -> Option<SequenceState> {
        self.sequence
    }

    /// Id the next opened round will get.
    pub fn next_match_id(&self) -> MatchId {
        self.match_counter
    }

    pub fn pending_timers(&self) -> impl Iterator<Item = &TimerKind> {
        self.pending_timers.iter().map(|(_, kind)| kind)
    }

    /// True when no round, sequence or timer is live.
    pub fn is_quiet(&self) -> bool {
        self.current_round.is_none() && self.sequence.is_none() && self.pending_timers.is_empty()
    }

    pub(crate) fn push_history(&mut self, entry: MatchHistoryEntry, capacity: usize) {
        self.history.push_back(entry);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }

    pub(crate) fn forget_timer(&mut self, kind: &TimerKind) {
        self.pending_timers.retain(|(_, pending)| pending != kind);
    }

    pub(crate) fn take_timers(&mut self) -> Vec<TimerHandle> {
        self.pending_timers
            .drain(..)
            .map(|(handle, _)| handle)
            .collect()
    }
}
