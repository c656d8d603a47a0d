//! Timer tokens and the collaborator traits the engine drives.
//!
//! The engine never sleeps. It asks a [`Scheduler`] to deliver a [`Timer`]
//! after a delay and later receives that token back through
//! [`RoundEngine::fire`](crate::RoundEngine::fire). Tokens carry ids, not
//! references, so a token that outlives its round is detected as stale by
//! comparing ids against the arena.

use std::time::Duration;

use dicearena_types::{ArenaEvent, ChatId, MatchId};

/// Opaque handle returned by [`Scheduler::schedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// What a timer does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Close betting on the given round.
    CloseBetting { match_id: MatchId },
    /// Roll the dice for the given round.
    Roll { match_id: MatchId },
    /// Open the next round of the given sequence.
    NextRound { sequence_id: u64 },
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::CloseBetting { .. } => "close_betting",
            TimerKind::Roll { .. } => "roll",
            TimerKind::NextRound { .. } => "next_round",
        }
    }
}

/// Immutable token delivered back to the engine when a delay elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timer {
    pub chat_id: ChatId,
    /// Generation of the arena that scheduled it. A chat that is removed and
    /// re-created gets a new generation, so ids restarting at 1 cannot match.
    pub generation: u64,
    pub kind: TimerKind,
}

/// Delayed, cancellable delivery of [`Timer`] tokens.
///
/// Cancelling a handle that already fired or was already cancelled must be
/// a no-op.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, timer: Timer) -> TimerHandle;
    fn cancel(&self, handle: TimerHandle);
}

/// Receiver of round lifecycle events.
pub trait EventSink {
    fn emit(&mut self, event: ArenaEvent);
}

impl EventSink for Vec<ArenaEvent> {
    fn emit(&mut self, event: ArenaEvent) {
        self.push(event);
    }
}

/// Convert a configured millisecond delay into a [`Duration`].
pub fn delay(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
