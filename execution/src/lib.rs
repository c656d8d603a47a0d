//! Dice arena execution layer.
//!
//! This crate contains the per-chat round engine ([`RoundEngine`]) and the
//! state it mutates ([`ChatArena`]). It is used by the live-table service,
//! which supplies the clock, the timers and the dice.
//!
//! ## Determinism requirements
//! - Do not read wall-clock time inside execution; `now_ms` is always passed in.
//! - Do not spawn or sleep; delays go through the [`Scheduler`] trait.
//! - Only use the arena's seeded fallback RNG when the die source fails.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Driving a round (example)
//! ```rust,ignore
//! use dicearena_execution::{ChatArena, RoundEngine};
//! use dicearena_execution::mocks::{ManualScheduler, ScriptedDice};
//! use dicearena_types::{ArenaConfig, Outcome};
//!
//! let config = ArenaConfig::default();
//! let scheduler = ManualScheduler::new();
//! let mut arena = ChatArena::new(-100, 7);
//! let mut events = Vec::new();
//!
//! let mut engine = RoundEngine::new(&mut arena, &config, &scheduler, &mut events);
//! engine.open_round(0)?;
//! engine.place_bet(1, "alice", Outcome::Big, 100, 10)?;
//!
//! // Betting closes, then the dice roll.
//! let mut dice = ScriptedDice::rolls(&[(4, 5)]);
//! while let Some((now_ms, timer)) = scheduler.pop_next() {
//!     RoundEngine::new(&mut arena, &config, &scheduler, &mut events)
//!         .fire(timer, &mut dice, now_ms);
//! }
//! ```

pub mod arena;
pub mod dice;
pub mod engine;
pub mod ledger;
pub mod payout;
pub mod round_query;
pub mod scheduler;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod sequence_tests;

pub use arena::{ChatArena, SequenceState};
pub use dice::{roll_pair, DieSource, DieSourceError, PrefetchedDice};
pub use engine::{BalanceAdjustment, RoundEngine, RoundOpening, SequenceStart};
pub use ledger::{place_bet, validate_stake, BetConfirmation, PlayerLedger};
pub use payout::{settle, Settlement};
pub use round_query::{
    leaderboard, player_stats, recent_history, round_status, LeaderboardEntry, PlayerStats,
    RoundSnapshot, RoundStatus,
};
pub use scheduler::{EventSink, Scheduler, Timer, TimerHandle, TimerKind};
