//! Shared domain types for dice arena.
//!
//! Everything in this crate is plain data: accounts, rounds, dice, history
//! entries, the events a round emits and the errors a command can return.
//! The state machine that mutates these lives in `dicearena-execution`.

pub mod arena;

pub use arena::*;

/// Identifier of a chat group. Group chats are negative on most platforms.
pub type ChatId = i64;

/// Identifier of a player within the messaging platform.
pub type PlayerId = i64;

/// Per-chat monotonically increasing round number.
pub type MatchId = u64;
