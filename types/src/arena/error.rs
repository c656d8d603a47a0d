use thiserror::Error as ThisError;

use crate::ChatId;

/// Every way an arena command can be refused.
///
/// All variants are recoverable and meant to be rendered back to the caller;
/// none of them leaves the arena in a modified state.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum ArenaError {
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("stake {amount} is below the minimum of {min}")]
    BelowMinimum { amount: u64, min: u64 },
    #[error("stake {amount} is above the maximum of {max}")]
    AboveMaximum { amount: u64, max: u64 },
    #[error("insufficient funds (balance={balance}, requested={requested})")]
    InsufficientFunds { balance: u64, requested: u64 },
    #[error("betting is closed for this round")]
    BettingClosed,
    #[error("a round is already active")]
    RoundAlreadyActive,
    #[error("a sequence is already active")]
    SequenceAlreadyActive,
    #[error("no active round")]
    NoActiveRound,
    #[error("no active sequence")]
    NoActiveSequence,
    #[error("sequence of {requested} rounds exceeds the limit of {max}")]
    SequenceLimitExceeded { requested: u32, max: u32 },
    #[error("sequence must request at least one round")]
    InvalidSequenceLength,
    #[error("chat {0} is not allowed to host rounds")]
    ChatNotAllowed(ChatId),
}

impl ArenaError {
    /// Stable machine-readable code used by transports.
    pub fn code(&self) -> &'static str {
        match self {
            ArenaError::InvalidAmount => "INVALID_AMOUNT",
            ArenaError::BelowMinimum { .. } => "BELOW_MINIMUM",
            ArenaError::AboveMaximum { .. } => "ABOVE_MAXIMUM",
            ArenaError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            ArenaError::BettingClosed => "BETTING_CLOSED",
            ArenaError::RoundAlreadyActive => "ROUND_ALREADY_ACTIVE",
            ArenaError::SequenceAlreadyActive => "SEQUENCE_ALREADY_ACTIVE",
            ArenaError::NoActiveRound => "NO_ACTIVE_ROUND",
            ArenaError::NoActiveSequence => "NO_ACTIVE_SEQUENCE",
            ArenaError::SequenceLimitExceeded { .. } => "SEQUENCE_LIMIT_EXCEEDED",
            ArenaError::InvalidSequenceLength => "INVALID_SEQUENCE_LENGTH",
            ArenaError::ChatNotAllowed(_) => "CHAT_NOT_ALLOWED",
        }
    }
}
