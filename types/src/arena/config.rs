use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::{
    BETTING_WINDOW_MS, HISTORY_CAPACITY, IDLE_ROUND_LIMIT, INITIAL_BALANCE,
    INTER_ROUND_DELAY_MS, MAX_BET, MAX_SEQUENCE_ROUNDS, MIN_BET, QUICK_BET_AMOUNT, ROLL_DELAY_MS,
    SEQUENCE_START_DELAY_MS,
};

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ArenaConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("max_bet ({max}) must be at least min_bet ({min})")]
    BetBounds { min: u64, max: u64 },
    #[error("quick_bet_amount ({amount}) is outside the stake limits")]
    QuickBetOutOfRange { amount: u64 },
}

/// Policy shared by every arena in a process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub betting_ms: u64,
    pub roll_delay_ms: u64,
    pub sequence_start_delay_ms: u64,
    pub inter_round_delay_ms: u64,
    pub initial_balance: u64,
    pub min_bet: u64,
    pub max_bet: Option<u64>,
    pub quick_bet_amount: u64,
    pub max_sequence_rounds: u32,
    pub history_capacity: usize,
    pub idle_round_limit: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            betting_ms: BETTING_WINDOW_MS,
            roll_delay_ms: ROLL_DELAY_MS,
            sequence_start_delay_ms: SEQUENCE_START_DELAY_MS,
            inter_round_delay_ms: INTER_ROUND_DELAY_MS,
            initial_balance: INITIAL_BALANCE,
            min_bet: MIN_BET,
            max_bet: Some(MAX_BET),
            quick_bet_amount: QUICK_BET_AMOUNT,
            max_sequence_rounds: MAX_SEQUENCE_ROUNDS,
            history_capacity: HISTORY_CAPACITY,
            idle_round_limit: IDLE_ROUND_LIMIT,
        }
    }
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ArenaConfigError> {
        let durations = [
            ("betting_ms", self.betting_ms),
            ("roll_delay_ms", self.roll_delay_ms),
            ("sequence_start_delay_ms", self.sequence_start_delay_ms),
            ("inter_round_delay_ms", self.inter_round_delay_ms),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(ArenaConfigError::Zero { field });
            }
        }
        if self.min_bet == 0 {
            return Err(ArenaConfigError::Zero { field: "min_bet" });
        }
        if let Some(max) = self.max_bet {
            if max < self.min_bet {
                return Err(ArenaConfigError::BetBounds {
                    min: self.min_bet,
                    max,
                });
            }
        }
        if !self.stake_in_bounds(self.quick_bet_amount) {
            return Err(ArenaConfigError::QuickBetOutOfRange {
                amount: self.quick_bet_amount,
            });
        }
        if self.max_sequence_rounds == 0 {
            return Err(ArenaConfigError::Zero {
                field: "max_sequence_rounds",
            });
        }
        if self.history_capacity == 0 {
            return Err(ArenaConfigError::Zero {
                field: "history_capacity",
            });
        }
        if self.idle_round_limit == 0 {
            return Err(ArenaConfigError::Zero {
                field: "idle_round_limit",
            });
        }
        Ok(())
    }

    fn stake_in_bounds(&self, amount: u64) -> bool {
        amount >= self.min_bet && self.max_bet.map_or(true, |max| amount <= max)
    }
}
