use serde::Serialize;

use super::ArenaError;
use crate::PlayerId;

/// A player's standing inside one chat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAccount {
    pub id: PlayerId,
    pub display_name: String,
    pub balance: u64,
    pub wins: u64,
    pub losses: u64,
    pub last_active_at_ms: u64,
}

impl PlayerAccount {
    pub fn new(id: PlayerId, display_name: String, balance: u64, now_ms: u64) -> Self {
        Self {
            id,
            display_name,
            balance,
            wins: 0,
            losses: 0,
            last_active_at_ms: now_ms,
        }
    }

    /// Remove `amount` from the balance.
    ///
    /// Fails without touching the account when the amount is zero or larger
    /// than the current balance.
    pub fn debit(&mut self, amount: u64) -> Result<u64, ArenaError> {
        if amount == 0 {
            return Err(ArenaError::InvalidAmount);
        }
        if amount > self.balance {
            return Err(ArenaError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }

    /// Add `amount` to the balance. Zero is a valid break-even credit.
    pub fn credit(&mut self, amount: u64) -> u64 {
        self.balance = self.balance.saturating_add(amount);
        self.balance
    }

    /// Count one settled round for this player.
    pub fn record_outcome(&mut self, won: bool) {
        if won {
            self.wins = self.wins.saturating_add(1);
        } else {
            self.losses = self.losses.saturating_add(1);
        }
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_active_at_ms = self.last_active_at_ms.max(now_ms);
    }

    pub fn games_played(&self) -> u64 {
        self.wins.saturating_add(self.losses)
    }
}
