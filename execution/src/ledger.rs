//! Per-chat player balances and the bet-placement primitive.

use std::collections::BTreeMap;

use dicearena_types::{ArenaConfig, ArenaError, Outcome, PlayerAccount, PlayerId, Round};
use serde::Serialize;

/// Accounts of every player who has ever touched one chat's arena.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerLedger {
    accounts: BTreeMap<PlayerId, PlayerAccount>,
}

impl PlayerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player: PlayerId) -> Option<&PlayerAccount> {
        self.accounts.get(&player)
    }

    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut PlayerAccount> {
        self.accounts.get_mut(&player)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Accounts in player-id order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerAccount> {
        self.accounts.values()
    }

    /// Balance the player has, or would start with if they had no account yet.
    pub fn balance_or(&self, player: PlayerId, initial_balance: u64) -> u64 {
        self.accounts
            .get(&player)
            .map_or(initial_balance, |account| account.balance)
    }

    /// Sum of every balance in the ledger.
    pub fn total_balance(&self) -> u64 {
        self.accounts
            .values()
            .fold(0u64, |acc, account| acc.saturating_add(account.balance))
    }

    /// Fetch the player's account, creating it with `initial_balance` on first
    /// touch. The display name and activity timestamp are refreshed either way.
    pub fn ensure_account(
        &mut self,
        player: PlayerId,
        display_name: &str,
        initial_balance: u64,
        now_ms: u64,
    ) -> &mut PlayerAccount {
        let account = self.accounts.entry(player).or_insert_with(|| {
            PlayerAccount::new(player, display_name.to_string(), initial_balance, now_ms)
        });
        if !display_name.is_empty() && account.display_name != display_name {
            account.display_name = display_name.to_string();
        }
        account.touch(now_ms);
        account
    }

    /// Name to show for a player, falling back to the numeric id.
    pub fn display_name(&self, player: PlayerId) -> String {
        match self.accounts.get(&player) {
            Some(account) if !account.display_name.is_empty() => account.display_name.clone(),
            _ => player.to_string(),
        }
    }
}

/// Check a stake against the configured bounds.
pub fn validate_stake(config: &ArenaConfig, amount: u64) -> Result<(), ArenaError> {
    if amount == 0 {
        return Err(ArenaError::InvalidAmount);
    }
    if amount < config.min_bet {
        return Err(ArenaError::BelowMinimum {
            amount,
            min: config.min_bet,
        });
    }
    if let Some(max) = config.max_bet {
        if amount > max {
            return Err(ArenaError::AboveMaximum { amount, max });
        }
    }
    Ok(())
}

/// Result of an accepted bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetConfirmation {
    pub match_id: u64,
    pub outcome: Outcome,
    /// Cumulative stake of this player on this outcome.
    pub stake: u64,
    /// Balance after the debit.
    pub balance: u64,
}

/// Place a bet on an open round.
///
/// Checks run in order and the first failure wins: the round must be open,
/// the amount must be within the stake bounds, and the player must be able
/// to cover it. A rejected bet mutates nothing and creates no account.
#[allow(clippy::too_many_arguments)]
pub fn place_bet(
    round: &mut Round,
    ledger: &mut PlayerLedger,
    config: &ArenaConfig,
    player: PlayerId,
    display_name: &str,
    outcome: Outcome,
    amount: u64,
    now_ms: u64,
) -> Result<BetConfirmation, ArenaError> {
    if !round.is_open() {
        return Err(ArenaError::BettingClosed);
    }
    validate_stake(config, amount)?;
    let balance = ledger.balance_or(player, config.initial_balance);
    if amount > balance {
        return Err(ArenaError::InsufficientFunds {
            balance,
            requested: amount,
        });
    }

    let account = ledger.ensure_account(player, display_name, config.initial_balance, now_ms);
    let balance = account.debit(amount)?;
    let stake = round.add_stake(outcome, player, amount);
    Ok(BetConfirmation {
        match_id: round.match_id,
        outcome,
        stake,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ArenaConfig {
        ArenaConfig {
            min_bet: 10,
            max_bet: Some(500),
            ..ArenaConfig::default()
        }
    }

    #[test]
    fn test_ensure_account_is_idempotent() {
        let mut ledger = PlayerLedger::new();
        ledger.ensure_account(1, "alice", 1_000, 5).balance -= 300;
        let account = ledger.ensure_account(1, "alice_renamed", 1_000, 9);
        assert_eq!(account.balance, 700);
        assert_eq!(account.display_name, "alice_renamed");
        assert_eq!(account.last_active_at_ms, 9);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_ensure_account_keeps_name_when_blank() {
        let mut ledger = PlayerLedger::new();
        ledger.ensure_account(1, "alice", 1_000, 0);
        ledger.ensure_account(1, "", 1_000, 1);
        assert_eq!(ledger.display_name(1), "alice");
        assert_eq!(ledger.display_name(2), "2");
    }

    #[test]
    fn test_validate_stake_bounds() {
        let config = test_config();
        assert_eq!(validate_stake(&config, 0), Err(ArenaError::InvalidAmount));
        assert_eq!(
            validate_stake(&config, 9),
            Err(ArenaError::BelowMinimum { amount: 9, min: 10 })
        );
        assert_eq!(
            validate_stake(&config, 501),
            Err(ArenaError::AboveMaximum {
                amount: 501,
                max: 500
            })
        );
        assert!(validate_stake(&config, 10).is_ok());
        assert!(validate_stake(&config, 500).is_ok());
    }

    #[test]
    fn test_place_bet_accumulates_and_debits() {
        let config = test_config();
        let mut round = Round::new(1, 0);
        let mut ledger = PlayerLedger::new();

        let first = place_bet(&mut round, &mut ledger, &config, 7, "bob", Outcome::Big, 100, 1)
            .expect("first bet");
        assert_eq!(first.stake, 100);
        assert_eq!(first.balance, 900);

        let second = place_bet(&mut round, &mut ledger, &config, 7, "bob", Outcome::Big, 50, 2)
            .expect("second bet");
        assert_eq!(second.stake, 150);
        assert_eq!(second.balance, 850);
        assert_eq!(round.stake_of(7), 150);
    }

    #[test]
    fn test_rejected_bet_creates_no_account() {
        let config = ArenaConfig {
            max_bet: None,
            ..test_config()
        };
        let mut round = Round::new(1, 0);
        let mut ledger = PlayerLedger::new();

        let err = place_bet(&mut round, &mut ledger, &config, 7, "bob", Outcome::Small, 1_001, 1)
            .unwrap_err();
        assert_eq!(
            err,
            ArenaError::InsufficientFunds {
                balance: 1_000,
                requested: 1_001
            }
        );
        assert!(ledger.is_empty());
        assert!(!round.has_stakes());
    }

    #[test]
    fn test_closed_round_rejects_before_amount_checks() {
        let config = test_config();
        let mut round = Round::new(1, 0);
        round.close();
        let mut ledger = PlayerLedger::new();

        // Zero would be InvalidAmount on an open round.
        let err = place_bet(&mut round, &mut ledger, &config, 7, "bob", Outcome::Big, 0, 1)
            .unwrap_err();
        assert_eq!(err, ArenaError::BettingClosed);
        assert!(ledger.is_empty());
    }
}
