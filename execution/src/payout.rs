//! Settlement of a rolled round against the ledger.

use std::collections::BTreeMap;

use dicearena_types::{Dice, Outcome, PlayerId, Round};

use crate::ledger::PlayerLedger;

/// What settling one round did to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub winning_outcome: Outcome,
    pub multiplier: u64,
    /// Gross credit per winning player.
    pub payouts: BTreeMap<PlayerId, u64>,
    /// Participants with no stake on the winning outcome.
    pub losers: Vec<PlayerId>,
    pub participant_count: usize,
}

impl Settlement {
    pub fn is_idle(&self) -> bool {
        self.participant_count == 0
    }
}

/// Pay the winning bucket and count wins and losses.
///
/// Each participant gets exactly one win or one loss no matter how many
/// outcomes they staked on, and is marked active at `now_ms`. Stakes were
/// already debited at bet time, so losing stakes need no other ledger write.
pub fn settle(round: &Round, dice: Dice, ledger: &mut PlayerLedger, now_ms: u64) -> Settlement {
    let winning_outcome = dice.outcome();
    let multiplier = winning_outcome.multiplier();
    let mut payouts = BTreeMap::new();

    if let Some(bucket) = round.bucket(winning_outcome) {
        for (player, amount) in bucket {
            let credit = amount.saturating_mul(multiplier);
            if let Some(account) = ledger.get_mut(*player) {
                account.credit(credit);
                account.record_outcome(true);
                account.touch(now_ms);
            }
            payouts.insert(*player, credit);
        }
    }

    let mut losers = Vec::new();
    for player in round.participants() {
        if payouts.contains_key(player) {
            continue;
        }
        if let Some(account) = ledger.get_mut(*player) {
            account.record_outcome(false);
            account.touch(now_ms);
        }
        losers.push(*player);
    }

    Settlement {
        winning_outcome,
        multiplier,
        payouts,
        losers,
        participant_count: round.participants().len(),
    }
}
