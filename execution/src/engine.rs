//! Round engine: the state machine driving one chat's arena.
//!
//! ```text
//! Open   --(CloseBetting timer)--> Closed
//! Closed --(Roll timer)----------> Settled
//! Open|Closed --(stop_round)-----> discarded, stakes refunded
//! ```
//!
//! Every public method is one non-preemptible step against the arena. The
//! caller holds the arena exclusively for the duration of the call, so there
//! are no interleavings inside a step. Timer firings that no longer match the
//! arena (wrong match id, wrong state, sequence gone) are logged and ignored.

use std::collections::BTreeMap;

use dicearena_types::{
    ArenaConfig, ArenaError, ArenaEvent, MatchHistoryEntry, MatchId, Outcome, OutcomeSummary,
    PlayerId, Round, RoundState, StakeLine,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::arena::{ChatArena, SequenceState};
use crate::dice::{roll_pair, DieSource};
use crate::ledger::{place_bet, BetConfirmation};
use crate::payout::settle;
use crate::scheduler::{delay, EventSink, Scheduler, Timer, TimerKind};

/// Result of opening a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOpening {
    pub match_id: MatchId,
    pub betting_ms: u64,
}

/// Result of starting a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStart {
    pub sequence_id: u64,
    pub total: u32,
    pub starts_in_ms: u64,
}

/// Result of an administrative balance change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAdjustment {
    pub player_id: PlayerId,
    pub old_balance: u64,
    pub new_balance: u64,
}

/// Borrowed view over one arena and its collaborators for the length of a
/// single step.
pub struct RoundEngine<'a, S: Scheduler + ?Sized, E: EventSink + ?Sized> {
    arena: &'a mut ChatArena,
    config: &'a ArenaConfig,
    scheduler: &'a S,
    events: &'a mut E,
}

impl<'a, S: Scheduler + ?Sized, E: EventSink + ?Sized> RoundEngine<'a, S, E> {
    pub fn new(
        arena: &'a mut ChatArena,
        config: &'a ArenaConfig,
        scheduler: &'a S,
        events: &'a mut E,
    ) -> Self {
        Self {
            arena,
            config,
            scheduler,
            events,
        }
    }

    pub fn arena(&self) -> &ChatArena {
        self.arena
    }

    /// Open a standalone round.
    pub fn open_round(&mut self, now_ms: u64) -> Result<RoundOpening, ArenaError> {
        if self.arena.current_round.is_some() {
            return Err(ArenaError::RoundAlreadyActive);
        }
        if self.arena.sequence.is_some() {
            return Err(ArenaError::SequenceAlreadyActive);
        }
        Ok(self.open_unchecked(now_ms))
    }

    fn open_unchecked(&mut self, now_ms: u64) -> RoundOpening {
        let match_id = self.arena.match_counter;
        self.arena.match_counter = match_id.saturating_add(1);
        self.arena.current_round = Some(Round::new(match_id, now_ms));
        self.schedule(self.config.betting_ms, TimerKind::CloseBetting { match_id });

        let sequence = self.arena.sequence.map(|sequence| sequence.progress());
        info!(
            chat_id = self.arena.chat_id(),
            match_id,
            sequence_id = sequence.map(|s| s.sequence_id),
            "round opened"
        );
        self.events.emit(ArenaEvent::RoundOpened {
            chat_id: self.arena.chat_id(),
            match_id,
            betting_ms: self.config.betting_ms,
            sequence,
        });
        RoundOpening {
            match_id,
            betting_ms: self.config.betting_ms,
        }
    }

    /// Stake `amount` on `outcome` in the current round.
    pub fn place_bet(
        &mut self,
        player: PlayerId,
        display_name: &str,
        outcome: Outcome,
        amount: u64,
        now_ms: u64,
    ) -> Result<BetConfirmation, ArenaError> {
        let round = self
            .arena
            .current_round
            .as_mut()
            .ok_or(ArenaError::NoActiveRound)?;
        let confirmation = place_bet(
            round,
            &mut self.arena.ledger,
            self.config,
            player,
            display_name,
            outcome,
            amount,
            now_ms,
        )?;
        self.arena.idle_streak = 0;
        debug!(
            chat_id = self.arena.chat_id(),
            match_id = confirmation.match_id,
            player,
            %outcome,
            amount,
            "bet accepted"
        );
        Ok(confirmation)
    }

    /// Schedule `count` consecutive rounds.
    pub fn start_sequence(&mut self, count: u32) -> Result<SequenceStart, ArenaError> {
        if count == 0 {
            return Err(ArenaError::InvalidSequenceLength);
        }
        if count > self.config.max_sequence_rounds {
            return Err(ArenaError::SequenceLimitExceeded {
                requested: count,
                max: self.config.max_sequence_rounds,
            });
        }
        if self.arena.current_round.is_some() {
            return Err(ArenaError::RoundAlreadyActive);
        }
        if self.arena.sequence.is_some() {
            return Err(ArenaError::SequenceAlreadyActive);
        }

        self.arena.sequence_counter = self.arena.sequence_counter.saturating_add(1);
        let sequence = SequenceState {
            id: self.arena.sequence_counter,
            total: count,
            completed: 0,
        };
        self.arena.sequence = Some(sequence);
        self.arena.idle_streak = 0;
        let starts_in_ms = self.config.sequence_start_delay_ms;
        self.schedule(
            starts_in_ms,
            TimerKind::NextRound {
                sequence_id: sequence.id,
            },
        );

        info!(
            chat_id = self.arena.chat_id(),
            sequence_id = sequence.id,
            total = count,
            "sequence started"
        );
        self.events.emit(ArenaEvent::SequenceStarted {
            chat_id: self.arena.chat_id(),
            sequence_id: sequence.id,
            total: count,
            starts_in_ms,
        });
        Ok(SequenceStart {
            sequence_id: sequence.id,
            total: count,
            starts_in_ms,
        })
    }

    /// Discard the current round and refund every stake.
    ///
    /// Also ends any running sequence. Win/loss counters, the idle streak and
    /// history are untouched.
    pub fn stop_round(&mut self, now_ms: u64) -> Result<BTreeMap<PlayerId, u64>, ArenaError> {
        match self.arena.current_round.as_ref() {
            Some(round) if round.state() != RoundState::Settled => {}
            _ => return Err(ArenaError::NoActiveRound),
        }
        self.cancel_timers();
        let Some(round) = self.arena.current_round.take() else {
            return Err(ArenaError::NoActiveRound);
        };
        let ended_sequence = self.arena.sequence.take();

        let refunds = round.stakes_by_player();
        for (player, amount) in &refunds {
            if let Some(account) = self.arena.ledger.get_mut(*player) {
                account.credit(*amount);
                account.touch(now_ms);
            }
        }

        info!(
            chat_id = self.arena.chat_id(),
            match_id = round.match_id,
            refunded = refunds.len(),
            sequence_id = ended_sequence.map(|s| s.id),
            "round stopped"
        );
        self.events.emit(ArenaEvent::RoundRefunded {
            chat_id: self.arena.chat_id(),
            match_id: round.match_id,
            refunds: refunds.clone(),
        });
        Ok(refunds)
    }

    /// Cancel a sequence that is waiting between rounds.
    pub fn cancel_sequence(&mut self) -> Result<SequenceState, ArenaError> {
        if self.arena.current_round.is_some() {
            return Err(ArenaError::RoundAlreadyActive);
        }
        let Some(sequence) = self.arena.sequence.take() else {
            return Err(ArenaError::NoActiveSequence);
        };
        self.cancel_timers();

        info!(
            chat_id = self.arena.chat_id(),
            sequence_id = sequence.id,
            completed = sequence.completed,
            "sequence cancelled"
        );
        self.events.emit(ArenaEvent::SequenceCancelled {
            chat_id: self.arena.chat_id(),
            sequence_id: sequence.id,
            completed: sequence.completed,
            total: sequence.total,
        });
        Ok(sequence)
    }

    /// Credit (positive `delta`) or debit (negative `delta`) a player.
    pub fn adjust_balance(
        &mut self,
        player: PlayerId,
        display_name: &str,
        delta: i64,
        now_ms: u64,
    ) -> Result<BalanceAdjustment, ArenaError> {
        let old_balance = self
            .arena
            .ledger
            .balance_or(player, self.config.initial_balance);
        let magnitude = delta.unsigned_abs();
        if delta < 0 && magnitude > old_balance {
            return Err(ArenaError::InsufficientFunds {
                balance: old_balance,
                requested: magnitude,
            });
        }

        let account = self.arena.ledger.ensure_account(
            player,
            display_name,
            self.config.initial_balance,
            now_ms,
        );
        let new_balance = if delta < 0 {
            account.debit(magnitude)?
        } else {
            account.credit(magnitude)
        };
        info!(
            chat_id = self.arena.chat_id(),
            player, delta, old_balance, new_balance, "balance adjusted"
        );
        Ok(BalanceAdjustment {
            player_id: player,
            old_balance,
            new_balance,
        })
    }

    /// Deliver a fired timer. Returns whether it changed the arena.
    pub fn fire<D: DieSource + ?Sized>(
        &mut self,
        timer: Timer,
        dice: &mut D,
        now_ms: u64,
    ) -> bool {
        if timer.chat_id != self.arena.chat_id() {
            debug!(
                chat_id = self.arena.chat_id(),
                timer_chat_id = timer.chat_id,
                "timer for another chat"
            );
            return false;
        }
        if timer.generation != self.arena.generation() {
            debug!(
                chat_id = self.arena.chat_id(),
                generation = self.arena.generation(),
                timer_generation = timer.generation,
                kind = timer.kind.as_str(),
                "timer from a previous arena"
            );
            return false;
        }
        self.arena.forget_timer(&timer.kind);
        match timer.kind {
            TimerKind::CloseBetting { match_id } => self.close_betting(match_id),
            TimerKind::Roll { match_id } => self.resolve_round(match_id, dice, now_ms).is_some(),
            TimerKind::NextRound { sequence_id } => self.next_round(sequence_id, now_ms),
        }
    }

    fn current_in_state(&self, match_id: MatchId, state: RoundState) -> bool {
        self.arena
            .current_round
            .as_ref()
            .is_some_and(|round| round.match_id == match_id && round.state() == state)
    }

    /// Stop accepting bets and schedule the roll.
    pub fn close_betting(&mut self, match_id: MatchId) -> bool {
        if !self.current_in_state(match_id, RoundState::Open) {
            debug!(chat_id = self.arena.chat_id(), match_id, "stale close_betting");
            return false;
        }
        let Some(round) = self.arena.current_round.as_mut() else {
            return false;
        };
        round.close();
        let summary = bet_summary(round, &self.arena.ledger);

        let roll_in_ms = self.config.roll_delay_ms;
        self.schedule(roll_in_ms, TimerKind::Roll { match_id });
        info!(
            chat_id = self.arena.chat_id(),
            match_id,
            outcomes = summary.len(),
            "betting closed"
        );
        self.events.emit(ArenaEvent::BettingClosed {
            chat_id: self.arena.chat_id(),
            match_id,
            summary,
            roll_in_ms,
        });
        true
    }

    /// Roll, settle and record the round. Returns the payout map, or `None`
    /// when the request is stale.
    pub fn resolve_round<D: DieSource + ?Sized>(
        &mut self,
        match_id: MatchId,
        source: &mut D,
        now_ms: u64,
    ) -> Option<BTreeMap<PlayerId, u64>> {
        if !self.current_in_state(match_id, RoundState::Closed) {
            debug!(chat_id = self.arena.chat_id(), match_id, "stale roll");
            return None;
        }
        let (dice, fallback_dice) = roll_pair(source, &mut self.arena.fallback_rng);
        let chat_id = self.arena.chat_id();

        let round = self.arena.current_round.as_mut()?;
        round.settle(dice);
        let settlement = settle(round, dice, &mut self.arena.ledger, now_ms);

        if settlement.is_idle() {
            self.arena.idle_streak = self.arena.idle_streak.saturating_add(1);
        } else {
            self.arena.idle_streak = 0;
        }
        self.arena.push_history(
            MatchHistoryEntry {
                match_id,
                dice,
                result: dice.total(),
                winning_outcome: settlement.winning_outcome,
                participant_count: settlement.participant_count,
                timestamp_ms: now_ms,
            },
            self.config.history_capacity,
        );

        info!(
            chat_id,
            match_id,
            total = dice.total(),
            outcome = %settlement.winning_outcome,
            winners = settlement.payouts.len(),
            losers = settlement.losers.len(),
            fallback_dice,
            idle_streak = self.arena.idle_streak,
            "round settled"
        );
        self.events.emit(ArenaEvent::RoundSettled {
            chat_id,
            match_id,
            dice,
            total: dice.total(),
            winning_outcome: settlement.winning_outcome,
            multiplier: settlement.multiplier,
            payouts: settlement.payouts.clone(),
            losers: settlement.losers.clone(),
            fallback_dice,
        });

        self.advance_sequence();
        self.arena.current_round = None;
        Some(settlement.payouts)
    }

    fn advance_sequence(&mut self) {
        let Some(mut sequence) = self.arena.sequence else {
            return;
        };
        let chat_id = self.arena.chat_id();
        sequence.completed = sequence.completed.saturating_add(1);

        if self.arena.idle_streak >= self.config.idle_round_limit {
            self.arena.sequence = None;
            self.cancel_timers();
            info!(
                chat_id,
                sequence_id = sequence.id,
                completed = sequence.completed,
                idle_streak = self.arena.idle_streak,
                "sequence auto-stopped"
            );
            self.events.emit(ArenaEvent::SequenceAutoStopped {
                chat_id,
                sequence_id: sequence.id,
                completed: sequence.completed,
                total: sequence.total,
                idle_streak: self.arena.idle_streak,
            });
        } else if sequence.completed < sequence.total {
            self.arena.sequence = Some(sequence);
            let next_in_ms = self.config.inter_round_delay_ms;
            self.schedule(
                next_in_ms,
                TimerKind::NextRound {
                    sequence_id: sequence.id,
                },
            );
            self.events.emit(ArenaEvent::SequenceAdvanced {
                chat_id,
                sequence_id: sequence.id,
                completed: sequence.completed,
                total: sequence.total,
                next_in_ms,
            });
        } else {
            self.arena.sequence = None;
            info!(chat_id, sequence_id = sequence.id, "sequence completed");
            self.events.emit(ArenaEvent::SequenceCompleted {
                chat_id,
                sequence_id: sequence.id,
                total: sequence.total,
            });
        }
    }

    /// Open the next round of a running sequence.
    pub fn next_round(&mut self, sequence_id: u64, now_ms: u64) -> bool {
        let live = self
            .arena
            .sequence
            .is_some_and(|sequence| sequence.id == sequence_id);
        if !live || self.arena.current_round.is_some() {
            debug!(chat_id = self.arena.chat_id(), sequence_id, "stale next_round");
            return false;
        }
        self.open_unchecked(now_ms);
        true
    }

    /// Cancel every pending timer, e.g. before the arena is dropped.
    pub fn teardown(&mut self) {
        self.cancel_timers();
    }

    fn schedule(&mut self, delay_ms: u64, kind: TimerKind) {
        let timer = Timer {
            chat_id: self.arena.chat_id(),
            generation: self.arena.generation(),
            kind,
        };
        let handle = self.scheduler.schedule(delay(delay_ms), timer);
        self.arena.pending_timers.push((handle, kind));
    }

    fn cancel_timers(&mut self) {
        for handle in self.arena.take_timers() {
            self.scheduler.cancel(handle);
        }
    }
}

/// Per-outcome stakes with display names, largest stakes first.
fn bet_summary(round: &Round, ledger: &crate::ledger::PlayerLedger) -> Vec<OutcomeSummary> {
    Outcome::ALL
        .iter()
        .filter_map(|outcome| {
            let bucket = round.bucket(*outcome).filter(|bucket| !bucket.is_empty())?;
            let mut stakes: Vec<StakeLine> = bucket
                .iter()
                .map(|(player, amount)| StakeLine {
                    player_id: *player,
                    display_name: ledger.display_name(*player),
                    amount: *amount,
                })
                .collect();
            stakes.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.player_id.cmp(&b.player_id)));
            Some(OutcomeSummary {
                outcome: *outcome,
                total: round.outcome_total(*outcome),
                stakes,
            })
        })
        .collect()
}
