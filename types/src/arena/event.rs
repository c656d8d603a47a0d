use std::collections::BTreeMap;

use serde::Serialize;

use super::{Dice, Outcome};
use crate::{ChatId, MatchId, PlayerId};

/// One player's stake on one outcome, resolved for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeLine {
    pub player_id: PlayerId,
    pub display_name: String,
    pub amount: u64,
}

/// Everything staked on one outcome when betting closed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSummary {
    pub outcome: Outcome,
    pub total: u64,
    /// Largest stakes first.
    pub stakes: Vec<StakeLine>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceProgress {
    pub sequence_id: u64,
    /// Rounds already settled before this one.
    pub completed: u32,
    pub total: u32,
}

/// Round lifecycle notifications, consumed by whatever renders them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ArenaEvent {
    RoundOpened {
        chat_id: ChatId,
        match_id: MatchId,
        betting_ms: u64,
        sequence: Option<SequenceProgress>,
    },
    BettingClosed {
        chat_id: ChatId,
        match_id: MatchId,
        summary: Vec<OutcomeSummary>,
        roll_in_ms: u64,
    },
    RoundSettled {
        chat_id: ChatId,
        match_id: MatchId,
        dice: Dice,
        total: u8,
        winning_outcome: Outcome,
        multiplier: u64,
        payouts: BTreeMap<PlayerId, u64>,
        losers: Vec<PlayerId>,
        fallback_dice: bool,
    },
    RoundRefunded {
        chat_id: ChatId,
        match_id: MatchId,
        refunds: BTreeMap<PlayerId, u64>,
    },
    SequenceStarted {
        chat_id: ChatId,
        sequence_id: u64,
        total: u32,
        starts_in_ms: u64,
    },
    SequenceAdvanced {
        chat_id: ChatId,
        sequence_id: u64,
        completed: u32,
        total: u32,
        next_in_ms: u64,
    },
    SequenceAutoStopped {
        chat_id: ChatId,
        sequence_id: u64,
        completed: u32,
        total: u32,
        idle_streak: u32,
    },
    SequenceCompleted {
        chat_id: ChatId,
        sequence_id: u64,
        total: u32,
    },
    SequenceCancelled {
        chat_id: ChatId,
        sequence_id: u64,
        completed: u32,
        total: u32,
    },
}

impl ArenaEvent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            ArenaEvent::RoundOpened { chat_id, .. }
            | ArenaEvent::BettingClosed { chat_id, .. }
            | ArenaEvent::RoundSettled { chat_id, .. }
            | ArenaEvent::RoundRefunded { chat_id, .. }
            | ArenaEvent::SequenceStarted { chat_id, .. }
            | ArenaEvent::SequenceAdvanced { chat_id, .. }
            | ArenaEvent::SequenceAutoStopped { chat_id, .. }
            | ArenaEvent::SequenceCompleted { chat_id, .. }
            | ArenaEvent::SequenceCancelled { chat_id, .. } => *chat_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArenaEvent::RoundOpened { .. } => "round_opened",
            ArenaEvent::BettingClosed { .. } => "betting_closed",
            ArenaEvent::RoundSettled { .. } => "round_settled",
            ArenaEvent::RoundRefunded { .. } => "round_refunded",
            ArenaEvent::SequenceStarted { .. } => "sequence_started",
            ArenaEvent::SequenceAdvanced { .. } => "sequence_advanced",
            ArenaEvent::SequenceAutoStopped { .. } => "sequence_auto_stopped",
            ArenaEvent::SequenceCompleted { .. } => "sequence_completed",
            ArenaEvent::SequenceCancelled { .. } => "sequence_cancelled",
        }
    }
}
