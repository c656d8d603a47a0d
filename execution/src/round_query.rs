//! Read-only views over an arena.
//!
//! - [`player_stats`]: one player's balance and record
//! - [`leaderboard`]: active players ranked by balance
//! - [`recent_history`]: newest settled rounds first
//! - [`round_status`]: the live round and sequence, if any

use std::collections::BTreeMap;

use dicearena_types::{
    ArenaConfig, MatchHistoryEntry, MatchId, Outcome, PlayerAccount, PlayerId, RoundState,
    SequenceProgress,
};
use serde::Serialize;

use crate::arena::ChatArena;

/// One player's standing, as shown by a stats command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub display_name: String,
    pub balance: u64,
    pub wins: u64,
    pub losses: u64,
    pub games_played: u64,
    /// Wins per thousand settled rounds played.
    pub win_rate_permille: u64,
    pub last_active_at_ms: u64,
}

impl From<&PlayerAccount> for PlayerStats {
    fn from(account: &PlayerAccount) -> Self {
        let games_played = account.games_played();
        let win_rate_permille = if games_played == 0 {
            0
        } else {
            account.wins.saturating_mul(1_000) / games_played
        };
        Self {
            player_id: account.id,
            display_name: account.display_name.clone(),
            balance: account.balance,
            wins: account.wins,
            losses: account.losses,
            games_played,
            win_rate_permille,
            last_active_at_ms: account.last_active_at_ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based.
    pub rank: usize,
    pub player_id: PlayerId,
    pub display_name: String,
    pub balance: u64,
    pub wins: u64,
    pub losses: u64,
}

/// Snapshot of the live round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub match_id: MatchId,
    pub state: RoundState,
    pub outcome_totals: BTreeMap<Outcome, u64>,
    pub participant_count: usize,
    pub opened_at_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStatus {
    pub round: Option<RoundSnapshot>,
    pub sequence: Option<SequenceProgress>,
    pub idle_streak: u32,
    pub next_match_id: MatchId,
}

pub fn player_stats(arena: &ChatArena, player: PlayerId) -> Option<PlayerStats> {
    arena.ledger().get(player).map(PlayerStats::from)
}

/// Players who have played or whose balance moved, richest first.
///
/// Ties are broken by player id so the order is stable.
pub fn leaderboard(arena: &ChatArena, config: &ArenaConfig, limit: usize) -> Vec<LeaderboardEntry> {
    let mut active: Vec<&PlayerAccount> = arena
        .ledger()
        .iter()
        .filter(|account| account.games_played() > 0 || account.balance != config.initial_balance)
        .collect();
    active.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.id.cmp(&b.id)));
    active
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, account)| LeaderboardEntry {
            rank: index + 1,
            player_id: account.id,
            display_name: account.display_name.clone(),
            balance: account.balance,
            wins: account.wins,
            losses: account.losses,
        })
        .collect()
}

/// Up to `limit` settled rounds, newest first.
pub fn recent_history(arena: &ChatArena, limit: usize) -> Vec<MatchHistoryEntry> {
    arena.history().rev().take(limit).cloned().collect()
}

pub fn round_status(arena: &ChatArena) -> RoundStatus {
    let round = arena.current_round().map(|round| RoundSnapshot {
        match_id: round.match_id,
        state: round.state(),
        outcome_totals: Outcome::ALL
            .iter()
            .map(|outcome| (*outcome, round.outcome_total(*outcome)))
            .collect(),
        participant_count: round.participants().len(),
        opened_at_ms: round.created_at_ms,
    });
    RoundStatus {
        round,
        sequence: arena.sequence().map(|sequence| sequence.progress()),
        idle_streak: arena.idle_streak(),
        next_match_id: arena.next_match_id(),
    }
}
