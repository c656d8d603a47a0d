//! WebSocket gateway: JSON commands in, acks and arena events out.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use dicearena_execution::{leaderboard, player_stats, recent_history, round_status};
use dicearena_types::{ArenaError, Outcome, LEADERBOARD_SIZE, RECENT_HISTORY_SIZE};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::now_ms;
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::registry::ArenaRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ArenaRegistry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumState(state): AxumState<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let mut events = state.registry.subscribe();

    let write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let event_task = {
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => send(&tx, &OutboundMessage::event(event)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<InboundMessage>(&text) {
                Ok(inbound) => {
                    let response = handle_inbound(inbound, &state.registry, now_ms());
                    send(&tx, &response);
                }
                Err(err) => {
                    warn!(?err, "invalid inbound message");
                    send(
                        &tx,
                        &OutboundMessage::error(String::new(), "INVALID_MESSAGE", err.to_string()),
                    );
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    write_task.abort();
    event_task.abort();
    debug!("socket closed");
}

fn send(tx: &mpsc::UnboundedSender<Message>, message: &OutboundMessage) {
    if let Ok(payload) = serde_json::to_string(message) {
        let _ = tx.send(Message::Text(payload));
    }
}

fn respond<T: serde::Serialize>(
    request_id: String,
    result: Result<T, ArenaError>,
) -> OutboundMessage {
    match result {
        Ok(value) => OutboundMessage::ack(request_id, &value),
        Err(err) => {
            debug!(code = err.code(), %err, "command rejected");
            OutboundMessage::from_arena_error(request_id, &err)
        }
    }
}

/// Execute one inbound command against the registry.
///
/// Never awaits; every arena step finishes before this returns.
pub fn handle_inbound(
    inbound: InboundMessage,
    registry: &ArenaRegistry,
    now_ms: u64,
) -> OutboundMessage {
    match inbound {
        InboundMessage::OpenRound {
            request_id,
            chat_id,
        } => {
            info!(chat_id, "open_round requested");
            respond(request_id, registry.open_round(chat_id, now_ms))
        }
        InboundMessage::Bet {
            request_id,
            chat_id,
            player_id,
            display_name,
            outcome,
            amount,
        } => {
            let outcome = match outcome.parse::<Outcome>() {
                Ok(outcome) => outcome,
                Err(err) => {
                    return OutboundMessage::error(request_id, "INVALID_OUTCOME", err.to_string())
                }
            };
            let amount = amount.unwrap_or(registry.config().quick_bet_amount);
            respond(
                request_id,
                registry.place_bet(chat_id, player_id, &display_name, outcome, amount, now_ms),
            )
        }
        InboundMessage::StartSequence {
            request_id,
            chat_id,
            count,
        } => respond(request_id, registry.start_sequence(chat_id, count)),
        InboundMessage::StopRound {
            request_id,
            chat_id,
        } => respond(request_id, registry.stop_round(chat_id, now_ms)),
        InboundMessage::CancelSequence {
            request_id,
            chat_id,
        } => respond(request_id, registry.cancel_sequence(chat_id)),
        InboundMessage::AdjustBalance {
            request_id,
            chat_id,
            player_id,
            display_name,
            delta,
        } => respond(
            request_id,
            registry.adjust_balance(chat_id, player_id, &display_name, delta, now_ms),
        ),
        InboundMessage::RemoveChat {
            request_id,
            chat_id,
        } => {
            let removed = registry.remove_chat(chat_id);
            OutboundMessage::ack(request_id, &json!({ "removed": removed }))
        }
        InboundMessage::Leaderboard {
            request_id,
            chat_id,
            limit,
        } => {
            let limit = limit.unwrap_or(LEADERBOARD_SIZE);
            respond(
                request_id,
                registry.query(chat_id, |arena| leaderboard(arena, registry.config(), limit)),
            )
        }
        InboundMessage::Stats {
            request_id,
            chat_id,
            player_id,
        } => respond(
            request_id,
            registry.query(chat_id, |arena| player_stats(arena, player_id)),
        ),
        InboundMessage::History {
            request_id,
            chat_id,
            limit,
        } => {
            let limit = limit.unwrap_or(RECENT_HISTORY_SIZE);
            respond(
                request_id,
                registry.query(chat_id, |arena| recent_history(arena, limit)),
            )
        }
        InboundMessage::Status {
            request_id,
            chat_id,
        } => respond(request_id, registry.query(chat_id, round_status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicearena_execution::mocks::ManualScheduler;
    use dicearena_execution::PrefetchedDice;
    use dicearena_types::ArenaConfig;

    fn setup() -> (ArenaRegistry, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let registry = ArenaRegistry::new(ArenaConfig::default(), None, scheduler.clone(), 64);
        (registry, scheduler)
    }

    fn parse(value: serde_json::Value) -> InboundMessage {
        serde_json::from_value(value).expect("valid inbound")
    }

    fn result(message: OutboundMessage) -> serde_json::Value {
        match message {
            OutboundMessage::Ack { result, .. } => result.unwrap_or_default(),
            other => panic!("expected ack, got {other:?}"),
        }
    }

    fn error_code(message: OutboundMessage) -> String {
        match message {
            OutboundMessage::Error { code, .. } => code,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_quick_bet_uses_configured_amount() {
        let (registry, _) = setup();
        let opened = handle_inbound(
            parse(json!({"type": "open_round", "requestId": "1", "chatId": -1})),
            &registry,
            0,
        );
        assert_eq!(result(opened)["matchId"], 1);

        let bet = handle_inbound(
            parse(json!({
                "type": "bet",
                "requestId": "2",
                "chatId": -1,
                "playerId": 5,
                "outcome": "S"
            })),
            &registry,
            1,
        );
        let bet = result(bet);
        assert_eq!(bet["stake"], 100);
        assert_eq!(bet["balance"], 900);
        assert_eq!(bet["outcome"], "small");
    }

    #[test]
    fn test_errors_carry_codes() {
        let (registry, _) = setup();
        let no_round = handle_inbound(
            parse(json!({
                "type": "bet",
                "requestId": "1",
                "chatId": -1,
                "playerId": 5,
                "outcome": "big",
                "amount": 10
            })),
            &registry,
            0,
        );
        assert_eq!(error_code(no_round), "NO_ACTIVE_ROUND");

        let bad_outcome = handle_inbound(
            parse(json!({
                "type": "bet",
                "requestId": "2",
                "chatId": -1,
                "playerId": 5,
                "outcome": "seven"
            })),
            &registry,
            0,
        );
        assert_eq!(error_code(bad_outcome), "INVALID_OUTCOME");

        let too_long = handle_inbound(
            parse(json!({"type": "start_sequence", "requestId": "3", "chatId": -1, "count": 50})),
            &registry,
            0,
        );
        assert_eq!(error_code(too_long), "SEQUENCE_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_round_then_queries() {
        let (registry, scheduler) = setup();
        handle_inbound(
            parse(json!({"type": "open_round", "requestId": "1", "chatId": -1})),
            &registry,
            0,
        );
        handle_inbound(
            parse(json!({
                "type": "bet",
                "requestId": "2",
                "chatId": -1,
                "playerId": 5,
                "displayName": "eve",
                "outcome": "big",
                "amount": 300
            })),
            &registry,
            1,
        );

        let status = result(handle_inbound(
            parse(json!({"type": "status", "requestId": "3", "chatId": -1})),
            &registry,
            2,
        ));
        assert_eq!(status["round"]["state"], "open");
        assert_eq!(status["round"]["outcomeTotals"]["big"], 300);

        while let Some((now, timer)) = scheduler.pop_next() {
            registry.fire(timer, PrefetchedDice::new(Ok(5), Ok(6)), now);
        }

        let stats = result(handle_inbound(
            parse(json!({"type": "stats", "requestId": "4", "chatId": -1, "playerId": 5})),
            &registry,
            3,
        ));
        assert_eq!(stats["balance"], 1_300);
        assert_eq!(stats["wins"], 1);
        assert_eq!(stats["displayName"], "eve");

        let board = result(handle_inbound(
            parse(json!({"type": "leaderboard", "requestId": "5", "chatId": -1})),
            &registry,
            3,
        ));
        assert_eq!(board[0]["playerId"], 5);

        let history = result(handle_inbound(
            parse(json!({"type": "history", "requestId": "6", "chatId": -1, "limit": 1})),
            &registry,
            3,
        ));
        assert_eq!(history[0]["result"], 11);
        assert_eq!(history[0]["winningOutcome"], "big");
    }

    #[test]
    fn test_stop_and_remove() {
        let (registry, scheduler) = setup();
        handle_inbound(
            parse(json!({"type": "open_round", "requestId": "1", "chatId": -1})),
            &registry,
            0,
        );
        handle_inbound(
            parse(json!({
                "type": "bet",
                "requestId": "2",
                "chatId": -1,
                "playerId": 5,
                "outcome": "l",
                "amount": 40
            })),
            &registry,
            1,
        );
        let refunds = result(handle_inbound(
            parse(json!({"type": "stop_round", "requestId": "3", "chatId": -1})),
            &registry,
            2,
        ));
        assert_eq!(refunds["5"], 40);
        assert_eq!(scheduler.pending_count(), 0);

        let removed = result(handle_inbound(
            parse(json!({"type": "remove_chat", "requestId": "4", "chatId": -1})),
            &registry,
            3,
        ));
        assert_eq!(removed["removed"], true);
        assert_eq!(registry.chat_count(), 0);
    }
}
