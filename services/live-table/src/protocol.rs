//! JSON wire format for the WebSocket gateway.

use dicearena_types::{ArenaError, ArenaEvent, ChatId, PlayerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    OpenRound {
        request_id: String,
        chat_id: ChatId,
    },
    Bet {
        request_id: String,
        chat_id: ChatId,
        player_id: PlayerId,
        #[serde(default)]
        display_name: String,
        /// `big`/`small`/`lucky` or their one-letter forms.
        outcome: String,
        /// Omitted for a quick bet.
        amount: Option<u64>,
    },
    StartSequence {
        request_id: String,
        chat_id: ChatId,
        count: u32,
    },
    StopRound {
        request_id: String,
        chat_id: ChatId,
    },
    CancelSequence {
        request_id: String,
        chat_id: ChatId,
    },
    AdjustBalance {
        request_id: String,
        chat_id: ChatId,
        player_id: PlayerId,
        #[serde(default)]
        display_name: String,
        delta: i64,
    },
    RemoveChat {
        request_id: String,
        chat_id: ChatId,
    },
    Leaderboard {
        request_id: String,
        chat_id: ChatId,
        limit: Option<usize>,
    },
    Stats {
        request_id: String,
        chat_id: ChatId,
        player_id: PlayerId,
    },
    History {
        request_id: String,
        chat_id: ChatId,
        limit: Option<usize>,
    },
    Status {
        request_id: String,
        chat_id: ChatId,
    },
}

impl InboundMessage {
    pub fn request_id(&self) -> &str {
        match self {
            InboundMessage::OpenRound { request_id, .. }
            | InboundMessage::Bet { request_id, .. }
            | InboundMessage::StartSequence { request_id, .. }
            | InboundMessage::StopRound { request_id, .. }
            | InboundMessage::CancelSequence { request_id, .. }
            | InboundMessage::AdjustBalance { request_id, .. }
            | InboundMessage::RemoveChat { request_id, .. }
            | InboundMessage::Leaderboard { request_id, .. }
            | InboundMessage::Stats { request_id, .. }
            | InboundMessage::History { request_id, .. }
            | InboundMessage::Status { request_id, .. } => request_id,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    Ack {
        request_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },
    Error {
        request_id: String,
        code: String,
        message: String,
    },
    Event {
        chat_id: ChatId,
        event: ArenaEvent,
    },
}

impl OutboundMessage {
    pub fn ack<T: Serialize>(request_id: String, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => OutboundMessage::Ack {
                request_id,
                result: Some(value),
            },
            Err(err) => OutboundMessage::error(request_id, "INTERNAL", err.to_string()),
        }
    }

    pub fn error(request_id: String, code: &str, message: String) -> Self {
        OutboundMessage::Error {
            request_id,
            code: code.to_string(),
            message,
        }
    }

    pub fn from_arena_error(request_id: String, err: &ArenaError) -> Self {
        OutboundMessage::error(request_id, err.code(), err.to_string())
    }

    pub fn event(event: ArenaEvent) -> Self {
        OutboundMessage::Event {
            chat_id: event.chat_id(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bet_with_and_without_amount() {
        let bet: InboundMessage = serde_json::from_value(json!({
            "type": "bet",
            "requestId": "r1",
            "chatId": -100,
            "playerId": 7,
            "displayName": "alice",
            "outcome": "b",
            "amount": 250
        }))
        .expect("parse");
        assert_eq!(
            bet,
            InboundMessage::Bet {
                request_id: "r1".to_string(),
                chat_id: -100,
                player_id: 7,
                display_name: "alice".to_string(),
                outcome: "b".to_string(),
                amount: Some(250),
            }
        );

        let quick: InboundMessage = serde_json::from_value(json!({
            "type": "bet",
            "requestId": "r2",
            "chatId": -100,
            "playerId": 7,
            "outcome": "lucky"
        }))
        .expect("parse");
        let InboundMessage::Bet { amount, display_name, .. } = quick else {
            panic!("expected bet");
        };
        assert_eq!(amount, None);
        assert_eq!(display_name, "");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed = serde_json::from_value::<InboundMessage>(json!({
            "type": "join",
            "requestId": "r1"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_error_shape() {
        let message =
            OutboundMessage::from_arena_error("r9".to_string(), &ArenaError::BettingClosed);
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "error",
                "requestId": "r9",
                "code": "BETTING_CLOSED",
                "message": "betting is closed for this round"
            })
        );
    }

    #[test]
    fn test_event_envelope() {
        let message = OutboundMessage::event(ArenaEvent::SequenceCompleted {
            chat_id: -5,
            sequence_id: 2,
            total: 3,
        });
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["type"], "event");
        assert_eq!(value["chatId"], -5);
        assert_eq!(value["event"]["type"], "sequence_completed");
        assert_eq!(value["event"]["sequenceId"], 2);
    }
}
