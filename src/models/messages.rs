use serde::{Deserialize, Serialize};

use crate::engine::{Color, Move};
use crate::game::clock::TimeControl;
use crate::game::state::{EndReason, GameStatus};

/// Server-side lifecycle of an online game.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Playing,
    Finished,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RematchStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Offer,
    Answer,
    Ice,
}

/// A relayed peer signal waiting for its addressee.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignalEnvelope {
    pub from: String,
    #[serde(rename = "type")]
    pub kind: SignalType,
    pub data: String,
}

/// Answer to `GET /api/online-move`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PollResponse {
    pub game_id: String,
    pub white_user_id: String,
    pub black_user_id: String,
    pub time_control: TimeControl,
    pub status: ServerStatus,
    pub current_player: Color,
    /// Seconds left, net of the running side's thinking time.
    pub white_time: u64,
    pub black_time: u64,
    /// Comma-joined move list.
    pub move_history: String,
    pub move_number: u32,
    pub winner: Option<String>,
    pub end_reason: Option<EndReason>,
    pub seconds_since_move: u64,
    pub rematch_offered_by: Option<String>,
    pub rematch_status: Option<RematchStatus>,
    pub rematch_game_id: Option<String>,
    #[serde(default)]
    pub signals: Vec<SignalEnvelope>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PollQuery {
    pub game_id: String,
    pub user_id: String,
}

/// Identifies the game and the acting player.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerRef {
    pub game_id: String,
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveSubmission {
    pub game_id: String,
    pub user_id: String,
    #[serde(rename = "move")]
    pub mv: Move,
    pub game_status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub move_number: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignalRequest {
    pub game_id: String,
    pub user_id: String,
    pub signal_type: SignalType,
    pub signal_data: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TimeoutReport {
    pub game_id: String,
    pub user_id: String,
    pub loser_color: Color,
}

/// Body of `POST /api/online-move`, discriminated by `action`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    Move(MoveSubmission),
    Signal(SignalRequest),
    Timeout(TimeoutReport),
    Resign(PlayerRef),
    Draw(PlayerRef),
    OfferRematch(PlayerRef),
    AcceptRematch(PlayerRef),
    DeclineRematch(PlayerRef),
}

impl ActionRequest {
    pub fn game_id(&self) -> &str {
        match self {
            Self::Move(m) => &m.game_id,
            Self::Signal(s) => &s.game_id,
            Self::Timeout(t) => &t.game_id,
            Self::Resign(p)
            | Self::Draw(p)
            | Self::OfferRematch(p)
            | Self::AcceptRematch(p)
            | Self::DeclineRematch(p) => &p.game_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::Move(m) => &m.user_id,
            Self::Signal(s) => &s.user_id,
            Self::Timeout(t) => &t.user_id,
            Self::Resign(p)
            | Self::Draw(p)
            | Self::OfferRematch(p)
            | Self::AcceptRematch(p)
            | Self::DeclineRematch(p) => &p.user_id,
        }
    }
}

/// Reply to any action. Only the fields relevant to the action are set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<EndReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_color: Option<Color>,
}

impl ActionResponse {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateGameRequest {
    pub white_user_id: String,
    pub black_user_id: String,
    #[serde(default)]
    pub time_control: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateGameResponse {
    pub game_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_submission_wire_shape() {
        let req = ActionRequest::Move(MoveSubmission {
            game_id: "g1".into(),
            user_id: "u1".into(),
            mv: "e2-e4".parse().unwrap(),
            game_status: GameStatus::Playing,
            winner_id: None,
            move_number: 1,
        });
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "action": "move",
                "game_id": "g1",
                "user_id": "u1",
                "move": "e2-e4",
                "game_status": "playing",
                "move_number": 1
            })
        );
        assert_eq!(req.game_id(), "g1");
    }

    #[test]
    fn test_rematch_and_timeout_actions_parse() {
        let offer: ActionRequest =
            serde_json::from_str(r#"{"action":"offer_rematch","game_id":"g","user_id":"u"}"#)
                .unwrap();
        assert!(matches!(offer, ActionRequest::OfferRematch(_)));
        let timeout: ActionRequest = serde_json::from_str(
            r#"{"action":"timeout","game_id":"g","user_id":"u","loser_color":"black"}"#,
        )
        .unwrap();
        assert_eq!(
            timeout,
            ActionRequest::Timeout(TimeoutReport {
                game_id: "g".into(),
                user_id: "u".into(),
                loser_color: Color::Black,
            })
        );
    }

    #[test]
    fn test_signal_request_wire_shape() {
        let req = ActionRequest::Signal(SignalRequest {
            game_id: "g".into(),
            user_id: "u".into(),
            signal_type: SignalType::Ice,
            signal_data: "{}".into(),
        });
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["action"], "signal");
        assert_eq!(value["signal_type"], "ice");
    }
}
