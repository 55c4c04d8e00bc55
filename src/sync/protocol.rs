//! JSON frames exchanged over the peer data channel.
//!
//! Every frame is `{"type": ..., "data": ..., "ts": ...}`. `ping` and
//! `pong` carry only `ts`; a `pong` echoes the `ts` of its `ping`.

use serde::{Deserialize, Serialize};

use crate::engine::{Color, Move};
use crate::error::SyncResult;
use crate::game::state::GameStatus;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Move,
    TimeSync,
    Resign,
    Draw,
    Timeout,
    Ping,
    Pong,
}

#[derive(Serialize, Deserialize, Debug)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: FrameType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ts: Option<u64>,
}

/// Self-sufficient move: the receiver needs nothing else to apply it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveFrame {
    #[serde(rename = "move")]
    pub mv: Move,
    pub white_ms: u64,
    pub black_ms: u64,
    pub game_status: GameStatus,
    pub move_number: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockFrame {
    pub white_ms: u64,
    pub black_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrawAction {
    Offer,
    Accept,
    Decline,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct DrawData {
    action: DrawAction,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct TimeoutData {
    loser_color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerMessage {
    Move(MoveFrame),
    TimeSync(ClockFrame),
    Resign,
    Draw(DrawAction),
    Timeout { loser: Color },
    Ping(u64),
    Pong(u64),
}

impl PeerMessage {
    /// Serialize, stamping `now_ms` unless the frame carries its own ts.
    pub fn encode(&self, now_ms: u64) -> SyncResult<String> {
        let (kind, data, ts) = match self {
            Self::Move(frame) => (FrameType::Move, Some(serde_json::to_value(frame)?), now_ms),
            Self::TimeSync(frame) => (
                FrameType::TimeSync,
                Some(serde_json::to_value(frame)?),
                now_ms,
            ),
            Self::Resign => (FrameType::Resign, None, now_ms),
            Self::Draw(action) => (
                FrameType::Draw,
                Some(serde_json::to_value(DrawData { action: *action })?),
                now_ms,
            ),
            Self::Timeout { loser } => (
                FrameType::Timeout,
                Some(serde_json::to_value(TimeoutData {
                    loser_color: *loser,
                })?),
                now_ms,
            ),
            Self::Ping(ts) => (FrameType::Ping, None, *ts),
            Self::Pong(ts) => (FrameType::Pong, None, *ts),
        };
        let raw = RawFrame {
            kind,
            data,
            ts: Some(ts),
        };
        Ok(serde_json::to_string(&raw)?)
    }

    pub fn decode(text: &str) -> SyncResult<Self> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let data = raw.data.unwrap_or(serde_json::Value::Null);
        let ts = raw.ts.unwrap_or(0);
        Ok(match raw.kind {
            FrameType::Move => Self::Move(serde_json::from_value(data)?),
            FrameType::TimeSync => Self::TimeSync(serde_json::from_value(data)?),
            FrameType::Resign => Self::Resign,
            FrameType::Draw => {
                let draw: DrawData = serde_json::from_value(data)?;
                Self::Draw(draw.action)
            }
            FrameType::Timeout => {
                let timeout: TimeoutData = serde_json::from_value(data)?;
                Self::Timeout {
                    loser: timeout.loser_color,
                }
            }
            FrameType::Ping => Self::Ping(ts),
            FrameType::Pong => Self::Pong(ts),
        })
    }
}
