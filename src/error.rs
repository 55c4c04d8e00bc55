//! Error types for the engine, the game state machine, the sync layer and
//! the HTTP server.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::engine::Position;
use crate::models::messages::ErrorResponse;

/// Errors raised while validating or applying moves.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Move or square string could not be parsed.
    #[error("invalid notation: {0}")]
    InvalidNotation(String),

    /// No piece on the source square.
    #[error("no piece at {0}")]
    NoPieceAt(Position),

    /// The piece on the source square belongs to the side not on move.
    #[error("not your turn")]
    NotYourTurn,

    /// Move breaks the rules of chess in the current position.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// Game already reached a terminal status.
    #[error("game is already over")]
    GameOver,

    /// A previously submitted move has not been acknowledged yet.
    #[error("a move is already awaiting confirmation")]
    MovePending,

    /// The side has used up its draw offers.
    #[error("draw offer limit reached")]
    DrawOfferLimit,

    /// Accepting or declining with no offer on the table.
    #[error("no draw offer to answer")]
    NoDrawOffer,

    /// A text board diagram was malformed.
    #[error("invalid board diagram: {0}")]
    InvalidDiagram(String),

    /// Time control string could not be understood.
    #[error("invalid time control: {0}")]
    InvalidTimeControl(String),

    /// A move list could not be replayed from the start position.
    #[error("replay failed at ply {ply}: {reason}")]
    ReplayFailed { ply: usize, reason: String },
}

/// Errors from the network layer. None of them are fatal to a game.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("peer channel is not open")]
    ChannelClosed,

    #[error("signaling failed: {0}")]
    Signal(String),
}

/// Errors while reading or writing the local snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejections returned by the game server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("not a player in this game")]
    NotAPlayer,

    #[error("game not found")]
    GameNotFound,

    #[error("stale move number: expected {expected}, got {got}")]
    StaleMove { expected: u32, got: u32 },
}

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotAPlayer => StatusCode::FORBIDDEN,
            Self::GameNotFound => StatusCode::NOT_FOUND,
            Self::StaleMove { .. } => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Result type alias for network operations
pub type SyncResult<T> = Result<T, SyncError>;
