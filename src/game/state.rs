//! The live game: board, clocks, histories and terminal status.
//!
//! The move list is the source of truth. [`replay_moves`] rebuilds every
//! derived field from it, and [`GameState::make_move`] produces exactly
//! the same fields incrementally.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::{
    Board, BoardState, CastleSide, CastlingRights, Color, Move, Piece, Position, PositionStatus,
};
use crate::error::{GameError, GameResult};

use super::clock::{Clock, TimeControl};

/// Draw offers each side may make per game.
pub const MAX_DRAW_OFFERS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Playing,
    Checkmate,
    Stalemate,
    Draw,
}

impl GameStatus {
    #[must_use]
    pub const fn is_over(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

/// Why a game ended, as reported to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Draw,
    Resign,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEnd {
    pub status: GameStatus,
    pub reason: EndReason,
    pub winner: Option<Color>,
}

impl GameEnd {
    /// A loss for `loser` that counts like checkmate.
    #[must_use]
    pub const fn loss(loser: Color, reason: EndReason) -> Self {
        Self {
            status: GameStatus::Checkmate,
            reason,
            winner: Some(loser.opposite()),
        }
    }

    #[must_use]
    pub const fn draw(status: GameStatus, reason: EndReason) -> Self {
        Self {
            status,
            reason,
            winner: None,
        }
    }

    /// Terminal outcome of a position, if it has one. `mover` just played.
    fn from_position(status: PositionStatus, mover: Color) -> Option<Self> {
        match status {
            PositionStatus::Checkmate => Some(Self::loss(mover.opposite(), EndReason::Checkmate)),
            PositionStatus::Stalemate => {
                Some(Self::draw(GameStatus::Stalemate, EndReason::Stalemate))
            }
            PositionStatus::InsufficientMaterial => {
                Some(Self::draw(GameStatus::Draw, EndReason::Draw))
            }
            PositionStatus::Ongoing | PositionStatus::Check => None,
        }
    }
}

/// What a single accepted move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub mv: Move,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub castle: Option<CastleSide>,
    pub en_passant: bool,
    pub promoted: bool,
    pub check: bool,
    pub status: GameStatus,
}

/// Everything derivable from a move list alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub board: Board,
    pub board_history: Vec<Board>,
    pub current_player: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Position>,
    /// Pieces white has taken.
    pub captured_by_white: Vec<Piece>,
    /// Pieces black has taken.
    pub captured_by_black: Vec<Piece>,
    /// King square of the side to move when it is in check.
    pub check_position: Option<Position>,
    pub status: GameStatus,
    pub end: Option<GameEnd>,
}

/// Rebuild the full position from the start by playing `moves` in order.
///
/// Fails on the first illegal move, naming the ply. Moves after a
/// terminal position are refused too.
pub fn replay_moves(moves: &[Move]) -> GameResult<Replay> {
    let mut state = BoardState::standard();
    let mut board_history = vec![state.board.clone()];
    let mut captured_by_white = Vec::new();
    let mut captured_by_black = Vec::new();
    let mut end = None;

    for (ply, mv) in moves.iter().enumerate() {
        if end.is_some() {
            return Err(GameError::ReplayFailed {
                ply,
                reason: GameError::GameOver.to_string(),
            });
        }
        let mover = state.to_move;
        let (next, effects) = state.play(*mv).map_err(|e| GameError::ReplayFailed {
            ply,
            reason: e.to_string(),
        })?;
        if let Some(piece) = effects.captured {
            match mover {
                Color::White => captured_by_white.push(piece),
                Color::Black => captured_by_black.push(piece),
            }
        }
        board_history.push(next.board.clone());
        end = GameEnd::from_position(next.status(), mover);
        state = next;
    }

    let check_position = if state.in_check() {
        state.board.king_position(state.to_move)
    } else {
        None
    };

    Ok(Replay {
        board: state.board,
        board_history,
        current_player: state.to_move,
        castling: state.castling,
        en_passant: state.en_passant,
        captured_by_white,
        captured_by_black,
        check_position,
        status: end.map_or(GameStatus::Playing, |e| e.status),
        end,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawOffers {
    pub white: u8,
    pub black: u8,
}

impl DrawOffers {
    fn slot(&mut self, color: Color) -> &mut u8 {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

/// Owns the board, clocks and histories of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub position: BoardState,
    pub time_control: TimeControl,
    pub clock: Clock,
    pub move_history: Vec<Move>,
    pub board_history: Vec<Board>,
    pub captured_by_white: Vec<Piece>,
    pub captured_by_black: Vec<Piece>,
    pub check_position: Option<Position>,
    pub status: GameStatus,
    pub end: Option<GameEnd>,
    pub draw_offers: DrawOffers,
}

impl GameState {
    /// Standard start with full clocks.
    #[must_use]
    pub fn new(time_control: TimeControl) -> Self {
        let position = BoardState::standard();
        Self {
            board_history: vec![position.board.clone()],
            position,
            time_control,
            clock: Clock::new(time_control),
            move_history: Vec::new(),
            captured_by_white: Vec::new(),
            captured_by_black: Vec::new(),
            check_position: None,
            status: GameStatus::Playing,
            end: None,
            draw_offers: DrawOffers::default(),
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.position.board
    }

    #[must_use]
    pub const fn current_player(&self) -> Color {
        self.position.to_move
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.status.is_over()
    }

    /// Legal destinations for highlighting; empty once the game is over.
    #[must_use]
    pub fn possible_moves(&self, from: Position) -> Vec<Position> {
        if self.is_over() {
            return Vec::new();
        }
        self.position.possible_moves(from)
    }

    /// Board after `ply` moves, for stepping through history.
    #[must_use]
    pub fn board_at(&self, ply: usize) -> Option<&Board> {
        self.board_history.get(ply)
    }

    /// Validate and apply one move for the side to move.
    pub fn make_move(&mut self, mv: Move) -> GameResult<MoveRecord> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        let mover = self.current_player();
        let (next, effects) = self.position.play(mv)?;

        if let Some(piece) = effects.captured {
            match mover {
                Color::White => self.captured_by_white.push(piece),
                Color::Black => self.captured_by_black.push(piece),
            }
        }
        self.clock.add_increment(mover);
        self.move_history.push(mv);
        self.board_history.push(next.board.clone());

        let position_status = next.status();
        let check = next.in_check();
        self.check_position = if check {
            next.board.king_position(next.to_move)
        } else {
            None
        };
        self.position = next;

        if let Some(end) = GameEnd::from_position(position_status, mover) {
            self.finish(end);
        }
        debug!("{mover} played {mv}, status {:?}", self.status);

        Ok(MoveRecord {
            mv,
            piece: effects.piece,
            captured: effects.captured,
            castle: effects.castle,
            en_passant: effects.en_passant_capture,
            promoted: effects.promoted,
            check,
            status: self.status,
        })
    }

    /// Replace every derived field with the result of replaying `moves`.
    /// Clocks are left to the caller.
    pub fn adopt(&mut self, moves: Vec<Move>, replay: Replay) {
        self.position = BoardState {
            board: replay.board,
            to_move: replay.current_player,
            castling: replay.castling,
            en_passant: replay.en_passant,
        };
        self.move_history = moves;
        self.board_history = replay.board_history;
        self.captured_by_white = replay.captured_by_white;
        self.captured_by_black = replay.captured_by_black;
        self.check_position = replay.check_position;
        self.status = replay.status;
        self.end = replay.end;
    }

    /// Enter a terminal state. Later calls are ignored.
    pub fn finish(&mut self, end: GameEnd) {
        if self.is_over() {
            return;
        }
        info!("game over: {:?} ({:?})", end.status, end.reason);
        self.status = end.status;
        self.end = Some(end);
    }

    pub fn resign(&mut self, color: Color) -> GameResult<GameEnd> {
        self.ensure_playing()?;
        let end = GameEnd::loss(color, EndReason::Resign);
        self.finish(end);
        Ok(end)
    }

    /// Record a draw offer from `color`, at most [`MAX_DRAW_OFFERS`] per side.
    pub fn offer_draw(&mut self, color: Color) -> GameResult<u8> {
        self.ensure_playing()?;
        let used = self.draw_offers.slot(color);
        if *used >= MAX_DRAW_OFFERS {
            return Err(GameError::DrawOfferLimit);
        }
        *used += 1;
        Ok(MAX_DRAW_OFFERS - *used)
    }

    pub fn agree_draw(&mut self) -> GameResult<GameEnd> {
        self.ensure_playing()?;
        let end = GameEnd::draw(GameStatus::Draw, EndReason::Draw);
        self.finish(end);
        Ok(end)
    }

    /// `color` ran out of clock or sat idle too long.
    pub fn time_out(&mut self, color: Color) -> Option<GameEnd> {
        if self.is_over() {
            return None;
        }
        let end = GameEnd::loss(color, EndReason::Timeout);
        self.finish(end);
        Some(end)
    }

    fn ensure_playing(&self) -> GameResult<()> {
        if self.is_over() {
            Err(GameError::GameOver)
        } else {
            Ok(())
        }
    }
}
