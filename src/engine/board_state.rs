//! Full position: board plus side to move, castling rights and en passant.

use serde::{Deserialize, Serialize};

use super::material::has_insufficient_material;
use super::rules::{self, MoveEffects};
use super::types::{Board, CastleSide, CastlingRights, Color, Move, Piece, PieceKind, Position};
use crate::error::{GameError, GameResult};

/// Terminal or ongoing verdict for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Ongoing,
    Check,
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

impl PositionStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Checkmate | Self::Stalemate | Self::InsufficientMaterial
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardState {
    pub board: Board,
    pub to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Position>,
}

impl BoardState {
    /// Standard start, white to move.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            board: Board::standard(),
            to_move: Color::White,
            castling: CastlingRights::ALL,
            en_passant: None,
        }
    }

    /// Wrap an arbitrary board, granting castling rights only where king
    /// and rook still stand on their home squares.
    #[must_use]
    pub fn from_board(board: Board, to_move: Color) -> Self {
        let mut castling = CastlingRights::ALL;
        for color in [Color::White, Color::Black] {
            let row = color.back_rank();
            let king_home = board.get(Position::new(row, 4))
                == Some(Piece::new(PieceKind::King, color));
            for side in [CastleSide::King, CastleSide::Queen] {
                let rook_home = board.get(Position::new(row, side.rook_home_col()))
                    == Some(Piece::new(PieceKind::Rook, color));
                if !(king_home && rook_home) {
                    castling.revoke(color, side);
                }
            }
        }
        Self {
            board,
            to_move,
            castling,
            en_passant: None,
        }
    }

    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        rules::all_legal_moves(&self.board, self.to_move, &self.castling, self.en_passant)
    }

    #[must_use]
    pub fn possible_moves(&self, from: Position) -> Vec<Position> {
        rules::possible_moves(&self.board, from, &self.castling, self.en_passant)
    }

    #[must_use]
    pub fn is_legal(&self, mv: Move) -> bool {
        match self.board.get(mv.from) {
            Some(piece) if piece.color == self.to_move => rules::legal(
                &self.board,
                mv.from,
                mv.to,
                piece,
                &self.castling,
                self.en_passant,
            ),
            _ => false,
        }
    }

    #[must_use]
    pub fn in_check(&self) -> bool {
        rules::in_check(&self.board, self.to_move)
    }

    /// Validate `mv` for the side to move and return the resulting position.
    pub fn play(&self, mv: Move) -> GameResult<(Self, MoveEffects)> {
        let piece = self.board.get(mv.from).ok_or(GameError::NoPieceAt(mv.from))?;
        if piece.color != self.to_move {
            return Err(GameError::NotYourTurn);
        }
        if !self.is_legal(mv) {
            return Err(GameError::IllegalMove(mv.to_string()));
        }
        self.play_unchecked(mv)
            .ok_or(GameError::NoPieceAt(mv.from))
    }

    /// Apply a move already known to be legal.
    #[must_use]
    pub fn play_unchecked(&self, mv: Move) -> Option<(Self, MoveEffects)> {
        let (board, effects) = rules::apply_move(&self.board, mv, self.en_passant)?;
        let next = Self {
            board,
            to_move: self.to_move.opposite(),
            castling: self.castling.after_move(effects.piece, mv),
            en_passant: rules::next_en_passant_target(effects.piece, mv),
        };
        Some((next, effects))
    }

    /// Verdict for the side to move.
    #[must_use]
    pub fn status(&self) -> PositionStatus {
        let check = self.in_check();
        let can_move =
            rules::has_legal_move(&self.board, self.to_move, &self.castling, self.en_passant);
        match (check, can_move) {
            (true, false) => PositionStatus::Checkmate,
            (false, false) => PositionStatus::Stalemate,
            _ if has_insufficient_material(&self.board) => PositionStatus::InsufficientMaterial,
            (true, true) => PositionStatus::Check,
            (false, true) => PositionStatus::Ongoing,
        }
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::standard()
    }
}
