//! Chess rules, evaluation and search.
//!
//! Nothing in here performs I/O or keeps state between calls; the game
//! state machine and the network layers build on these pure functions.

pub mod board_state;
pub mod eval;
pub mod material;
pub mod rules;
pub mod search;
pub mod types;

#[cfg(test)]
mod tests;

pub use board_state::{BoardState, PositionStatus};
pub use rules::{
    all_legal_moves, apply_move, in_check, is_checkmate, is_stalemate, legal, possible_moves,
    pseudo_legal, simulate_move, square_under_attack, MoveEffects,
};
pub use search::{choose_move, Difficulty, SearchResult, MATE_SCORE};
pub use types::{
    format_move_list, parse_move_list, Board, CastleSide, CastlingRights, Color, Move, Piece,
    PieceKind, Position,
};
