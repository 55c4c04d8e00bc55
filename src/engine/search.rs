//! Computer opponent: minimax with alpha-beta pruning.
//!
//! All randomness comes from the caller's RNG so a seeded generator
//! reproduces every choice, including the medium-level move sampling.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::debug;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board_state::BoardState;
use super::eval::{evaluate, piece_value};
use super::rules;
use super::types::{Color, Move};
use crate::error::GameError;

/// Score of delivering mate at the root; shorter mates score higher.
pub const MATE_SCORE: i32 = 1_000_000;
const INF: i32 = i32::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Master,
}

impl Difficulty {
    /// Search depth in plies. Easy never searches.
    #[must_use]
    pub const fn depth(self) -> u8 {
        match self {
            Self::Easy => 0,
            Self::Medium | Self::Hard => 2,
            Self::Master => 4,
        }
    }

    /// Half-width of the uniform noise added to each root score.
    #[must_use]
    pub const fn noise(self) -> i32 {
        match self {
            Self::Easy => 0,
            Self::Medium | Self::Hard => 20,
            Self::Master => 2,
        }
    }

    /// How long the bot pretends to think before playing.
    #[must_use]
    pub const fn think_delay(self) -> Duration {
        match self {
            Self::Easy => Duration::from_millis(1200),
            Self::Medium => Duration::from_millis(900),
            Self::Hard => Duration::from_millis(700),
            Self::Master => Duration::from_millis(500),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Master => "master",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "master" => Ok(Self::Master),
            other => Err(GameError::InvalidNotation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub best: Move,
    /// Noise-free minimax score from the mover's perspective.
    pub score: i32,
}

/// Pick a move for the side to move at the given difficulty.
pub fn choose_move<R: Rng + ?Sized>(
    state: &BoardState,
    difficulty: Difficulty,
    rng: &mut R,
) -> Option<Move> {
    let mut moves = state.legal_moves();
    if moves.is_empty() {
        return None;
    }
    match difficulty {
        Difficulty::Easy => moves.choose(rng).copied(),
        Difficulty::Medium => {
            moves.shuffle(rng);
            moves.truncate(moves.len().div_ceil(2));
            search_best(state, &moves, difficulty.depth(), difficulty.noise(), rng)
                .map(|r| r.best)
        }
        Difficulty::Hard | Difficulty::Master => {
            search_best(state, &moves, difficulty.depth(), difficulty.noise(), rng)
                .map(|r| r.best)
        }
    }
}

/// Root search restricted to `candidates`.
///
/// Children are searched with alpha held `2 * noise` below the best raw
/// score, so any move that could still win after noise gets an exact score.
pub fn search_best<R: Rng + ?Sized>(
    state: &BoardState,
    candidates: &[Move],
    depth: u8,
    noise: i32,
    rng: &mut R,
) -> Option<SearchResult> {
    let root = state.to_move;
    let mut best: Option<SearchResult> = None;
    let mut best_noisy = i32::MIN;
    let mut best_raw = -INF;

    for mv in ordered(state, candidates) {
        let Some((child, _)) = state.play_unchecked(mv) else {
            continue;
        };
        let alpha = best_raw.saturating_sub(2 * noise + 1).max(-INF);
        let score = minimax(&child, depth.saturating_sub(1), alpha, INF, root, 1);
        let jitter = if noise > 0 {
            rng.random_range(-noise..=noise)
        } else {
            0
        };
        let noisy = score + jitter;
        if best.is_none() || noisy > best_noisy {
            best_noisy = noisy;
            best = Some(SearchResult { best: mv, score });
        }
        best_raw = best_raw.max(score);
    }

    if let Some(result) = &best {
        debug!(
            "search depth {depth} picked {} (score {}) from {} candidates",
            result.best,
            result.score,
            candidates.len()
        );
    }
    best
}

fn terminal_score(state: &BoardState, root: Color, ply: i32) -> i32 {
    if !state.in_check() {
        return 0;
    }
    if state.to_move == root {
        -(MATE_SCORE - ply)
    } else {
        MATE_SCORE - ply
    }
}

fn minimax(
    state: &BoardState,
    depth: u8,
    mut alpha: i32,
    mut beta: i32,
    root: Color,
    ply: i32,
) -> i32 {
    if depth == 0 {
        let can_move = rules::has_legal_move(
            &state.board,
            state.to_move,
            &state.castling,
            state.en_passant,
        );
        return if can_move {
            evaluate(&state.board, root)
        } else {
            terminal_score(state, root, ply)
        };
    }

    let moves = state.legal_moves();
    if moves.is_empty() {
        return terminal_score(state, root, ply);
    }

    let maximizing = state.to_move == root;
    let mut value = if maximizing { -INF } else { INF };
    for mv in ordered(state, &moves) {
        let Some((child, _)) = state.play_unchecked(mv) else {
            continue;
        };
        let score = minimax(&child, depth - 1, alpha, beta, root, ply + 1);
        if maximizing {
            value = value.max(score);
            alpha = alpha.max(value);
        } else {
            value = value.min(score);
            beta = beta.min(value);
        }
        if alpha >= beta {
            break;
        }
    }
    value
}

/// Captures first, most valuable victim first; otherwise board order.
fn ordered(state: &BoardState, moves: &[Move]) -> Vec<Move> {
    let mut out = moves.to_vec();
    out.sort_by_key(|mv| {
        Reverse(
            state
                .board
                .get(mv.to)
                .map_or(0, |victim| piece_value(victim.kind)),
        )
    });
    out
}
