//! Move legality: movement patterns, king safety and termination checks.
//!
//! Every function here is pure. Callers pass castling rights and the
//! en-passant target explicitly; attack detection ignores both.

use super::types::{Board, CastleSide, CastlingRights, Color, Move, Piece, PieceKind, Position};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const ORTHOGONALS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Side effects a move had beyond relocating the moving piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEffects {
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub castle: Option<CastleSide>,
    pub en_passant_capture: bool,
    pub promoted: bool,
}

fn deltas(from: Position, to: Position) -> (i8, i8) {
    (
        to.row as i8 - from.row as i8,
        to.col as i8 - from.col as i8,
    )
}

/// True when every square strictly between `from` and `to` is empty.
/// Only meaningful for straight or diagonal lines.
fn path_clear(board: &Board, from: Position, to: Position) -> bool {
    let (dr, dc) = deltas(from, to);
    let (sr, sc) = (dr.signum(), dc.signum());
    let mut cursor = from.offset(sr, sc);
    while let Some(pos) = cursor {
        if pos == to {
            return true;
        }
        if !board.is_empty(pos) {
            return false;
        }
        cursor = pos.offset(sr, sc);
    }
    false
}

/// Whether `piece` on `from` hits `to`, regardless of what stands there.
/// Pawns hit only their two forward diagonals.
fn attacks(board: &Board, from: Position, to: Position, piece: Piece) -> bool {
    let (dr, dc) = deltas(from, to);
    if dr == 0 && dc == 0 {
        return false;
    }
    match piece.kind {
        PieceKind::Pawn => dr == piece.color.pawn_direction() && dc.abs() == 1,
        PieceKind::Knight => matches!((dr.abs(), dc.abs()), (1, 2) | (2, 1)),
        PieceKind::King => dr.abs() <= 1 && dc.abs() <= 1,
        PieceKind::Bishop => dr.abs() == dc.abs() && path_clear(board, from, to),
        PieceKind::Rook => (dr == 0 || dc == 0) && path_clear(board, from, to),
        PieceKind::Queen => {
            (dr == 0 || dc == 0 || dr.abs() == dc.abs()) && path_clear(board, from, to)
        }
    }
}

/// Castling wing if `from`-`to` is a castle the flags and board allow,
/// ignoring attacks on the king's path.
fn castle_pattern(
    board: &Board,
    from: Position,
    to: Position,
    piece: Piece,
    castling: &CastlingRights,
) -> Option<CastleSide> {
    let side = CastleSide::from_king_move(Move::new(from, to))?;
    let row = piece.color.back_rank();
    if from.row != row || !castling.allows(piece.color, side) {
        return None;
    }
    let rook_home = Position::new(row, side.rook_home_col());
    if board.get(rook_home) != Some(Piece::new(PieceKind::Rook, piece.color)) {
        return None;
    }
    let between = match side {
        CastleSide::King => 5..=6,
        CastleSide::Queen => 1..=3,
    };
    between
        .map(|col| Position::new(row, col))
        .all(|pos| board.is_empty(pos))
        .then_some(side)
}

/// Movement-pattern check without regard to the mover's own king.
pub fn pseudo_legal(
    board: &Board,
    from: Position,
    to: Position,
    piece: Piece,
    castling: &CastlingRights,
    en_passant: Option<Position>,
) -> bool {
    if from == to {
        return false;
    }
    let target = board.get(to);
    if target.is_some_and(|t| t.color == piece.color) {
        return false;
    }

    match piece.kind {
        PieceKind::Pawn => {
            let dir = piece.color.pawn_direction();
            let (dr, dc) = deltas(from, to);
            if dc == 0 && target.is_none() {
                if dr == dir {
                    return true;
                }
                if from.row == piece.color.pawn_start_row() && dr == dir * 2 {
                    return from.offset(dir, 0).is_some_and(|mid| board.is_empty(mid));
                }
                return false;
            }
            if dc.abs() != 1 || dr != dir {
                return false;
            }
            if target.is_some() {
                return true;
            }
            // En passant: target square empty, enemy pawn beside us.
            en_passant == Some(to)
                && board.get(Position::new(from.row, to.col))
                    == Some(Piece::new(PieceKind::Pawn, piece.color.opposite()))
        }
        PieceKind::King => {
            attacks(board, from, to, piece)
                || castle_pattern(board, from, to, piece, castling).is_some()
        }
        _ => attacks(board, from, to, piece),
    }
}

/// Relocate a piece, moving the rook along when the king castles.
/// En-passant removal and promotion are left to [`apply_move`].
#[must_use]
pub fn simulate_move(board: &Board, from: Position, to: Position) -> Board {
    let mut next = board.clone();
    let Some(piece) = next.take(from) else {
        return next;
    };
    next.set(to, Some(piece));
    if piece.kind == PieceKind::King {
        if let Some(side) = CastleSide::from_king_move(Move::new(from, to)) {
            let rook = next.take(Position::new(from.row, side.rook_home_col()));
            next.set(Position::new(from.row, side.transit_col()), rook);
        }
    }
    next
}

/// The one authoritative board transition: relocation, castling rook,
/// en-passant pawn removal and auto-queen promotion.
///
/// Returns `None` when `mv.from` is empty. Legality is not checked.
#[must_use]
pub fn apply_move(
    board: &Board,
    mv: Move,
    en_passant: Option<Position>,
) -> Option<(Board, MoveEffects)> {
    let piece = board.get(mv.from)?;
    let mut captured = board.get(mv.to);
    let mut next = simulate_move(board, mv.from, mv.to);

    let mut en_passant_capture = false;
    if piece.kind == PieceKind::Pawn
        && captured.is_none()
        && mv.from.col != mv.to.col
        && en_passant == Some(mv.to)
    {
        captured = next.take(Position::new(mv.from.row, mv.to.col));
        en_passant_capture = true;
    }

    let promoted = piece.kind == PieceKind::Pawn && mv.to.row == piece.color.promotion_row();
    if promoted {
        next.set(mv.to, Some(Piece::new(PieceKind::Queen, piece.color)));
    }

    let castle = if piece.kind == PieceKind::King {
        CastleSide::from_king_move(mv)
    } else {
        None
    };

    Some((
        next,
        MoveEffects {
            piece,
            captured,
            castle,
            en_passant_capture,
            promoted,
        },
    ))
}

/// En-passant target created by `mv`, set only on a pawn double step.
#[must_use]
pub fn next_en_passant_target(piece: Piece, mv: Move) -> Option<Position> {
    let (dr, _) = deltas(mv.from, mv.to);
    (piece.kind == PieceKind::Pawn && dr.abs() == 2)
        .then(|| Position::new((mv.from.row + mv.to.row) / 2, mv.from.col))
}

/// Whether any piece of color `by` attacks `square`.
#[must_use]
pub fn square_under_attack(board: &Board, square: Position, by: Color) -> bool {
    board
        .pieces()
        .any(|(pos, piece)| piece.color == by && attacks(board, pos, square, piece))
}

/// Whether `color`'s king is attacked. A board without that king is never in check.
#[must_use]
pub fn in_check(board: &Board, color: Color) -> bool {
    board
        .king_position(color)
        .is_some_and(|king| square_under_attack(board, king, color.opposite()))
}

/// Pseudo-legal and leaves the mover's king safe. Castling additionally
/// requires the start, transit and destination squares to be unattacked.
pub fn legal(
    board: &Board,
    from: Position,
    to: Position,
    piece: Piece,
    castling: &CastlingRights,
    en_passant: Option<Position>,
) -> bool {
    if !pseudo_legal(board, from, to, piece, castling, en_passant) {
        return false;
    }
    let enemy = piece.color.opposite();
    if piece.kind == PieceKind::King {
        if let Some(side) = castle_pattern(board, from, to, piece, castling) {
            let row = from.row;
            let path = [from.col, side.transit_col(), side.king_target_col()];
            if path
                .into_iter()
                .any(|col| square_under_attack(board, Position::new(row, col), enemy))
            {
                return false;
            }
        }
    }
    match apply_move(board, Move::new(from, to), en_passant) {
        Some((next, _)) => !in_check(&next, piece.color),
        None => false,
    }
}

/// Shape-based superset of destinations; filtered by [`legal`] afterwards.
fn candidate_targets(board: &Board, from: Position, piece: Piece) -> Vec<Position> {
    let mut out = Vec::with_capacity(16);
    let push_offsets = |offsets: &[(i8, i8)], out: &mut Vec<Position>| {
        out.extend(offsets.iter().filter_map(|&(dr, dc)| from.offset(dr, dc)));
    };
    match piece.kind {
        PieceKind::Pawn => {
            let dir = piece.color.pawn_direction();
            push_offsets(&[(dir, 0), (dir * 2, 0), (dir, -1), (dir, 1)], &mut out);
        }
        PieceKind::Knight => push_offsets(&KNIGHT_OFFSETS, &mut out),
        PieceKind::King => {
            push_offsets(&KING_OFFSETS, &mut out);
            push_offsets(&[(0, 2), (0, -2)], &mut out);
        }
        PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
            let rays: &[(i8, i8)] = match piece.kind {
                PieceKind::Bishop => &DIAGONALS,
                PieceKind::Rook => &ORTHOGONALS,
                _ => &KING_OFFSETS,
            };
            for &(dr, dc) in rays {
                let mut cursor = from.offset(dr, dc);
                while let Some(pos) = cursor {
                    out.push(pos);
                    if !board.is_empty(pos) {
                        break;
                    }
                    cursor = pos.offset(dr, dc);
                }
            }
        }
    }
    out
}

/// All legal destinations for the piece on `pos`, for move highlighting.
#[must_use]
pub fn possible_moves(
    board: &Board,
    pos: Position,
    castling: &CastlingRights,
    en_passant: Option<Position>,
) -> Vec<Position> {
    let Some(piece) = board.get(pos) else {
        return Vec::new();
    };
    let mut targets: Vec<Position> = candidate_targets(board, pos, piece)
        .into_iter()
        .filter(|&to| legal(board, pos, to, piece, castling, en_passant))
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

/// Every legal move for `color`, in board order.
#[must_use]
pub fn all_legal_moves(
    board: &Board,
    color: Color,
    castling: &CastlingRights,
    en_passant: Option<Position>,
) -> Vec<Move> {
    board
        .pieces()
        .filter(|(_, piece)| piece.color == color)
        .flat_map(|(from, _)| {
            possible_moves(board, from, castling, en_passant)
                .into_iter()
                .map(move |to| Move::new(from, to))
        })
        .collect()
}

/// Cheaper than counting: stops at the first legal move found.
#[must_use]
pub fn has_legal_move(
    board: &Board,
    color: Color,
    castling: &CastlingRights,
    en_passant: Option<Position>,
) -> bool {
    board
        .pieces()
        .filter(|(_, piece)| piece.color == color)
        .any(|(from, piece)| {
            candidate_targets(board, from, piece)
                .into_iter()
                .any(|to| legal(board, from, to, piece, castling, en_passant))
        })
}

#[must_use]
pub fn is_checkmate(
    board: &Board,
    color: Color,
    castling: &CastlingRights,
    en_passant: Option<Position>,
) -> bool {
    in_check(board, color) && !has_legal_move(board, color, castling, en_passant)
}

#[must_use]
pub fn is_stalemate(
    board: &Board,
    color: Color,
    castling: &CastlingRights,
    en_passant: Option<Position>,
) -> bool {
    !in_check(board, color) && !has_legal_move(board, color, castling, en_passant)
}
