//! Board, piece and move types shared by the whole crate.
//!
//! Row 0 is black's back rank, row 7 is white's. Columns run a..h.
//! Moves travel as `"<file><rank>-<file><rank>"` strings; captures,
//! castling, en passant and promotion are inferred from the board.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};

/// Chess piece color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Row holding this side's king and rooks at the start.
    #[must_use]
    pub const fn back_rank(self) -> u8 {
        match self {
            Self::White => 7,
            Self::Black => 0,
        }
    }

    /// Row delta of a single pawn step.
    #[must_use]
    pub const fn pawn_direction(self) -> i8 {
        match self {
            Self::White => -1,
            Self::Black => 1,
        }
    }

    #[must_use]
    pub const fn pawn_start_row(self) -> u8 {
        match self {
            Self::White => 6,
            Self::Black => 1,
        }
    }

    #[must_use]
    pub const fn promotion_row(self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

impl FromStr for Color {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(Self::White),
            "black" => Ok(Self::Black),
            other => Err(GameError::InvalidNotation(other.to_string())),
        }
    }
}

/// Chess piece type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    #[must_use]
    pub const fn is_slider(self) -> bool {
        matches!(self, Self::Queen | Self::Rook | Self::Bishop)
    }

    const fn letter(self) -> char {
        match self {
            Self::King => 'k',
            Self::Queen => 'q',
            Self::Rook => 'r',
            Self::Bishop => 'b',
            Self::Knight => 'n',
            Self::Pawn => 'p',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'k' => Some(Self::King),
            'q' => Some(Self::Queen),
            'r' => Some(Self::Rook),
            'b' => Some(Self::Bishop),
            'n' => Some(Self::Knight),
            'p' => Some(Self::Pawn),
            _ => None,
        }
    }
}

/// An immutable piece value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    #[must_use]
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// Diagram letter: uppercase for white, lowercase for black.
    #[must_use]
    pub fn to_char(self) -> char {
        match self.color {
            Color::White => self.kind.letter().to_ascii_uppercase(),
            Color::Black => self.kind.letter(),
        }
    }

    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        let kind = PieceKind::from_letter(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self { kind, color })
    }
}

/// A square on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    #[must_use]
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// The square `dr` rows and `dc` columns away, if it is on the board.
    #[must_use]
    pub fn offset(self, dr: i8, dc: i8) -> Option<Self> {
        let row = i8::try_from(self.row).ok()? + dr;
        let col = i8::try_from(self.col).ok()? + dc;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Self::new(row as u8, col as u8))
        } else {
            None
        }
    }

    /// All 64 squares, row-major from a8.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..8u8).flat_map(|row| (0..8u8).map(move |col| Self::new(row, col)))
    }

    #[must_use]
    pub fn file_char(self) -> char {
        char::from(b'a' + self.col)
    }

    /// Rank number 1..=8 as printed on a board.
    #[must_use]
    pub const fn rank(self) -> u8 {
        8 - self.row
    }

    /// Light squares have an even row+col sum (a8 and h1 are light).
    #[must_use]
    pub const fn is_light(self) -> bool {
        (self.row + self.col) % 2 == 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank())
    }
}

impl FromStr for Position {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(GameError::InvalidNotation(s.to_string()));
        }
        let file = bytes[0].to_ascii_lowercase();
        let rank = bytes[1];
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(GameError::InvalidNotation(s.to_string()));
        }
        Ok(Self::new(8 - (rank - b'0'), file - b'a'))
    }
}

/// One ply: a source and a destination square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

impl Move {
    #[must_use]
    pub const fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| GameError::InvalidNotation(s.to_string()))?;
        Ok(Self::new(from.parse()?, to.parse()?))
    }
}

impl TryFrom<String> for Move {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Move> for String {
    fn from(mv: Move) -> Self {
        mv.to_string()
    }
}

/// Parse a comma-joined move list as stored by the server.
pub fn parse_move_list(list: &str) -> GameResult<Vec<Move>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[must_use]
pub fn format_move_list(moves: &[Move]) -> String {
    moves
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// 8x8 grid of optional pieces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

impl Board {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
        }
    }

    /// The standard starting position.
    #[must_use]
    pub fn standard() -> Self {
        let mut board = Self::empty();
        for (col, kind) in BACK_RANK.iter().enumerate() {
            board.squares[0][col] = Some(Piece::new(*kind, Color::Black));
            board.squares[1][col] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            board.squares[6][col] = Some(Piece::new(PieceKind::Pawn, Color::White));
            board.squares[7][col] = Some(Piece::new(*kind, Color::White));
        }
        board
    }

    /// Build a board from eight rows of eight characters, row 0 first.
    /// `.` marks an empty square, letters follow FEN (uppercase = white).
    pub fn from_diagram(rows: &[&str]) -> GameResult<Self> {
        if rows.len() != 8 {
            return Err(GameError::InvalidDiagram(format!(
                "expected 8 rows, got {}",
                rows.len()
            )));
        }
        let mut board = Self::empty();
        for (row, line) in rows.iter().enumerate() {
            let chars: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if chars.len() != 8 {
                return Err(GameError::InvalidDiagram(format!(
                    "row {row} has {} squares",
                    chars.len()
                )));
            }
            for (col, c) in chars.into_iter().enumerate() {
                if c == '.' {
                    continue;
                }
                let piece = Piece::from_char(c)
                    .ok_or_else(|| GameError::InvalidDiagram(format!("unknown piece '{c}'")))?;
                board.squares[row][col] = Some(piece);
            }
        }
        Ok(board)
    }

    #[must_use]
    pub fn get(&self, pos: Position) -> Option<Piece> {
        self.squares[usize::from(pos.row)][usize::from(pos.col)]
    }

    pub fn set(&mut self, pos: Position, piece: Option<Piece>) {
        self.squares[usize::from(pos.row)][usize::from(pos.col)] = piece;
    }

    /// Remove and return whatever stands on `pos`.
    pub fn take(&mut self, pos: Position) -> Option<Piece> {
        self.squares[usize::from(pos.row)][usize::from(pos.col)].take()
    }

    #[must_use]
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos).is_none()
    }

    /// Every occupied square with its piece.
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(|pos| self.get(pos).map(|piece| (pos, piece)))
    }

    #[must_use]
    pub fn king_position(&self, color: Color) -> Option<Position> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceKind::King && p.color == color)
            .map(|(pos, _)| pos)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.squares {
            let line: String = row
                .iter()
                .map(|sq| sq.map_or('.', Piece::to_char))
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Which wing a castling move goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    #[must_use]
    pub const fn king_target_col(self) -> u8 {
        match self {
            Self::King => 6,
            Self::Queen => 2,
        }
    }

    /// Column the king passes over, which is also where the rook lands.
    #[must_use]
    pub const fn transit_col(self) -> u8 {
        match self {
            Self::King => 5,
            Self::Queen => 3,
        }
    }

    #[must_use]
    pub const fn rook_home_col(self) -> u8 {
        match self {
            Self::King => 7,
            Self::Queen => 0,
        }
    }

    /// Classify a king move as castling by shape alone.
    #[must_use]
    pub fn from_king_move(mv: Move) -> Option<Self> {
        if mv.from.row != mv.to.row || mv.from.col != 4 {
            return None;
        }
        match mv.to.col {
            6 => Some(Self::King),
            2 => Some(Self::Queen),
            _ => None,
        }
    }
}

/// Per-side, per-wing castling flags. Only ever cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

impl CastlingRights {
    pub const ALL: Self = Self {
        white_king_side: true,
        white_queen_side: true,
        black_king_side: true,
        black_queen_side: true,
    };

    pub const NONE: Self = Self {
        white_king_side: false,
        white_queen_side: false,
        black_king_side: false,
        black_queen_side: false,
    };

    #[must_use]
    pub const fn allows(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king_side,
            (Color::White, CastleSide::Queen) => self.white_queen_side,
            (Color::Black, CastleSide::King) => self.black_king_side,
            (Color::Black, CastleSide::Queen) => self.black_queen_side,
        }
    }

    pub fn revoke(&mut self, color: Color, side: CastleSide) {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king_side = false,
            (Color::White, CastleSide::Queen) => self.white_queen_side = false,
            (Color::Black, CastleSide::King) => self.black_king_side = false,
            (Color::Black, CastleSide::Queen) => self.black_queen_side = false,
        }
    }

    /// Rights after `piece` played `mv`: a king move clears both wings,
    /// and touching a rook home square clears that wing.
    #[must_use]
    pub fn after_move(mut self, piece: Piece, mv: Move) -> Self {
        if piece.kind == PieceKind::King {
            self.revoke(piece.color, CastleSide::King);
            self.revoke(piece.color, CastleSide::Queen);
        }
        for color in [Color::White, Color::Black] {
            for side in [CastleSide::King, CastleSide::Queen] {
                let home = Position::new(color.back_rank(), side.rook_home_col());
                if mv.from == home || mv.to == home {
                    self.revoke(color, side);
                }
            }
        }
        self
    }
}

impl Default for CastlingRights {
    fn default() -> Self {
        Self::ALL
    }
}
