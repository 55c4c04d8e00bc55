use super::types::{Board, Color, PieceKind};

#[derive(Debug, Default, Clone, Copy)]
struct SideCount {
    pawns: u8,
    knights: u8,
    bishops: u8,
    rooks: u8,
    queens: u8,
    bishop_on_light: bool,
    bishop_on_dark: bool,
}

impl SideCount {
    fn only_king(&self) -> bool {
        self.pawns + self.knights + self.bishops + self.rooks + self.queens == 0
    }

    fn single_minor(&self) -> bool {
        self.pawns == 0
            && self.rooks == 0
            && self.queens == 0
            && self.knights + self.bishops == 1
    }

    fn single_bishop(&self) -> bool {
        self.pawns == 0
            && self.rooks == 0
            && self.queens == 0
            && self.knights == 0
            && self.bishops == 1
    }
}

/// Check if the board has insufficient material for checkmate
pub fn has_insufficient_material(board: &Board) -> bool {
    let mut white = SideCount::default();
    let mut black = SideCount::default();

    for (pos, piece) in board.pieces() {
        let side = match piece.color {
            Color::White => &mut white,
            Color::Black => &mut black,
        };
        match piece.kind {
            PieceKind::Pawn => side.pawns += 1,
            PieceKind::Knight => side.knights += 1,
            PieceKind::Bishop => {
                side.bishops += 1;
                if pos.is_light() {
                    side.bishop_on_light = true;
                } else {
                    side.bishop_on_dark = true;
                }
            }
            PieceKind::Rook => side.rooks += 1,
            PieceKind::Queen => side.queens += 1,
            PieceKind::King => {}
        }
    }

    // King vs King
    if white.only_king() && black.only_king() {
        return true;
    }

    // King and minor piece vs King
    if (white.single_minor() && black.only_king()) || (black.single_minor() && white.only_king()) {
        return true;
    }

    // King and Bishop vs King and Bishop (bishops on same color)
    if white.single_bishop() && black.single_bishop() {
        return (white.bishop_on_light && black.bishop_on_light)
            || (white.bishop_on_dark && black.bishop_on_dark);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: [&str; 8]) -> Board {
        Board::from_diagram(&rows).unwrap()
    }

    #[test]
    fn test_bare_kings_are_a_draw() {
        let b = board([
            "....k...", "........", "........", "........", "........", "........", "........",
            "....K...",
        ]);
        assert!(has_insufficient_material(&b));
    }

    #[test]
    fn test_single_minor_is_a_draw() {
        let b = board([
            "....k...", "........", "........", "........", "........", "........", "........",
            "...NK...",
        ]);
        assert!(has_insufficient_material(&b));
    }

    #[test]
    fn test_rook_or_pawn_is_enough() {
        let rook = board([
            "....k...", "........", "........", "........", "........", "........", "........",
            "R...K...",
        ]);
        assert!(!has_insufficient_material(&rook));
        let pawn = board([
            "....k...", "........", "........", "........", "........", "........", "P.......",
            "....K...",
        ]);
        assert!(!has_insufficient_material(&pawn));
    }

    #[test]
    fn test_same_colored_bishops() {
        // c8 and f1 are both light squares.
        let same = board([
            "..b.k...", "........", "........", "........", "........", "........", "........",
            "....KB..",
        ]);
        assert!(has_insufficient_material(&same));
        // f8 is dark.
        let opposite = board([
            "....kb..", "........", "........", "........", "........", "........", "........",
            "....KB..",
        ]);
        assert!(!has_insufficient_material(&opposite));
    }
}
