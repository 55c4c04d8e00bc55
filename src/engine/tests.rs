use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::*;

fn pos(s: &str) -> Position {
    s.parse().unwrap()
}

fn mv(s: &str) -> Move {
    s.parse().unwrap()
}

fn play_all(moves: &[&str]) -> BoardState {
    moves.iter().fold(BoardState::standard(), |state, m| {
        state.play(mv(m)).unwrap().0
    })
}

fn diagram(rows: [&str; 8], to_move: Color) -> BoardState {
    BoardState::from_board(Board::from_diagram(&rows).unwrap(), to_move)
}

#[test]
fn test_opening_pawn_moves() {
    let state = BoardState::standard();
    let targets = state.possible_moves(pos("e2"));
    assert_eq!(targets, vec![pos("e4"), pos("e3")]);
    assert_eq!(state.legal_moves().len(), 20);
    assert!(state.possible_moves(pos("e4")).is_empty());
}

#[test]
fn test_double_step_needs_clear_path() {
    let state = diagram(
        [
            "....k...", "........", "........", "........", "........", "....n...", "....P...",
            "....K...",
        ],
        Color::White,
    );
    assert!(state.possible_moves(pos("e2")).is_empty());
}

#[test]
fn test_after_e4_e5_white_to_move() {
    let state = play_all(&["e2-e4", "e7-e5"]);
    assert_eq!(state.to_move, Color::White);
    assert_eq!(
        state.board.get(pos("e4")),
        Some(Piece::new(PieceKind::Pawn, Color::White))
    );
    assert_eq!(
        state.board.get(pos("e5")),
        Some(Piece::new(PieceKind::Pawn, Color::Black))
    );
    assert!(state.board.is_empty(pos("e2")));
    assert!(state.board.is_empty(pos("e7")));
    assert_eq!(state.board.pieces().count(), 32);
    assert_eq!(state.en_passant, Some(pos("e6")));
}

#[test]
fn test_fools_mate() {
    let state = play_all(&["f2-f3", "e7-e5", "g2-g4", "d8-h4"]);
    assert!(is_checkmate(
        &state.board,
        Color::White,
        &state.castling,
        state.en_passant
    ));
    assert_eq!(state.status(), PositionStatus::Checkmate);
    assert!(state.legal_moves().is_empty());
}

#[test]
fn test_stalemate_is_not_check() {
    let state = diagram(
        [
            "k.......", "........", ".Q......", "........", "........", "........", "........",
            "..K.....",
        ],
        Color::Black,
    );
    assert!(is_stalemate(
        &state.board,
        Color::Black,
        &state.castling,
        None
    ));
    assert!(!is_checkmate(
        &state.board,
        Color::Black,
        &state.castling,
        None
    ));
    assert!(!state.in_check());
    assert_eq!(state.status(), PositionStatus::Stalemate);
}

#[test]
fn test_castling_through_attacked_square_is_refused() {
    // The f8 rook covers f1 while e1 and g1 stay quiet.
    let state = diagram(
        [
            "....kr..", "........", "........", "........", "........", "........", "........",
            "R...K..R",
        ],
        Color::White,
    );
    assert!(!square_under_attack(&state.board, pos("e1"), Color::Black));
    assert!(!square_under_attack(&state.board, pos("g1"), Color::Black));
    assert!(square_under_attack(&state.board, pos("f1"), Color::Black));
    assert!(!state.is_legal(mv("e1-g1")));
    assert!(state.is_legal(mv("e1-c1")));
}

#[test]
fn test_castling_out_of_check_is_refused() {
    let state = diagram(
        [
            "....r..k", "........", "........", "........", "........", "........", "........",
            "....K..R",
        ],
        Color::White,
    );
    assert!(state.in_check());
    assert!(!state.is_legal(mv("e1-g1")));
}

#[test]
fn test_pawn_guarding_transit_square_blocks_castling() {
    // Black pawn on e2 attacks d1 and f1 even though both are empty.
    let state = diagram(
        [
            "....k...", "........", "........", "........", "........", "........", "....p...",
            "R...K..R",
        ],
        Color::White,
    );
    assert!(!state.is_legal(mv("e1-g1")));
    assert!(!state.is_legal(mv("e1-c1")));
}

#[test]
fn test_castling_moves_the_rook_and_clears_rights() {
    let state = play_all(&[
        "e2-e4", "e7-e5", "g1-f3", "b8-c6", "f1-c4", "g8-f6", "e1-g1",
    ]);
    assert_eq!(
        state.board.get(pos("g1")),
        Some(Piece::new(PieceKind::King, Color::White))
    );
    assert_eq!(
        state.board.get(pos("f1")),
        Some(Piece::new(PieceKind::Rook, Color::White))
    );
    assert!(state.board.is_empty(pos("h1")));
    assert!(!state.castling.white_king_side && !state.castling.white_queen_side);
    assert!(state.castling.black_king_side);
}

#[test]
fn test_rook_move_forfeits_one_wing() {
    let state = play_all(&["h2-h4", "a7-a5", "h1-h3", "a8-a6", "h3-h1", "a6-a8"]);
    assert!(!state.castling.white_king_side);
    assert!(state.castling.white_queen_side);
    assert!(!state.castling.black_queen_side);
    assert!(state.castling.black_king_side);
}

#[test]
fn test_en_passant_only_on_the_next_ply() {
    let ready = play_all(&["e2-e4", "a7-a6", "e4-e5", "d7-d5"]);
    assert_eq!(ready.en_passant, Some(pos("d6")));
    assert!(ready.is_legal(mv("e5-d6")));

    let (after, effects) = ready.play(mv("e5-d6")).unwrap();
    assert!(effects.en_passant_capture);
    assert_eq!(
        effects.captured,
        Some(Piece::new(PieceKind::Pawn, Color::Black))
    );
    assert!(after.board.is_empty(pos("d5")));
    assert_eq!(after.en_passant, None);

    let late = play_all(&["e2-e4", "a7-a6", "e4-e5", "d7-d5", "a2-a3", "a6-a5"]);
    assert_eq!(late.en_passant, None);
    assert!(!late.is_legal(mv("e5-d6")));
}

#[test]
fn test_pinned_piece_cannot_leave_the_line() {
    let state = diagram(
        [
            "....r..k", "........", "........", "........", "........", "........", "....B...",
            "....K...",
        ],
        Color::White,
    );
    assert!(state.possible_moves(pos("e2")).is_empty());
    assert!(!state.is_legal(mv("e2-d3")));
}

#[test]
fn test_promotion_is_always_to_queen() {
    let state = diagram(
        [
            ".......k", "P.......", "........", "........", "........", "........", "........",
            "....K...",
        ],
        Color::White,
    );
    let (after, effects) = state.play(mv("a7-a8")).unwrap();
    assert!(effects.promoted);
    assert_eq!(
        after.board.get(pos("a8")),
        Some(Piece::new(PieceKind::Queen, Color::White))
    );
}

#[test]
fn test_simulate_move_leaves_special_effects_to_apply_move() {
    let board = Board::from_diagram(&[
        ".......k", "P.......", "........", "........", "........", "........", "........",
        "....K...",
    ])
    .unwrap();
    let moved = simulate_move(&board, pos("a7"), pos("a8"));
    assert_eq!(
        moved.get(pos("a8")),
        Some(Piece::new(PieceKind::Pawn, Color::White))
    );
    let (applied, _) = apply_move(&board, mv("a7-a8"), None).unwrap();
    assert_eq!(
        applied.get(pos("a8")),
        Some(Piece::new(PieceKind::Queen, Color::White))
    );
}

#[test]
fn test_play_rejects_wrong_side_and_illegal_moves() {
    let state = BoardState::standard();
    assert!(matches!(
        state.play(mv("e7-e5")),
        Err(crate::error::GameError::NotYourTurn)
    ));
    assert!(matches!(
        state.play(mv("e2-e5")),
        Err(crate::error::GameError::IllegalMove(_))
    ));
    assert!(matches!(
        state.play(mv("e4-e5")),
        Err(crate::error::GameError::NoPieceAt(_))
    ));
}

#[test]
fn test_pseudo_legal_ignores_king_safety() {
    let state = diagram(
        [
            "....r..k", "........", "........", "........", "........", "........", "....B...",
            "....K...",
        ],
        Color::White,
    );
    let bishop = Piece::new(PieceKind::Bishop, Color::White);
    assert!(pseudo_legal(
        &state.board,
        pos("e2"),
        pos("d3"),
        bishop,
        &state.castling,
        None
    ));
    assert!(!legal(
        &state.board,
        pos("e2"),
        pos("d3"),
        bishop,
        &state.castling,
        None
    ));
}

fn to_square(p: Position) -> chess::Square {
    chess::Square::make_square(
        chess::Rank::from_index(usize::from(7 - p.row)),
        chess::File::from_index(usize::from(p.col)),
    )
}

fn from_square(sq: chess::Square) -> Position {
    Position::new(
        7 - sq.get_rank().to_index() as u8,
        sq.get_file().to_index() as u8,
    )
}

fn oracle_moves(board: &chess::Board) -> Vec<Move> {
    let mut moves: Vec<Move> = chess::MoveGen::new_legal(board)
        .filter(|m| matches!(m.get_promotion(), None | Some(chess::Piece::Queen)))
        .map(|m| Move::new(from_square(m.get_source()), from_square(m.get_dest())))
        .collect();
    moves.sort_by_key(|m| (m.from, m.to));
    moves
}

#[test]
fn test_random_playouts_match_reference_move_generator() {
    for seed in 0..12 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ours = BoardState::standard();
        let mut reference = chess::Board::default();

        for ply in 0..120 {
            let mut legal = ours.legal_moves();
            legal.sort_by_key(|m| (m.from, m.to));
            assert_eq!(
                legal,
                oracle_moves(&reference),
                "seed {seed} ply {ply}\n{}",
                ours.board
            );
            let Some(&choice) = legal.choose(&mut rng) else {
                break;
            };

            let mover = ours.to_move;
            let (next, effects) = ours.play(choice).unwrap();
            assert!(!in_check(&next.board, mover), "seed {seed} ply {ply}");

            let promotion = effects.promoted.then_some(chess::Piece::Queen);
            let oracle_move =
                chess::ChessMove::new(to_square(choice.from), to_square(choice.to), promotion);
            reference = reference.make_move_new(oracle_move);
            ours = next;
        }
    }
}
