// Standard chess rules oracle backed by `shakmaty`.
//
// Move payloads arrive as opaque JSON. Two shapes are understood:
// - a SAN string: `"e4"`, `"Nxf7+"`, `"O-O"`, `"Qh4#"` (check suffixes are
//   accepted and ignored);
// - an object `{"from": "e2", "to": "e4", "promotion": "q"}` where
//   `promotion` is optional. Castling may name either the king's destination
//   (`e1` -> `g1`) or the rook's square (`e1` -> `h1`).
// Anything else is rejected.
//
// Draw detection covers the fifty-move rule, insufficient material and
// threefold repetition. Repetition needs history that a bare position does
// not carry, so `ChessBoard` keeps a key per reached position.

use serde::Deserialize;
use serde_json::Value;
use shakmaty::san::SanPlus;
use shakmaty::{Bitboard, Board, Chess, Color, EnPassantMode, Move, Position, Role, Square};

use crate::oracle::{MoveRejected, RulesOracle};

/// Halfmove clock value at which the fifty-move rule applies.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

#[derive(Clone, Copy, Debug, Default)]
pub struct StandardChess;

/// A chess position plus the repetition history leading to it.
#[derive(Clone, Debug)]
pub struct ChessBoard {
    position: Chess,
    history: Vec<PositionKey>,
}

impl ChessBoard {
    pub fn position(&self) -> &Chess {
        &self.position
    }

    fn repetitions_of_current(&self) -> usize {
        match self.history.last() {
            Some(current) => self.history.iter().filter(|k| *k == current).count(),
            None => 0,
        }
    }
}

/// The parts of a position that count for repetition.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PositionKey {
    board: Board,
    turn: Color,
    castling: Bitboard,
    ep_square: Option<Square>,
}

impl PositionKey {
    fn of(pos: &Chess) -> Self {
        Self {
            board: pos.board().clone(),
            turn: pos.turn(),
            castling: pos.castles().castling_rights(),
            ep_square: pos.ep_square(EnPassantMode::Legal),
        }
    }
}

#[derive(Deserialize)]
struct CoordinateMove {
    from: String,
    to: String,
    #[serde(default)]
    promotion: Option<String>,
}

impl RulesOracle for StandardChess {
    type Board = ChessBoard;

    fn new_board(&self) -> ChessBoard {
        let position = Chess::default();
        let history = vec![PositionKey::of(&position)];
        ChessBoard { position, history }
    }

    fn apply(&self, board: &ChessBoard, mv: &Value) -> Result<ChessBoard, MoveRejected> {
        let m = parse_move(&board.position, mv).ok_or(MoveRejected)?;
        let position = board
            .position
            .clone()
            .play(&m)
            .map_err(|_| MoveRejected)?;
        let mut history = board.history.clone();
        history.push(PositionKey::of(&position));
        Ok(ChessBoard { position, history })
    }

    fn is_checkmate(&self, board: &ChessBoard) -> bool {
        board.position.is_checkmate()
    }

    fn is_draw(&self, board: &ChessBoard) -> bool {
        board.position.halfmoves() >= FIFTY_MOVE_HALFMOVES
            || board.position.is_insufficient_material()
            || board.repetitions_of_current() >= 3
    }

    fn is_stalemate(&self, board: &ChessBoard) -> bool {
        board.position.is_stalemate()
    }
}

/// Resolve a JSON move payload to a legal move in `pos`.
fn parse_move(pos: &Chess, mv: &Value) -> Option<Move> {
    match mv {
        Value::String(text) => {
            let san = SanPlus::from_ascii(text.trim().as_bytes()).ok()?;
            san.san.to_move(pos).ok()
        }
        Value::Object(_) => {
            let coords: CoordinateMove = serde_json::from_value(mv.clone()).ok()?;
            let from = Square::from_ascii(coords.from.trim().as_bytes()).ok()?;
            let to = Square::from_ascii(coords.to.trim().as_bytes()).ok()?;
            let promotion = match coords.promotion.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(p) => Some(Role::from_char(p.chars().next()?.to_ascii_lowercase())?),
            };
            pos.legal_moves().into_iter().find(|m| {
                m.from() == Some(from)
                    && m.promotion() == promotion
                    && (m.to() == to || castling_king_target(pos, m) == Some(to))
            })
        }
        _ => None,
    }
}

/// For a castling move, the square the king lands on.
fn castling_king_target(pos: &Chess, m: &Move) -> Option<Square> {
    m.castling_side().map(|side| side.king_to(pos.turn()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shakmaty::CastlingMode;
    use shakmaty::fen::Fen;

    use super::*;

    fn board_from_fen(fen: &str) -> ChessBoard {
        let fen: Fen = fen.parse().unwrap();
        let position: Chess = fen.into_position(CastlingMode::Standard).unwrap();
        let history = vec![PositionKey::of(&position)];
        ChessBoard { position, history }
    }

    /// Play a sequence of SAN moves from the start position, panicking on
    /// the first rejection.
    fn play_all(moves: &[&str]) -> ChessBoard {
        let oracle = StandardChess;
        let mut board = oracle.new_board();
        for san in moves {
            board = oracle
                .apply(&board, &json!(san))
                .unwrap_or_else(|_| panic!("move {san} rejected"));
        }
        board
    }

    #[test]
    fn accepts_opening_move() {
        let board = play_all(&["e4"]);
        assert_eq!(board.position().turn(), Color::Black);
    }

    #[test]
    fn rejects_illegal_san() {
        let oracle = StandardChess;
        let board = oracle.new_board();
        // Black's move on white's turn.
        assert_eq!(oracle.apply(&board, &json!("e5")).unwrap_err(), MoveRejected);
        assert!(oracle.apply(&board, &json!("Ke2")).is_err());
        assert!(oracle.apply(&board, &json!("not a move")).is_err());
    }

    #[test]
    fn rejects_non_move_payloads() {
        let oracle = StandardChess;
        let board = oracle.new_board();
        assert!(oracle.apply(&board, &json!(42)).is_err());
        assert!(oracle.apply(&board, &json!(null)).is_err());
        assert!(oracle.apply(&board, &json!({"from": "e2"})).is_err());
        assert!(oracle.apply(&board, &json!({"from": "z9", "to": "e4"})).is_err());
    }

    #[test]
    fn accepts_coordinate_object() {
        let oracle = StandardChess;
        let board = oracle.new_board();
        let board = oracle
            .apply(&board, &json!({"from": "e2", "to": "e4"}))
            .unwrap();
        assert_eq!(board.position().turn(), Color::Black);
        assert!(oracle.apply(&board, &json!({"from": "e7", "to": "e4"})).is_err());
    }

    #[test]
    fn coordinate_castling_uses_king_destination() {
        let oracle = StandardChess;
        let board = play_all(&["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5"]);
        let castled = oracle
            .apply(&board, &json!({"from": "e1", "to": "g1"}))
            .unwrap();
        assert_eq!(castled.position().turn(), Color::Black);
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let oracle = StandardChess;
        let board = play_all(&["f3", "e5", "g4"]);
        assert!(!oracle.is_checkmate(&board));

        let board = oracle.apply(&board, &json!("Qh4#")).unwrap();
        assert!(oracle.is_checkmate(&board));
        assert!(oracle.is_game_over(&board));
        assert!(!oracle.is_draw(&board));
    }

    #[test]
    fn loyd_stalemate() {
        let oracle = StandardChess;
        let board = play_all(&[
            "e3", "a5", "Qh5", "Ra6", "Qxa5", "h5", "h4", "Rah6", "Qxc7", "f6", "Qxd7+", "Kf7",
            "Qxb7", "Qd3", "Qxb8", "Qh7", "Qxc8", "Kg6", "Qe6",
        ]);
        assert!(oracle.is_stalemate(&board));
        assert!(!oracle.is_checkmate(&board));
        assert!(oracle.is_game_over(&board));
    }

    #[test]
    fn threefold_repetition_is_draw() {
        let oracle = StandardChess;
        let shuffle = ["Nf3", "Nf6", "Ng1", "Ng8"];

        let board = play_all(&shuffle);
        assert!(!oracle.is_draw(&board), "start position seen only twice");

        let twice: Vec<&str> = shuffle.iter().chain(shuffle.iter()).copied().collect();
        let board = play_all(&twice);
        assert!(oracle.is_draw(&board));
    }

    #[test]
    fn fifty_move_rule_is_draw() {
        let oracle = StandardChess;
        let board = board_from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 99 80");
        assert!(!oracle.is_draw(&board));

        let board = oracle.apply(&board, &json!("Ra2")).unwrap();
        assert_eq!(board.position().halfmoves(), 100);
        assert!(oracle.is_draw(&board));
        assert!(!oracle.is_checkmate(&board));
        assert!(oracle.is_game_over(&board));
    }

    #[test]
    fn bare_kings_are_insufficient_material() {
        let oracle = StandardChess;
        let board = board_from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1");
        assert!(!oracle.is_draw(&board));

        let board = oracle.apply(&board, &json!("Kxe2")).unwrap();
        assert!(board.position().is_insufficient_material());
        assert!(oracle.is_draw(&board));
        assert!(!oracle.is_stalemate(&board));
    }
}
