// Rules oracle seam.
//
// The relay arbitrates *who* may move and *when*, never *what* is legal. That
// question goes to a `RulesOracle`, which owns the board representation and
// answers legality and terminal-state queries. Sessions store the oracle's
// `Board` opaquely and only ever call back into the oracle with it.
//
// `apply` returns a new board instead of mutating in place, so a rejected
// move can never leave a half-applied position behind.
//
// The production oracle is `chess::StandardChess`. Tests use scripted
// oracles that accept or reject moves by payload.

use serde_json::Value;

/// The oracle refused a move (illegal, or not a move at all).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveRejected;

pub trait RulesOracle: Send + 'static {
    type Board: Send + 'static;

    /// Board for a freshly created room.
    fn new_board(&self) -> Self::Board;

    /// Validate `mv` against `board` and return the resulting position.
    fn apply(&self, board: &Self::Board, mv: &Value) -> Result<Self::Board, MoveRejected>;

    fn is_checkmate(&self, board: &Self::Board) -> bool;

    fn is_draw(&self, board: &Self::Board) -> bool;

    fn is_stalemate(&self, board: &Self::Board) -> bool;

    fn is_game_over(&self, board: &Self::Board) -> bool {
        self.is_checkmate(board) || self.is_draw(board) || self.is_stalemate(board)
    }
}
