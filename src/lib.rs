pub mod board;
pub mod book;
pub mod eval;
pub mod magic;
pub mod search;
pub mod time;
pub mod uci;
pub mod utils;
pub mod zobrist;

pub use board::{
    move_from_sq, move_promotion, move_to_sq, move_to_uci, new_move, parse_uci_move, Board, Color,
    Move, PieceKind, MOVE_NONE, START_FEN,
};

/// Build the process-wide attack and hashing tables. Idempotent; every
/// entry point calls it once up front, and lazy initialization covers
/// anything that forgets.
pub fn init() {
    magic::init();
    zobrist::init();
}
