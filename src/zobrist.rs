//! Zobrist hashing key schedule.
//!
//! A position's hash is the XOR of one key per (piece, color, square), the
//! side key when Black is to move, a key per castling-rights mask and a key
//! per en-passant file. Keys are a deterministic splitmix64 stream so every
//! process builds the same schedule.

use std::sync::OnceLock;

use crate::board::{Board, Color, PieceKind};
use crate::utils;

pub struct Keys {
    /// Indexed by color*6 + kind, then square.
    pub piece: [[u64; 64]; 12],
    pub side: u64,
    pub castling: [u64; 16],
    pub ep_file: [u64; 8],
}

static KEYS: OnceLock<Keys> = OnceLock::new();

fn split_mix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn generate() -> Keys {
    // One shared counter keeps every key distinct; splitmix64 is designed
    // to be consumed as a sequential stream.
    let mut state = 0x5eed_c0de_5eed_c0deu64;
    let mut next = || {
        state = state.wrapping_add(1);
        split_mix64(state)
    };

    let mut piece = [[0u64; 64]; 12];
    for row in piece.iter_mut() {
        for key in row.iter_mut() {
            *key = next();
        }
    }
    let side = next();
    let mut castling = [0u64; 16];
    for key in castling.iter_mut() {
        *key = next();
    }
    let mut ep_file = [0u64; 8];
    for key in ep_file.iter_mut() {
        *key = next();
    }

    Keys { piece, side, castling, ep_file }
}

/// Build the schedule. Thread-safe and idempotent.
pub fn init() {
    keys();
}

#[inline]
pub fn keys() -> &'static Keys {
    KEYS.get_or_init(generate)
}

#[inline]
pub fn piece_index(kind: PieceKind, color: Color) -> usize {
    (color as usize) * 6 + (kind as usize)
}

/// Recompute the hash of a board from scratch. FEN setup uses this; the
/// incremental updates in `make_move` must always agree with it.
pub fn recalc_full(board: &Board) -> u64 {
    let keys = keys();
    let mut h = 0u64;
    for color in [Color::White, Color::Black] {
        for kind in PieceKind::ALL {
            let mut bb = board.piece_bb(kind, color);
            while let Some(sq) = utils::pop_lsb(&mut bb) {
                h ^= keys.piece[piece_index(kind, color)][sq];
            }
        }
    }
    if board.side == Color::Black {
        h ^= keys.side;
    }
    h ^= keys.castling[board.castling as usize];
    if let Some(ep_sq) = board.ep {
        h ^= keys.ep_file[(ep_sq % 8) as usize];
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_is_deterministic_and_distinct() {
        let keys = keys();
        assert_ne!(keys.side, 0);
        // Spot-check a few keys for accidental duplication
        assert_ne!(keys.piece[0][0], keys.piece[0][1]);
        assert_ne!(keys.piece[0][0], keys.piece[11][63]);
        assert_ne!(keys.castling[0], keys.castling[15]);
        assert_ne!(keys.ep_file[0], keys.ep_file[7]);
    }
}
