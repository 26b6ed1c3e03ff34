//! Polyglot-format opening book reader.
//!
//! A book file is a flat sequence of 16-byte big-endian entries:
//! 8-byte position key, 2-byte move, 2-byte weight, 4-byte learn field.
//! Entries are indexed by the engine's own Zobrist key, so the book must be
//! built with a matching key schedule. Probing picks among the stored moves
//! with a weight-proportional random draw and only ever returns a move that
//! is legal in the given position; anything else is treated as a miss.

use std::collections::HashMap;
use std::fs;

use rand::Rng;
use thiserror::Error;

use crate::board::{move_from_sq, move_to_sq, new_move, Board, Move, PieceKind};

const ENTRY_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("cannot read book file: {0}")]
    Io(#[from] std::io::Error),
    #[error("book file size is not a multiple of 16 bytes")]
    Truncated,
    #[error("book file holds no entries")]
    Empty,
}

#[derive(Debug, Clone, Copy)]
struct BookEntry {
    raw_move: u16,
    weight: u16,
}

pub struct OpeningBook {
    entries: HashMap<u64, Vec<BookEntry>>,
}

impl OpeningBook {
    pub fn load(path: &str) -> Result<Self, BookError> {
        let bytes = fs::read(path)?;
        if bytes.len() % ENTRY_SIZE != 0 {
            return Err(BookError::Truncated);
        }

        let mut entries: HashMap<u64, Vec<BookEntry>> = HashMap::new();
        for chunk in bytes.chunks_exact(ENTRY_SIZE) {
            let key = u64::from_be_bytes(chunk[0..8].try_into().unwrap());
            let raw_move = u16::from_be_bytes(chunk[8..10].try_into().unwrap());
            let weight = u16::from_be_bytes(chunk[10..12].try_into().unwrap());
            // Bytes 12..16 are the learn field; unused.
            entries.entry(key).or_default().push(BookEntry { raw_move, weight });
        }

        if entries.is_empty() {
            return Err(BookError::Empty);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the position and return a legal book move, or None.
    pub fn probe(&self, board: &mut Board) -> Option<Move> {
        let candidates = self.entries.get(&board.zobrist_key())?;

        // Weight-proportional draw; zero weights still get one ticket so a
        // book with unweighted entries remains usable.
        let total: u32 = candidates.iter().map(|e| e.weight.max(1) as u32).sum();
        let mut ticket = rand::thread_rng().gen_range(0..total);
        let mut chosen = candidates[0];
        for entry in candidates {
            let tickets = entry.weight.max(1) as u32;
            if ticket < tickets {
                chosen = *entry;
                break;
            }
            ticket -= tickets;
        }

        let decoded = decode_book_move(chosen.raw_move, board);
        let legal = board.generate_moves();
        legal.iter().copied().find(|&mv| mv == decoded)
    }
}

/// Decode the Polyglot move field. Bits 0-5 are the destination, 6-11 the
/// origin, 12-14 the promotion (0 none, 1 N, 2 B, 3 R, 4 Q) — under the
/// A1=0 square numbering these subfields are plain square indices.
/// Polyglot encodes castling as king-takes-own-rook; remap it to the
/// engine's king-two-files form.
fn decode_book_move(raw: u16, board: &Board) -> Move {
    let to = (raw & 0x3F) as usize;
    let from = ((raw >> 6) & 0x3F) as usize;
    let promotion = match (raw >> 12) & 0x7 {
        1 => Some(PieceKind::Knight),
        2 => Some(PieceKind::Bishop),
        3 => Some(PieceKind::Rook),
        4 => Some(PieceKind::Queen),
        _ => None,
    };

    if matches!(board.piece_on(from), Some((PieceKind::King, _))) {
        let remapped_to = match (from, to) {
            (4, 7) => 6,    // e1h1 -> e1g1
            (4, 0) => 2,    // e1a1 -> e1c1
            (60, 63) => 62, // e8h8 -> e8g8
            (60, 56) => 58, // e8a8 -> e8c8
            _ => to,
        };
        return new_move(from, remapped_to, promotion);
    }

    new_move(from, to, promotion)
}

/// Encode a move into the Polyglot move field. Used by tests and tooling
/// that build book files.
pub fn encode_book_move(mv: Move) -> u16 {
    let promo = match crate::board::move_promotion(mv) {
        Some(PieceKind::Knight) => 1u16,
        Some(PieceKind::Bishop) => 2,
        Some(PieceKind::Rook) => 3,
        Some(PieceKind::Queen) => 4,
        _ => 0,
    };
    (move_to_sq(mv) as u16) | ((move_from_sq(mv) as u16) << 6) | (promo << 12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_field_round_trip() {
        crate::init();
        let board = Board::startpos();
        let e2e4 = new_move(12, 28, None);
        assert_eq!(decode_book_move(encode_book_move(e2e4), &board), e2e4);

        let promo = new_move(48, 56, Some(PieceKind::Queen));
        assert_eq!(encode_book_move(promo) >> 12, 4);
    }

    #[test]
    fn castle_encoding_is_remapped() {
        crate::init();
        let mut board = Board::new();
        board
            .set_from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
            .unwrap();
        // King takes own rook on h1 means kingside castle
        let raw = (7u16) | (4u16 << 6);
        assert_eq!(decode_book_move(raw, &board), new_move(4, 6, None));
    }
}
