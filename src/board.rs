// Square mapping: A1=0, B1=1, ..., H8=63. Every module relies on this
// ordering, including the rank masks (white pawns start on RANK_2).

use thiserror::Error;

use crate::magic;
use crate::utils;
use crate::zobrist::{self, piece_index};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];
}

/// Promotion expansion order; the search's ordering then lifts the queen.
pub const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

// Move codec: 16-bit layout
// Bits 0-5:   from (0-63)
// Bits 6-11:  to (0-63)
// Bits 12-14: promotion (0 = none, 1 = N, 2 = B, 3 = R, 4 = Q)
// Castling and en-passant carry no flag; make_move infers them from the
// board. The all-zero word doubles as the null move ("0000").
pub type Move = u16;

pub const MOVE_NONE: Move = 0;

pub fn new_move(from: usize, to: usize, promotion: Option<PieceKind>) -> Move {
    let promo = match promotion {
        Some(PieceKind::Knight) => 1u16,
        Some(PieceKind::Bishop) => 2,
        Some(PieceKind::Rook) => 3,
        Some(PieceKind::Queen) => 4,
        _ => 0,
    };
    (from as u16 & 0x3F) | ((to as u16 & 0x3F) << 6) | (promo << 12)
}

#[inline]
pub fn move_from_sq(m: Move) -> usize {
    (m & 0x3F) as usize
}

#[inline]
pub fn move_to_sq(m: Move) -> usize {
    ((m >> 6) & 0x3F) as usize
}

#[inline]
pub fn move_promotion(m: Move) -> Option<PieceKind> {
    match (m >> 12) & 0x7 {
        1 => Some(PieceKind::Knight),
        2 => Some(PieceKind::Bishop),
        3 => Some(PieceKind::Rook),
        4 => Some(PieceKind::Queen),
        _ => None,
    }
}

/// Convert a square index (0-63) to UCI notation (e.g. 0 -> "a1").
pub fn square_to_uci(sq: usize) -> String {
    let file = (b'a' + (sq % 8) as u8) as char;
    let rank = (b'1' + (sq / 8) as u8) as char;
    format!("{}{}", file, rank)
}

/// Convert a Move to long-algebraic notation (e.g. "e2e4", "e7e8q").
pub fn move_to_uci(m: Move) -> String {
    if m == MOVE_NONE {
        return "0000".to_string();
    }
    let mut uci = format!(
        "{}{}",
        square_to_uci(move_from_sq(m)),
        square_to_uci(move_to_sq(m))
    );
    if let Some(promo) = move_promotion(m) {
        uci.push(match promo {
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            _ => 'q',
        });
    }
    uci
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("placement does not describe 8 ranks of 8 files")]
    BadPlacement,
    #[error("invalid piece character '{0}'")]
    InvalidPiece(char),
    #[error("invalid side-to-move field")]
    InvalidSide,
    #[error("invalid castling field")]
    InvalidCastling,
    #[error("invalid en-passant field")]
    InvalidEnPassant,
    #[error("invalid clock field")]
    InvalidClock,
    #[error("each side must have exactly one king")]
    BadKingCount,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("move string too short")]
    TooShort,
    #[error("invalid square notation")]
    InvalidSquare,
    #[error("invalid promotion piece")]
    InvalidPromotion,
    #[error("move is not legal in this position")]
    Illegal,
}

fn uci_to_square(uci: &str) -> Result<usize, MoveParseError> {
    let bytes = uci.as_bytes();
    if bytes.len() < 2 {
        return Err(MoveParseError::InvalidSquare);
    }
    let (file, rank) = (bytes[0], bytes[1]);
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return Err(MoveParseError::InvalidSquare);
    }
    Ok((rank - b'1') as usize * 8 + (file - b'a') as usize)
}

/// Parse a long-algebraic move string against the current legal moves.
pub fn parse_uci_move(board: &mut Board, uci: &str) -> Result<Move, MoveParseError> {
    if uci.len() < 4 {
        return Err(MoveParseError::TooShort);
    }
    let from = uci_to_square(&uci[0..2])?;
    let to = uci_to_square(&uci[2..4])?;
    let promotion = match uci.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(PieceKind::Queen),
        Some(b'r') => Some(PieceKind::Rook),
        Some(b'b') => Some(PieceKind::Bishop),
        Some(b'n') => Some(PieceKind::Knight),
        Some(_) => return Err(MoveParseError::InvalidPromotion),
    };

    let candidate = new_move(from, to, promotion);
    if board.generate_moves().contains(&candidate) {
        Ok(candidate)
    } else {
        Err(MoveParseError::Illegal)
    }
}

/// Everything needed to reverse one make_move.
#[derive(Debug, Clone, Copy)]
pub struct Undo {
    pub mv: Move,
    pub moved_piece: PieceKind,
    pub captured_piece: Option<PieceKind>,
    pub captured_sq: usize,
    pub prev_ep: Option<u8>,
    pub prev_castling: u8,
    pub prev_halfmove: u16,
    pub prev_fullmove: u16,
    pub prev_side: Color,
    pub prev_zobrist: u64,
}

// Castling rights that survive a move touching each square. Bit layout:
// bit 3 = K, bit 2 = Q, bit 1 = k, bit 0 = q. Only the king and rook home
// squares clear anything; a move from OR to such a square drops the right.
const CASTLE_MASK: [u8; 64] = {
    let mut mask = [0b1111u8; 64];
    mask[0] = 0b1011; // a1 rook gone -> no white queenside
    mask[4] = 0b0011; // e1 king moved -> white loses both
    mask[7] = 0b0111; // h1 rook gone -> no white kingside
    mask[56] = 0b1110; // a8
    mask[60] = 0b1100; // e8
    mask[63] = 0b1101; // h8
    mask
};

pub const WHITE_KINGSIDE: u8 = 0b1000;
pub const WHITE_QUEENSIDE: u8 = 0b0100;
pub const BLACK_KINGSIDE: u8 = 0b0010;
pub const BLACK_QUEENSIDE: u8 = 0b0001;

#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    // 12 bitboards: 0-5 = white P,N,B,R,Q,K; 6-11 = black P,N,B,R,Q,K
    piece_bb: [u64; 12],
    // Redundant mailbox for O(1) piece-at queries; kept in lockstep with
    // the bitboards by set_piece/remove_piece.
    squares: [Option<(PieceKind, Color)>; 64],
    pub white_occ: u64,
    pub black_occ: u64,
    pub occ: u64,
    pub side: Color,
    pub castling: u8,
    pub ep: Option<u8>,
    pub halfmove: u16,
    pub fullmove: u16,
    pub zobrist: u64,
    white_king_sq: u8,
    black_king_sq: u8,
}

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Empty board to be populated via FEN setup.
    pub fn new() -> Self {
        Self {
            piece_bb: [0; 12],
            squares: [None; 64],
            white_occ: 0,
            black_occ: 0,
            occ: 0,
            side: Color::White,
            castling: 0,
            ep: None,
            halfmove: 0,
            fullmove: 1,
            zobrist: 0,
            white_king_sq: 0,
            black_king_sq: 0,
        }
    }

    pub fn startpos() -> Self {
        let mut board = Self::new();
        board
            .set_from_fen(START_FEN)
            .expect("the start FEN is well formed");
        board
    }

    #[inline]
    pub fn piece_bb(&self, kind: PieceKind, color: Color) -> u64 {
        self.piece_bb[piece_index(kind, color)]
    }

    #[inline]
    pub fn piece_on(&self, sq: usize) -> Option<(PieceKind, Color)> {
        self.squares[sq]
    }

    #[inline]
    pub fn occupancy(&self) -> u64 {
        self.occ
    }

    #[inline]
    pub fn is_occupied(&self, sq: usize) -> bool {
        self.squares[sq].is_some()
    }

    #[inline]
    pub fn king_sq(&self, side: Color) -> usize {
        match side {
            Color::White => self.white_king_sq as usize,
            Color::Black => self.black_king_sq as usize,
        }
    }

    pub fn set_piece(&mut self, sq: usize, kind: PieceKind, color: Color) {
        self.piece_bb[piece_index(kind, color)] |= 1u64 << sq;
        self.squares[sq] = Some((kind, color));
        if kind == PieceKind::King {
            match color {
                Color::White => self.white_king_sq = sq as u8,
                Color::Black => self.black_king_sq = sq as u8,
            }
        }
    }

    pub fn remove_piece(&mut self, sq: usize, kind: PieceKind, color: Color) {
        self.piece_bb[piece_index(kind, color)] &= !(1u64 << sq);
        self.squares[sq] = None;
    }

    /// Rebuild the occupancy unions from the piece bitboards.
    pub fn refresh_occupancy(&mut self) {
        self.white_occ = 0;
        self.black_occ = 0;
        for i in 0..6 {
            self.white_occ |= self.piece_bb[i];
            self.black_occ |= self.piece_bb[i + 6];
        }
        self.occ = self.white_occ | self.black_occ;
    }

    #[inline]
    pub fn occ_of(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_occ,
            Color::Black => self.black_occ,
        }
    }

    #[inline]
    pub fn zobrist_key(&self) -> u64 {
        self.zobrist
    }

    pub fn recalc_zobrist(&self) -> u64 {
        zobrist::recalc_full(self)
    }

    /// Null-move material condition: any non-pawn piece besides the king.
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        self.piece_bb(PieceKind::Knight, color)
            | self.piece_bb(PieceKind::Bishop, color)
            | self.piece_bb(PieceKind::Rook, color)
            | self.piece_bb(PieceKind::Queen, color)
            != 0
    }

    // Attack detection ------------------------------------------------

    /// All pieces of `by` that attack `sq` under the given occupancy,
    /// by reverse-attack reasoning: a white pawn attacks sq exactly when
    /// it stands on a square a black pawn on sq would attack, and the
    /// sliding lookups are symmetric.
    pub fn attackers_to(&self, sq: usize, by: Color, occ: u64) -> u64 {
        let mut attackers =
            utils::pawn_attacks(sq, by == Color::Black) & self.piece_bb(PieceKind::Pawn, by);
        attackers |= utils::knight_attacks(sq) & self.piece_bb(PieceKind::Knight, by);
        attackers |= utils::king_attacks(sq) & self.piece_bb(PieceKind::King, by);

        let diagonal = self.piece_bb(PieceKind::Bishop, by) | self.piece_bb(PieceKind::Queen, by);
        if diagonal != 0 {
            attackers |= magic::bishop_attacks(sq, occ) & diagonal;
        }
        let orthogonal = self.piece_bb(PieceKind::Rook, by) | self.piece_bb(PieceKind::Queen, by);
        if orthogonal != 0 {
            attackers |= magic::rook_attacks(sq, occ) & orthogonal;
        }
        attackers
    }

    #[inline]
    pub fn is_square_attacked(&self, sq: usize, by: Color) -> bool {
        self.attackers_to(sq, by, self.occ) != 0
    }

    #[inline]
    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_square_attacked(self.king_sq(color), color.opposite())
    }

    /// A capture under the current board state, including en passant.
    /// Must be asked before the move is made.
    pub fn is_capture(&self, mv: Move) -> bool {
        let to = move_to_sq(mv);
        if self.squares[to].is_some() {
            return true;
        }
        let from = move_from_sq(mv);
        matches!(self.squares[from], Some((PieceKind::Pawn, _)))
            && self.ep == Some(to as u8)
            && from % 8 != to % 8
    }

    // Make / unmake ----------------------------------------------------

    pub fn make_move(&mut self, mv: Move) -> Undo {
        let keys = zobrist::keys();
        let from = move_from_sq(mv);
        let to = move_to_sq(mv);
        let (piece, color) = self.squares[from].expect("make_move from an empty square");
        let promotion = move_promotion(mv);

        // En passant: a pawn sliding diagonally onto the vacant ep square.
        // The captured pawn sits on the file of `to`, rank of `from`.
        let is_ep = piece == PieceKind::Pawn
            && self.ep == Some(to as u8)
            && from % 8 != to % 8;
        let captured_sq = if is_ep { (from / 8) * 8 + to % 8 } else { to };
        let captured_piece = if is_ep {
            Some(PieceKind::Pawn)
        } else {
            self.squares[to].map(|(kind, _)| kind)
        };

        let undo = Undo {
            mv,
            moved_piece: piece,
            captured_piece,
            captured_sq,
            prev_ep: self.ep,
            prev_castling: self.castling,
            prev_halfmove: self.halfmove,
            prev_fullmove: self.fullmove,
            prev_side: self.side,
            prev_zobrist: self.zobrist,
        };

        let mut h = self.zobrist;

        // Old ep file and castling mask leave the hash first.
        if let Some(ep_sq) = self.ep {
            h ^= keys.ep_file[(ep_sq % 8) as usize];
        }
        h ^= keys.castling[self.castling as usize];

        // Captured piece out.
        if let Some(captured) = captured_piece {
            h ^= keys.piece[piece_index(captured, color.opposite())][captured_sq];
            self.remove_piece(captured_sq, captured, color.opposite());
        }

        // Mover out at from, mover-or-promotion in at to.
        let placed = promotion.unwrap_or(piece);
        h ^= keys.piece[piece_index(piece, color)][from];
        h ^= keys.piece[piece_index(placed, color)][to];
        self.remove_piece(from, piece, color);
        self.set_piece(to, placed, color);

        // Castling: a king move of two files drags its rook along.
        if piece == PieceKind::King && from.abs_diff(to) == 2 {
            let (rook_from, rook_to) = match to {
                6 => (7, 5),    // e1g1, h1 -> f1
                2 => (0, 3),    // e1c1, a1 -> d1
                62 => (63, 61), // e8g8, h8 -> f8
                _ => (56, 59),  // e8c8, a8 -> d8
            };
            self.remove_piece(rook_from, PieceKind::Rook, color);
            self.set_piece(rook_to, PieceKind::Rook, color);
            h ^= keys.piece[piece_index(PieceKind::Rook, color)][rook_from];
            h ^= keys.piece[piece_index(PieceKind::Rook, color)][rook_to];
        }

        // Rights drop when the king or a rook leaves home, or a rook is
        // captured on home. The per-square mask covers all three cases.
        self.castling &= CASTLE_MASK[from] & CASTLE_MASK[to];
        h ^= keys.castling[self.castling as usize];

        // New ep target only behind a double-pushed pawn.
        self.ep = if piece == PieceKind::Pawn && from.abs_diff(to) == 16 {
            Some(((from + to) / 2) as u8)
        } else {
            None
        };
        if let Some(ep_sq) = self.ep {
            h ^= keys.ep_file[(ep_sq % 8) as usize];
        }

        self.halfmove = if piece == PieceKind::Pawn || captured_piece.is_some() {
            0
        } else {
            self.halfmove + 1
        };
        if self.side == Color::Black {
            self.fullmove += 1;
        }
        self.side = self.side.opposite();
        h ^= keys.side;

        self.zobrist = h;
        self.refresh_occupancy();
        undo
    }

    pub fn unmake_move(&mut self, undo: Undo) {
        self.side = undo.prev_side;
        self.halfmove = undo.prev_halfmove;
        self.fullmove = undo.prev_fullmove;
        self.ep = undo.prev_ep;
        self.castling = undo.prev_castling;
        self.zobrist = undo.prev_zobrist;

        let from = move_from_sq(undo.mv);
        let to = move_to_sq(undo.mv);
        let mover_color = undo.prev_side;

        // The destination holds the promoted piece for promotions.
        let placed = move_promotion(undo.mv).unwrap_or(undo.moved_piece);
        self.remove_piece(to, placed, mover_color);
        self.set_piece(from, undo.moved_piece, mover_color);

        if let Some(captured) = undo.captured_piece {
            self.set_piece(undo.captured_sq, captured, mover_color.opposite());
        }

        if undo.moved_piece == PieceKind::King && from.abs_diff(to) == 2 {
            let (rook_from, rook_to) = match to {
                6 => (7, 5),
                2 => (0, 3),
                62 => (63, 61),
                _ => (56, 59),
            };
            self.remove_piece(rook_to, PieceKind::Rook, mover_color);
            self.set_piece(rook_from, PieceKind::Rook, mover_color);
        }

        self.refresh_occupancy();
    }

    /// Skip the turn. Only the side, ep target and hash change; used for
    /// null-move pruning.
    pub fn make_null_move(&mut self) -> Undo {
        let keys = zobrist::keys();
        let undo = Undo {
            mv: MOVE_NONE,
            moved_piece: PieceKind::Pawn,
            captured_piece: None,
            captured_sq: 0,
            prev_ep: self.ep,
            prev_castling: self.castling,
            prev_halfmove: self.halfmove,
            prev_fullmove: self.fullmove,
            prev_side: self.side,
            prev_zobrist: self.zobrist,
        };
        if let Some(ep_sq) = self.ep {
            self.zobrist ^= keys.ep_file[(ep_sq % 8) as usize];
        }
        self.ep = None;
        self.side = self.side.opposite();
        self.zobrist ^= keys.side;
        undo
    }

    pub fn unmake_null_move(&mut self, undo: Undo) {
        self.side = undo.prev_side;
        self.ep = undo.prev_ep;
        self.castling = undo.prev_castling;
        self.halfmove = undo.prev_halfmove;
        self.fullmove = undo.prev_fullmove;
        self.zobrist = undo.prev_zobrist;
    }

    // Move generation --------------------------------------------------

    /// Every move that leaves the mover's own king safe. Legality is
    /// settled by make-and-test, which also covers the ep rank-pin case.
    pub fn generate_moves(&mut self) -> Vec<Move> {
        let mut pseudo = Vec::with_capacity(64);
        self.generate_pseudo_moves(&mut pseudo);
        self.filter_legal(pseudo)
    }

    /// Captures and promotions only, for the quiescence search.
    pub fn generate_captures(&mut self) -> Vec<Move> {
        let mut pseudo = Vec::with_capacity(64);
        self.generate_pseudo_moves(&mut pseudo);
        pseudo.retain(|&mv| self.is_capture(mv) || move_promotion(mv).is_some());
        self.filter_legal(pseudo)
    }

    fn filter_legal(&mut self, pseudo: Vec<Move>) -> Vec<Move> {
        let mover = self.side;
        let mut legal = Vec::with_capacity(pseudo.len());
        for mv in pseudo {
            let undo = self.make_move(mv);
            if !self.is_in_check(mover) {
                legal.push(mv);
            }
            self.unmake_move(undo);
        }
        legal
    }

    pub fn generate_pseudo_moves(&self, out: &mut Vec<Move>) {
        self.generate_pawn_pseudos(self.side, out);
        self.generate_knight_pseudos(self.side, out);
        self.generate_slider_pseudos(self.side, out);
        self.generate_king_pseudos(self.side, out);
    }

    fn generate_pawn_pseudos(&self, side: Color, out: &mut Vec<Move>) {
        let pawns = self.piece_bb(PieceKind::Pawn, side);
        let empty = !self.occ;
        let (prom_rank, enemy_occ) = match side {
            Color::White => (utils::RANK_8, self.black_occ),
            Color::Black => (utils::RANK_1, self.white_occ),
        };

        let push_dest = match side {
            Color::White => (pawns << 8) & empty,
            Color::Black => (pawns >> 8) & empty,
        };

        // Single pushes, promotions expanded at the back rank.
        let mut bb = push_dest;
        while let Some(to) = utils::pop_lsb(&mut bb) {
            let from = match side {
                Color::White => to - 8,
                Color::Black => to + 8,
            };
            if (1u64 << to) & prom_rank != 0 {
                for kind in PROMOTION_KINDS {
                    out.push(new_move(from, to, Some(kind)));
                }
            } else {
                out.push(new_move(from, to, None));
            }
        }

        // Double pushes from the start rank, both squares empty.
        let start_rank = match side {
            Color::White => utils::RANK_2,
            Color::Black => utils::RANK_7,
        };
        let first_push = match side {
            Color::White => ((pawns & start_rank) << 8) & empty,
            Color::Black => ((pawns & start_rank) >> 8) & empty,
        };
        let mut bb = match side {
            Color::White => (first_push << 8) & empty,
            Color::Black => (first_push >> 8) & empty,
        };
        while let Some(to) = utils::pop_lsb(&mut bb) {
            let from = match side {
                Color::White => to - 16,
                Color::Black => to + 16,
            };
            out.push(new_move(from, to, None));
        }

        // Diagonal captures; the ep square counts as an enemy-occupied
        // target even though it is empty.
        let mut targets = enemy_occ;
        if let Some(ep_sq) = self.ep {
            targets |= 1u64 << ep_sq;
        }
        for (shift_ok, delta) in [(utils::NOT_FILE_H, 1i32), (utils::NOT_FILE_A, -1i32)] {
            let capture_dest = match side {
                Color::White => {
                    if delta == 1 {
                        ((pawns & shift_ok) << 9) & targets
                    } else {
                        ((pawns & shift_ok) << 7) & targets
                    }
                }
                Color::Black => {
                    if delta == 1 {
                        ((pawns & shift_ok) >> 7) & targets
                    } else {
                        ((pawns & shift_ok) >> 9) & targets
                    }
                }
            };
            let mut bb = capture_dest;
            while let Some(to) = utils::pop_lsb(&mut bb) {
                let from = match (side, delta) {
                    (Color::White, 1) => to - 9,
                    (Color::White, _) => to - 7,
                    (Color::Black, 1) => to + 7,
                    (Color::Black, _) => to + 9,
                };
                if (1u64 << to) & prom_rank != 0 {
                    for kind in PROMOTION_KINDS {
                        out.push(new_move(from, to, Some(kind)));
                    }
                } else {
                    out.push(new_move(from, to, None));
                }
            }
        }
    }

    fn generate_knight_pseudos(&self, side: Color, out: &mut Vec<Move>) {
        let own = self.occ_of(side);
        let mut knights = self.piece_bb(PieceKind::Knight, side);
        while let Some(from) = utils::pop_lsb(&mut knights) {
            let mut dests = utils::knight_attacks(from) & !own;
            while let Some(to) = utils::pop_lsb(&mut dests) {
                out.push(new_move(from, to, None));
            }
        }
    }

    fn generate_slider_pseudos(&self, side: Color, out: &mut Vec<Move>) {
        let own = self.occ_of(side);
        for kind in [PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen] {
            let mut pieces = self.piece_bb(kind, side);
            while let Some(from) = utils::pop_lsb(&mut pieces) {
                let attacks = match kind {
                    PieceKind::Bishop => magic::bishop_attacks(from, self.occ),
                    PieceKind::Rook => magic::rook_attacks(from, self.occ),
                    _ => magic::queen_attacks(from, self.occ),
                };
                let mut dests = attacks & !own;
                while let Some(to) = utils::pop_lsb(&mut dests) {
                    out.push(new_move(from, to, None));
                }
            }
        }
    }

    fn generate_king_pseudos(&self, side: Color, out: &mut Vec<Move>) {
        let own = self.occ_of(side);
        let mut kings = self.piece_bb(PieceKind::King, side);
        while let Some(from) = utils::pop_lsb(&mut kings) {
            let mut dests = utils::king_attacks(from) & !own;
            while let Some(to) = utils::pop_lsb(&mut dests) {
                out.push(new_move(from, to, None));
            }
            self.generate_castling_moves(side, from, out);
        }
    }

    fn generate_castling_moves(&self, side: Color, king_from: usize, out: &mut Vec<Move>) {
        let king_home = if side == Color::White { 4 } else { 60 };
        if king_from != king_home {
            return;
        }
        let enemy = side.opposite();

        // Kingside: f/g empty, rook home, king path e-f-g unattacked.
        let (ks_right, rook_home, empties, path) = match side {
            Color::White => (WHITE_KINGSIDE, 7usize, [5usize, 6], [4usize, 5, 6]),
            Color::Black => (BLACK_KINGSIDE, 63, [61, 62], [60, 61, 62]),
        };
        if self.castling & ks_right != 0
            && self.piece_bb(PieceKind::Rook, side) & (1u64 << rook_home) != 0
            && empties.iter().all(|&sq| !self.is_occupied(sq))
            && path.iter().all(|&sq| !self.is_square_attacked(sq, enemy))
        {
            out.push(new_move(king_from, path[2], None));
        }

        // Queenside: b/c/d empty; only e-d-c must be unattacked, the
        // b-file square may be covered.
        let (qs_right, rook_home, empties, path) = match side {
            Color::White => (WHITE_QUEENSIDE, 0usize, [1usize, 2, 3], [4usize, 3, 2]),
            Color::Black => (BLACK_QUEENSIDE, 56, [57, 58, 59], [60, 59, 58]),
        };
        if self.castling & qs_right != 0
            && self.piece_bb(PieceKind::Rook, side) & (1u64 << rook_home) != 0
            && empties.iter().all(|&sq| !self.is_occupied(sq))
            && path.iter().all(|&sq| !self.is_square_attacked(sq, enemy))
        {
            out.push(new_move(king_from, path[2], None));
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

// FEN parsing and serialization
impl Board {
    pub fn set_from_fen(&mut self, fen: &str) -> Result<(), FenError> {
        let mut parts = fen.trim().split_whitespace();
        let piece_part = parts.next().ok_or(FenError::MissingField("pieces"))?;
        let side_part = parts.next().ok_or(FenError::MissingField("side"))?;
        let castle_part = parts.next().ok_or(FenError::MissingField("castling"))?;
        let ep_part = parts.next().ok_or(FenError::MissingField("en-passant"))?;
        // Clock fields are optional; absent clocks default to 0 / 1.
        let halfmove_part = parts.next();
        let fullmove_part = parts.next();

        let mut board = Board::new();

        let ranks: Vec<&str> = piece_part.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::BadPlacement);
        }
        for (i, rank_part) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for ch in rank_part.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file += skip as usize;
                } else {
                    if file >= 8 {
                        return Err(FenError::BadPlacement);
                    }
                    let (kind, color) = match ch {
                        'P' => (PieceKind::Pawn, Color::White),
                        'N' => (PieceKind::Knight, Color::White),
                        'B' => (PieceKind::Bishop, Color::White),
                        'R' => (PieceKind::Rook, Color::White),
                        'Q' => (PieceKind::Queen, Color::White),
                        'K' => (PieceKind::King, Color::White),
                        'p' => (PieceKind::Pawn, Color::Black),
                        'n' => (PieceKind::Knight, Color::Black),
                        'b' => (PieceKind::Bishop, Color::Black),
                        'r' => (PieceKind::Rook, Color::Black),
                        'q' => (PieceKind::Queen, Color::Black),
                        'k' => (PieceKind::King, Color::Black),
                        _ => return Err(FenError::InvalidPiece(ch)),
                    };
                    board.set_piece(rank * 8 + file, kind, color);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenError::BadPlacement);
            }
        }

        if board.piece_bb(PieceKind::King, Color::White).count_ones() != 1
            || board.piece_bb(PieceKind::King, Color::Black).count_ones() != 1
        {
            return Err(FenError::BadKingCount);
        }

        board.side = match side_part {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(FenError::InvalidSide),
        };

        for ch in castle_part.chars() {
            match ch {
                'K' => board.castling |= WHITE_KINGSIDE,
                'Q' => board.castling |= WHITE_QUEENSIDE,
                'k' => board.castling |= BLACK_KINGSIDE,
                'q' => board.castling |= BLACK_QUEENSIDE,
                '-' => {}
                _ => return Err(FenError::InvalidCastling),
            }
        }

        board.ep = match ep_part {
            "-" => None,
            s => {
                let bytes = s.as_bytes();
                if bytes.len() != 2
                    || !(b'a'..=b'h').contains(&bytes[0])
                    || !(bytes[1] == b'3' || bytes[1] == b'6')
                {
                    return Err(FenError::InvalidEnPassant);
                }
                Some((bytes[1] - b'1') * 8 + (bytes[0] - b'a'))
            }
        };

        board.halfmove = match halfmove_part {
            Some(s) => s.parse().map_err(|_| FenError::InvalidClock)?,
            None => 0,
        };
        board.fullmove = match fullmove_part {
            Some(s) => s.parse().map_err(|_| FenError::InvalidClock)?,
            None => 1,
        };

        board.refresh_occupancy();
        board.zobrist = board.recalc_zobrist();
        *self = board;
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empties = 0;
            for file in 0..8 {
                match self.squares[rank * 8 + file] {
                    None => empties += 1,
                    Some((kind, color)) => {
                        if empties > 0 {
                            fen.push(char::from_digit(empties, 10).unwrap());
                            empties = 0;
                        }
                        fen.push(piece_char(kind, color));
                    }
                }
            }
            if empties > 0 {
                fen.push(char::from_digit(empties, 10).unwrap());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side == Color::White { 'w' } else { 'b' });

        fen.push(' ');
        if self.castling == 0 {
            fen.push('-');
        } else {
            for (right, ch) in [
                (WHITE_KINGSIDE, 'K'),
                (WHITE_QUEENSIDE, 'Q'),
                (BLACK_KINGSIDE, 'k'),
                (BLACK_QUEENSIDE, 'q'),
            ] {
                if self.castling & right != 0 {
                    fen.push(ch);
                }
            }
        }

        fen.push(' ');
        match self.ep {
            None => fen.push('-'),
            Some(sq) => fen.push_str(&square_to_uci(sq as usize)),
        }

        fen.push_str(&format!(" {} {}", self.halfmove, self.fullmove));
        fen
    }
}

fn piece_char(kind: PieceKind, color: Color) -> char {
    let ch = match kind {
        PieceKind::Pawn => 'p',
        PieceKind::Knight => 'n',
        PieceKind::Bishop => 'b',
        PieceKind::Rook => 'r',
        PieceKind::Queen => 'q',
        PieceKind::King => 'k',
    };
    if color == Color::White {
        ch.to_ascii_uppercase()
    } else {
        ch
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Board({})", self.to_fen())
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                match self.squares[rank * 8 + file] {
                    Some((kind, color)) => write!(f, "{} ", piece_char(kind, color))?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
