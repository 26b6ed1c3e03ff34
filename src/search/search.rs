//! Iterative-deepening negamax search.
//!
//! Alpha-beta with principal-variation search, null-move pruning, late-move
//! reductions and a quiescence extension over captures and promotions.
//! Move ordering stacks the transposition-table move, MVV-LVA captures,
//! queen promotions, two killer slots per ply and a color/from/to history
//! table. Cancellation is cooperative: the stop flag and the clock are
//! polled every 1024 nodes and between root moves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::params::{SearchParams, SearchResult};
use super::stats::SearchStats;
use super::tt::{NodeType, TranspositionTable};
use crate::board::{
    move_from_sq, move_promotion, move_to_sq, Board, Move, PieceKind, MOVE_NONE,
};
use crate::eval;

pub const INFINITE: i32 = 32_000;
pub const MATE: i32 = 31_000;
/// Scores at or beyond this are mate-in-N; N plies = MATE - |score|.
pub const MATE_THRESHOLD: i32 = 30_000;

pub const MAX_PLY: usize = 128;

const NULL_MOVE_REDUCTION: i32 = 2;
const STOP_POLL_MASK: u64 = 1023;

pub struct Search {
    board: Board,
    tt: Arc<TranspositionTable>,
    params: SearchParams,
    stats: SearchStats,

    /// Two killer slots per ply.
    killers: [[Move; 2]; MAX_PLY],

    /// History heuristic, indexed [color][from][to].
    history: [[[i32; 64]; 64]; 2],

    stop: Arc<AtomicBool>,
    start_time: Instant,
    stopped: bool,

    /// Per-worker ordering perturbation for Lazy-SMP divergence; zero
    /// means untouched ordering.
    ordering_seed: u64,
}

impl Search {
    pub fn new(board: Board, tt_size_mb: usize, params: SearchParams) -> Self {
        Self::with_tt(board, Arc::new(TranspositionTable::new(tt_size_mb)), params)
    }

    pub fn with_tt(board: Board, tt: Arc<TranspositionTable>, params: SearchParams) -> Self {
        Self {
            board,
            tt,
            params,
            stats: SearchStats::new(),
            killers: [[MOVE_NONE; 2]; MAX_PLY],
            history: [[[0; 64]; 64]; 2],
            stop: Arc::new(AtomicBool::new(false)),
            start_time: Instant::now(),
            stopped: false,
            ordering_seed: 0,
        }
    }

    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_ordering_seed(mut self, seed: u64) -> Self {
        self.ordering_seed = seed;
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn set_board(&mut self, board: Board) {
        self.board = board;
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Iterative deepening driver. Each depth is seeded with the previous
    /// best move; the result of an interrupted depth is only kept when
    /// nothing shallower completed.
    pub fn search(&mut self) -> SearchResult {
        self.stats.reset();
        self.stats.start_timing();
        self.start_time = Instant::now();
        self.stopped = false;
        self.tt.new_search();

        let mut result = SearchResult {
            score: -INFINITE,
            ..SearchResult::default()
        };

        // A root position past the fifty-move clock is already drawn.
        if self.board.halfmove >= 100 {
            result.score = 0;
            result.best_move = self.board.generate_moves().first().copied().unwrap_or(MOVE_NONE);
            return result;
        }

        let max_depth = self.params.max_depth.min(MAX_PLY as u8 - 1).max(1);
        for depth in 1..=max_depth {
            let (best_move, score) = self.search_root(depth, result.best_move);

            if self.stopped {
                // A partially searched depth is unreliable, except when
                // no depth completed at all.
                if result.best_move == MOVE_NONE && best_move != MOVE_NONE {
                    result.best_move = best_move;
                    result.score = score;
                    result.depth_reached = depth;
                }
                break;
            }

            result.best_move = best_move;
            result.score = score;
            result.depth_reached = depth;
            result.pv = self.extract_pv(depth as usize);

            if score.abs() >= MATE_THRESHOLD {
                break;
            }
            if self.out_of_time() {
                break;
            }
        }

        // Never return the null move from a live position.
        if result.best_move == MOVE_NONE {
            if let Some(&fallback) = self.board.generate_moves().first() {
                result.best_move = fallback;
            }
        }

        self.stats.update_timing();
        result.nodes = self.stats.nodes;
        result.nps = self.stats.nps;
        result
    }

    fn search_root(&mut self, depth: u8, seed_move: Move) -> (Move, i32) {
        let in_check = self.board.is_in_check(self.board.side);
        let mut moves = self.board.generate_moves();
        if moves.is_empty() {
            return (MOVE_NONE, if in_check { -MATE } else { 0 });
        }
        self.order_moves(&mut moves, seed_move, 0);

        let mut alpha = -INFINITE;
        let beta = INFINITE;
        let mut best_move = moves[0];

        for (index, &mv) in moves.iter().enumerate() {
            if self.should_stop() {
                self.stopped = true;
                break;
            }

            let undo = self.board.make_move(mv);
            self.stats.inc_node();
            let score = if index == 0 {
                -self.negamax(depth as i32 - 1, -beta, -alpha, 1, true)
            } else {
                // PVS: null window first, full re-search on improvement.
                let tentative = -self.negamax(depth as i32 - 1, -alpha - 1, -alpha, 1, true);
                if tentative > alpha && !self.stopped {
                    -self.negamax(depth as i32 - 1, -beta, -alpha, 1, true)
                } else {
                    tentative
                }
            };
            self.board.unmake_move(undo);

            if self.stopped {
                break;
            }
            if score > alpha {
                alpha = score;
                best_move = mv;
            }
        }

        if !self.stopped {
            self.tt
                .store(self.board.zobrist_key(), alpha, depth, NodeType::Exact, best_move);
        }
        (best_move, alpha)
    }

    fn negamax(&mut self, depth: i32, mut alpha: i32, beta: i32, ply: usize, allow_null: bool) -> i32 {
        self.stats.inc_node();
        if self.stats.nodes & STOP_POLL_MASK == 0 && self.should_stop() {
            self.stopped = true;
        }
        if self.stopped {
            return 0;
        }
        if ply >= MAX_PLY {
            return eval::evaluate(&self.board);
        }
        if self.board.halfmove >= 100 {
            return 0;
        }

        let key = self.board.zobrist_key();
        let mut tt_move = MOVE_NONE;
        if let Some(entry) = self.tt.probe(key) {
            self.stats.inc_tt_hit();
            tt_move = entry.best_move;
            if entry.depth as i32 >= depth {
                match entry.node_type {
                    NodeType::Exact => return entry.score,
                    NodeType::LowerBound if entry.score >= beta => return entry.score,
                    NodeType::UpperBound if entry.score <= alpha => return entry.score,
                    _ => {}
                }
            }
        }

        if depth <= 0 {
            return self.quiescence(alpha, beta, ply);
        }

        let in_check = self.board.is_in_check(self.board.side);

        // Null-move pruning: hand the opponent a free move; if the reduced
        // search still fails high the real position almost surely does too.
        // Skipped in check and in pawn endings (zugzwang).
        if allow_null
            && self.params.enable_null_move
            && depth >= 3
            && !in_check
            && self.board.has_non_pawn_material(self.board.side)
        {
            let undo = self.board.make_null_move();
            let score = -self.negamax(
                depth - 1 - NULL_MOVE_REDUCTION,
                -beta,
                -beta + 1,
                ply + 1,
                false,
            );
            self.board.unmake_null_move(undo);
            if self.stopped {
                return 0;
            }
            if score >= beta {
                self.stats.inc_null_cutoff();
                return beta;
            }
        }

        let mut moves = self.board.generate_moves();
        if moves.is_empty() {
            return if in_check { -MATE + ply as i32 } else { 0 };
        }
        self.order_moves(&mut moves, tt_move, ply);

        let orig_alpha = alpha;
        let mut best_move = MOVE_NONE;

        for (index, &mv) in moves.iter().enumerate() {
            let quiet = !self.board.is_capture(mv) && move_promotion(mv).is_none();

            let undo = self.board.make_move(mv);
            let gives_check = self.board.is_in_check(self.board.side);

            let score = if index == 0 {
                -self.negamax(depth - 1, -beta, -alpha, ply + 1, true)
            } else {
                // Late quiet moves get a reduced null-window probe first.
                let mut reduction = 0;
                if self.params.enable_lmr
                    && depth >= 3
                    && index >= 4
                    && quiet
                    && !in_check
                    && !gives_check
                {
                    reduction = lmr_reduction(depth, index);
                }

                let mut tentative =
                    -self.negamax(depth - 1 - reduction, -alpha - 1, -alpha, ply + 1, true);
                if tentative > alpha && reduction > 0 && !self.stopped {
                    tentative = -self.negamax(depth - 1, -alpha - 1, -alpha, ply + 1, true);
                }
                if tentative > alpha && tentative < beta && !self.stopped {
                    tentative = -self.negamax(depth - 1, -beta, -alpha, ply + 1, true);
                }
                tentative
            };

            self.board.unmake_move(undo);
            if self.stopped {
                return 0;
            }

            if score >= beta {
                self.tt.store(key, beta, depth as u8, NodeType::LowerBound, mv);
                if quiet {
                    self.store_killer(ply, mv);
                    self.bump_history(mv, depth);
                }
                self.stats.inc_cutoff();
                return beta;
            }
            if score > alpha {
                alpha = score;
                best_move = mv;
            }
        }

        let node_type = if alpha > orig_alpha {
            NodeType::Exact
        } else {
            NodeType::UpperBound
        };
        self.tt.store(key, alpha, depth as u8, node_type, best_move);
        alpha
    }

    /// Captures-and-promotions extension past the horizon. The stand-pat
    /// score may both cut and raise alpha, so a quiet position collapses
    /// to the static evaluation.
    fn quiescence(&mut self, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        self.stats.inc_node();
        self.stats.inc_qnode();
        if self.stats.nodes & STOP_POLL_MASK == 0 && self.should_stop() {
            self.stopped = true;
        }
        if self.stopped {
            return 0;
        }

        let stand_pat = eval::evaluate(&self.board);
        if ply >= MAX_PLY {
            return stand_pat;
        }
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut moves = self.board.generate_captures();
        self.order_moves(&mut moves, MOVE_NONE, ply);

        for &mv in &moves {
            let undo = self.board.make_move(mv);
            let score = -self.quiescence(-beta, -alpha, ply + 1);
            self.board.unmake_move(undo);
            if self.stopped {
                return 0;
            }
            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }
        alpha
    }

    // Move ordering ----------------------------------------------------

    fn order_moves(&self, moves: &mut [Move], tt_move: Move, ply: usize) {
        let mut scored: Vec<(i32, Move)> = moves
            .iter()
            .map(|&mv| (self.score_move(mv, tt_move, ply), mv))
            .collect();
        scored.sort_by_key(|&(score, _)| std::cmp::Reverse(score));
        for (slot, (_, mv)) in moves.iter_mut().zip(scored) {
            *slot = mv;
        }
    }

    fn score_move(&self, mv: Move, tt_move: Move, ply: usize) -> i32 {
        if mv == tt_move && tt_move != MOVE_NONE {
            return 1_000_000;
        }

        if self.board.is_capture(mv) {
            let victim = match self.board.piece_on(move_to_sq(mv)) {
                Some((kind, _)) => kind,
                None => PieceKind::Pawn, // en passant
            };
            let attacker = self.board.piece_on(move_from_sq(mv)).map(|(kind, _)| kind);
            return 100_000 + piece_value(victim) - attacker.map_or(0, piece_value);
        }

        if move_promotion(mv) == Some(PieceKind::Queen) {
            return 90_000;
        }

        if self.killers[ply][0] == mv {
            return 80_000;
        }
        if self.killers[ply][1] == mv {
            return 79_000;
        }

        let mut score = self.history[self.board.side as usize][move_from_sq(mv)][move_to_sq(mv)];
        if self.ordering_seed != 0 {
            // Small deterministic jitter so SMP workers walk different
            // trees; never enough to outrank a real history signal.
            score += ((mv as u64).wrapping_mul(self.ordering_seed) >> 58) as i32;
        }
        score
    }

    fn store_killer(&mut self, ply: usize, mv: Move) {
        if self.killers[ply][0] != mv {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = mv;
        }
    }

    fn bump_history(&mut self, mv: Move, depth: i32) {
        let slot = &mut self.history[self.board.side as usize][move_from_sq(mv)][move_to_sq(mv)];
        *slot = (*slot + depth * depth).min(60_000);
    }

    // Control ----------------------------------------------------------

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.out_of_time()
    }

    fn out_of_time(&self) -> bool {
        if self.params.infinite || !self.params.use_time {
            return false;
        }
        self.start_time.elapsed().as_millis() as u64 >= self.params.time_limit_ms
    }

    /// Walk the principal variation out of the transposition table. Every
    /// step is validated against the legal moves, so a stale entry ends
    /// the line instead of corrupting the board.
    fn extract_pv(&mut self, max_len: usize) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut undos = Vec::new();

        for _ in 0..max_len.min(MAX_PLY) {
            let entry = match self.tt.probe(self.board.zobrist_key()) {
                Some(entry) if entry.best_move != MOVE_NONE => entry,
                _ => break,
            };
            if !self.board.generate_moves().contains(&entry.best_move) {
                break;
            }
            pv.push(entry.best_move);
            undos.push(self.board.make_move(entry.best_move));
        }

        while let Some(undo) = undos.pop() {
            self.board.unmake_move(undo);
        }
        pv
    }
}

fn lmr_reduction(depth: i32, index: usize) -> i32 {
    1 + ((depth as f64).ln() * (index as f64).ln() / 2.0) as i32
}

fn piece_value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => 100,
        PieceKind::Knight => 320,
        PieceKind::Bishop => 330,
        PieceKind::Rook => 500,
        PieceKind::Queen => 900,
        PieceKind::King => 20_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{move_to_uci, new_move};

    fn search_for(fen: &str, depth: u8) -> (Search, SearchResult) {
        crate::init();
        let mut board = Board::new();
        board.set_from_fen(fen).expect("test FEN is valid");
        let params = SearchParams::new().max_depth(depth).time_limit(0);
        let mut search = Search::new(board, 8, params);
        let result = search.search();
        (search, result)
    }

    #[test]
    fn finds_back_rank_mate_in_one() {
        let (_, result) = search_for("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 2);
        assert_eq!(move_to_uci(result.best_move), "a1a8");
        assert!(result.score >= MATE_THRESHOLD, "score {}", result.score);
    }

    #[test]
    fn stalemate_scores_zero() {
        let (_, result) = search_for("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 1);
        assert_eq!(result.best_move, MOVE_NONE);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn promotes_to_queen() {
        let (_, result) = search_for("8/P7/8/8/8/8/8/k6K w - - 0 1", 1);
        assert_eq!(move_to_uci(result.best_move), "a7a8q");
    }

    #[test]
    fn grabs_the_hanging_queen() {
        // White rook a1 can take the undefended queen on a8
        let (_, result) = search_for("q5k1/6pp/8/8/8/8/6PP/R5K1 w - - 0 1", 4);
        assert_eq!(move_to_uci(result.best_move), "a1a8");
    }

    #[test]
    fn reports_nodes_and_depth() {
        let (_, result) = search_for(crate::board::START_FEN, 3);
        assert!(result.nodes > 0);
        assert_eq!(result.depth_reached, 3);
        assert!(!result.pv.is_empty());
    }

    #[test]
    fn pv_starts_with_best_move() {
        let (_, result) = search_for("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 3);
        assert_eq!(result.pv.first().copied(), Some(result.best_move));
    }

    #[test]
    fn killers_shift_not_duplicate() {
        crate::init();
        let board = Board::startpos();
        let mut search = Search::new(board, 1, SearchParams::new());
        let first = new_move(12, 28, None);
        let second = new_move(11, 27, None);

        search.store_killer(3, first);
        search.store_killer(3, first);
        assert_eq!(search.killers[3], [first, MOVE_NONE]);

        search.store_killer(3, second);
        assert_eq!(search.killers[3], [second, first]);
    }

    #[test]
    fn history_bump_is_depth_squared() {
        crate::init();
        let board = Board::startpos();
        let mut search = Search::new(board, 1, SearchParams::new());
        let mv = new_move(12, 28, None);
        search.bump_history(mv, 3);
        assert_eq!(search.history[0][12][28], 9);
        search.bump_history(mv, 4);
        assert_eq!(search.history[0][12][28], 25);
    }

    #[test]
    fn fifty_move_rule_draws_the_search() {
        let (_, result) = search_for("q5k1/6pp/8/8/8/8/6PP/R5K1 w - - 100 80", 2);
        // With the clock expired every line scores as a draw
        assert_eq!(result.score, 0);
    }

    #[test]
    fn stop_flag_halts_the_search() {
        crate::init();
        let board = Board::startpos();
        let params = SearchParams::new().max_depth(64).time_limit(0);
        let stop = Arc::new(AtomicBool::new(true));
        let mut search = Search::new(board, 8, params).with_stop_flag(stop);
        let result = search.search();
        // Stopped immediately, but a legal move still comes back
        assert_ne!(result.best_move, MOVE_NONE);
    }
}
