//! Falchion - Search Module
//!
//! Iterative deepening principal variation search with:
//! - Aspiration windows with directional re-search
//! - Transposition table probing and depth-preferred storing
//! - Mate distance pruning and check extensions
//! - Null move pruning and static beta cutoffs
//! - Internal iterative deepening
//! - Razoring and futility pruning
//! - Late move reductions
//! - Killer and history ordered quiets
//! - SEE-filtered quiescence with delta pruning

use std::io::{self, Write};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crate::bitboard::{RANK_2, RANK_7};
use crate::evaluation::{self, piece_value};
use crate::move_generator::generate_legal;
use crate::movepick::MovePicker;
use crate::moves::{Move, MoveKind};
use crate::parallel_search::SearchContext;
use crate::position::Position;
use crate::tt::Bound;
use crate::types::*;

// Aspiration window half-width after the first full-window iteration
pub const ASPIRATION_WINDOW: i32 = 50;

// Static beta cutoff (reverse futility)
const STATIC_CUTOFF_DEPTH: i32 = 4;
const STATIC_CUTOFF_MARGIN: i32 = 120;

// Null move pruning
const NULL_MOVE_DEPTH: i32 = 3;
const NULL_MOVE_DEEP_DEPTH: i32 = 6;
const NULL_MOVE_REDUCTION: i32 = 2;
const NULL_MOVE_REDUCTION_DEEP: i32 = 3;

// Internal iterative deepening
const IID_DEPTH: i32 = 5;
const IID_REDUCTION: i32 = 2;

// Razoring
const RAZOR_DEPTH: i32 = 3;
const RAZOR_BASE: i32 = 180;
const RAZOR_STEP: i32 = 100;

// Futility margins at depth one and two
const FUTILITY_MARGIN: i32 = 250;
const EXTENDED_FUTILITY_MARGIN: i32 = 450;

// Late move reductions
const LMR_DEPTH: i32 = 3;
const LMR_MOVE_NUMBER: usize = 4;

// Quiescence delta pruning
const DELTA_MARGIN: i32 = 200;

// Clock poll interval, in visited nodes
const NODE_CHECK_INTERVAL: u64 = 10_000;

// Iterative deepening never goes past this depth
pub const MAX_SEARCH_DEPTH: i32 = 100;

/// How a search is bounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchType {
    /// Run until told to stop.
    Infinite,
    /// Budget a slice of the remaining game clock.
    TimePerGame { remaining_ms: u64 },
    /// Fixed budget for this move alone.
    TimePerMove { budget_ms: u64 },
    /// Think on the opponent's time; `ponderhit` converts to a timed
    /// search against the remaining clock.
    Ponder { remaining_ms: u64 },
}

/// Slice of the remaining clock to spend on one move.
pub fn allocate_time(remaining_ms: u64) -> u64 {
    (remaining_ms / 30 - remaining_ms / 60_000).max(1)
}

fn razor_margin(depth: i32) -> i32 {
    RAZOR_BASE + RAZOR_STEP * depth
}

fn is_promoting_pawn(pos: &Position) -> bool {
    let rank = if pos.side_to_move == WHITE { RANK_7 } else { RANK_2 };
    pos.bitboards[pos.side_to_move as usize][PAWN as usize] & rank != 0
}

/// Table moves can be stale or collided; only moves that are legal in
/// the position are worth walking.
fn validated(pos: &mut Position, mv: Move) -> Move {
    if mv.is_null() {
        return Move::NULL;
    }
    if generate_legal(pos).iter().any(|&m| m == mv) {
        mv
    } else {
        Move::NULL
    }
}

// ============================================================================
// PER-WORKER SEARCH STATE
// ============================================================================

/// Killer slots, history counters, node statistics and the clock for
/// one search worker. Never shared between threads.
pub struct SearchInfo {
    pub nodes: u64,
    pub seldepth: usize,
    pub depth: i32,
    pub killers: [[Move; 2]; MAX_PLY],
    history: [[i32; 4096]; 2],
    depth_limit: i32,
    allocated_ms: Option<u64>,
    timer: Instant,
}

impl Default for SearchInfo {
    fn default() -> Self {
        SearchInfo {
            nodes: 0,
            seldepth: 0,
            depth: 1,
            killers: [[Move::NULL; 2]; MAX_PLY],
            history: [[0; 4096]; 2],
            depth_limit: MAX_SEARCH_DEPTH,
            allocated_ms: None,
            timer: Instant::now(),
        }
    }
}

impl SearchInfo {
    /// Reset every per-search counter. `None` means no time budget.
    pub fn new_search(&mut self, time_ms: Option<u64>) {
        self.nodes = 0;
        self.seldepth = 0;
        self.depth = 1;
        self.killers = [[Move::NULL; 2]; MAX_PLY];
        self.history = [[0; 4096]; 2];
        self.allocated_ms = time_ms;
        self.timer = Instant::now();
    }

    /// Swap an unbounded search for a timed one, restarting the clock.
    pub fn set_game_time(&mut self, ms: u64) {
        self.allocated_ms = Some(ms);
        self.timer = Instant::now();
    }

    pub fn set_depth_limit(&mut self, depth: i32) {
        self.depth_limit = depth;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.timer.elapsed().as_millis() as u64
    }

    /// The budget counts as spent at 85% so the iteration in progress
    /// still has room to wind down.
    pub fn time_over(&self) -> bool {
        match self.allocated_ms {
            None => self.depth > self.depth_limit,
            Some(ms) => self.elapsed_ms() as f64 >= ms as f64 * 0.85,
        }
    }

    pub fn history_score(&self, color: u8, mv: Move) -> i32 {
        self.history[color as usize][mv.butterfly_index()]
    }

    pub fn bump_history(&mut self, color: u8, mv: Move, depth: i32) {
        self.history[color as usize][mv.butterfly_index()] += 1 << depth.min(20);
    }

    /// Keep the newest killer in slot 0, demoting the previous one.
    pub fn store_killer(&mut self, mv: Move, ply: usize) {
        if mv != self.killers[ply][0] {
            self.killers[ply][1] = self.killers[ply][0];
        }
        self.killers[ply][0] = mv;
    }
}

// ============================================================================
// SEARCH WORKER
// ============================================================================

/// One search worker. The leader prints and manages the clock; helpers
/// run silently against the shared table.
pub struct Searcher {
    ctx: Arc<SearchContext>,
    pub info: SearchInfo,
    verbose: bool,
    pondering: bool,
    remaining_ms: u64,
    cores: usize,
}

impl Searcher {
    pub fn new(ctx: Arc<SearchContext>, verbose: bool, cores: usize) -> Self {
        Searcher {
            ctx,
            info: SearchInfo::default(),
            verbose,
            pondering: false,
            remaining_ms: 0,
            cores,
        }
    }

    /// A silent single-core worker for the helper pool.
    pub fn helper(ctx: Arc<SearchContext>) -> Self {
        Searcher::new(ctx, false, 1)
    }

    /// Arm the clock and ponder state for one search.
    pub fn prepare(&mut self, stype: SearchType) {
        self.pondering = false;
        match stype {
            SearchType::Infinite => self.info.new_search(None),
            SearchType::Ponder { remaining_ms } => {
                self.pondering = true;
                self.remaining_ms = remaining_ms;
                self.info.new_search(None);
            }
            SearchType::TimePerGame { remaining_ms } => {
                self.remaining_ms = remaining_ms;
                self.info.new_search(Some(allocate_time(remaining_ms)));
            }
            SearchType::TimePerMove { budget_ms } => {
                self.info.new_search(Some(budget_ms));
            }
        }
    }

    /// Deepen until the clock, the depth limit or the stop flag ends
    /// the search, keeping the best move of the last completed depth.
    pub fn iterative_search(&mut self, pos: &mut Position) -> Move {
        let mut to_make = Move::NULL;
        let mut mv = Move::NULL;
        let mut score = -INFINITY;

        if let Some(s) = self.root(self.info.depth, -INFINITY, INFINITY, &mut mv, pos) {
            score = s;
            to_make = mv;
        }
        self.info.depth += 1;

        while (self.info.depth < MAX_SEARCH_DEPTH && !self.info.time_over()) || self.pondering {
            if self.ctx.stop.load(Ordering::Relaxed) {
                break;
            }

            if self.pondering && self.ctx.ponder_hit.swap(false, Ordering::SeqCst) {
                log::debug!("ponderhit: converting to a timed search");
                self.info.set_game_time(allocate_time(self.remaining_ms));
                self.pondering = false;
            }

            self.info.seldepth = 0;
            self.info.nodes = 0;

            if self.info.depth > 5 && self.cores > 1 {
                self.ctx.publish(
                    self.info.depth,
                    score - ASPIRATION_WINDOW,
                    score + ASPIRATION_WINDOW,
                    pos,
                );
            }

            // Aspiration: a narrow window around the previous score,
            // reopening the failed side in full on a miss
            let depth = self.info.depth;
            let mut result = self.root(
                depth,
                score - ASPIRATION_WINDOW,
                score + ASPIRATION_WINDOW,
                &mut mv,
                pos,
            );

            if let Some(s) = result {
                if s <= score - ASPIRATION_WINDOW {
                    result = self.root(depth, -INFINITY, score + ASPIRATION_WINDOW, &mut mv, pos);
                }
            }
            if let Some(s) = result {
                if s >= score + ASPIRATION_WINDOW {
                    result = self.root(depth, score - ASPIRATION_WINDOW, INFINITY, &mut mv, pos);
                }
            }

            // An interrupted depth keeps the previous best move
            if let Some(s) = result {
                score = s;
                to_make = mv;
            }

            self.info.depth += 1;
        }

        self.ctx.stop.store(true, Ordering::SeqCst);
        to_make
    }

    /// One full-width pass over the legal root moves. Returns `None`
    /// when the clock or the stop flag cut the pass short.
    pub fn root(
        &mut self,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        best: &mut Move,
        pos: &mut Position,
    ) -> Option<i32> {
        let start_ms = self.info.elapsed_ms();
        let mut picker = MovePicker::new_root(pos, &self.info);

        // A single legal reply needs no search at all
        if picker.len() == 1 {
            if let Some(mv) = picker.next() {
                *best = mv;
            }
            return Some(alpha);
        }

        let mut i = 0;
        while let Some(mv) = picker.next() {
            if self.info.time_over() || self.ctx.stop.load(Ordering::Relaxed) {
                return None;
            }

            let mut child = pos.play(mv);
            let score = if i == 0 {
                -self.alpha_beta(depth - 1, -beta, -alpha, 1, true, &mut child)
            } else {
                let s = -self.alpha_beta(depth - 1, -alpha - 1, -alpha, 1, false, &mut child);
                if s > alpha {
                    -self.alpha_beta(depth - 1, -beta, -alpha, 1, true, &mut child)
                } else {
                    s
                }
            };
            drop(child);

            if score > alpha {
                *best = mv;
                if score >= beta {
                    if self.verbose {
                        self.report(pos, *best, beta, depth, start_ms);
                    }
                    return Some(beta);
                }
                alpha = score;
            }
            i += 1;
        }

        if self.verbose {
            self.report(pos, *best, alpha, depth, start_ms);
        }
        Some(alpha)
    }

    fn alpha_beta(
        &mut self,
        mut depth: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: usize,
        pv: bool,
        pos: &mut Position,
    ) -> i32 {
        self.info.nodes += 1;

        if ply > self.info.seldepth {
            self.info.seldepth = ply;
        }

        // Only the leader watches the clock; helpers follow its flag
        if self.info.nodes % NODE_CHECK_INTERVAL == 0 && self.verbose && self.info.time_over() {
            self.ctx.stop.store(true, Ordering::SeqCst);
        }
        if self.ctx.stop.load(Ordering::Relaxed) {
            return alpha;
        }

        if ply >= MAX_PLY - 1 {
            return evaluation::evaluate(pos);
        }

        // Mate distance pruning
        alpha = alpha.max(-MATE + ply as i32);
        beta = beta.min(MATE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }

        let (hit, mut hash_move) = self.ctx.tt.probe(pos.hash, depth, alpha, beta);
        if let Some(score) = hit {
            return score;
        }

        let in_check = pos.checkers() != 0;
        if in_check {
            depth += 1;
        }

        if depth <= 0 {
            return self.quiescence(alpha, beta, ply, pos);
        }

        if pos.is_repetition() {
            return DRAW;
        }

        let eval = evaluation::evaluate(pos);

        // Static beta cutoff: the stand-pat score clears beta by a
        // full margin even before a move is tried
        if depth <= STATIC_CUTOFF_DEPTH
            && !pv
            && !in_check
            && alpha.abs() < MATE - MAX_PLY as i32
            && beta.abs() < MATE - MAX_PLY as i32
            && eval - STATIC_CUTOFF_MARGIN * depth >= beta
        {
            return beta;
        }

        // Null move pruning
        if pos.allow_null
            && !pv
            && depth >= NULL_MOVE_DEPTH
            && !in_check
            && !evaluation::is_endgame(pos)
        {
            let r = if depth >= NULL_MOVE_DEEP_DEPTH {
                NULL_MOVE_REDUCTION_DEEP
            } else {
                NULL_MOVE_REDUCTION
            };
            let score = {
                let mut child = pos.play_null();
                -self.alpha_beta(depth - r - 1, -beta, -beta + 1, ply, false, &mut child)
            };
            if score >= beta {
                return beta;
            }
        }

        // Internal iterative deepening: seed the table with an
        // ordering hint when the probe came back empty
        if depth >= IID_DEPTH && hash_move.is_null() && pv {
            let saved = pos.allow_null;
            pos.allow_null = false;
            self.alpha_beta(depth - IID_REDUCTION - 1, alpha, beta, ply, true, pos);
            pos.allow_null = saved;

            let (_, mv) = self.ctx.tt.probe(pos.hash, depth, alpha, beta);
            hash_move = mv;
        }

        // Razoring: verify a hopeless-looking node with a shifted
        // quiescence window before shrinking it away
        if !pv && depth <= RAZOR_DEPTH && eval + razor_margin(depth) <= alpha {
            let margin = razor_margin(depth);
            let res = self.quiescence(alpha - margin, beta - margin, ply, pos);
            if res + margin <= alpha {
                depth -= 1;
            }
            if depth <= 0 {
                return alpha;
            }
        }

        // Futility: flagged here, applied to late quiet moves below
        let mut futility = false;
        if !pv && !in_check && depth == 1 && eval + FUTILITY_MARGIN <= alpha {
            futility = true;
        }
        if !pv && !in_check && depth == 2 && eval + EXTENDED_FUTILITY_MARGIN <= alpha {
            futility = true;
        }

        let pinned = pos.pinned_pieces();
        let us = pos.side_to_move;
        let mut picker = MovePicker::new(pos, &self.info, ply, hash_move);

        let mut bound = Bound::Upper;
        let mut best = hash_move;
        let mut legal = 0;
        let mut move_number = 0usize;
        let mut pruned = false;

        while let Some(mv) = picker.next() {
            if !pos.is_move_legal(mv, pinned) {
                continue;
            }
            legal += 1;

            let capture = pos.is_capture(mv);
            let mut child = pos.play(mv);
            let gives_check = child.in_check();

            if futility && move_number > 0 && !capture && mv.promoted().is_none() && !gives_check {
                pruned = true;
                continue;
            }

            let score = if move_number == 0 {
                -self.alpha_beta(depth - 1, -beta, -alpha, ply + 1, pv, &mut child)
            } else {
                let mut r = 0;
                if move_number >= LMR_MOVE_NUMBER
                    && depth >= LMR_DEPTH
                    && !in_check
                    && !capture
                    && mv.promoted().is_none()
                    && !gives_check
                    && mv != self.info.killers[ply][0]
                    && mv != self.info.killers[ply][1]
                {
                    r = 1 + move_number as i32 / 6;
                }
                let reduced = (depth - r).max(1);

                let s =
                    -self.alpha_beta(reduced - 1, -alpha - 1, -alpha, ply + 1, false, &mut child);
                if s > alpha {
                    -self.alpha_beta(depth - 1, -beta, -alpha, ply + 1, true, &mut child)
                } else {
                    s
                }
            };
            drop(child);

            if score >= beta {
                // The hash move is already ordered first; feeding it
                // back through the killer slots repeats that work
                if mv == hash_move {
                    return beta;
                }
                if !capture {
                    self.info.store_killer(mv, ply);
                    self.info.bump_history(us, mv, depth);
                }
                if !pruned {
                    self.ctx.tt.save(pos.hash, depth, beta, mv, Bound::Lower);
                }
                return beta;
            }

            if score > alpha {
                bound = Bound::Exact;
                alpha = score;
                best = mv;
            }
            move_number += 1;
        }

        if legal == 0 {
            alpha = if in_check { -MATE + ply as i32 } else { DRAW };
        }

        if pos.is_fifty_moves() {
            alpha = DRAW;
        }

        // Forward-pruned nodes carry unreliable scores; keep them out
        // of the table
        if !pruned {
            self.ctx.tt.save(pos.hash, depth, alpha, best, bound);
        }

        alpha
    }

    fn quiescence(&mut self, mut alpha: i32, beta: i32, ply: usize, pos: &mut Position) -> i32 {
        self.info.nodes += 1;

        if ply >= MAX_PLY - 1 {
            return evaluation::evaluate(pos);
        }

        let in_check = pos.checkers() != 0;
        let mut stand_pat = 0;

        if !in_check {
            stand_pat = evaluation::evaluate(pos);
            if stand_pat >= beta {
                return beta;
            }

            // Big delta: even a free queen (plus a pending promotion)
            // cannot lift this node back to alpha
            let mut delta = piece_value(QUEEN);
            if is_promoting_pawn(pos) {
                delta += piece_value(QUEEN) - piece_value(PAWN);
            }
            if stand_pat < alpha - delta {
                return alpha;
            }

            if alpha < stand_pat {
                alpha = stand_pat;
            }
        }

        if pos.is_repetition() {
            return DRAW;
        }

        let pinned = pos.pinned_pieces();
        let mut picker = MovePicker::new_quiescence(pos, &self.info, ply);
        let mut legal = 0;

        while let Some(mv) = picker.next() {
            if !in_check && mv.promoted().is_none() {
                let victim = match mv.kind {
                    MoveKind::EnPassant => PAWN,
                    _ => pos.piece_on(mv.to_sq()).kind,
                };
                if piece_value(victim) + stand_pat + DELTA_MARGIN <= alpha || pos.see(mv) < 0 {
                    continue;
                }
            }

            if !pos.is_move_legal(mv, pinned) {
                continue;
            }
            legal += 1;

            let score = {
                let mut child = pos.play(mv);
                -self.quiescence(-beta, -alpha, ply + 1, &mut child)
            };

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        if in_check && legal == 0 {
            return -MATE + ply as i32;
        }

        alpha
    }

    /// The reply the table expects after `to_make`, for `ponder` hints.
    pub fn ponder_move(&self, pos: &mut Position, to_make: Move) -> Move {
        if to_make.is_null() {
            return Move::NULL;
        }
        let mut child = pos.play(to_make);
        let mv = self.ctx.tt.best_move(child.hash);
        validated(&mut child, mv)
    }

    /// Walk the table along the expected line, stopping at the first
    /// miss or at the reporting depth.
    fn pv_line(&self, pos: &mut Position, first: Move, depth: i32) -> String {
        if first.is_null() || depth == 0 {
            return String::new();
        }
        let mut child = pos.play(first);
        let next = self.ctx.tt.best_move(child.hash);
        let next = validated(&mut child, next);
        let rest = self.pv_line(&mut child, next, depth - 1);
        drop(child);

        if rest.is_empty() {
            first.to_uci()
        } else {
            format!("{} {}", first.to_uci(), rest)
        }
    }

    fn report(&self, pos: &mut Position, to_make: Move, score: i32, depth: i32, start_ms: u64) {
        let elapsed = self.info.elapsed_ms();
        let delta = elapsed.saturating_sub(start_ms).max(1);
        let nodes = self.info.nodes;
        let nps = nodes * 1000 / delta;

        let score_text = if score.abs() >= MATE - MAX_PLY as i32 {
            let mut plies = MATE - score.abs() + 1;
            if score < 0 {
                plies = -plies;
            }
            format!("mate {}", plies / 2)
        } else {
            format!("cp {}", score)
        };

        let mut line = format!(
            "info depth {} seldepth {} score {} time {} nodes {} nps {}",
            depth, self.info.seldepth, score_text, elapsed, nodes, nps
        );
        let pv = self.pv_line(pos, to_make, depth);
        if !pv.is_empty() {
            line.push_str(" pv ");
            line.push_str(&pv);
        }
        println!("{}", line);
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_generator::find_move;
    use crate::position::STARTING_FEN;

    fn searcher() -> Searcher {
        let ctx = Arc::new(SearchContext::new(8));
        Searcher::new(ctx, false, 1)
    }

    fn search_to_depth(fen: &str, depth: i32) -> Move {
        let mut pos = Position::from_fen(fen).unwrap();
        let mut s = searcher();
        s.info.new_search(None);
        s.info.set_depth_limit(depth);
        s.iterative_search(&mut pos)
    }

    #[test]
    fn allocate_time_follows_remaining_clock() {
        assert_eq!(allocate_time(60_000), 1_999);
        assert_eq!(allocate_time(0), 1);
    }

    #[test]
    fn killer_slots_shift_on_new_move() {
        let mut info = SearchInfo::default();
        let first = Move::new(12, 28);
        let second = Move::new(6, 21);

        info.store_killer(first, 3);
        info.store_killer(first, 3);
        assert_eq!(info.killers[3][0], first);
        assert!(info.killers[3][1].is_null(), "re-storing must not demote");

        info.store_killer(second, 3);
        assert_eq!(info.killers[3][0], second);
        assert_eq!(info.killers[3][1], first);
    }

    #[test]
    fn history_bonus_accumulates() {
        let mut info = SearchInfo::default();
        let mv = Move::new(12, 28);

        info.bump_history(WHITE, mv, 3);
        info.bump_history(WHITE, mv, 4);
        assert_eq!(info.history_score(WHITE, mv), (1 << 3) + (1 << 4));
        assert_eq!(info.history_score(BLACK, mv), 0);
    }

    #[test]
    fn mate_in_one_is_found() {
        let mv = search_to_depth("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 4);
        assert_eq!(mv.to_uci(), "a1a8");
    }

    #[test]
    fn deeper_search_keeps_the_forced_mate() {
        let shallow = search_to_depth("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 2);
        let deep = search_to_depth("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 6);
        assert_eq!(shallow.to_uci(), "a1a8");
        assert_eq!(deep.to_uci(), "a1a8");
    }

    #[test]
    fn winning_capture_is_chosen() {
        let mv = search_to_depth("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", 3);
        assert_eq!(mv.to_uci(), "d2d5");
    }

    #[test]
    fn checkmated_position_scores_mate_distance() {
        let mut pos =
            Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 0 1")
                .unwrap();
        let mut s = searcher();
        s.info.new_search(None);

        let score = s.alpha_beta(3, -INFINITY, INFINITY, 0, true, &mut pos);
        assert_eq!(score, -MATE);
    }

    #[test]
    fn stalemate_scores_zero() {
        let mut pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let mut s = searcher();
        s.info.new_search(None);

        let score = s.alpha_beta(3, -INFINITY, INFINITY, 0, true, &mut pos);
        assert_eq!(score, DRAW);
    }

    #[test]
    fn repeated_position_scores_zero() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        for token in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let mv = find_move(&mut pos, token).unwrap();
            pos.make_move(mv);
        }
        let mut s = searcher();
        s.info.new_search(None);

        let score = s.alpha_beta(4, -INFINITY, INFINITY, 0, true, &mut pos);
        assert_eq!(score, DRAW);
    }

    #[test]
    fn hundred_halfmove_positions_score_zero() {
        let mut pos = Position::from_fen("7k/8/8/8/8/8/8/QQQQQQ1K w - - 100 1").unwrap();
        let mut s = searcher();
        s.info.new_search(None);

        let score = s.alpha_beta(4, -INFINITY, INFINITY, 0, true, &mut pos);
        assert_eq!(score, DRAW, "material means nothing at the clock limit");
    }

    #[test]
    fn table_hit_short_circuits_repeat_search() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        let mut s = searcher();
        s.info.new_search(None);

        let first = s.alpha_beta(4, -INFINITY, INFINITY, 0, true, &mut pos);
        let visited = s.info.nodes;
        assert!(visited > 1);

        s.info.nodes = 0;
        let second = s.alpha_beta(4, -INFINITY, INFINITY, 0, true, &mut pos);
        assert_eq!(first, second);
        assert_eq!(s.info.nodes, 1, "stored root entry must answer the re-probe");
    }

    #[test]
    fn quiescence_returns_bounded_score() {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let mut s = searcher();
        s.info.new_search(None);

        let score = s.quiescence(-INFINITY, INFINITY, 0, &mut pos);
        assert!(score > -INFINITY && score < INFINITY);
        assert!(s.info.nodes < 200_000, "capture tree must bottom out");
    }

    #[test]
    fn timed_search_returns_a_move() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        let mut s = searcher();
        s.prepare(SearchType::TimePerMove { budget_ms: 100 });

        let mv = s.iterative_search(&mut pos);
        assert!(!mv.is_null());
    }

    #[test]
    fn ponder_hint_is_legal_or_absent() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        let mut s = searcher();
        s.info.new_search(None);
        s.info.set_depth_limit(4);

        let best = s.iterative_search(&mut pos);
        let ponder = s.ponder_move(&mut pos, best);
        if !ponder.is_null() {
            let mut after = pos.play(best);
            let replies = generate_legal(&mut after);
            assert!(replies.iter().any(|&m| m == ponder));
        }
    }
}
