//! Falchion - Move Ordering Module
//!
//! Staged move selection for the search. Moves are generated once,
//! scored once, then handed out best-first by a lazy selection scan so
//! a beta cutoff never pays for sorting the tail of the list.

use crate::evaluation::piece_value;
use crate::move_generator::{generate_all, generate_captures, generate_evasions, generate_legal};
use crate::moves::{Move, MoveList, MAX_MOVES};
use crate::position::Position;
use crate::search::SearchInfo;

/// Ordering score pinning the hash move to the front
pub const HASH_MOVE_SCORE: i32 = i32::MAX;

/// Scored move list with best-first selection
pub struct MovePicker {
    moves: MoveList,
    scores: [i32; MAX_MOVES],
    cursor: usize,
}

impl MovePicker {
    /// Picker for a full-width node: every pseudo-legal move, or every
    /// evasion when in check. The hash move, if it survives generation,
    /// is pinned to the front.
    pub fn new(pos: &Position, info: &SearchInfo, ply: usize, hash_move: Move) -> Self {
        let mut moves = MoveList::new();
        let checkers = pos.checkers();
        if checkers != 0 {
            generate_evasions(pos, checkers, false, &mut moves);
        } else {
            generate_all(pos, &mut moves);
        }
        let mut picker = MovePicker {
            moves,
            scores: [0; MAX_MOVES],
            cursor: 0,
        };
        picker.score(pos, info, ply, hash_move);
        picker
    }

    /// Picker over the fully legal root moves. The root has no hash
    /// move; ordering relies on captures, killers and history alone.
    pub fn new_root(pos: &mut Position, info: &SearchInfo) -> Self {
        let moves = generate_legal(pos);
        let mut picker = MovePicker {
            moves,
            scores: [0; MAX_MOVES],
            cursor: 0,
        };
        picker.score(pos, info, 0, Move::NULL);
        picker
    }

    /// Picker for a quiescence node: captures only, or every evasion
    /// when in check.
    pub fn new_quiescence(pos: &Position, info: &SearchInfo, ply: usize) -> Self {
        let mut moves = MoveList::new();
        let checkers = pos.checkers();
        if checkers != 0 {
            generate_evasions(pos, checkers, false, &mut moves);
        } else {
            generate_captures(pos, &mut moves);
        }
        let mut picker = MovePicker {
            moves,
            scores: [0; MAX_MOVES],
            cursor: 0,
        };
        picker.score(pos, info, ply, Move::NULL);
        picker
    }

    /// Hand out the highest-scored move not yet returned.
    pub fn next(&mut self) -> Option<Move> {
        if self.cursor >= self.moves.len() {
            return None;
        }
        let mut max = self.cursor;
        for i in self.cursor + 1..self.moves.len() {
            if self.scores[i] > self.scores[max] {
                max = i;
            }
        }
        if max != self.cursor {
            self.moves.swap(self.cursor, max);
            self.scores.swap(self.cursor, max);
        }
        let mv = self.moves[self.cursor];
        self.cursor += 1;
        Some(mv)
    }

    /// Number of generated moves (legal and illegal alike).
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Score every move: hash move above all, promotions at the
    /// promoted piece's value, captures at their static-exchange score,
    /// killers just below zero, remaining quiets by history offset so
    /// they rank below both killers.
    fn score(&mut self, pos: &Position, info: &SearchInfo, ply: usize, hash_move: Move) {
        let stm = pos.side_to_move;
        let mut max_history = 0;
        for i in 0..self.moves.len() {
            let mv = self.moves[i];
            if !hash_move.is_null() && mv == hash_move {
                self.scores[i] = HASH_MOVE_SCORE;
            } else if let Some(kind) = mv.promoted() {
                self.scores[i] = piece_value(kind);
            } else if pos.is_capture(mv) {
                self.scores[i] = pos.see(mv);
            } else if mv == info.killers[ply][0] {
                self.scores[i] = -1;
            } else if mv == info.killers[ply][1] {
                self.scores[i] = -2;
            } else {
                let h = info.history_score(stm, mv);
                if h > max_history {
                    max_history = h;
                }
            }
        }
        for i in 0..self.moves.len() {
            let mv = self.moves[i];
            if (!hash_move.is_null() && mv == hash_move)
                || mv.promoted().is_some()
                || pos.is_capture(mv)
                || mv == info.killers[ply][0]
                || mv == info.killers[ply][1]
            {
                continue;
            }
            self.scores[i] = info.history_score(stm, mv) - max_history - 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_generator::find_move;
    use crate::search::SearchInfo;
    use crate::types::QUEEN;

    #[test]
    fn hash_move_comes_first() {
        let mut pos = Position::new();
        let info = SearchInfo::default();
        let hash_move = find_move(&mut pos, "g1f3").unwrap();
        let mut picker = MovePicker::new(&pos, &info, 0, hash_move);
        assert_eq!(picker.next(), Some(hash_move));
    }

    #[test]
    fn winning_capture_leads() {
        let pos =
            Position::from_fen("4k3/2p5/3p4/8/3n4/2P5/1Q6/4K3 w - - 0 1").unwrap();
        let info = SearchInfo::default();
        let mut picker = MovePicker::new(&pos, &info, 0, Move::NULL);
        let first = picker.next().unwrap();
        assert_eq!(first.to_uci(), "c3d4");
    }

    #[test]
    fn losing_capture_sinks_below_quiets() {
        // Queen takes a pawn defended by a pawn: the exchange score
        // drops it behind every quiet move
        let pos = Position::from_fen("4k3/8/2p5/3p4/8/2P5/3Q4/4K3 w - - 0 1").unwrap();
        let info = SearchInfo::default();
        let mut picker = MovePicker::new(&pos, &info, 0, Move::NULL);
        let mut last = Move::NULL;
        while let Some(mv) = picker.next() {
            last = mv;
        }
        assert_eq!(last.to_uci(), "d2d5");
    }

    #[test]
    fn killers_rank_above_other_quiets() {
        let mut pos = Position::new();
        let info_killer = find_move(&mut pos, "b1c3").unwrap();
        let mut info = SearchInfo::default();
        info.killers[0][0] = info_killer;
        let mut picker = MovePicker::new(&pos, &info, 0, Move::NULL);
        // Starting position has no captures or promotions, so the
        // killer leads
        assert_eq!(picker.next(), Some(info_killer));
    }

    #[test]
    fn history_orders_quiets() {
        let mut pos = Position::new();
        let liked = find_move(&mut pos, "d2d4").unwrap();
        let mut info = SearchInfo::default();
        info.bump_history(pos.side_to_move, liked, 5);
        let mut picker = MovePicker::new(&pos, &info, 0, Move::NULL);
        assert_eq!(picker.next(), Some(liked));
    }

    #[test]
    fn quiescence_picker_stays_on_captures() {
        let pos =
            Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/3PP3/8/PPP2PPP/RNBQKBNR b KQkq - 0 2")
                .unwrap();
        let info = SearchInfo::default();
        let mut picker = MovePicker::new_quiescence(&pos, &info, 0);
        while let Some(mv) = picker.next() {
            assert!(pos.is_capture(mv));
        }
    }

    #[test]
    fn promotion_scores_at_piece_value() {
        let pos = Position::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let info = SearchInfo::default();
        let mut picker = MovePicker::new(&pos, &info, 0, Move::NULL);
        let first = picker.next().unwrap();
        assert_eq!(first.promoted(), Some(QUEEN));
    }
}
