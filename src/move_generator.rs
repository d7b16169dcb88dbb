//! Falchion - Move Generation Module
//!
//! Bitboard move generation, split into capture and quiet passes so the
//! search can stage them. Positions in check use a dedicated evasion
//! generator that masks the checking sliders' rays off the king's
//! escape squares.

use crate::bitboard::*;
use crate::error::MoveError;
use crate::moves::{Move, MoveList};
use crate::position::Position;
use crate::types::*;

// ============================================================
// Castling masks
// ============================================================

/// Squares that must be empty between king and rook
const WHITE_OO_EMPTY: u64 = 0x0000_0000_0000_0060;
const WHITE_OOO_EMPTY: u64 = 0x0000_0000_0000_000E;
const BLACK_OO_EMPTY: u64 = WHITE_OO_EMPTY << 56;
const BLACK_OOO_EMPTY: u64 = WHITE_OOO_EMPTY << 56;

/// Squares the king crosses, which may not be attacked. The b-file
/// square is crossed only by the rook, so queenside omits it.
const WHITE_OO_SAFE: u64 = 0x0000_0000_0000_0060;
const WHITE_OOO_SAFE: u64 = 0x0000_0000_0000_000C;
const BLACK_OO_SAFE: u64 = WHITE_OO_SAFE << 56;
const BLACK_OOO_SAFE: u64 = WHITE_OOO_SAFE << 56;

const E1: usize = 4;
const G1: usize = 6;
const C1: usize = 2;
const E8: usize = 60;
const G8: usize = 62;
const C8: usize = 58;

// ============================================================
// Public interface
// ============================================================

/// Generate every legal move for the side to move.
pub fn generate_legal(pos: &mut Position) -> MoveList {
    let mut list = MoveList::new();
    let checkers = pos.checkers();
    if checkers != 0 {
        generate_evasions(pos, checkers, false, &mut list);
    } else {
        generate_all(pos, &mut list);
    }
    retain_legal(pos, &mut list);
    list
}

/// Drop pseudo-legal moves that would leave the king in check.
pub fn retain_legal(pos: &mut Position, list: &mut MoveList) {
    let pinned = pos.pinned_pieces();
    let mut cur = 0;
    let mut len = list.len();
    while cur != len {
        if pos.is_move_legal(list[cur], pinned) {
            cur += 1;
        } else {
            len -= 1;
            list.swap(cur, len);
        }
    }
    list.truncate(len);
}

/// Generate all pseudo-legal moves for a position not in check.
pub fn generate_all(pos: &Position, list: &mut MoveList) {
    generate_captures(pos, list);
    generate_quiets(pos, list);
}

/// Generate pseudo-legal captures, including en passant.
pub fn generate_captures(pos: &Position, list: &mut MoveList) {
    let enemy = pos.enemy_pieces();
    pawn_moves(pos, enemy, true, list);
    knight_moves(pos, enemy, list);
    bishop_moves(pos, enemy, list);
    queen_moves(pos, enemy, list);
    king_moves(pos, enemy, list);
    rook_moves(pos, enemy, list);
}

/// Generate pseudo-legal quiet moves, castling last.
pub fn generate_quiets(pos: &Position, list: &mut MoveList) {
    let empty = !pos.occupied;
    pawn_moves(pos, empty, false, list);
    knight_moves(pos, empty, list);
    bishop_moves(pos, empty, list);
    queen_moves(pos, empty, list);
    king_moves(pos, empty, list);
    rook_moves(pos, empty, list);
    castle_moves(pos, list);
}

/// Generate pseudo-legal check evasions. `checkers` must be the
/// non-empty set of pieces giving check. With `captures_only` the
/// output is restricted to captures of a checker.
pub fn generate_evasions(pos: &Position, checkers: u64, captures_only: bool, list: &mut MoveList) {
    let us = pos.side_to_move as usize;
    let ksq = pos.king_square[us];

    let mut slider_rays = 0u64;
    let mut count = 0;
    let mut checksq = 0;
    let mut b = checkers;
    while b != 0 {
        checksq = pop_lsb(&mut b);
        count += 1;
        match pos.squares[checksq].kind {
            BISHOP => slider_rays |= PSEUDO_BISHOP_ATTACKS[checksq],
            ROOK => slider_rays |= PSEUDO_ROOK_ATTACKS[checksq],
            QUEEN => {
                // A queen giving contact check along a diagonal still
                // guards the squares behind blockers on its rank and
                // file, so those rays use the real occupancy.
                if BETWEEN[ksq][checksq] != 0
                    || PSEUDO_BISHOP_ATTACKS[checksq] & square_bb(ksq) == 0
                {
                    slider_rays |=
                        PSEUDO_BISHOP_ATTACKS[checksq] | PSEUDO_ROOK_ATTACKS[checksq];
                } else {
                    slider_rays |=
                        PSEUDO_BISHOP_ATTACKS[checksq] | rook_attacks(checksq, pos.occupied);
                }
            }
            _ => {}
        }
    }

    let king_targets = if captures_only {
        KING_ATTACKS[ksq] & checkers
    } else {
        KING_ATTACKS[ksq] & !pos.occupancy[us] & !slider_rays
    };
    push_all(ksq, king_targets, list);

    // Double check: only the king can move
    if count > 1 {
        return;
    }

    let target = if captures_only {
        checkers
    } else {
        BETWEEN[checksq][ksq] | checkers
    };
    pawn_moves(pos, target, true, list);
    knight_moves(pos, target, list);
    bishop_moves(pos, target, list);
    rook_moves(pos, target, list);
    queen_moves(pos, target, list);
}

/// Parse a UCI move token (`e2e4`, `e7e8q`) against the legal moves
/// of the position.
pub fn find_move(pos: &mut Position, token: &str) -> Result<Move, MoveError> {
    if token.len() < 4 || token.len() > 5 {
        return Err(MoveError::BadSyntax(token.to_string()));
    }
    let legal = generate_legal(pos);
    for &mv in legal.iter() {
        if mv.to_uci() == token {
            return Ok(mv);
        }
    }
    Err(MoveError::Illegal(token.to_string()))
}

// ============================================================
// Per-piece generators
// ============================================================

fn pawn_moves(pos: &Position, target: u64, include_ep: bool, list: &mut MoveList) {
    let us = pos.side_to_move as usize;
    let mut pawns = pos.bitboards[us][PAWN as usize];
    while pawns != 0 {
        let from = pop_lsb(&mut pawns);
        let mut targets = pawn_targets(pos, from) & target;
        while targets != 0 {
            let to = pop_lsb(&mut targets);
            push_pawn(from, to, list);
        }
        if include_ep {
            if let Some(ep) = pos.en_passant {
                if PAWN_ATTACKS[us][from] & square_bb(ep as usize) != 0 {
                    list.push(Move::en_passant(from, ep as usize));
                }
            }
        }
    }
}

/// Push, double push and capture targets for a single pawn
fn pawn_targets(pos: &Position, from: usize) -> u64 {
    let us = pos.side_to_move as usize;
    let empty = !pos.occupied;
    let bb = square_bb(from);
    if us == WHITE as usize {
        let single = shift_north(bb) & empty;
        let double = shift_north(single & RANK_3) & empty;
        single | double | (PAWN_ATTACKS[us][from] & pos.occupancy[BLACK as usize])
    } else {
        let single = shift_south(bb) & empty;
        let double = shift_south(single & RANK_6) & empty;
        single | double | (PAWN_ATTACKS[us][from] & pos.occupancy[WHITE as usize])
    }
}

fn push_pawn(from: usize, to: usize, list: &mut MoveList) {
    let to_rank = rank_of(to);
    if to_rank == 7 || to_rank == 0 {
        list.push(Move::promotion(from, to, QUEEN));
        list.push(Move::promotion(from, to, ROOK));
        list.push(Move::promotion(from, to, BISHOP));
        list.push(Move::promotion(from, to, KNIGHT));
    } else if rank_of(from).abs_diff(to_rank) == 2 {
        list.push(Move::double_push(from, to));
    } else {
        list.push(Move::new(from, to));
    }
}

fn knight_moves(pos: &Position, target: u64, list: &mut MoveList) {
    let us = pos.side_to_move as usize;
    let mut knights = pos.bitboards[us][KNIGHT as usize];
    while knights != 0 {
        let from = pop_lsb(&mut knights);
        push_all(from, KNIGHT_ATTACKS[from] & target, list);
    }
}

fn bishop_moves(pos: &Position, target: u64, list: &mut MoveList) {
    let us = pos.side_to_move as usize;
    let mut bishops = pos.bitboards[us][BISHOP as usize];
    while bishops != 0 {
        let from = pop_lsb(&mut bishops);
        push_all(from, bishop_attacks(from, pos.occupied) & target, list);
    }
}

fn rook_moves(pos: &Position, target: u64, list: &mut MoveList) {
    let us = pos.side_to_move as usize;
    let mut rooks = pos.bitboards[us][ROOK as usize];
    while rooks != 0 {
        let from = pop_lsb(&mut rooks);
        push_all(from, rook_attacks(from, pos.occupied) & target, list);
    }
}

fn queen_moves(pos: &Position, target: u64, list: &mut MoveList) {
    let us = pos.side_to_move as usize;
    let mut queens = pos.bitboards[us][QUEEN as usize];
    while queens != 0 {
        let from = pop_lsb(&mut queens);
        push_all(from, queen_attacks(from, pos.occupied) & target, list);
    }
}

fn king_moves(pos: &Position, target: u64, list: &mut MoveList) {
    let us = pos.side_to_move as usize;
    let ksq = pos.king_square[us];
    push_all(ksq, KING_ATTACKS[ksq] & target, list);
}

fn castle_moves(pos: &Position, list: &mut MoveList) {
    let them = opposite(pos.side_to_move);
    if pos.side_to_move == WHITE {
        if pos.castling_rights & CASTLE_WK != 0
            && pos.occupied & WHITE_OO_EMPTY == 0
            && !any_attacked(pos, WHITE_OO_SAFE, them)
        {
            list.push(Move::castle(E1, G1));
        }
        if pos.castling_rights & CASTLE_WQ != 0
            && pos.occupied & WHITE_OOO_EMPTY == 0
            && !any_attacked(pos, WHITE_OOO_SAFE, them)
        {
            list.push(Move::castle(E1, C1));
        }
    } else {
        if pos.castling_rights & CASTLE_BK != 0
            && pos.occupied & BLACK_OO_EMPTY == 0
            && !any_attacked(pos, BLACK_OO_SAFE, them)
        {
            list.push(Move::castle(E8, G8));
        }
        if pos.castling_rights & CASTLE_BQ != 0
            && pos.occupied & BLACK_OOO_EMPTY == 0
            && !any_attacked(pos, BLACK_OOO_SAFE, them)
        {
            list.push(Move::castle(E8, C8));
        }
    }
}

fn any_attacked(pos: &Position, mut squares: u64, by: u8) -> bool {
    while squares != 0 {
        let sq = pop_lsb(&mut squares);
        if pos.attacked(sq, by) {
            return true;
        }
    }
    false
}

fn push_all(from: usize, mut targets: u64, list: &mut MoveList) {
    while targets != 0 {
        let to = pop_lsb(&mut targets);
        list.push(Move::new(from, to));
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveKind;
    use crate::position::Position;

    fn legal_uci(fen: &str) -> Vec<String> {
        let mut pos = Position::from_fen(fen).unwrap();
        generate_legal(&mut pos)
            .iter()
            .map(|m| m.to_uci())
            .collect()
    }

    #[test]
    fn starting_position_has_twenty_moves() {
        let mut pos = Position::new();
        let moves = generate_legal(&mut pos);
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn complex_middlegame_move_count() {
        let moves = legal_uci("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        assert_eq!(moves.len(), 48);
        assert!(moves.contains(&"e1g1".to_string()));
        assert!(moves.contains(&"e1c1".to_string()));
    }

    #[test]
    fn checkmate_has_no_moves() {
        let moves = legal_uci("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 0 3");
        assert!(moves.is_empty());
    }

    #[test]
    fn contact_queen_check_evasions() {
        let moves = legal_uci("4k3/8/8/8/8/8/5q2/4K3 w - - 0 1");
        assert_eq!(moves.len(), 2);
        assert!(moves.contains(&"e1d1".to_string()));
        assert!(moves.contains(&"e1f2".to_string()));
    }

    #[test]
    fn check_can_be_blocked_or_captured() {
        // Rook gives check along the e-file; the bishop can block,
        // the knight can block or capture the rook
        let moves = legal_uci("1k2r3/6N1/8/8/8/8/3B4/4K3 w - - 0 1");
        assert_eq!(moves.len(), 6);
        assert!(moves.contains(&"d2e3".to_string()));
        assert!(moves.contains(&"g7e8".to_string()));
        assert!(moves.contains(&"g7e6".to_string()));
    }

    #[test]
    fn castle_blocked_by_attacked_crossing_square() {
        let moves = legal_uci("r3k2r/8/8/8/8/5r2/8/R3K2R w KQkq - 0 1");
        assert!(!moves.contains(&"e1g1".to_string()));
        assert!(moves.contains(&"e1c1".to_string()));
    }

    #[test]
    fn queenside_castle_allowed_when_only_b1_attacked() {
        let moves = legal_uci("r3k2r/8/8/8/8/1r6/8/R3K2R w KQkq - 0 1");
        assert!(moves.contains(&"e1g1".to_string()));
        assert!(moves.contains(&"e1c1".to_string()));
    }

    #[test]
    fn castle_requires_empty_squares() {
        let moves = legal_uci("r3k2r/8/8/8/8/8/8/R2QK2R w KQkq - 0 1");
        assert!(moves.contains(&"e1g1".to_string()));
        assert!(!moves.contains(&"e1c1".to_string()));
    }

    #[test]
    fn en_passant_capture_is_generated() {
        let moves = legal_uci("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        assert!(moves.contains(&"e5d6".to_string()));
        assert_eq!(moves.len(), 7);
    }

    #[test]
    fn promotions_fan_out_to_four_pieces() {
        let moves = legal_uci("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let promos: Vec<_> = moves.iter().filter(|m| m.starts_with("a7a8")).collect();
        assert_eq!(promos.len(), 4);
        assert_eq!(moves.len(), 9);
    }

    #[test]
    fn pinned_knight_cannot_move() {
        let mut pos = Position::from_fen("1k2r3/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        let moves = generate_legal(&mut pos);
        assert_eq!(moves.len(), 4);
        assert!(moves.iter().all(|m| m.from_sq() == 4));
    }

    #[test]
    fn captures_pass_yields_only_captures() {
        let mut pos =
            Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/3PP3/8/PPP2PPP/RNBQKBNR b KQkq - 0 2")
                .unwrap();
        let mut list = MoveList::new();
        generate_captures(&pos, &mut list);
        for &mv in list.iter() {
            let is_capture = pos.piece_on(mv.to_sq()) != NO_PIECE
                || mv.kind == MoveKind::EnPassant;
            assert!(is_capture, "{} is not a capture", mv.to_uci());
        }
        assert!(list.iter().any(|m| m.to_uci() == "e5d4"));
    }

    #[test]
    fn capture_only_evasions_target_the_checker() {
        // Knight on f3 checks the king; only the bishop can take it
        let pos = Position::from_fen("4k3/8/8/8/8/5n2/4B3/4K3 w - - 0 1").unwrap();
        let checkers = pos.checkers();
        assert_ne!(checkers, 0);
        let mut list = MoveList::new();
        generate_evasions(&pos, checkers, true, &mut list);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].to_uci(), "e2f3");
    }

    #[test]
    fn parses_uci_tokens_against_legal_moves() {
        let mut pos = Position::new();
        let mv = find_move(&mut pos, "e2e4").unwrap();
        assert_eq!(mv.from_sq(), 12);
        assert_eq!(mv.to_sq(), 28);
        assert_eq!(mv.kind, MoveKind::DoublePush);
        assert!(matches!(
            find_move(&mut pos, "e2e5"),
            Err(MoveError::Illegal(_))
        ));
        assert!(matches!(
            find_move(&mut pos, "xyz"),
            Err(MoveError::BadSyntax(_))
        ));
    }
}
