//! Falchion - Position Evaluation Module
//!
//! This module provides tapered static evaluation of chess positions
//! considering:
//! - Material balance
//! - Piece positioning (piece-square tables)
//! - Pawn structure (doubled, isolated, passed pawns)
//! - King shelter
//! - Piece mobility
//! - Bishop pair and tempo
//!
//! Every term is scored twice, once for the opening and once for the
//! endgame; the two sums are blended by the material phase.

use crate::bitboard::*;
use crate::position::Position;
use crate::types::*;

// ============================================================================
// PIECE VALUES AND GAME PHASE
// ============================================================================

/// Piece values indexed by kind, king included
pub const PIECE_VALUES: [i32; 6] = [90, 335, 350, 540, 1100, 2000];

/// Material of both sides at the starting position
pub const OPENING_MATERIAL: i32 = PIECE_VALUES[0] * 16
    + PIECE_VALUES[1] * 4
    + PIECE_VALUES[2] * 4
    + PIECE_VALUES[3] * 4
    + PIECE_VALUES[4] * 2
    + PIECE_VALUES[5] * 2;

/// Total material at which the endgame is assumed to begin
pub const ENDGAME_MATERIAL: i32 = OPENING_MATERIAL - 4200;

const KING_MATERIAL: i32 = PIECE_VALUES[5] * 2;
const OPENING_NON_PAWN_MATERIAL: i32 = OPENING_MATERIAL - PIECE_VALUES[0] * 16;

/// Phase scale: 0 is the pure opening, 256 the pure endgame
pub const MAX_PHASE: i32 = 256;

#[inline]
pub fn piece_value(kind: u8) -> i32 {
    PIECE_VALUES[kind as usize]
}

/// Game phase from remaining non-pawn material
pub fn phase(pos: &Position) -> i32 {
    let pawns = (pos.count(WHITE, PAWN) + pos.count(BLACK, PAWN)) as i32;
    let non_pawn = pos.total_material() - pawns * PIECE_VALUES[0] - KING_MATERIAL;
    let opening_pieces = OPENING_NON_PAWN_MATERIAL - KING_MATERIAL;
    let phase = (non_pawn * MAX_PHASE + opening_pieces / 2) / opening_pieces;
    MAX_PHASE - phase
}

#[inline]
pub fn is_endgame(pos: &Position) -> bool {
    pos.total_material() <= ENDGAME_MATERIAL
}

// ============================================================================
// PIECE-SQUARE TABLES
// ============================================================================

// Pawn PST - encourages central control and advancement
const PAWN_PST: [i32; 64] = [
    0,   0,   0,   0,   0,   0,   0,   0,   // Rank 1
    5,  10,  10, -20, -20,  10,  10,   5,   // Rank 2
    5,  -5, -10,   0,   0, -10,  -5,   5,   // Rank 3
    0,   0,   0,  20,  20,   0,   0,   0,   // Rank 4
    5,   5,  10,  25,  25,  10,   5,   5,   // Rank 5
   10,  10,  20,  30,  30,  20,  10,  10,   // Rank 6
   50,  50,  50,  50,  50,  50,  50,  50,   // Rank 7
    0,   0,   0,   0,   0,   0,   0,   0,   // Rank 8
];

// Knight PST - encourages central positioning
const KNIGHT_PST: [i32; 64] = [
   -50, -40, -30, -30, -30, -30, -40, -50,
   -40, -20,   0,   5,   5,   0, -20, -40,
   -30,   5,  10,  15,  15,  10,   5, -30,
   -30,   0,  15,  20,  20,  15,   0, -30,
   -30,   5,  15,  20,  20,  15,   5, -30,
   -30,   0,  10,  15,  15,  10,   0, -30,
   -40, -20,   0,   0,   0,   0, -20, -40,
   -50, -40, -30, -30, -30, -30, -40, -50,
];

// Bishop PST
const BISHOP_PST: [i32; 64] = [
   -20, -10, -10, -10, -10, -10, -10, -20,
   -10,   5,   0,   0,   0,   0,   5, -10,
   -10,  10,  10,  10,  10,  10,  10, -10,
   -10,   0,  10,  10,  10,  10,   0, -10,
   -10,   5,   5,  10,  10,   5,   5, -10,
   -10,   0,   5,  10,  10,   5,   0, -10,
   -10,   0,   0,   0,   0,   0,   0, -10,
   -20, -10, -10, -10, -10, -10, -10, -20,
];

// Rook PST
const ROOK_PST: [i32; 64] = [
    0,   0,   0,   5,   5,   0,   0,   0,
   -5,   0,   0,   0,   0,   0,   0,  -5,
   -5,   0,   0,   0,   0,   0,   0,  -5,
   -5,   0,   0,   0,   0,   0,   0,  -5,
   -5,   0,   0,   0,   0,   0,   0,  -5,
   -5,   0,   0,   0,   0,   0,   0,  -5,
    5,  10,  10,  10,  10,  10,  10,   5,
    0,   0,   0,   0,   0,   0,   0,   0,
];

// Queen PST
const QUEEN_PST: [i32; 64] = [
   -20, -10, -10,  -5,  -5, -10, -10, -20,
   -10,   0,   5,   0,   0,   0,   0, -10,
   -10,   5,   5,   5,   5,   5,   0, -10,
     0,   0,   5,   5,   5,   5,   0,  -5,
    -5,   0,   5,   5,   5,   5,   0,  -5,
   -10,   0,   5,   5,   5,   5,   0, -10,
   -10,   0,   0,   0,   0,   0,   0, -10,
   -20, -10, -10,  -5,  -5, -10, -10, -20,
];

// King opening PST - keeps the king tucked away
const KING_OPENING_PST: [i32; 64] = [
    20,  30,  10,   0,   0,  10,  30,  20,
    20,  20,   0,   0,   0,   0,  20,  20,
   -10, -20, -20, -20, -20, -20, -20, -10,
   -20, -30, -30, -40, -40, -30, -30, -20,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
];

// King endgame PST - activates the king
const KING_ENDGAME_PST: [i32; 64] = [
   -50, -30, -30, -30, -30, -30, -30, -50,
   -30, -30,   0,   0,   0,   0, -30, -30,
   -30, -10,  20,  30,  30,  20, -10, -30,
   -30, -10,  30,  40,  40,  30, -10, -30,
   -30, -10,  30,  40,  40,  30, -10, -30,
   -30, -10,  20,  30,  30,  20, -10, -30,
   -30, -20, -10,   0,   0, -10, -20, -30,
   -50, -40, -30, -20, -20, -30, -40, -50,
];

/// Opening and endgame piece-square values for a piece on a square.
/// Tables are white-oriented; black squares are mirrored.
pub fn pst_pair(piece: Piece, sq: usize) -> (i32, i32) {
    let index = if piece.color == WHITE { sq } else { mirror(sq) };
    match piece.kind {
        PAWN => (PAWN_PST[index], PAWN_PST[index]),
        KNIGHT => (KNIGHT_PST[index], KNIGHT_PST[index]),
        BISHOP => (BISHOP_PST[index], BISHOP_PST[index]),
        ROOK => (ROOK_PST[index], ROOK_PST[index]),
        QUEEN => (QUEEN_PST[index], QUEEN_PST[index]),
        KING => (KING_OPENING_PST[index], KING_ENDGAME_PST[index]),
        _ => (0, 0),
    }
}

// ============================================================================
// EVALUATION TERMS (opening, endgame)
// ============================================================================

const TEMPO_BONUS: (i32, i32) = (5, 5);
const QUEEN_HOME_PENALTY: (i32, i32) = (15, 0);
const BISHOP_PAIR_BONUS: (i32, i32) = (33, 55);
const ISOLATED_PAWN_PENALTY: (i32, i32) = (16, 8);
const DOUBLED_PAWN_PENALTY: (i32, i32) = (5, 2);

const PASSED_PAWN_BONUS: [(i32, i32); 8] = [
    (0, 0),
    (0, 0),
    (10, 10),
    (15, 20),
    (25, 40),
    (30, 60),
    (30, 125),
    (0, 0),
];

// Bonus per shield pawn: directly in front of the king row, then one
// rank further out
const PAWN_SHELTER_BONUS: [(i32, i32); 2] = [(5, 3), (4, 2)];

const KNIGHT_MOBILITY: [i32; 9] = [-15, -10, -5, 0, 5, 10, 10, 15, 15];
const BISHOP_MOBILITY: [i32; 14] = [-15, -10, -5, 0, 5, 10, 15, 20, 25, 30, 30, 35, 35, 35];
const ROOK_MOBILITY: [i32; 15] = [-5, -5, 0, 5, 10, 10, 15, 20, 30, 35, 35, 40, 40, 40, 40];
const QUEEN_MOBILITY: [i32; 28] = [
    -5, -4, -3, -2, -1, 0, 5, 10, 13, 16, 18, 20, 22, 24, 26, 28, 29, 30, 30, 30, 30, 30, 30,
    30, 30, 30, 30, 30,
];

const D1: usize = 3;
const D8: usize = 59;

// ============================================================================
// MAIN EVALUATION FUNCTION
// ============================================================================

/// Evaluate the position from the side to move's perspective
pub fn evaluate(pos: &Position) -> i32 {
    let mut opening = 0i32;
    let mut endgame = 0i32;

    let white = WHITE as usize;
    let black = BLACK as usize;

    // Material and piece-square tables
    let material = pos.material_score(WHITE);
    opening += material + (pos.pst[white].0 - pos.pst[black].0);
    endgame += material + (pos.pst[white].1 - pos.pst[black].1);

    // Bishop pair bonus
    if pos.count(WHITE, BISHOP) == 2 {
        opening += BISHOP_PAIR_BONUS.0;
        endgame += BISHOP_PAIR_BONUS.1;
    }
    if pos.count(BLACK, BISHOP) == 2 {
        opening -= BISHOP_PAIR_BONUS.0;
        endgame -= BISHOP_PAIR_BONUS.1;
    }

    // Tempo bonus
    if pos.side_to_move == WHITE {
        opening += TEMPO_BONUS.0;
        endgame += TEMPO_BONUS.1;
    } else {
        opening -= TEMPO_BONUS.0;
        endgame -= TEMPO_BONUS.1;
    }

    // Premature queen development penalty
    if pos.pieces(WHITE, QUEEN) & square_bb(D1) == 0 {
        opening -= QUEEN_HOME_PENALTY.0;
        endgame -= QUEEN_HOME_PENALTY.1;
    }
    if pos.pieces(BLACK, QUEEN) & square_bb(D8) == 0 {
        opening += QUEEN_HOME_PENALTY.0;
        endgame += QUEEN_HOME_PENALTY.1;
    }

    // Doubled and isolated pawns, judged once per file
    let wpawns = pos.pieces(WHITE, PAWN);
    let bpawns = pos.pieces(BLACK, PAWN);

    for file in 0..8 {
        let pawns = pos.pawns_on_file[white][file];
        if pawns > 0 {
            if wpawns & ADJACENT_FILES[file] == 0 {
                opening -= ISOLATED_PAWN_PENALTY.0;
                endgame -= ISOLATED_PAWN_PENALTY.1;
            }
            if pawns > 1 {
                opening -= DOUBLED_PAWN_PENALTY.0;
                endgame -= DOUBLED_PAWN_PENALTY.1;
            }
        }
    }

    for file in 0..8 {
        let pawns = pos.pawns_on_file[black][file];
        if pawns > 0 {
            if bpawns & ADJACENT_FILES[file] == 0 {
                opening += ISOLATED_PAWN_PENALTY.0;
                endgame += ISOLATED_PAWN_PENALTY.1;
            }
            if pawns > 1 {
                opening += DOUBLED_PAWN_PENALTY.0;
                endgame += DOUBLED_PAWN_PENALTY.1;
            }
        }
    }

    // Passed pawns and mobility
    let white_pawn_attacks = pawn_attack_span(wpawns, WHITE);
    let black_pawn_attacks = pawn_attack_span(bpawns, BLACK);

    for sq in 0..64 {
        let piece = pos.piece_on(sq);
        if piece.is_none() {
            continue;
        }

        if piece.kind == PAWN {
            let enemy_pawns = pos.pieces(opposite(piece.color), PAWN);
            if PASSER_SPAN[piece.color as usize][sq] & enemy_pawns == 0 {
                let rank = rank_of(sq);
                if piece.color == WHITE {
                    opening += PASSED_PAWN_BONUS[rank].0;
                    endgame += PASSED_PAWN_BONUS[rank].1;
                } else {
                    opening -= PASSED_PAWN_BONUS[7 - rank].0;
                    endgame -= PASSED_PAWN_BONUS[7 - rank].1;
                }
            }
        } else if piece.kind != KING {
            let own = pos.occupancy[piece.color as usize];
            let safe = if piece.color == WHITE {
                !black_pawn_attacks
            } else {
                !white_pawn_attacks
            };

            let (targets, table): (u64, &[i32]) = match piece.kind {
                KNIGHT => (KNIGHT_ATTACKS[sq] & !own, &KNIGHT_MOBILITY),
                BISHOP => (bishop_attacks(sq, pos.occupied) & !own, &BISHOP_MOBILITY),
                ROOK => (rook_attacks(sq, pos.occupied) & !own, &ROOK_MOBILITY),
                _ => (queen_attacks(sq, pos.occupied) & !own, &QUEEN_MOBILITY),
            };

            let bonus = table[popcount(targets & safe) as usize];
            if piece.color == WHITE {
                opening += bonus;
                endgame += bonus;
            } else {
                opening -= bonus;
                endgame -= bonus;
            }
        }
    }

    // Pawn shelter
    let wking = square_bb(pos.king_square[white]);
    let (shelter1, shelter2) = if wking & WHITE_KING_SIDE != 0 {
        (
            popcount(wpawns & WHITE_KING_SHIELD),
            popcount(wpawns & (WHITE_KING_SHIELD << 8)),
        )
    } else if wking & WHITE_QUEEN_SIDE != 0 {
        (
            popcount(wpawns & WHITE_QUEEN_SHIELD),
            popcount(wpawns & (WHITE_QUEEN_SHIELD << 8)),
        )
    } else {
        (0, 0)
    };
    opening += shelter1 as i32 * PAWN_SHELTER_BONUS[0].0 + shelter2 as i32 * PAWN_SHELTER_BONUS[1].0;
    endgame += shelter1 as i32 * PAWN_SHELTER_BONUS[0].1 + shelter2 as i32 * PAWN_SHELTER_BONUS[1].1;

    let bking = square_bb(pos.king_square[black]);
    let (shelter1, shelter2) = if bking & BLACK_KING_SIDE != 0 {
        (
            popcount(bpawns & BLACK_KING_SHIELD),
            popcount(bpawns & (BLACK_KING_SHIELD >> 8)),
        )
    } else if bking & BLACK_QUEEN_SIDE != 0 {
        (
            popcount(bpawns & BLACK_QUEEN_SHIELD),
            popcount(bpawns & (BLACK_QUEEN_SHIELD >> 8)),
        )
    } else {
        (0, 0)
    };
    opening -= shelter1 as i32 * PAWN_SHELTER_BONUS[0].0 + shelter2 as i32 * PAWN_SHELTER_BONUS[1].0;
    endgame -= shelter1 as i32 * PAWN_SHELTER_BONUS[0].1 + shelter2 as i32 * PAWN_SHELTER_BONUS[1].1;

    // Blend by phase and orient to the side to move
    let phase = phase(pos);
    let score = (opening * (MAX_PHASE - phase) + endgame * phase) / MAX_PHASE;
    score * (1 - 2 * pos.side_to_move as i32)
}

/// Squares attacked by any pawn of the set
fn pawn_attack_span(pawns: u64, color: u8) -> u64 {
    if color == WHITE {
        ((pawns << 7) & NOT_FILE_H) | ((pawns << 9) & NOT_FILE_A)
    } else {
        ((pawns >> 7) & NOT_FILE_A) | ((pawns >> 9) & NOT_FILE_H)
    }
}
