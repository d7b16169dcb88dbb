//! Falchion - Bitboard Module
//!
//! This module provides bitboard utilities for fast move generation.
//! A bitboard is a 64-bit integer where each bit represents a square on
//! the board. Attack tables are precomputed at compile time; sliding
//! attacks against an occupancy are resolved by directional ray walks.

// ============================================================================
// CONSTANTS - Files and Ranks
// ============================================================================

pub const FILE_A: u64 = 0x0101010101010101;
pub const FILE_H: u64 = 0x8080808080808080;

pub const RANK_1: u64 = 0x00000000000000FF;
pub const RANK_2: u64 = 0x000000000000FF00;
pub const RANK_3: u64 = 0x0000000000FF0000;
pub const RANK_6: u64 = 0x0000FF0000000000;
pub const RANK_7: u64 = 0x00FF000000000000;
pub const RANK_8: u64 = 0xFF00000000000000;

pub const NOT_FILE_A: u64 = !FILE_A;
pub const NOT_FILE_H: u64 = !FILE_H;
pub const NOT_FILE_AB: u64 = !(FILE_A | (FILE_A << 1));
pub const NOT_FILE_GH: u64 = !(FILE_H | (FILE_H >> 1));

// ============================================================================
// PRECOMPUTED ATTACK TABLES
// ============================================================================

/// Knight attack table - attacks from each square
pub static KNIGHT_ATTACKS: [u64; 64] = init_knight_attacks();

/// King attack table - attacks from each square
pub static KING_ATTACKS: [u64; 64] = init_king_attacks();

/// Pawn attack table - [color][square] where 0=white, 1=black
pub static PAWN_ATTACKS: [[u64; 64]; 2] = init_pawn_attacks();

/// Rook rays on an empty board, per square
pub static PSEUDO_ROOK_ATTACKS: [u64; 64] = init_pseudo_rook();

/// Bishop rays on an empty board, per square
pub static PSEUDO_BISHOP_ATTACKS: [u64; 64] = init_pseudo_bishop();

/// Squares strictly between two squares on a shared rank, file or
/// diagonal; zero for unaligned pairs
pub static BETWEEN: [[u64; 64]; 64] = init_between();

/// Neighboring files of each file (isolated-pawn test)
pub static ADJACENT_FILES: [u64; 8] = init_adjacent_files();

/// Squares an enemy pawn would have to occupy to stop a pawn on the
/// indexed square from promoting - [color][square]
pub static PASSER_SPAN: [[u64; 64]; 2] = init_passer_span();

// ============================================================================
// CASTLE ZONES AND PAWN SHIELDS
// ============================================================================

/// King squares after castling, per wing, and the pawn rows that
/// shield them
pub const WHITE_KING_SIDE: u64 = 0x00000000000000E0;
pub const WHITE_QUEEN_SIDE: u64 = 0x0000000000000007;
pub const WHITE_KING_SHIELD: u64 = 0x000000000000E000;
pub const WHITE_QUEEN_SHIELD: u64 = 0x0000000000000700;
pub const BLACK_KING_SIDE: u64 = 0xE000000000000000;
pub const BLACK_QUEEN_SIDE: u64 = 0x0700000000000000;
pub const BLACK_KING_SHIELD: u64 = 0x00E0000000000000;
pub const BLACK_QUEEN_SHIELD: u64 = 0x0007000000000000;

// ============================================================================
// INITIALIZATION FUNCTIONS (const)
// ============================================================================

const fn init_knight_attacks() -> [u64; 64] {
    let mut attacks = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let bb = 1u64 << sq;
        let mut attack = 0u64;

        // NNE: +17 (up 2, right 1)
        if bb & NOT_FILE_H != 0 {
            attack |= bb << 17;
        }
        // NNW: +15 (up 2, left 1)
        if bb & NOT_FILE_A != 0 {
            attack |= bb << 15;
        }
        // NEE: +10 (up 1, right 2)
        if bb & NOT_FILE_GH != 0 {
            attack |= bb << 10;
        }
        // NWW: +6 (up 1, left 2)
        if bb & NOT_FILE_AB != 0 {
            attack |= bb << 6;
        }
        // SSE: -15 (down 2, right 1)
        if bb & NOT_FILE_H != 0 && sq >= 15 {
            attack |= bb >> 15;
        }
        // SSW: -17 (down 2, left 1)
        if bb & NOT_FILE_A != 0 && sq >= 17 {
            attack |= bb >> 17;
        }
        // SEE: -6 (down 1, right 2)
        if bb & NOT_FILE_GH != 0 && sq >= 6 {
            attack |= bb >> 6;
        }
        // SWW: -10 (down 1, left 2)
        if bb & NOT_FILE_AB != 0 && sq >= 10 {
            attack |= bb >> 10;
        }

        attacks[sq] = attack;
        sq += 1;
    }

    attacks
}

const fn init_king_attacks() -> [u64; 64] {
    let mut attacks = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let bb = 1u64 << sq;
        let mut attack = bb << 8;
        if sq >= 8 {
            attack |= bb >> 8;
        }
        if bb & NOT_FILE_H != 0 {
            attack |= (bb << 1) | (bb << 9);
            if sq >= 7 {
                attack |= bb >> 7;
            }
        }
        if bb & NOT_FILE_A != 0 {
            attack |= (bb >> 1) | (bb << 7);
            if sq >= 9 {
                attack |= bb >> 9;
            }
        }

        attacks[sq] = attack;
        sq += 1;
    }

    attacks
}

const fn init_pawn_attacks() -> [[u64; 64]; 2] {
    let mut attacks = [[0u64; 64]; 2];
    let mut sq = 0usize;

    while sq < 64 {
        let bb = 1u64 << sq;

        // White pawn attacks (moving up)
        let mut white_attack = 0u64;
        if bb & NOT_FILE_A != 0 {
            white_attack |= bb << 7;
        }
        if bb & NOT_FILE_H != 0 {
            white_attack |= bb << 9;
        }
        attacks[0][sq] = white_attack;

        // Black pawn attacks (moving down)
        let mut black_attack = 0u64;
        if bb & NOT_FILE_H != 0 && sq >= 7 {
            black_attack |= bb >> 7;
        }
        if bb & NOT_FILE_A != 0 && sq >= 9 {
            black_attack |= bb >> 9;
        }
        attacks[1][sq] = black_attack;

        sq += 1;
    }

    attacks
}

const fn init_pseudo_rook() -> [u64; 64] {
    let mut attacks = [0u64; 64];
    let mut sq = 0usize;
    while sq < 64 {
        // XOR clears the square itself, set in both masks
        attacks[sq] = (FILE_A << (sq & 7)) ^ (RANK_1 << (sq & 56));
        sq += 1;
    }
    attacks
}

const fn init_pseudo_bishop() -> [u64; 64] {
    let mut attacks = [0u64; 64];
    let mut sq = 0usize;
    while sq < 64 {
        let mut attack = 0u64;
        let mut dir = 0usize;
        let steps: [(i32, i32); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];
        while dir < 4 {
            let (df, dr) = steps[dir];
            let mut f = (sq & 7) as i32 + df;
            let mut r = (sq >> 3) as i32 + dr;
            while f >= 0 && f < 8 && r >= 0 && r < 8 {
                attack |= 1u64 << (r * 8 + f);
                f += df;
                r += dr;
            }
            dir += 1;
        }
        attacks[sq] = attack;
        sq += 1;
    }
    attacks
}

const fn between_mask(a: usize, b: usize) -> u64 {
    let df = (b & 7) as i32 - (a & 7) as i32;
    let dr = (b >> 3) as i32 - (a >> 3) as i32;

    let step = if df == 0 && dr != 0 {
        8 * dr.signum()
    } else if dr == 0 && df != 0 {
        df.signum()
    } else if df != 0 && df.abs() == dr.abs() {
        8 * dr.signum() + df.signum()
    } else {
        return 0;
    };

    let mut mask = 0u64;
    let mut sq = a as i32 + step;
    while sq != b as i32 {
        mask |= 1u64 << sq;
        sq += step;
    }
    mask
}

const fn init_between() -> [[u64; 64]; 64] {
    let mut table = [[0u64; 64]; 64];
    let mut from = 0usize;
    while from < 64 {
        let mut to = 0usize;
        while to < 64 {
            table[from][to] = between_mask(from, to);
            to += 1;
        }
        from += 1;
    }
    table
}

const fn init_adjacent_files() -> [u64; 8] {
    let mut masks = [0u64; 8];
    let mut file = 0usize;
    while file < 8 {
        if file > 0 {
            masks[file] |= FILE_A << (file - 1);
        }
        if file < 7 {
            masks[file] |= FILE_A << (file + 1);
        }
        file += 1;
    }
    masks
}

const fn init_passer_span() -> [[u64; 64]; 2] {
    let mut spans = [[0u64; 64]; 2];
    let mut sq = 0usize;
    while sq < 64 {
        let file = sq & 7;
        let rank = sq >> 3;
        let mut files = FILE_A << file;
        if file > 0 {
            files |= FILE_A << (file - 1);
        }
        if file < 7 {
            files |= FILE_A << (file + 1);
        }
        // Ranks strictly ahead of the pawn
        let ahead_white = if rank < 7 { !0u64 << (8 * (rank + 1)) } else { 0 };
        let ahead_black = if rank > 0 { (1u64 << (8 * rank)) - 1 } else { 0 };
        spans[0][sq] = files & ahead_white;
        spans[1][sq] = files & ahead_black;
        sq += 1;
    }
    spans
}

// ============================================================================
// SLIDING PIECE ATTACKS
// ============================================================================

/// Get rook attacks from a square given occupied squares
#[inline]
pub fn rook_attacks(sq: usize, occupied: u64) -> u64 {
    let mut attacks = 0u64;

    // North
    let mut current = sq;
    while current < 56 {
        current += 8;
        attacks |= 1u64 << current;
        if (1u64 << current) & occupied != 0 {
            break;
        }
    }

    // South
    current = sq;
    while current >= 8 {
        current -= 8;
        attacks |= 1u64 << current;
        if (1u64 << current) & occupied != 0 {
            break;
        }
    }

    // East
    current = sq;
    while current % 8 < 7 {
        current += 1;
        attacks |= 1u64 << current;
        if (1u64 << current) & occupied != 0 {
            break;
        }
    }

    // West
    current = sq;
    while current % 8 > 0 {
        current -= 1;
        attacks |= 1u64 << current;
        if (1u64 << current) & occupied != 0 {
            break;
        }
    }

    attacks
}

/// Get bishop attacks from a square given occupied squares
#[inline]
pub fn bishop_attacks(sq: usize, occupied: u64) -> u64 {
    let mut attacks = 0u64;
    let file = sq % 8;
    let rank = sq / 8;

    // Northeast
    let mut f = file;
    let mut r = rank;
    while f < 7 && r < 7 {
        f += 1;
        r += 1;
        let target = r * 8 + f;
        attacks |= 1u64 << target;
        if (1u64 << target) & occupied != 0 {
            break;
        }
    }

    // Northwest
    f = file;
    r = rank;
    while f > 0 && r < 7 {
        f -= 1;
        r += 1;
        let target = r * 8 + f;
        attacks |= 1u64 << target;
        if (1u64 << target) & occupied != 0 {
            break;
        }
    }

    // Southeast
    f = file;
    r = rank;
    while f < 7 && r > 0 {
        f += 1;
        r -= 1;
        let target = r * 8 + f;
        attacks |= 1u64 << target;
        if (1u64 << target) & occupied != 0 {
            break;
        }
    }

    // Southwest
    f = file;
    r = rank;
    while f > 0 && r > 0 {
        f -= 1;
        r -= 1;
        let target = r * 8 + f;
        attacks |= 1u64 << target;
        if (1u64 << target) & occupied != 0 {
            break;
        }
    }

    attacks
}

/// Get queen attacks (combination of rook and bishop)
#[inline]
pub fn queen_attacks(sq: usize, occupied: u64) -> u64 {
    rook_attacks(sq, occupied) | bishop_attacks(sq, occupied)
}

// ============================================================================
// BITBOARD UTILITIES
// ============================================================================

/// Extract and clear the least significant bit, returning its index
#[inline]
pub fn pop_lsb(bb: &mut u64) -> usize {
    let idx = bb.trailing_zeros() as usize;
    *bb &= *bb - 1;
    idx
}

/// Count the number of set bits in a bitboard
#[inline]
pub fn popcount(bb: u64) -> u32 {
    bb.count_ones()
}

/// Create a bitboard with a single bit set at the given square
#[inline]
pub const fn square_bb(sq: usize) -> u64 {
    1u64 << sq
}

/// Get the file (0-7) of a square
#[inline]
pub const fn file_of(sq: usize) -> usize {
    sq & 7
}

/// Get the rank (0-7) of a square
#[inline]
pub const fn rank_of(sq: usize) -> usize {
    sq >> 3
}

/// Shift a bitboard north (up) by one rank
#[inline]
pub const fn shift_north(bb: u64) -> u64 {
    bb << 8
}

/// Shift a bitboard south (down) by one rank
#[inline]
pub const fn shift_south(bb: u64) -> u64 {
    bb >> 8
}

/// Three squares are on one line (pin-ray test)
#[inline]
pub fn aligned(a: usize, b: usize, c: usize) -> bool {
    (BETWEEN[a][b] | BETWEEN[a][c] | BETWEEN[b][c])
        & (square_bb(a) | square_bb(b) | square_bb(c))
        != 0
}
