//! Falchion - Type definitions and constants
//!
//! This module provides the core type definitions and constants for
//! representing chess pieces, colors, squares and search scores.

/// Color constants
pub const WHITE: u8 = 0;
pub const BLACK: u8 = 1;
pub const NO_COLOR: u8 = 2;

/// Piece kind constants
pub const PAWN: u8 = 0;
pub const KNIGHT: u8 = 1;
pub const BISHOP: u8 = 2;
pub const ROOK: u8 = 3;
pub const QUEEN: u8 = 4;
pub const KING: u8 = 5;
pub const NO_KIND: u8 = 6;

/// Castling rights bitmasks
pub const CASTLE_WK: u8 = 1; // White kingside
pub const CASTLE_WQ: u8 = 2; // White queenside
pub const CASTLE_BK: u8 = 4; // Black kingside
pub const CASTLE_BQ: u8 = 8; // Black queenside

/// Search score constants
pub const INFINITY: i32 = 100_000;
pub const MATE: i32 = 50_000;
pub const DRAW: i32 = 0;

/// Upper bound on search ply (killer/history tables)
pub const MAX_PLY: usize = 128;

/// Upper bound on game plies recorded in the position history stack.
/// Search depth stays well below this, so the stack never overflows.
pub const MAX_GAME_PLY: usize = 1024;

/// File and rank names for UCI notation
pub const FILE_NAMES: &[u8; 8] = b"abcdefgh";
pub const RANK_NAMES: &[u8; 8] = b"12345678";

/// A colored piece occupying a square, or the empty marker
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Piece {
    pub color: u8,
    pub kind: u8,
}

/// Empty-square marker for the piece-on-square array
pub const NO_PIECE: Piece = Piece { color: NO_COLOR, kind: NO_KIND };

impl Piece {
    pub const fn new(color: u8, kind: u8) -> Piece {
        Piece { color, kind }
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.kind == NO_KIND
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self.kind != NO_KIND
    }
}

/// The other color
#[inline]
pub fn opposite(color: u8) -> u8 {
    color ^ 1
}

/// Vertically mirrored square (a1 <-> a8)
#[inline]
pub fn mirror(sq: usize) -> usize {
    sq ^ 56
}

/// Convert square index (0-63) to algebraic notation (e.g., "e4")
pub fn square_name(sq: usize) -> String {
    let file = sq % 8;
    let rank = sq / 8;
    format!("{}{}", FILE_NAMES[file] as char, RANK_NAMES[rank] as char)
}

/// Convert algebraic notation to square index
pub fn parse_square(name: &str) -> Option<usize> {
    let mut chars = name.chars();
    let file = match chars.next()? {
        c @ 'a'..='h' => (c as usize) - ('a' as usize),
        _ => return None,
    };
    let rank = match chars.next()? {
        c @ '1'..='8' => (c as usize) - ('1' as usize),
        _ => return None,
    };
    Some(rank * 8 + file)
}

/// FEN piece character to piece value
pub fn fen_to_piece(c: char) -> Option<Piece> {
    let kind = match c.to_ascii_lowercase() {
        'p' => PAWN,
        'n' => KNIGHT,
        'b' => BISHOP,
        'r' => ROOK,
        'q' => QUEEN,
        'k' => KING,
        _ => return None,
    };
    let color = if c.is_ascii_uppercase() { WHITE } else { BLACK };
    Some(Piece::new(color, kind))
}

/// Piece value to FEN character
pub fn piece_to_fen(piece: Piece) -> Option<char> {
    let c = match piece.kind {
        PAWN => 'p',
        KNIGHT => 'n',
        BISHOP => 'b',
        ROOK => 'r',
        QUEEN => 'q',
        KING => 'k',
        _ => return None,
    };
    if piece.color == WHITE {
        Some(c.to_ascii_uppercase())
    } else {
        Some(c)
    }
}

/// Promotion piece letter for UCI move text
pub fn promotion_char(kind: u8) -> char {
    match kind {
        KNIGHT => 'n',
        BISHOP => 'b',
        ROOK => 'r',
        QUEEN => 'q',
        _ => '?',
    }
}
