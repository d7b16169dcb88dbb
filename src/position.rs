//! Falchion - Position Module
//!
//! This module provides the core position state: per-piece bitboards with
//! a mailbox mirror, castling rights, the en passant square and clocks,
//! plus incrementally maintained material, piece-square and hash values.
//! It includes FEN parsing and generation, move execution with a
//! drop-to-rewind guard, static exchange evaluation and repetition
//! detection.

use crate::bitboard::*;
use crate::error::FenError;
use crate::evaluation::{self, piece_value};
use crate::moves::{Move, MoveKind};
use crate::types::*;
use crate::zobrist;
use std::ops::{Deref, DerefMut};

/// Starting position FEN
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// State a move destroys, saved per ply so it can be restored
#[derive(Clone, Copy)]
struct Snapshot {
    castling_rights: u8,
    en_passant: Option<u8>,
    halfmove_clock: u16,
    hash: u64,
    captured: u8,
}

impl Snapshot {
    const EMPTY: Snapshot = Snapshot {
        castling_rights: 0,
        en_passant: None,
        halfmove_clock: 0,
        hash: 0,
        captured: NO_KIND,
    };
}

/// Chess position with all derived state kept in sync by make/undo
#[derive(Clone)]
pub struct Position {
    /// Piece bitboards indexed by [color][kind]
    pub bitboards: [[u64; 6]; 2],
    /// All pieces of one color
    pub occupancy: [u64; 2],
    /// All pieces of both colors
    pub occupied: u64,
    /// Mailbox mirror of the bitboards (0=a1, 63=h8)
    pub squares: [Piece; 64],
    pub side_to_move: u8,
    /// Bitmask for castling rights (1=K, 2=Q, 4=k, 8=q)
    pub castling_rights: u8,
    /// Target square for en passant
    pub en_passant: Option<u8>,
    /// Moves since last pawn move or capture (for 50-move rule)
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
    /// Plies played since the position was loaded
    pub ply: usize,
    pub king_square: [usize; 2],
    pub num_pieces: [[u8; 6]; 2],
    /// Material sum per color, king included
    pub material: [i32; 2],
    /// Piece-square sums per color as (opening, endgame)
    pub pst: [(i32, i32); 2],
    pub pawns_on_file: [[u8; 8]; 2],
    /// Zobrist hash of the current position
    pub hash: u64,
    /// Cleared while a null move is on the board
    pub allow_null: bool,
    /// Whether each color has castled in this game
    pub castled: [bool; 2],
    history: [Snapshot; MAX_GAME_PLY],
}

impl Position {
    /// Create a position with the starting setup
    pub fn new() -> Self {
        Position::from_fen(STARTING_FEN).unwrap()
    }

    /// Create a position from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut parts = fen.split_whitespace();
        let placement = parts
            .next()
            .ok_or(FenError::MissingField("piece placement"))?;
        let side = parts.next().ok_or(FenError::MissingField("side to move"))?;
        let castling = parts.next().unwrap_or("-");
        let en_passant = parts.next().unwrap_or("-");
        let halfmove = parts.next().unwrap_or("0");
        let fullmove = parts.next().unwrap_or("1");

        let mut pos = Position {
            bitboards: [[0; 6]; 2],
            occupancy: [0; 2],
            occupied: 0,
            squares: [NO_PIECE; 64],
            side_to_move: WHITE,
            castling_rights: 0,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            ply: 0,
            king_square: [0; 2],
            num_pieces: [[0; 6]; 2],
            material: [0; 2],
            pst: [(0, 0); 2],
            pawns_on_file: [[0; 8]; 2],
            hash: 0,
            allow_null: true,
            castled: [false; 2],
            history: [Snapshot::EMPTY; MAX_GAME_PLY],
        };

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::BadRankCount(ranks.len()));
        }

        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else if let Some(piece) = fen_to_piece(c) {
                    if file > 7 {
                        return Err(FenError::BadRankWidth(rank_str.to_string()));
                    }
                    pos.add_piece(piece, rank * 8 + file);
                    file += 1;
                } else {
                    return Err(FenError::BadPiece(c));
                }
            }
            if file != 8 {
                return Err(FenError::BadRankWidth(rank_str.to_string()));
            }
        }

        pos.side_to_move = match side {
            "w" => WHITE,
            "b" => BLACK,
            _ => return Err(FenError::BadSideToMove(side.to_string())),
        };

        if castling != "-" {
            for c in castling.chars() {
                match c {
                    'K' => pos.castling_rights |= CASTLE_WK,
                    'Q' => pos.castling_rights |= CASTLE_WQ,
                    'k' => pos.castling_rights |= CASTLE_BK,
                    'q' => pos.castling_rights |= CASTLE_BQ,
                    _ => return Err(FenError::BadCastling(castling.to_string())),
                }
            }
        }

        if en_passant != "-" {
            let sq = parse_square(en_passant)
                .ok_or_else(|| FenError::BadEnPassant(en_passant.to_string()))?;
            let rank = rank_of(sq);
            if rank != 2 && rank != 5 {
                return Err(FenError::BadEnPassant(en_passant.to_string()));
            }
            pos.en_passant = Some(sq as u8);
        }

        pos.halfmove_clock = halfmove
            .parse()
            .map_err(|_| FenError::BadHalfMoveClock(halfmove.to_string()))?;
        pos.fullmove_number = fullmove.parse().unwrap_or(1);

        if pos.num_pieces[WHITE as usize][KING as usize] != 1 {
            return Err(FenError::MissingKing("white"));
        }
        if pos.num_pieces[BLACK as usize][KING as usize] != 1 {
            return Err(FenError::MissingKing("black"));
        }

        pos.occupied = pos.occupancy[0] | pos.occupancy[1];
        pos.hash = pos.compute_hash();

        Ok(pos)
    }

    fn add_piece(&mut self, piece: Piece, sq: usize) {
        let color = piece.color as usize;
        let kind = piece.kind as usize;
        self.squares[sq] = piece;
        self.bitboards[color][kind] |= square_bb(sq);
        self.occupancy[color] |= square_bb(sq);
        self.num_pieces[color][kind] += 1;
        self.material[color] += piece_value(piece.kind);
        let (op, eg) = evaluation::pst_pair(piece, sq);
        self.pst[color].0 += op;
        self.pst[color].1 += eg;
        if piece.kind == PAWN {
            self.pawns_on_file[color][file_of(sq)] += 1;
        }
        if piece.kind == KING {
            self.king_square[color] = sq;
        }
    }

    /// Hash the position from scratch
    pub fn compute_hash(&self) -> u64 {
        let z = zobrist::keys();
        let mut hash = 0u64;
        for sq in 0..64 {
            let piece = self.squares[sq];
            if piece.is_some() {
                hash ^= z.pieces[piece.color as usize][piece.kind as usize][sq];
            }
        }
        if self.side_to_move == BLACK {
            hash ^= z.side;
        }
        hash ^= z.castling[self.castling_rights as usize];
        if let Some(ep) = self.en_passant {
            hash ^= z.en_passant[file_of(ep as usize)];
        }
        hash
    }

    /// Generate FEN string from the current position
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty_count = 0;
            for file in 0..8 {
                let piece = self.squares[rank * 8 + file];
                if piece.is_none() {
                    empty_count += 1;
                } else {
                    if empty_count > 0 {
                        fen.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    if let Some(c) = piece_to_fen(piece) {
                        fen.push(c);
                    }
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side_to_move == WHITE { 'w' } else { 'b' });

        fen.push(' ');
        if self.castling_rights == 0 {
            fen.push('-');
        } else {
            if self.castling_rights & CASTLE_WK != 0 {
                fen.push('K');
            }
            if self.castling_rights & CASTLE_WQ != 0 {
                fen.push('Q');
            }
            if self.castling_rights & CASTLE_BK != 0 {
                fen.push('k');
            }
            if self.castling_rights & CASTLE_BQ != 0 {
                fen.push('q');
            }
        }

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&square_name(sq as usize)),
            None => fen.push('-'),
        }

        // Clock fields are tracked internally but not emitted
        fen.push_str(" 0 1");

        fen
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    #[inline]
    pub fn piece_on(&self, sq: usize) -> Piece {
        self.squares[sq]
    }

    /// True when the move takes an enemy piece
    #[inline]
    pub fn is_capture(&self, mv: Move) -> bool {
        !self.squares[mv.to_sq()].is_none() || mv.kind == MoveKind::EnPassant
    }

    #[inline]
    pub fn pieces(&self, color: u8, kind: u8) -> u64 {
        self.bitboards[color as usize][kind as usize]
    }

    #[inline]
    pub fn our_pieces(&self) -> u64 {
        self.occupancy[self.side_to_move as usize]
    }

    #[inline]
    pub fn enemy_pieces(&self) -> u64 {
        self.occupancy[opposite(self.side_to_move) as usize]
    }

    /// Material of both sides combined, kings included
    #[inline]
    pub fn total_material(&self) -> i32 {
        self.material[0] + self.material[1]
    }

    /// Material difference from the given color's point of view
    #[inline]
    pub fn material_score(&self, color: u8) -> i32 {
        self.material[color as usize] - self.material[opposite(color) as usize]
    }

    #[inline]
    pub fn count(&self, color: u8, kind: u8) -> u8 {
        self.num_pieces[color as usize][kind as usize]
    }

    // ========================================================================
    // ATTACK QUERIES
    // ========================================================================

    /// Check if a square is attacked by any piece of the given color
    pub fn attacked(&self, sq: usize, by: u8) -> bool {
        let by = by as usize;
        let defender = by ^ 1;

        if PAWN_ATTACKS[defender][sq] & self.bitboards[by][PAWN as usize] != 0 {
            return true;
        }
        if KNIGHT_ATTACKS[sq] & self.bitboards[by][KNIGHT as usize] != 0 {
            return true;
        }
        if KING_ATTACKS[sq] & self.bitboards[by][KING as usize] != 0 {
            return true;
        }

        let straight =
            self.bitboards[by][ROOK as usize] | self.bitboards[by][QUEEN as usize];
        if straight != 0 && rook_attacks(sq, self.occupied) & straight != 0 {
            return true;
        }

        let diagonal =
            self.bitboards[by][BISHOP as usize] | self.bitboards[by][QUEEN as usize];
        if diagonal != 0 && bishop_attacks(sq, self.occupied) & diagonal != 0 {
            return true;
        }

        false
    }

    /// All pieces of one color attacking a square under the given occupancy
    pub fn attacks_to(&self, sq: usize, color: u8, occupied: u64) -> u64 {
        let c = color as usize;
        let defender = c ^ 1;

        (KING_ATTACKS[sq] & self.bitboards[c][KING as usize])
            | (PAWN_ATTACKS[defender][sq] & self.bitboards[c][PAWN as usize])
            | (KNIGHT_ATTACKS[sq] & self.bitboards[c][KNIGHT as usize])
            | (bishop_attacks(sq, occupied)
                & (self.bitboards[c][BISHOP as usize] | self.bitboards[c][QUEEN as usize]))
            | (rook_attacks(sq, occupied)
                & (self.bitboards[c][ROOK as usize] | self.bitboards[c][QUEEN as usize]))
    }

    /// Enemy pieces attacking the king of the given color
    pub fn king_attackers(&self, sq: usize, color: u8) -> u64 {
        let c = color as usize;
        let opp = c ^ 1;

        (PAWN_ATTACKS[c][sq] & self.bitboards[opp][PAWN as usize])
            | (KNIGHT_ATTACKS[sq] & self.bitboards[opp][KNIGHT as usize])
            | (bishop_attacks(sq, self.occupied)
                & (self.bitboards[opp][BISHOP as usize] | self.bitboards[opp][QUEEN as usize]))
            | (rook_attacks(sq, self.occupied)
                & (self.bitboards[opp][ROOK as usize] | self.bitboards[opp][QUEEN as usize]))
    }

    /// Pieces giving check to the side to move
    #[inline]
    pub fn checkers(&self) -> u64 {
        let us = self.side_to_move as usize;
        self.king_attackers(self.king_square[us], self.side_to_move)
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.checkers() != 0
    }

    /// Own pieces that shield the king from an enemy slider
    pub fn pinned_pieces(&self) -> u64 {
        let us = self.side_to_move as usize;
        let them = us ^ 1;
        let king_sq = self.king_square[us];
        let own = self.occupancy[us];

        let mut pinned = 0u64;
        let mut pinners = ((self.bitboards[them][ROOK as usize]
            | self.bitboards[them][QUEEN as usize])
            & PSEUDO_ROOK_ATTACKS[king_sq])
            | ((self.bitboards[them][BISHOP as usize]
                | self.bitboards[them][QUEEN as usize])
                & PSEUDO_BISHOP_ATTACKS[king_sq]);

        while pinners != 0 {
            let sq = pop_lsb(&mut pinners);
            let blockers = BETWEEN[sq][king_sq] & self.occupied;

            if blockers != 0 && blockers & (blockers - 1) == 0 && blockers & own != 0 {
                pinned |= blockers;
            }
        }
        pinned
    }

    /// Check a pseudo-legal move leaves the own king safe.
    ///
    /// King moves are tested against the current occupancy; the evasion
    /// generator already rules out retreats along a checker's ray.
    pub fn is_move_legal(&mut self, mv: Move, pinned: u64) -> bool {
        let us = self.side_to_move;

        if self.squares[mv.from_sq()].kind == KING {
            return !self.attacked(mv.to_sq(), opposite(us));
        }

        if mv.kind == MoveKind::EnPassant {
            let after = self.play(mv);
            let king_sq = after.king_square[us as usize];
            return !after.attacked(king_sq, after.side_to_move);
        }

        pinned == 0
            || pinned & square_bb(mv.from_sq()) == 0
            || aligned(mv.from_sq(), mv.to_sq(), self.king_square[us as usize])
    }

    // ========================================================================
    // MOVE EXECUTION
    // ========================================================================

    /// Apply a move, returning a guard that rewinds it on drop
    #[inline]
    pub fn play(&mut self, mv: Move) -> MoveGuard<'_> {
        self.make_move(mv);
        MoveGuard { position: self, mv }
    }

    /// Apply a null move, returning a guard that rewinds it on drop
    pub fn play_null(&mut self) -> NullGuard<'_> {
        let z = zobrist::keys();

        self.history[self.ply] = Snapshot {
            castling_rights: self.castling_rights,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
            captured: NO_KIND,
        };

        self.side_to_move = opposite(self.side_to_move);
        self.hash ^= z.side;
        if let Some(ep) = self.en_passant {
            self.hash ^= z.en_passant[file_of(ep as usize)];
        }
        self.en_passant = None;
        self.allow_null = false;
        self.ply += 1;

        NullGuard { position: self }
    }

    /// Apply a move permanently
    pub fn make_move(&mut self, mv: Move) {
        let z = zobrist::keys();
        let from = mv.from_sq();
        let to = mv.to_sq();
        let us = self.side_to_move as usize;
        let them = us ^ 1;
        let piece_moved = self.squares[from].kind;
        let captured = match mv.kind {
            MoveKind::EnPassant => PAWN,
            _ => self.squares[to].kind,
        };
        let is_capture = captured != NO_KIND;
        let old_rights = self.castling_rights;

        self.history[self.ply] = Snapshot {
            castling_rights: self.castling_rights,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
            captured,
        };

        self.hash ^= z.side;

        // Move the piece in the mailbox
        self.squares[to] = self.squares[from];
        self.squares[from] = NO_PIECE;
        let moved = Piece::new(us as u8, piece_moved);
        let (op_from, eg_from) = evaluation::pst_pair(moved, from);
        let (op_to, eg_to) = evaluation::pst_pair(moved, to);
        self.pst[us].0 += op_to - op_from;
        self.pst[us].1 += eg_to - eg_from;

        let from_bb = square_bb(from);
        let to_bb = square_bb(to);
        let from_to = from_bb | to_bb;

        self.bitboards[us][piece_moved as usize] ^= from_to;
        self.hash ^= z.pieces[us][piece_moved as usize][from];
        self.hash ^= z.pieces[us][piece_moved as usize][to];
        self.occupancy[us] ^= from_to;

        if piece_moved == KING {
            self.king_square[us] = to;

            if mv.kind == MoveKind::Castle {
                self.make_castle(from, to);
            }

            if us == WHITE as usize {
                self.castling_rights &= !(CASTLE_WK | CASTLE_WQ);
            } else {
                self.castling_rights &= !(CASTLE_BK | CASTLE_BQ);
            }
        } else if piece_moved == ROOK {
            if self.castling_rights != 0 {
                match from {
                    0 => self.castling_rights &= !CASTLE_WQ,
                    7 => self.castling_rights &= !CASTLE_WK,
                    56 => self.castling_rights &= !CASTLE_BQ,
                    63 => self.castling_rights &= !CASTLE_BK,
                    _ => {}
                }
            }
        } else if let Some(promoted) = mv.promoted() {
            self.squares[to] = Piece::new(us as u8, promoted);
            self.bitboards[us][PAWN as usize] ^= to_bb;
            self.bitboards[us][promoted as usize] ^= to_bb;
            self.num_pieces[us][PAWN as usize] -= 1;
            self.num_pieces[us][promoted as usize] += 1;

            let pawn = Piece::new(us as u8, PAWN);
            let promo = Piece::new(us as u8, promoted);
            let (op_pawn, eg_pawn) = evaluation::pst_pair(pawn, to);
            let (op_promo, eg_promo) = evaluation::pst_pair(promo, to);
            self.pst[us].0 += op_promo - op_pawn;
            self.pst[us].1 += eg_promo - eg_pawn;

            self.material[us] += piece_value(promoted) - piece_value(PAWN);
            self.hash ^= z.pieces[us][PAWN as usize][to];
            self.hash ^= z.pieces[us][promoted as usize][to];

            self.pawns_on_file[us][file_of(from)] -= 1;
        }

        if is_capture {
            if mv.kind == MoveKind::EnPassant {
                let cap_sq = if us == WHITE as usize { to - 8 } else { to + 8 };
                let cap_bb = square_bb(cap_sq);

                self.squares[cap_sq] = NO_PIECE;
                let victim = Piece::new(them as u8, PAWN);
                let (op, eg) = evaluation::pst_pair(victim, cap_sq);
                self.pst[them].0 -= op;
                self.pst[them].1 -= eg;
                self.hash ^= z.pieces[them][PAWN as usize][cap_sq];

                self.occupancy[them] ^= cap_bb;
                self.bitboards[them][PAWN as usize] ^= cap_bb;
                self.occupied ^= from_to ^ cap_bb;

                self.pawns_on_file[us][file_of(from)] -= 1;
                self.pawns_on_file[us][file_of(to)] += 1;
                self.pawns_on_file[them][file_of(to)] -= 1;
            } else {
                if captured == ROOK {
                    match to {
                        7 if them == WHITE as usize => self.castling_rights &= !CASTLE_WK,
                        0 if them == WHITE as usize => self.castling_rights &= !CASTLE_WQ,
                        63 if them == BLACK as usize => self.castling_rights &= !CASTLE_BK,
                        56 if them == BLACK as usize => self.castling_rights &= !CASTLE_BQ,
                        _ => {}
                    }
                } else if captured == PAWN {
                    self.pawns_on_file[them][file_of(to)] -= 1;
                }

                if piece_moved == PAWN && mv.promoted().is_none() {
                    self.pawns_on_file[us][file_of(from)] -= 1;
                    self.pawns_on_file[us][file_of(to)] += 1;
                }

                let victim = Piece::new(them as u8, captured);
                let (op, eg) = evaluation::pst_pair(victim, to);
                self.pst[them].0 -= op;
                self.pst[them].1 -= eg;

                self.bitboards[them][captured as usize] ^= to_bb;
                self.occupancy[them] ^= to_bb;
                self.occupied ^= from_bb;
                self.hash ^= z.pieces[them][captured as usize][to];
            }

            self.num_pieces[them][captured as usize] -= 1;
            self.material[them] -= piece_value(captured);
        } else {
            self.occupied ^= from_to;
        }

        if let Some(ep) = self.en_passant {
            self.hash ^= z.en_passant[file_of(ep as usize)];
        }
        self.en_passant = None;

        if piece_moved == PAWN && mv.kind == MoveKind::DoublePush {
            let ep = (from + to) / 2;
            self.en_passant = Some(ep as u8);
            self.hash ^= z.en_passant[file_of(ep)];
        }

        if old_rights != self.castling_rights {
            self.hash ^=
                z.castling[old_rights as usize] ^ z.castling[self.castling_rights as usize];
        }

        if is_capture || piece_moved == PAWN {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if us == BLACK as usize {
            self.fullmove_number += 1;
        }

        self.side_to_move = them as u8;
        self.ply += 1;
    }

    fn undo_move(&mut self, mv: Move) {
        self.ply -= 1;
        let snap = self.history[self.ply];
        let captured = snap.captured;
        let is_capture = captured != NO_KIND;

        self.side_to_move = opposite(self.side_to_move);
        let us = self.side_to_move as usize;
        let them = us ^ 1;

        let from = mv.from_sq();
        let to = mv.to_sq();
        let promotion = mv.promoted();
        let piece_moved = match promotion {
            Some(_) => PAWN,
            None => self.squares[to].kind,
        };

        // Move the piece back in the mailbox
        self.squares[from] = self.squares[to];

        if promotion.is_none() {
            let moved = Piece::new(us as u8, piece_moved);
            let (op_from, eg_from) = evaluation::pst_pair(moved, from);
            let (op_to, eg_to) = evaluation::pst_pair(moved, to);
            self.pst[us].0 += op_from - op_to;
            self.pst[us].1 += eg_from - eg_to;
        }

        let from_bb = square_bb(from);
        let to_bb = square_bb(to);
        let from_to = from_bb | to_bb;

        self.bitboards[us][piece_moved as usize] ^= from_to;
        self.occupancy[us] ^= from_to;

        if piece_moved == KING {
            self.king_square[us] = from;
            if mv.kind == MoveKind::Castle {
                self.undo_castle(from, to);
            }
        } else if let Some(promoted) = promotion {
            self.squares[from] = Piece::new(us as u8, PAWN);
            self.bitboards[us][promoted as usize] ^= to_bb;
            self.bitboards[us][PAWN as usize] ^= to_bb;
            self.num_pieces[us][PAWN as usize] += 1;
            self.num_pieces[us][promoted as usize] -= 1;

            let pawn = Piece::new(us as u8, PAWN);
            let promo = Piece::new(us as u8, promoted);
            let (op_pawn, eg_pawn) = evaluation::pst_pair(pawn, from);
            let (op_promo, eg_promo) = evaluation::pst_pair(promo, to);
            self.pst[us].0 += op_pawn - op_promo;
            self.pst[us].1 += eg_pawn - eg_promo;

            self.material[us] += piece_value(PAWN) - piece_value(promoted);

            self.pawns_on_file[us][file_of(from)] += 1;
        }

        if is_capture {
            if mv.kind == MoveKind::EnPassant {
                self.squares[to] = NO_PIECE;
                let cap_sq = if us == WHITE as usize { to - 8 } else { to + 8 };
                let cap_bb = square_bb(cap_sq);

                self.squares[cap_sq] = Piece::new(them as u8, PAWN);
                let victim = Piece::new(them as u8, PAWN);
                let (op, eg) = evaluation::pst_pair(victim, cap_sq);
                self.pst[them].0 += op;
                self.pst[them].1 += eg;

                self.occupancy[them] ^= cap_bb;
                self.bitboards[them][PAWN as usize] ^= cap_bb;
                self.occupied ^= from_to ^ cap_bb;

                self.pawns_on_file[us][file_of(from)] += 1;
                self.pawns_on_file[us][file_of(to)] -= 1;
                self.pawns_on_file[them][file_of(to)] += 1;
            } else {
                if captured == PAWN {
                    self.pawns_on_file[them][file_of(to)] += 1;
                }
                if piece_moved == PAWN && promotion.is_none() {
                    self.pawns_on_file[us][file_of(from)] += 1;
                    self.pawns_on_file[us][file_of(to)] -= 1;
                }

                self.squares[to] = Piece::new(them as u8, captured);
                let victim = Piece::new(them as u8, captured);
                let (op, eg) = evaluation::pst_pair(victim, to);
                self.pst[them].0 += op;
                self.pst[them].1 += eg;

                self.bitboards[them][captured as usize] ^= to_bb;
                self.occupancy[them] ^= to_bb;
                self.occupied ^= from_bb;
            }

            self.num_pieces[them][captured as usize] += 1;
            self.material[them] += piece_value(captured);
        } else {
            self.squares[to] = NO_PIECE;
            self.occupied ^= from_to;
        }

        self.castling_rights = snap.castling_rights;
        self.en_passant = snap.en_passant;
        self.halfmove_clock = snap.halfmove_clock;
        self.hash = snap.hash;

        if us == BLACK as usize {
            self.fullmove_number -= 1;
        }
    }

    fn undo_null(&mut self) {
        self.ply -= 1;
        let snap = self.history[self.ply];
        self.side_to_move = opposite(self.side_to_move);
        self.en_passant = snap.en_passant;
        self.hash = snap.hash;
        self.allow_null = true;
    }

    fn make_castle(&mut self, from: usize, to: usize) {
        let us = self.side_to_move as usize;
        let (rook_from, rook_to) = self.castle_rook_squares(from, to);
        let rook_mask = square_bb(rook_from) | square_bb(rook_to);
        let z = zobrist::keys();

        self.bitboards[us][ROOK as usize] ^= rook_mask;
        self.occupancy[us] ^= rook_mask;
        self.occupied ^= rook_mask;
        self.squares[rook_from] = NO_PIECE;
        self.squares[rook_to] = Piece::new(us as u8, ROOK);

        let rook = Piece::new(us as u8, ROOK);
        let (op_from, eg_from) = evaluation::pst_pair(rook, rook_from);
        let (op_to, eg_to) = evaluation::pst_pair(rook, rook_to);
        self.pst[us].0 += op_to - op_from;
        self.pst[us].1 += eg_to - eg_from;

        self.hash ^= z.pieces[us][ROOK as usize][rook_from];
        self.hash ^= z.pieces[us][ROOK as usize][rook_to];
        self.castled[us] = true;
    }

    fn undo_castle(&mut self, from: usize, to: usize) {
        let us = self.side_to_move as usize;
        let (rook_from, rook_to) = self.castle_rook_squares(from, to);
        let rook_mask = square_bb(rook_from) | square_bb(rook_to);

        self.bitboards[us][ROOK as usize] ^= rook_mask;
        self.occupancy[us] ^= rook_mask;
        self.occupied ^= rook_mask;
        self.squares[rook_from] = Piece::new(us as u8, ROOK);
        self.squares[rook_to] = NO_PIECE;

        let rook = Piece::new(us as u8, ROOK);
        let (op_from, eg_from) = evaluation::pst_pair(rook, rook_from);
        let (op_to, eg_to) = evaluation::pst_pair(rook, rook_to);
        self.pst[us].0 += op_from - op_to;
        self.pst[us].1 += eg_from - eg_to;
        self.castled[us] = false;
    }

    fn castle_rook_squares(&self, from: usize, to: usize) -> (usize, usize) {
        if from < to {
            // O-O
            if self.side_to_move == WHITE {
                (7, 5)
            } else {
                (63, 61)
            }
        } else {
            // O-O-O
            if self.side_to_move == WHITE {
                (0, 3)
            } else {
                (56, 59)
            }
        }
    }

    // ========================================================================
    // STATIC EXCHANGE EVALUATION
    // ========================================================================

    /// Estimate the material outcome of the capture sequence on the
    /// target square, assuming both sides always recapture with their
    /// least valuable attacker
    pub fn see(&self, mv: Move) -> i32 {
        let to = mv.to_sq();
        let from = mv.from_sq();
        let captured = match mv.kind {
            MoveKind::EnPassant => PAWN,
            _ => self.squares[to].kind,
        };

        let mut gain = [0i32; 32];
        let mut depth = 1;
        gain[0] = if captured == NO_KIND {
            0
        } else {
            piece_value(captured)
        };

        let mut attacking = self.squares[from].kind;
        let mut occ = self.occupied ^ square_bb(from);
        let mut side = opposite(self.side_to_move);
        let mut attackers = self.attacks_to(to, side, occ) & occ;

        while attackers != 0 && depth < gain.len() {
            gain[depth] = piece_value(attacking) - gain[depth - 1];

            let (from_set, kind) = self.least_valuable_attacker(side, attackers);
            attacking = kind;

            occ ^= from_set;
            side = opposite(side);
            attackers = self.attacks_to(to, side, occ) & occ;
            depth += 1;
        }

        while depth > 1 {
            depth -= 1;
            gain[depth - 1] = -std::cmp::max(-gain[depth - 1], gain[depth]);
        }

        gain[0]
    }

    fn least_valuable_attacker(&self, color: u8, attackers: u64) -> (u64, u8) {
        for kind in PAWN..=KING {
            let set = self.pieces(color, kind) & attackers;
            if set != 0 {
                return (set & set.wrapping_neg(), kind);
            }
        }
        (0, NO_KIND)
    }

    // ========================================================================
    // DRAW DETECTION
    // ========================================================================

    /// Check if the current position already occurred since the last
    /// irreversible move.
    ///
    /// Scans plies with the same side to move and reports the first hash
    /// match, treating a single recurrence as a draw for search purposes.
    pub fn is_repetition(&self) -> bool {
        if self.halfmove_clock < 4 {
            return false;
        }

        let start = if self.side_to_move == WHITE { 0 } else { 1 };
        let mut i = start;
        while i < self.ply {
            if self.history[i].hash == self.hash {
                return true;
            }
            i += 2;
        }
        false
    }

    /// Check if the 50-move rule applies
    #[inline]
    pub fn is_fifty_moves(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Display the board as a string
    pub fn display(&self) -> String {
        let mut lines = Vec::new();
        lines.push("  +---+---+---+---+---+---+---+---+".to_string());

        for rank in (0..8).rev() {
            let mut row = format!("{} |", rank + 1);
            for file in 0..8 {
                let piece = self.squares[rank * 8 + file];
                if let Some(c) = piece_to_fen(piece) {
                    row.push_str(&format!(" {} |", c));
                } else {
                    row.push_str("   |");
                }
            }
            lines.push(row);
            lines.push("  +---+---+---+---+---+---+---+---+".to_string());
        }
        lines.push("    a   b   c   d   e   f   g   h".to_string());
        lines.push(format!("FEN: {}", self.to_fen()));
        lines.push(format!("Hash: {:016x}", self.hash));

        lines.join("\n")
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Borrowed position with a move applied; rewinds when dropped
pub struct MoveGuard<'a> {
    position: &'a mut Position,
    mv: Move,
}

impl Deref for MoveGuard<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.position
    }
}

impl DerefMut for MoveGuard<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.position
    }
}

impl Drop for MoveGuard<'_> {
    fn drop(&mut self) {
        self.position.undo_move(self.mv);
    }
}

/// Borrowed position with a null move applied; rewinds when dropped
pub struct NullGuard<'a> {
    position: &'a mut Position,
}

impl Deref for NullGuard<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.position
    }
}

impl DerefMut for NullGuard<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.position
    }
}

impl Drop for NullGuard<'_> {
    fn drop(&mut self) {
        self.position.undo_null();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_state() {
        let pos = Position::new();
        assert_eq!(pos.side_to_move, WHITE);
        assert_eq!(pos.castling_rights, 0xF);
        assert_eq!(pos.en_passant, None);
        assert_eq!(pos.king_square[WHITE as usize], 4);
        assert_eq!(pos.king_square[BLACK as usize], 60);
        assert_eq!(pos.material[0], pos.material[1]);
        assert_eq!(pos.count(WHITE, PAWN), 8);
        assert_eq!(pos.to_fen(), STARTING_FEN);
    }

    #[test]
    fn fen_round_trip() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.to_fen(), fen);
        assert_eq!(pos.hash, pos.compute_hash());
    }

    #[test]
    fn fen_errors() {
        assert!(matches!(
            Position::from_fen(""),
            Err(FenError::MissingField(_))
        ));
        assert!(matches!(
            Position::from_fen("8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::BadRankCount(7))
        ));
        assert!(matches!(
            Position::from_fen("9/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::BadRankWidth(_))
        ));
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            Err(FenError::BadSideToMove(_))
        ));
        assert!(matches!(
            Position::from_fen("8/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::MissingKing(_))
        ));
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1"),
            Err(FenError::BadEnPassant(_))
        ));
    }

    #[test]
    fn guard_rewinds_everything() {
        let mut pos = Position::new();
        let before_fen = pos.to_fen();
        let before_hash = pos.hash;
        let before_pst = pos.pst;

        {
            let mut after = pos.play(Move::double_push(12, 28));
            assert_eq!(after.side_to_move, BLACK);
            assert_eq!(after.en_passant, Some(20));
            assert_eq!(after.hash, after.compute_hash());

            // Nested reply
            let reply = after.play(Move::double_push(50, 34));
            assert_eq!(reply.side_to_move, WHITE);
            assert_eq!(reply.hash, reply.compute_hash());
        }

        assert_eq!(pos.to_fen(), before_fen);
        assert_eq!(pos.hash, before_hash);
        assert_eq!(pos.pst, before_pst);
    }

    #[test]
    fn capture_and_undo_restores_material() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2")
                .unwrap();
        let material = pos.material;
        let counts = pos.num_pieces;

        {
            let after = pos.play(Move::new(28, 35));
            assert_eq!(
                after.material[BLACK as usize],
                material[BLACK as usize] - piece_value(PAWN)
            );
            assert_eq!(after.count(BLACK, PAWN), 7);
            assert_eq!(after.hash, after.compute_hash());
        }

        assert_eq!(pos.material, material);
        assert_eq!(pos.num_pieces, counts);
        assert_eq!(pos.hash, pos.compute_hash());
    }

    #[test]
    fn en_passant_capture_removes_pawn() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 3")
                .unwrap();
        let before = pos.to_fen();

        {
            let after = pos.play(Move::en_passant(27, 20));
            assert!(after.piece_on(28).is_none());
            assert!(after.piece_on(20).is_some());
            assert_eq!(after.count(WHITE, PAWN), 7);
            assert_eq!(after.hash, after.compute_hash());
        }

        assert_eq!(pos.to_fen(), before);
        assert_eq!(pos.count(WHITE, PAWN), 8);
    }

    #[test]
    fn castling_moves_rook_and_clears_rights() {
        let mut pos =
            Position::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let before = pos.to_fen();

        {
            let after = pos.play(Move::castle(4, 6));
            assert_eq!(after.piece_on(6).kind, KING);
            assert_eq!(after.piece_on(5).kind, ROOK);
            assert!(after.piece_on(7).is_none());
            assert_eq!(after.castling_rights & (CASTLE_WK | CASTLE_WQ), 0);
            assert!(after.castled[WHITE as usize]);
            assert_eq!(after.hash, after.compute_hash());
        }

        assert_eq!(pos.to_fen(), before);
        assert!(!pos.castled[WHITE as usize]);
    }

    #[test]
    fn promotion_updates_material_and_counts() {
        let mut pos = Position::from_fen("8/P7/8/8/8/8/k7/K7 w - - 0 1").unwrap();
        let material = pos.material[WHITE as usize];

        {
            let after = pos.play(Move::promotion(48, 56, QUEEN));
            assert_eq!(after.piece_on(56).kind, QUEEN);
            assert_eq!(after.count(WHITE, PAWN), 0);
            assert_eq!(after.count(WHITE, QUEEN), 1);
            assert_eq!(
                after.material[WHITE as usize],
                material + piece_value(QUEEN) - piece_value(PAWN)
            );
            assert_eq!(after.pawns_on_file[WHITE as usize][0], 0);
            assert_eq!(after.hash, after.compute_hash());
        }

        assert_eq!(pos.count(WHITE, PAWN), 1);
        assert_eq!(pos.hash, pos.compute_hash());
    }

    #[test]
    fn null_move_flips_side_and_restores() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3p4/8/8/PPPPPPPP/RNBQKBNR w KQkq d6 0 2")
                .unwrap();
        let hash = pos.hash;

        {
            let null = pos.play_null();
            assert_eq!(null.side_to_move, BLACK);
            assert_eq!(null.en_passant, None);
            assert!(!null.allow_null);
            assert_eq!(null.hash, null.compute_hash());
        }

        assert_eq!(pos.hash, hash);
        assert_eq!(pos.side_to_move, WHITE);
        assert!(pos.allow_null);
    }

    #[test]
    fn repetition_detected_after_shuffle() {
        let mut pos = Position::new();
        // Knights out and back twice
        pos.make_move(Move::new(6, 21));
        pos.make_move(Move::new(62, 45));
        pos.make_move(Move::new(21, 6));
        pos.make_move(Move::new(45, 62));
        assert!(pos.is_repetition());
    }

    #[test]
    fn pinned_piece_detected() {
        // Black rook on e8 pins the white knight on e3
        let mut pos = Position::from_fen("1k2r3/8/8/8/8/4N3/8/4K3 w - - 0 1").unwrap();
        let pinned = pos.pinned_pieces();
        assert_eq!(pinned, square_bb(20));

        // The knight may not leave the file
        assert!(!pos.is_move_legal(Move::new(20, 35), pinned));
        // The king can step aside
        assert!(pos.is_move_legal(Move::new(4, 3), pinned));
    }

    #[test]
    fn see_judges_exchanges() {
        // Pawn takes an undefended pawn
        let pos = Position::from_fen("1k6/8/8/3p4/4P3/8/8/1K6 w - - 0 1").unwrap();
        assert_eq!(pos.see(Move::new(28, 35)), piece_value(PAWN));

        // Pawn takes a pawn defended by a pawn: even trade
        let pos = Position::from_fen("1k6/8/2p5/3p4/4P3/8/8/1K6 w - - 0 1").unwrap();
        assert_eq!(pos.see(Move::new(28, 35)), 0);

        // Rook takes a defended pawn loses material
        let pos = Position::from_fen("1k1r4/8/8/3p4/8/8/3R4/1K6 w - - 0 1").unwrap();
        assert_eq!(
            pos.see(Move::new(11, 35)),
            piece_value(PAWN) - piece_value(ROOK)
        );
    }

    #[test]
    fn check_detection() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
        assert!(pos.in_check());
        assert_eq!(pos.checkers(), square_bb(12));

        let pos = Position::new();
        assert!(!pos.in_check());
    }
}
