//! Falchion - Move Representation Module
//!
//! A move is a from/to square pair plus a kind tag. The tag carries what
//! the board cannot tell from the squares alone: castling, en passant,
//! double pushes and the piece a pawn promotes to. Captures are not
//! tagged; the target square of the position answers that.

use crate::types::*;
use std::ops::Index;

/// Upper bound on moves in any reachable position
pub const MAX_MOVES: usize = 256;

/// What kind of move this is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    Quiet,
    DoublePush,
    Castle,
    EnPassant,
    /// Pawn promotion, carrying the new piece kind
    Promotion(u8),
}

/// A single chess move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub from: u8,
    pub to: u8,
    pub kind: MoveKind,
}

impl Move {
    /// The null move, used as an empty slot marker
    pub const NULL: Move = Move {
        from: 0,
        to: 0,
        kind: MoveKind::Quiet,
    };

    /// Create a quiet move or plain capture
    pub fn new(from: usize, to: usize) -> Self {
        Move {
            from: from as u8,
            to: to as u8,
            kind: MoveKind::Quiet,
        }
    }

    /// Create a pawn double push
    pub fn double_push(from: usize, to: usize) -> Self {
        Move {
            from: from as u8,
            to: to as u8,
            kind: MoveKind::DoublePush,
        }
    }

    /// Create a castling move (king squares)
    pub fn castle(from: usize, to: usize) -> Self {
        Move {
            from: from as u8,
            to: to as u8,
            kind: MoveKind::Castle,
        }
    }

    /// Create an en passant capture
    pub fn en_passant(from: usize, to: usize) -> Self {
        Move {
            from: from as u8,
            to: to as u8,
            kind: MoveKind::EnPassant,
        }
    }

    /// Create a promotion to the given piece kind
    pub fn promotion(from: usize, to: usize, kind: u8) -> Self {
        Move {
            from: from as u8,
            to: to as u8,
            kind: MoveKind::Promotion(kind),
        }
    }

    /// Origin square
    #[inline]
    pub fn from_sq(&self) -> usize {
        self.from as usize
    }

    /// Destination square
    #[inline]
    pub fn to_sq(&self) -> usize {
        self.to as usize
    }

    /// The piece kind a promotion creates, if any
    #[inline]
    pub fn promoted(&self) -> Option<u8> {
        match self.kind {
            MoveKind::Promotion(kind) => Some(kind),
            _ => None,
        }
    }

    /// Check if this is the null move
    #[inline]
    pub fn is_null(&self) -> bool {
        self.from == self.to
    }

    /// Index into a from/to keyed table (history heuristic)
    #[inline]
    pub fn butterfly_index(&self) -> usize {
        ((self.from as usize) << 6) | self.to as usize
    }

    /// Convert move to UCI notation (e.g., "e2e4", "e7e8q")
    pub fn to_uci(&self) -> String {
        let mut uci = format!(
            "{}{}",
            square_name(self.from_sq()),
            square_name(self.to_sq())
        );
        if let Some(kind) = self.promoted() {
            uci.push(promotion_char(kind));
        }
        uci
    }
}

impl Default for Move {
    fn default() -> Self {
        Move::NULL
    }
}

/// Fixed-capacity move container filled by the generator
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    len: usize,
}

impl MoveList {
    pub fn new() -> Self {
        MoveList {
            moves: [Move::NULL; MAX_MOVES],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, mv: Move) {
        self.moves[self.len] = mv;
        self.len += 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    /// Shorten the list, keeping the first `len` moves
    pub fn truncate(&mut self, len: usize) {
        debug_assert!(len <= self.len);
        self.len = len;
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.moves.swap(a, b);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves[..self.len].iter()
    }
}

impl Default for MoveList {
    fn default() -> Self {
        MoveList::new()
    }
}

impl Index<usize> for MoveList {
    type Output = Move;

    fn index(&self, index: usize) -> &Move {
        &self.moves[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uci_notation() {
        assert_eq!(Move::new(12, 28).to_uci(), "e2e4");
        assert_eq!(Move::promotion(52, 60, QUEEN).to_uci(), "e7e8q");
        assert_eq!(Move::promotion(52, 61, KNIGHT).to_uci(), "e7f8n");
        assert_eq!(Move::castle(4, 6).to_uci(), "e1g1");
    }

    #[test]
    fn null_move_detection() {
        assert!(Move::NULL.is_null());
        assert!(!Move::new(12, 28).is_null());
    }

    #[test]
    fn butterfly_index_is_unique_per_from_to() {
        let a = Move::new(12, 28).butterfly_index();
        let b = Move::new(28, 12).butterfly_index();
        assert_ne!(a, b);
        assert_eq!(a, 12 * 64 + 28);
    }

    #[test]
    fn list_push_and_iterate() {
        let mut list = MoveList::new();
        assert!(list.is_empty());
        list.push(Move::new(8, 16));
        list.push(Move::new(8, 24));
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].to_sq(), 24);
        let targets: Vec<usize> = list.iter().map(|m| m.to_sq()).collect();
        assert_eq!(targets, vec![16, 24]);
    }
}
