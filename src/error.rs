//! Falchion - Input error types
//!
//! Typed errors for the external input boundary (FEN strings and
//! coordinate move text). Engine internals never construct these; they
//! exist so malformed protocol input is rejected instead of silently
//! desyncing the position.

use thiserror::Error;

/// Errors raised while parsing a FEN string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("FEN is missing the {0} field")]
    MissingField(&'static str),
    #[error("piece placement has {0} ranks, expected 8")]
    BadRankCount(usize),
    #[error("rank '{0}' does not describe exactly 8 squares")]
    BadRankWidth(String),
    #[error("unrecognized piece character '{0}'")]
    BadPiece(char),
    #[error("side to move must be 'w' or 'b', got '{0}'")]
    BadSideToMove(String),
    #[error("unrecognized castling field '{0}'")]
    BadCastling(String),
    #[error("unrecognized en passant square '{0}'")]
    BadEnPassant(String),
    #[error("half-move clock '{0}' is not a number")]
    BadHalfMoveClock(String),
    #[error("position has no {0} king")]
    MissingKing(&'static str),
}

/// Errors raised while parsing coordinate move text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("move text '{0}' is not coordinate notation")]
    BadSyntax(String),
    #[error("move '{0}' is not legal in the current position")]
    Illegal(String),
}
