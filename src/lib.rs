//! Falchion - UCI Chess Engine
//!
//! A chess engine written in Rust with support for:
//! - Full FIDE chess rules
//! - UCI protocol with pondering
//! - Principal variation search with aspiration windows
//! - Transposition table with Zobrist hashing
//! - Advanced pruning techniques (NMP, LMR, razoring, futility)
//! - Multi-threaded search (Lazy SMP)
//! - Bitboard representation for fast move generation

pub mod types;
pub mod error;
pub mod bitboard;
pub mod zobrist;
pub mod moves;
pub mod position;
pub mod move_generator;
pub mod evaluation;
pub mod movepick;
pub mod tt;
pub mod search;
pub mod parallel_search;
pub mod perft;
pub mod uci;
