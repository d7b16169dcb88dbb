//! Falchion - Zobrist Hashing Module
//!
//! Random keys for incremental position hashing. Every board factor that
//! distinguishes two positions gets its own key: piece placements, the side
//! to move, each castling-rights mask and the en passant file. The key set
//! is generated once from a fixed seed so hashes are stable across runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

const ZOBRIST_SEED: u64 = 0x2C6F_DE5A_9B11_37E4;

/// Complete key set for position hashing
pub struct Zobrist {
    /// Keys indexed by [color][kind][square]
    pub pieces: [[[u64; 64]; 6]; 2],
    /// Key XORed in when black is to move
    pub side: u64,
    /// One key per castling-rights mask
    pub castling: [u64; 16],
    /// Keys indexed by en passant file
    pub en_passant: [u64; 8],
}

static KEYS: OnceLock<Zobrist> = OnceLock::new();

/// Get the global key set, generating it on first use
pub fn keys() -> &'static Zobrist {
    KEYS.get_or_init(Zobrist::generate)
}

impl Zobrist {
    fn generate() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);

        let mut pieces = [[[0u64; 64]; 6]; 2];
        for color in &mut pieces {
            for kind in color.iter_mut() {
                for key in kind.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let mut castling = [0u64; 16];
        for key in &mut castling {
            *key = rng.gen();
        }

        let mut en_passant = [0u64; 8];
        for key in &mut en_passant {
            *key = rng.gen();
        }

        Zobrist {
            pieces,
            side: rng.gen(),
            castling,
            en_passant,
        }
    }
}
