//! Falchion - Perft and Benchmarking
//!
//! Legal path counting for move generator validation, a `divide`
//! breakdown for debugging mismatches, and a fixed-depth benchmark
//! over a suite of middlegame and endgame positions.

use std::time::Instant;

use crate::error::FenError;
use crate::move_generator::generate_legal;
use crate::parallel_search::Engine;
use crate::position::Position;
use crate::search::SearchType;

/// Count the legal move paths `depth` plies deep from this position.
pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    let moves = generate_legal(pos);
    if depth == 1 {
        return moves.len() as u64;
    }
    if depth == 0 {
        return 1;
    }

    let mut nodes = 0;
    for &mv in moves.iter() {
        let mut child = pos.play(mv);
        nodes += perft(&mut child, depth - 1);
    }
    nodes
}

/// Perft with a per-move breakdown printed at the root. Returns the
/// total count.
pub fn divide(pos: &mut Position, depth: u32) -> u64 {
    let moves = generate_legal(pos);
    let mut nodes = 0;

    for (i, &mv) in moves.iter().enumerate() {
        let delta = if depth > 1 {
            let mut child = pos.play(mv);
            perft(&mut child, depth - 1)
        } else {
            1
        };
        nodes += delta;
        println!("move {:>2}: {} {} nodes", i + 1, mv.to_uci(), delta);
    }
    nodes
}

/// Timed perft run with a node rate summary.
pub fn run_perft(pos: &mut Position, depth: u32) {
    println!("Depth: {}", depth);
    let timer = Instant::now();
    let nodes = perft(pos, depth);
    report(nodes, timer);
}

/// Timed divide run with a node rate summary.
pub fn run_divide(pos: &mut Position, depth: u32) {
    println!("Depth: {}", depth);
    let timer = Instant::now();
    let nodes = divide(pos, depth);
    report(nodes, timer);
}

fn report(nodes: u64, timer: Instant) {
    let ms = (timer.elapsed().as_millis() as u64).max(1);
    println!("Nodes: {}", nodes);
    println!("Time : {} ms", ms);
    println!("Speed: {:.1} kNps", nodes as f64 / ms as f64);
}

/// Time-to-depth benchmark suite, openings through bare endgames.
pub const BENCH_POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
    "r1bn1rk1/ppp1qppp/3pp3/3P4/2P1n3/2B2NP1/PP2PPBP/2RQK2R w K -",
    "r2q1rk1/1bppbppp/p4n2/n2Np3/Pp2P3/1B1P1N2/1PP2PPP/R1BQ1RK1 w - -",
    "rnb2rk1/1pq1bppp/p3pn2/3p4/3NPP2/2N1B3/PPP1B1PP/R3QRK1 w - -",
    "2rq1rk1/p3bppp/bpn1pn2/2pp4/3P4/1P2PNP1/PBPN1PBP/R2QR1K1 w - -",
    "rn3rk1/1p2ppbp/1pp3p1/3n4/3P1Bb1/2N1PN2/PP3PPP/2R1KB1R w K -",
    "r1bq1rk1/3nbppp/p1p1pn2/1p4B1/3P4/2NBPN2/PP3PPP/2RQK2R w K -",
    "r1b1k2r/pp1nqp1p/2p3p1/3p3n/3P4/2NBP3/PPQ2PPP/2KR2NR w kq -",
    "2q1r1k1/1ppb4/r2p1Pp1/p4n1p/2P1n3/5NPP/PP3Q1K/2BRRB2 w - -",
    "7r/1p2k3/2bpp3/p3np2/P1PR4/2N2PP1/1P4K1/3B4 b - -",
    "4k3/p1P3p1/2q1np1p/3N4/8/1Q3PP1/6KP/8 w - -",
    "3q4/pp3pkp/5npN/2bpr1B1/4r3/2P2Q2/PP3PPP/R4RK1 w - -",
    "8/1p3pkp/p1r3p1/3P3n/3p1P2/3P4/PP3KP1/R3N3 b - -",
    "1k2b3/1pp5/4r3/R3N1pp/1P3P2/p5P1/2P4P/1K6 w - -",
    "2k5/3n1pb1/p2n2pp/2pP4/2P2PP1/1K3N1P/2B5/4B3 w - -",
    "6k1/p7/6pp/1p1Pp3/2n1P1Pb/6NP/P4KP1/B7 w - -",
];

/// Search every bench position to a fixed depth and report the total
/// wall time.
pub fn run_bench(depth: i32, hash_mb: usize, threads: usize) -> Result<(), FenError> {
    let mut engine = Engine::new(hash_mb, threads);
    engine.set_depth_limit(depth);

    let timer = Instant::now();
    for fen in BENCH_POSITIONS {
        let mut pos = Position::from_fen(fen)?;
        println!("Fen: {}", fen);
        // Each position is timed from an empty table
        engine.clear_hash();
        engine.start_thinking(SearchType::Infinite, &mut pos, true);
    }
    let secs = timer.elapsed().as_secs_f64();

    println!("Depth: {}", depth);
    println!("Time: {:.3} secs", secs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_shallow_counts() {
        let mut pos = Position::new();
        assert_eq!(perft(&mut pos, 1), 20);
        assert_eq!(perft(&mut pos, 2), 400);
        assert_eq!(perft(&mut pos, 3), 8_902);
        assert_eq!(perft(&mut pos, 4), 197_281);
    }

    #[test]
    fn kiwipete_counts() {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut pos, 1), 48);
        assert_eq!(perft(&mut pos, 2), 2_039);
        assert_eq!(perft(&mut pos, 3), 97_862);
    }

    #[test]
    fn underpromotion_position_counts() {
        let mut pos = Position::from_fen(
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        )
        .unwrap();
        assert_eq!(perft(&mut pos, 1), 44);
        assert_eq!(perft(&mut pos, 2), 1_486);
        assert_eq!(perft(&mut pos, 3), 62_379);
    }

    #[test]
    fn en_passant_pin_position_counts() {
        let mut pos = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(perft(&mut pos, 1), 14);
        assert_eq!(perft(&mut pos, 2), 191);
        assert_eq!(perft(&mut pos, 3), 2_812);
        assert_eq!(perft(&mut pos, 4), 43_238);
    }

    #[test]
    fn divide_total_matches_perft() {
        let mut pos = Position::new();
        let total = divide(&mut pos, 3);
        assert_eq!(total, perft(&mut pos, 3));
    }

    #[test]
    fn bench_positions_all_parse() {
        for fen in BENCH_POSITIONS {
            assert!(Position::from_fen(fen).is_ok(), "bad fen: {}", fen);
        }
    }
}
