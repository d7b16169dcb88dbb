use falchion::perft::perft;
use falchion::position::Position;

#[test]
fn perft_startpos_small_depths() {
    let mut pos = Position::new();
    assert_eq!(perft(&mut pos, 1), 20);
    assert_eq!(perft(&mut pos, 2), 400);
    assert_eq!(perft(&mut pos, 3), 8_902);
    assert_eq!(perft(&mut pos, 4), 197_281);
}

#[test]
fn perft_startpos_depth_five() {
    let mut pos = Position::new();
    assert_eq!(perft(&mut pos, 5), 4_865_609);
}

#[test]
#[ignore = "about a minute of work; run with --ignored"]
fn perft_startpos_depth_six() {
    let mut pos = Position::new();
    assert_eq!(perft(&mut pos, 6), 119_060_324);
}

// Positions that stress castling rights, promotions, pins and en
// passant edge cases.
#[test]
fn perft_tricky_positions() {
    let cases: &[(&str, u32, u64)] = &[
        (
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            4,
            4_085_603,
        ),
        ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 5, 674_624),
        (
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            4,
            422_333,
        ),
        (
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            4,
            2_103_487,
        ),
        (
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            4,
            3_894_594,
        ),
    ];

    for &(fen, depth, count) in cases {
        let mut pos = Position::from_fen(fen).unwrap();
        assert_eq!(perft(&mut pos, depth), count, "fen: {}", fen);
    }
}
