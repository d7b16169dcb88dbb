use criterion::{black_box, criterion_group, criterion_main, Criterion};
use falchion::perft::perft;
use falchion::position::Position;

fn bench_perft(c: &mut Criterion) {
    c.bench_function("perft_4_startpos", |b| {
        let mut pos = Position::new();
        b.iter(|| black_box(perft(black_box(&mut pos), 4)))
    });

    c.bench_function("perft_3_kiwipete", |b| {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        b.iter(|| black_box(perft(black_box(&mut pos), 3)))
    });
}

criterion_group!(benches, bench_perft);
criterion_main!(benches);
