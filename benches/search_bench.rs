use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use falchion::evaluation;
use falchion::moves::Move;
use falchion::parallel_search::SearchContext;
use falchion::position::Position;
use falchion::search::Searcher;
use falchion::types::INFINITY;

fn bench_search(c: &mut Criterion) {
    c.bench_function("search_depth_5_startpos", |b| {
        b.iter(|| {
            let ctx = Arc::new(SearchContext::new(16));
            let mut searcher = Searcher::new(ctx, false, 1);
            searcher.info.new_search(None);
            let mut pos = Position::new();
            let mut mv = Move::NULL;
            let score = searcher.root(5, -INFINITY, INFINITY, &mut mv, black_box(&mut pos));
            black_box(score)
        })
    });
}

fn bench_eval(c: &mut Criterion) {
    let pos = Position::new();
    c.bench_function("evaluate_startpos", |b| {
        b.iter(|| black_box(evaluation::evaluate(black_box(&pos))))
    });
}

criterion_group!(benches, bench_search, bench_eval);
criterion_main!(benches);
