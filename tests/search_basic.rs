//! End-to-end checks of the engine facade: bestmove legality, forced
//! tactics, and clock behavior.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use falchion::move_generator::generate_legal;
use falchion::parallel_search::Engine;
use falchion::position::Position;
use falchion::search::SearchType;

fn best_at_depth(fen: &str, depth: i32) -> String {
    let mut engine = Engine::new(8, 1);
    engine.set_depth_limit(depth);
    let mut pos = Position::from_fen(fen).unwrap();
    engine
        .start_thinking(SearchType::Infinite, &mut pos, false)
        .to_uci()
}

#[test]
fn bestmove_is_always_legal_from_the_start() {
    let engine = Engine::new(8, 1);
    let mut pos = Position::new();
    let mv = engine.start_thinking(SearchType::TimePerMove { budget_ms: 200 }, &mut pos, false);
    assert!(generate_legal(&mut pos).iter().any(|&m| m == mv));
}

#[test]
fn finds_back_rank_mate() {
    assert_eq!(best_at_depth("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 4), "a1a8");
}

#[test]
fn mate_choice_is_stable_as_depth_grows() {
    assert_eq!(best_at_depth("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 2), "a1a8");
    assert_eq!(best_at_depth("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 6), "a1a8");
}

#[test]
fn takes_the_hanging_queen() {
    assert_eq!(best_at_depth("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", 4), "d2d5");
}

#[test]
fn movetime_budget_is_respected() {
    let engine = Engine::new(8, 1);
    let mut pos = Position::new();

    let start = Instant::now();
    let mv = engine.start_thinking(SearchType::TimePerMove { budget_ms: 200 }, &mut pos, false);
    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(!mv.is_null());
}

#[test]
fn stop_flag_halts_an_infinite_search() {
    let engine = Engine::new(8, 1);
    let ctx = engine.context();
    let mut pos = Position::new();

    thread::scope(|scope| {
        let handle = scope.spawn(|| engine.start_thinking(SearchType::Infinite, &mut pos, false));
        thread::sleep(Duration::from_millis(100));
        ctx.stop.store(true, Ordering::SeqCst);
        let mv = handle.join().unwrap();
        assert!(!mv.is_null());
    });
}

#[test]
fn ponderhit_converts_to_a_timed_search() {
    let engine = Engine::new(8, 1);
    let ctx = engine.context();
    let mut pos = Position::new();

    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            engine.start_thinking(SearchType::Ponder { remaining_ms: 3_000 }, &mut pos, false)
        });
        thread::sleep(Duration::from_millis(100));
        ctx.ponder_hit.store(true, Ordering::SeqCst);
        let mv = handle.join().unwrap();
        assert!(!mv.is_null());
    });
}
