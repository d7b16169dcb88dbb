//! Falchion - Parallel Search Module (Lazy SMP)
//!
//! One leader thread owns the clock and the UCI output. Helper threads
//! repeat its iterations with jittered aspiration windows, and whatever
//! they learn reaches the leader through the shared transposition
//! table.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use rand::Rng;

use crate::moves::Move;
use crate::position::Position;
use crate::search::{SearchType, Searcher, MAX_SEARCH_DEPTH};
use crate::tt::TranspositionTable;
use crate::types::*;

// Helper aspiration windows are widened by up to this much
const MAX_WINDOW_JITTER: i32 = 25;

/// Work order for the helper pool.
#[derive(Clone)]
struct SmpJob {
    generation: u64,
    depth: i32,
    alpha: i32,
    beta: i32,
    position: Position,
}

/// State shared by every worker of one engine: the transposition
/// table, the control flags and the current work order.
pub struct SearchContext {
    pub tt: TranspositionTable,
    pub stop: AtomicBool,
    pub quit: AtomicBool,
    pub ponder_hit: AtomicBool,
    job: Mutex<SmpJob>,
    signal: Condvar,
}

impl SearchContext {
    pub fn new(hash_mb: usize) -> Self {
        SearchContext {
            tt: TranspositionTable::new(hash_mb),
            stop: AtomicBool::new(false),
            quit: AtomicBool::new(false),
            ponder_hit: AtomicBool::new(false),
            job: Mutex::new(SmpJob {
                generation: 0,
                depth: 0,
                alpha: -INFINITY,
                beta: INFINITY,
                position: Position::new(),
            }),
            signal: Condvar::new(),
        }
    }

    /// Hand the helpers a new iteration to chew on.
    pub fn publish(&self, depth: i32, alpha: i32, beta: i32, pos: &Position) {
        let mut job = self.job.lock().unwrap();
        job.generation += 1;
        job.depth = depth;
        job.alpha = alpha;
        job.beta = beta;
        job.position = pos.clone();
        drop(job);
        self.signal.notify_all();
    }

    /// Block until a job newer than `seen` arrives. `None` means the
    /// engine is shutting down.
    fn next_job(&self, seen: u64) -> Option<SmpJob> {
        let mut job = self.job.lock().unwrap();
        loop {
            if self.quit.load(Ordering::Relaxed) {
                return None;
            }
            if job.generation != seen {
                return Some(job.clone());
            }
            job = self.signal.wait(job).unwrap();
        }
    }

    /// Wake every waiter so it can observe a flag change.
    fn notify(&self) {
        self.signal.notify_all();
    }
}

/// Helper thread body. Killers and history survive across iterations
/// of the same root position and reset when the root changes.
fn smp_worker(ctx: Arc<SearchContext>) {
    let mut searcher = Searcher::helper(ctx.clone());
    let mut seen = 0u64;
    let mut last_hash = 0u64;

    while let Some(job) = ctx.next_job(seen) {
        seen = job.generation;
        let mut position = job.position;

        if position.hash != last_hash {
            searcher.info.new_search(None);
            last_hash = position.hash;
        }

        let jitter = rand::thread_rng().gen_range(0..MAX_WINDOW_JITTER);
        let mut mv = Move::NULL;
        searcher.root(
            job.depth,
            job.alpha - jitter,
            job.beta + jitter,
            &mut mv,
            &mut position,
        );
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// The engine facade. Owns the shared context and the helper pool and
/// runs one search at a time on the calling thread.
pub struct Engine {
    ctx: Arc<SearchContext>,
    helpers: Vec<JoinHandle<()>>,
    threads: usize,
    hash_mb: usize,
    depth_limit: i32,
}

impl Engine {
    pub fn new(hash_mb: usize, threads: usize) -> Self {
        let mut engine = Engine {
            ctx: Arc::new(SearchContext::new(hash_mb)),
            helpers: Vec::new(),
            threads: threads.max(1),
            hash_mb,
            depth_limit: MAX_SEARCH_DEPTH,
        };
        engine.spawn_helpers();
        engine
    }

    fn spawn_helpers(&mut self) {
        for id in 1..self.threads {
            let ctx = self.ctx.clone();
            log::debug!("spawning helper thread {}", id);
            self.helpers.push(thread::spawn(move || smp_worker(ctx)));
        }
    }

    fn join_helpers(&mut self) {
        self.ctx.stop.store(true, Ordering::SeqCst);
        self.ctx.quit.store(true, Ordering::SeqCst);
        self.ctx.notify();
        for handle in self.helpers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Resize the helper pool. Only call between searches.
    pub fn set_threads(&mut self, threads: usize) {
        if threads.max(1) == self.threads {
            return;
        }
        self.join_helpers();
        self.threads = threads.max(1);
        self.ctx.quit.store(false, Ordering::SeqCst);
        self.spawn_helpers();
    }

    /// Rebuild the shared table at a new size. The pool is restarted on
    /// a fresh context so probes never pay for a resize lock.
    pub fn set_hash_size(&mut self, megabytes: usize) {
        if megabytes == self.hash_mb {
            return;
        }
        self.join_helpers();
        self.hash_mb = megabytes;
        self.ctx = Arc::new(SearchContext::new(megabytes));
        self.spawn_helpers();
    }

    pub fn set_depth_limit(&mut self, depth: i32) {
        self.depth_limit = depth;
    }

    pub fn clear_hash(&self) {
        self.ctx.tt.clear();
    }

    /// A handle the front end can signal mid-search.
    pub fn context(&self) -> Arc<SearchContext> {
        self.ctx.clone()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run one search to completion on the calling thread and return
    /// the chosen move. With `verbose` set, info lines stream during
    /// the search and a `bestmove` line closes it.
    pub fn start_thinking(&self, stype: SearchType, pos: &mut Position, verbose: bool) -> Move {
        self.ctx.stop.store(false, Ordering::SeqCst);
        self.ctx.ponder_hit.store(false, Ordering::SeqCst);

        let mut searcher = Searcher::new(self.ctx.clone(), verbose, self.threads);
        searcher.prepare(stype);
        searcher.info.set_depth_limit(self.depth_limit);

        let best = searcher.iterative_search(pos);

        if verbose {
            let mut line = String::from("bestmove ");
            if best.is_null() {
                line.push_str("0000");
            } else {
                line.push_str(&best.to_uci());
            }
            let ponder = searcher.ponder_move(pos, best);
            if !ponder.is_null() {
                line.push_str(" ponder ");
                line.push_str(&ponder.to_uci());
            }
            println!("{}", line);
            let _ = io::stdout().flush();
        }
        best
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.join_helpers();
        log::debug!("helper pool joined");
    }
}
