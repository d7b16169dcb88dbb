//! Falchion - Transposition Table Module
//!
//! Fixed-capacity hash table shared by all search workers. Entries live
//! in four-slot buckets; each bucket is guarded by its own lock so
//! different buckets never contend. The lock flavor is pluggable: a
//! spin lock by default, a blocking mutex for deterministic tests.

use crate::moves::Move;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub const BUCKET_SIZE: usize = 4;

/// What the stored score proves about the true value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

/// One slot of a bucket
#[derive(Clone, Copy, Debug)]
pub struct Entry {
    pub key: u64,
    pub score: i32,
    pub best: Move,
    pub depth: i16,
    pub bound: Bound,
}

impl Entry {
    pub const EMPTY: Entry = Entry {
        key: 0,
        score: 0,
        best: Move::NULL,
        depth: 0,
        bound: Bound::Upper,
    };
}

pub type Bucket = [Entry; BUCKET_SIZE];

// ============================================================
// Bucket locks
// ============================================================

/// Per-bucket lock owning the bucket it guards
pub trait BucketLock<T>: Send + Sync {
    fn new(value: T) -> Self;
    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

/// Busy-wait lock; the critical sections here are a handful of loads
/// and stores, shorter than a parked-thread wakeup
pub struct SpinLock<T> {
    flag: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T: Send> BucketLock<T> for SpinLock<T> {
    fn new(value: T) -> Self {
        SpinLock {
            flag: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        while self
            .flag
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        let result = f(unsafe { &mut *self.data.get() });
        self.flag.store(false, Ordering::Release);
        result
    }
}

/// Mutex-backed lock with the same shape
pub struct BlockingLock<T> {
    inner: Mutex<T>,
}

impl<T: Send> BucketLock<T> for BlockingLock<T> {
    fn new(value: T) -> Self {
        BlockingLock {
            inner: Mutex::new(value),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock().unwrap();
        f(&mut guard)
    }
}

// ============================================================
// Table
// ============================================================

pub struct TranspositionTable<L: BucketLock<Bucket> = SpinLock<Bucket>> {
    buckets: Vec<L>,
    mask: u64,
}

impl<L: BucketLock<Bucket>> TranspositionTable<L> {
    /// Allocate a table of roughly `megabytes` MB. The megabyte count
    /// and the entry count both round down to powers of two so the
    /// bucket mask stays a simple AND.
    pub fn new(megabytes: usize) -> Self {
        let mb = previous_power_of_two(megabytes.max(1));
        let raw = mb * 1024 * 1024 / std::mem::size_of::<Entry>();
        let entries = previous_power_of_two(raw).max(BUCKET_SIZE);
        let mask = (entries - BUCKET_SIZE) as u64;
        let mut buckets = Vec::with_capacity(entries / BUCKET_SIZE);
        for _ in 0..entries / BUCKET_SIZE {
            buckets.push(L::new([Entry::EMPTY; BUCKET_SIZE]));
        }
        TranspositionTable { buckets, mask }
    }

    #[inline]
    fn bucket(&self, key: u64) -> &L {
        &self.buckets[((key & self.mask) as usize) / BUCKET_SIZE]
    }

    /// Look the position up. A usable hit needs a key match, stored
    /// depth at least `depth`, and a bound compatible with the window;
    /// it yields the proven score and the slot's move. Otherwise the
    /// score is `None` and the move is whatever key-matching slot was
    /// seen, for ordering.
    pub fn probe(&self, key: u64, depth: i32, alpha: i32, beta: i32) -> (Option<i32>, Move) {
        self.bucket(key).with(|bucket| {
            let mut best = Move::NULL;
            for entry in bucket.iter() {
                if entry.key == key {
                    if i32::from(entry.depth) >= depth {
                        let usable = match entry.bound {
                            Bound::Exact => Some(entry.score),
                            Bound::Lower if entry.score >= beta => Some(beta),
                            Bound::Upper if entry.score <= alpha => Some(alpha),
                            _ => None,
                        };
                        if let Some(score) = usable {
                            return (Some(score), entry.best);
                        }
                    }
                    best = entry.best;
                }
            }
            (None, best)
        })
    }

    /// Store a result, overwriting the shallowest slot of the bucket
    /// if the new depth is at least as large.
    pub fn save(&self, key: u64, depth: i32, score: i32, best: Move, bound: Bound) {
        self.bucket(key).with(|bucket| {
            let mut shallowest = 0;
            for i in 1..BUCKET_SIZE {
                if bucket[i].depth < bucket[shallowest].depth {
                    shallowest = i;
                }
            }
            if depth >= i32::from(bucket[shallowest].depth) {
                bucket[shallowest] = Entry {
                    key,
                    score,
                    best,
                    depth: depth as i16,
                    bound,
                };
            }
        });
    }

    /// The stored move for a position, if any. Used to walk the
    /// principal variation out of the table.
    pub fn best_move(&self, key: u64) -> Move {
        self.bucket(key).with(|bucket| {
            for entry in bucket.iter() {
                if entry.key == key && !entry.best.is_null() {
                    return entry.best;
                }
            }
            Move::NULL
        })
    }

    /// Zero every bucket. Callers must ensure no concurrent search is
    /// probing or saving.
    pub fn clear(&self) {
        for lock in &self.buckets {
            lock.with(|bucket| *bucket = [Entry::EMPTY; BUCKET_SIZE]);
        }
    }
}

fn previous_power_of_two(n: usize) -> usize {
    let mut p = 1;
    while p * 2 <= n {
        p *= 2;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Move;

    type TestTable = TranspositionTable<BlockingLock<Bucket>>;

    #[test]
    fn save_then_probe_round_trips() {
        let tt = TestTable::new(1);
        let mv = Move::new(12, 28);
        tt.save(0xABCD, 6, 42, mv, Bound::Exact);
        let (score, best) = tt.probe(0xABCD, 6, -100, 100);
        assert_eq!(score, Some(42));
        assert_eq!(best, mv);
    }

    #[test]
    fn shallow_entries_do_not_satisfy_deep_probes() {
        let tt = TestTable::new(1);
        tt.save(0xABCD, 4, 42, Move::new(12, 28), Bound::Exact);
        let (score, best) = tt.probe(0xABCD, 6, -100, 100);
        assert_eq!(score, None);
        assert_eq!(best, Move::new(12, 28), "move still usable for ordering");
    }

    #[test]
    fn bounds_respect_the_window() {
        let tt = TestTable::new(1);
        tt.save(1, 5, 80, Move::NULL, Bound::Lower);
        // Lower bound of 80 proves nothing against beta = 100
        assert_eq!(tt.probe(1, 5, 0, 100).0, None);
        // but cuts off when beta = 50
        assert_eq!(tt.probe(1, 5, 0, 50).0, Some(50));

        tt.save(2, 5, -80, Move::NULL, Bound::Upper);
        assert_eq!(tt.probe(2, 5, -100, 0).0, None);
        assert_eq!(tt.probe(2, 5, -50, 0).0, Some(-50));
    }

    #[test]
    fn replacement_prefers_deeper_entries() {
        let tt = TestTable::new(1);
        // Four colliding keys fill one bucket
        let base = 0x40u64;
        for i in 0..4u64 {
            let key = base + (i << 40);
            tt.save(key, 2 + i as i32, 10, Move::NULL, Bound::Exact);
        }
        // A deeper entry evicts the shallowest
        let newcomer = base + (9u64 << 40);
        tt.save(newcomer, 9, 99, Move::NULL, Bound::Exact);
        assert_eq!(tt.probe(newcomer, 9, -100, 100).0, Some(99));
        assert_eq!(tt.probe(base, 1, -100, 100).0, None, "shallowest evicted");

        // A shallower entry than every slot is dropped
        let reject = base + (7u64 << 40);
        tt.save(reject, 1, 7, Move::NULL, Bound::Exact);
        assert_eq!(tt.probe(reject, 1, -100, 100).0, None);
    }

    #[test]
    fn clear_forgets_everything() {
        let tt = TestTable::new(1);
        tt.save(0xF00D, 6, 42, Move::new(0, 1), Bound::Exact);
        tt.clear();
        assert_eq!(tt.probe(0xF00D, 1, -100, 100).0, None);
        assert!(tt.best_move(0xF00D).is_null());
    }

    #[test]
    fn spin_lock_table_is_shareable() {
        use std::sync::Arc;
        let tt: Arc<TranspositionTable> = Arc::new(TranspositionTable::new(1));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let tt = Arc::clone(&tt);
            handles.push(std::thread::spawn(move || {
                for i in 0..1000u64 {
                    let key = t.wrapping_mul(0x9E3779B97F4A7C15) ^ i;
                    tt.save(key, (i % 8) as i32, i as i32, Move::NULL, Bound::Exact);
                    tt.probe(key, 1, -100, 100);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn sizes_round_down_to_powers_of_two() {
        assert_eq!(previous_power_of_two(1), 1);
        assert_eq!(previous_power_of_two(24), 16);
        assert_eq!(previous_power_of_two(32), 32);
        assert_eq!(previous_power_of_two(1000), 512);
    }
}
