//! Concurrent acquire/release stress with instance-identity tracking.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tarn_pool::{Pool, PoolConfig, ResetOutcome, Resource, ResourceId};

#[derive(Debug, Default)]
struct Scratch {
    dirty: bool,
}

impl Resource for Scratch {
    fn reset(&mut self) -> ResetOutcome {
        self.dirty = false;
        ResetOutcome::Reuse
    }
}

struct Outcome {
    acquired: usize,
    exhausted: usize,
}

fn hammer(pool: Pool<Scratch>, threads: usize, iterations: usize) -> Outcome {
    let held: Arc<Mutex<HashSet<ResourceId>>> = Arc::new(Mutex::new(HashSet::new()));
    let acquired = Arc::new(AtomicUsize::new(0));
    let exhausted = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    // Watch the invariant from the side while the workers run.
    let observer = {
        let pool = pool.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                let stats = pool.stats();
                assert!(stats.is_consistent(), "invariant broken: {:?}", stats);
                assert!(stats.within(pool.config().limit()), "over limit: {:?}", stats);
                thread::yield_now();
            }
        })
    };

    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let pool = pool.clone();
            let held = Arc::clone(&held);
            let acquired = Arc::clone(&acquired);
            let exhausted = Arc::clone(&exhausted);
            thread::spawn(move || {
                for _ in 0..iterations {
                    match pool.acquire() {
                        Ok(mut lease) => {
                            assert!(
                                held.lock().insert(lease.id()),
                                "resource {} issued twice",
                                lease.id()
                            );
                            assert!(!lease.dirty, "resource {} was not reset", lease.id());
                            lease.dirty = true;
                            thread::yield_now();
                            held.lock().remove(&lease.id());
                            pool.release(lease).unwrap();
                            acquired.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) if e.is_exhausted() => {
                            exhausted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => panic!("unexpected acquire error: {}", e),
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    done.store(true, Ordering::Relaxed);
    observer.join().unwrap();

    let stats = pool.stats();
    assert!(stats.is_consistent());
    assert_eq!(stats.outstanding, 0);

    Outcome {
        acquired: acquired.load(Ordering::Relaxed),
        exhausted: exhausted.load(Ordering::Relaxed),
    }
}

#[test]
fn test_stress_fail_policy() {
    let pool = Pool::with_fn(PoolConfig::fail(3), Scratch::default).unwrap();
    let outcome = hammer(pool.clone(), 8, 500);

    assert_eq!(outcome.acquired + outcome.exhausted, 8 * 500);
    assert_eq!(pool.capacity(), 3);
}

#[test]
fn test_stress_grow_policy() {
    let pool = Pool::with_fn(PoolConfig::grow(1, 4), Scratch::default).unwrap();
    let outcome = hammer(pool.clone(), 8, 500);

    assert_eq!(outcome.acquired + outcome.exhausted, 8 * 500);
    assert!(pool.capacity() <= 4);
    assert!(pool.high_water_mark() <= 4);
}

#[test]
fn test_stress_block_policy() {
    let pool = Pool::with_fn(
        PoolConfig::block(2, Duration::from_secs(10)),
        Scratch::default,
    )
    .unwrap();
    let outcome = hammer(pool.clone(), 8, 300);

    // With a generous timeout every acquire is eventually served.
    assert_eq!(outcome.acquired, 8 * 300);
    assert_eq!(outcome.exhausted, 0);
    assert_eq!(pool.capacity(), 2);
    assert_eq!(pool.free_count(), 2);
}
