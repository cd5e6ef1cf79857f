//! Integration tests for the exhaustion policies and the release contract.
//!
//! Each test walks one pool through a complete acquire/release story and
//! checks the accounting invariant after every step.

use std::thread;
use std::time::{Duration, Instant};

use tarn_pool::{
    AcquireError, ExhaustionError, MisuseError, Pool, PoolConfig, ResetOutcome, Resource,
};

/// The resource from the classic object-pool walkthrough: a single value
/// that must read zero whenever it is handed out.
#[derive(Debug, Default)]
struct Counter {
    value: i32,
}

impl Resource for Counter {
    fn reset(&mut self) -> ResetOutcome {
        self.value = 0;
        ResetOutcome::Reuse
    }
}

fn counter_pool(config: PoolConfig) -> Pool<Counter> {
    Pool::with_fn(config, Counter::default).expect("valid pool")
}

fn assert_invariant(pool: &Pool<Counter>) {
    let stats = pool.stats();
    assert_eq!(
        stats.free + stats.outstanding,
        stats.capacity,
        "free + outstanding != capacity: {:?}",
        stats
    );
    if let Some(max) = pool.config().limit() {
        assert!(stats.capacity <= max, "capacity above limit: {:?}", stats);
    }
}

fn wait_for_waiters(pool: &Pool<Counter>, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.waiting() < count {
        assert!(Instant::now() < deadline, "waiters never queued");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_fail_policy_scenario() {
    let pool = counter_pool(PoolConfig::fail(2));

    let first = pool.acquire().unwrap();
    assert_invariant(&pool);
    let _second = pool.acquire().unwrap();
    assert_invariant(&pool);

    let err = pool.acquire().unwrap_err();
    assert!(matches!(
        err,
        AcquireError::Exhausted(ExhaustionError::Empty)
    ));
    assert_invariant(&pool);

    pool.release(first).unwrap();
    assert_invariant(&pool);

    assert!(pool.acquire().is_ok());
    assert_eq!(pool.capacity(), 2);
}

#[test]
fn test_grow_policy_scenario() {
    let pool = counter_pool(PoolConfig::grow(1, 3));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || pool.acquire().map(|lease| lease.detach()))
        })
        .collect();

    let detached: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    assert_eq!(pool.capacity(), 3);
    assert_eq!(pool.outstanding(), 3);
    assert_eq!(pool.high_water_mark(), 3);
    assert_invariant(&pool);

    let err = pool.acquire().unwrap_err();
    assert!(matches!(
        err,
        AcquireError::Exhausted(ExhaustionError::AtCapacity { max: 3 })
    ));

    for counter in detached {
        pool.restore(counter).unwrap();
    }
    assert_eq!(pool.free_count(), 3);
    assert_invariant(&pool);
}

#[test]
fn test_block_policy_timeout_scenario() {
    let pool = counter_pool(PoolConfig::block(1, Duration::from_millis(50)));
    let _held_by_a = pool.acquire().unwrap();

    let b_pool = pool.clone();
    let b = thread::spawn(move || {
        let start = Instant::now();
        let result = b_pool.acquire();
        (result.map(|lease| lease.id()), start.elapsed())
    });

    let (result, elapsed) = b.join().unwrap();
    assert!(matches!(
        result,
        Err(AcquireError::Exhausted(ExhaustionError::Timeout(t))) if t == Duration::from_millis(50)
    ));
    assert!(elapsed >= Duration::from_millis(50), "returned early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "returned late: {:?}", elapsed);

    // No phantom reservation is left behind by the timed-out waiter.
    assert_eq!(pool.waiting(), 0);
    assert_invariant(&pool);
}

#[test]
fn test_timed_out_waiter_does_not_swallow_release() {
    let pool = counter_pool(PoolConfig::block(1, Duration::from_millis(20)));
    let held = pool.acquire().unwrap();

    assert!(pool.acquire().unwrap_err().is_timeout());
    pool.release(held).unwrap();

    assert_eq!(pool.free_count(), 1);
    assert!(pool.try_acquire().is_ok());
}

#[test]
fn test_block_policy_handoff_scenario() {
    let pool = counter_pool(PoolConfig::block(1, Duration::from_secs(5)));

    let mut a = pool.acquire().unwrap();
    a.value = 10;
    let a_id = a.id();

    let b_pool = pool.clone();
    let b = thread::spawn(move || {
        let lease = b_pool.acquire().unwrap();
        (lease.id(), lease.value)
    });

    wait_for_waiters(&pool, 1);
    pool.release(a).unwrap();

    let (b_id, b_value) = b.join().unwrap();
    assert_eq!(b_id, a_id, "waiter should receive the released instance");
    assert_eq!(b_value, 0, "handed-off resource must be reset");
    assert_invariant(&pool);
}

#[test]
fn test_acquire_timeout_overrides_configured_wait() {
    let pool = counter_pool(PoolConfig::block(1, Duration::from_secs(30)));
    let _held = pool.acquire().unwrap();

    let start = Instant::now();
    let err = pool.acquire_timeout(Duration::from_millis(10)).unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_misuse_scenario() {
    let pool = counter_pool(PoolConfig::fail(1));
    let stranger = counter_pool(PoolConfig::fail(1));

    // A resource this pool never handed out.
    let foreign = stranger.acquire().unwrap();
    let foreign_id = foreign.id();
    assert_eq!(pool.release(foreign), Err(MisuseError::ForeignPool(foreign_id)));
    assert_invariant(&pool);

    // A detached resource from the other pool, restored while this pool's
    // only resource is held.
    let held = pool.acquire().unwrap();
    let stray = stranger.acquire().unwrap().detach();
    let stray_id = stray.id();
    assert_eq!(pool.restore(stray), Err(MisuseError::ForeignPool(stray_id)));
    assert_invariant(&pool);

    // The pool never took it in, so it still has nothing to hand out.
    assert_eq!(pool.capacity(), 1);
    assert_eq!(pool.free_count(), 0);
    assert!(pool.try_acquire().is_err());

    let held_id = held.id();
    pool.release(held).unwrap();
    let again = pool.acquire().unwrap();
    assert_eq!(again.id(), held_id);
    assert_eq!(again.value, 0);
}

#[test]
fn test_resource_reset_is_idempotent() {
    let mut counter = Counter { value: 17 };
    counter.reset();
    let once = counter.value;
    counter.reset();
    assert_eq!(counter.value, once);
}
