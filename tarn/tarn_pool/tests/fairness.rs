//! FIFO fairness of blocked acquires.

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tarn_pool::{Pool, PoolConfig};

fn wait_for_waiters(pool: &Pool<Vec<u8>>, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.waiting() < count {
        assert!(Instant::now() < deadline, "waiters never queued");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_waiters_served_in_arrival_order() {
    let pool = Pool::with_fn(PoolConfig::block(1, Duration::from_secs(10)), Vec::<u8>::new)
        .unwrap();
    let held = pool.acquire().unwrap();
    let served = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for arrival in 0..5 {
        let pool_clone = pool.clone();
        let served = Arc::clone(&served);
        handles.push(thread::spawn(move || {
            let mut lease = pool_clone.acquire().unwrap();
            assert!(lease.is_empty(), "resource was not reset");
            lease.push(arrival);
            served.lock().push(arrival);
            // Dropping the lease hands it to the next waiter.
        }));
        // Queue each waiter only after the previous one is blocked.
        wait_for_waiters(&pool, arrival as usize + 1);
    }

    drop(held);
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(*served.lock(), vec![0, 1, 2, 3, 4]);
    let stats = pool.stats();
    assert_eq!(stats.handoffs, 5);
    assert_eq!(stats.capacity, 1);
    assert!(stats.is_consistent());
}

#[test]
fn test_new_arrivals_queue_behind_waiters() {
    let pool = Pool::with_fn(PoolConfig::block(1, Duration::from_secs(10)), Vec::<u8>::new)
        .unwrap();
    let held = pool.acquire().unwrap();

    let waiter_pool = pool.clone();
    let waiter = thread::spawn(move || waiter_pool.acquire().unwrap().id());
    wait_for_waiters(&pool, 1);

    let held_id = held.id();
    pool.release(held).unwrap();

    // The released resource went to the waiter, not back to the free set.
    assert!(pool.try_acquire().is_err());
    assert_eq!(waiter.join().unwrap(), held_id);
    assert!(pool.try_acquire().is_ok());
}
