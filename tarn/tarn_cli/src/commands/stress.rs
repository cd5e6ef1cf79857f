//! Concurrent stress run against a pool.
//!
//! Every worker repeatedly acquires a resource, checks that nobody else holds
//! the same instance and that it arrived reset, dirties it, and releases it.
//! A separate observer samples the pool's accounting while the workers run.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use tarn_pool::{AcquireError, Pool, PoolConfig, PoolStats, ResetOutcome, Resource, ResourceId};

use super::config;

/// Arguments for the stress command
#[derive(Args)]
pub struct StressArgs {
    /// Number of worker threads
    #[clap(long, default_value_t = 8)]
    threads: usize,

    /// Acquire/release cycles per worker
    #[clap(long, default_value_t = 1000)]
    iterations: usize,

    /// Pool configuration file (TOML); defaults to growing from 2 to 4
    #[clap(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[clap(long)]
    json: bool,
}

/// A scratch buffer that must come back empty
#[derive(Debug, Default)]
struct Scratch {
    buf: Vec<u8>,
}

impl Resource for Scratch {
    fn reset(&mut self) -> ResetOutcome {
        self.buf.clear();
        ResetOutcome::Reuse
    }
}

/// Outcome of a stress run
#[derive(Debug, Serialize)]
pub struct StressReport {
    /// When the workers started
    pub started_at: DateTime<Utc>,

    /// When the last worker finished
    pub finished_at: DateTime<Utc>,

    /// The pool's exhaustion policy
    pub policy: String,

    /// Worker threads
    pub threads: usize,

    /// Cycles per worker
    pub iterations: usize,

    /// Successful acquires
    pub acquired: usize,

    /// Acquires refused by the exhaustion policy
    pub exhausted: usize,

    /// Acquires that failed for any other reason
    pub failed: usize,

    /// Resources observed in two workers' hands at once
    pub double_issues: usize,

    /// Resources handed out without being reset
    pub unreset: usize,

    /// Accounting snapshots that broke `free + outstanding == capacity`
    pub inconsistent_snapshots: usize,

    /// Final pool statistics
    pub stats: PoolStats,
}

impl StressReport {
    fn violations(&self) -> usize {
        self.failed + self.double_issues + self.unreset + self.inconsistent_snapshots
    }
}

#[derive(Default)]
struct Tally {
    acquired: AtomicUsize,
    exhausted: AtomicUsize,
    failed: AtomicUsize,
    double_issues: AtomicUsize,
    unreset: AtomicUsize,
    inconsistent: AtomicUsize,
}

/// Implementation of the stress command
pub fn execute(args: &StressArgs) -> Result<()> {
    let pool_config = match &args.config {
        Some(path) => config::load(path)?,
        None => PoolConfig::grow(2, 4),
    };

    let report = run(pool_config, args.threads, args.iterations)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.violations() > 0 {
        bail!("stress run found {} violations", report.violations());
    }
    Ok(())
}

/// Run `threads` workers for `iterations` cycles each against a fresh pool
pub fn run(pool_config: PoolConfig, threads: usize, iterations: usize) -> Result<StressReport> {
    let policy = pool_config.policy.to_string();
    let limit = pool_config.limit();
    let pool = Pool::with_fn(pool_config, Scratch::default).context("failed to build pool")?;

    info!(
        "Stressing pool {} ({}) with {} threads x {} iterations",
        pool.id(),
        policy,
        threads,
        iterations
    );

    let tally = Tally::default();
    let held: Mutex<HashSet<ResourceId>> = Mutex::new(HashSet::new());
    let done = AtomicBool::new(false);
    let started_at = Utc::now();

    thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Relaxed) {
                let stats = pool.stats();
                if !stats.is_consistent() || !stats.within(limit) {
                    tally.inconsistent.fetch_add(1, Ordering::Relaxed);
                }
                thread::yield_now();
            }
        });

        let (pool, held, tally) = (&pool, &held, &tally);
        let workers: Vec<_> = (0..threads)
            .map(|_| scope.spawn(move || work(pool, held, tally, iterations)))
            .collect();

        for worker in workers {
            // A panicking worker counts as a failure, not a crash.
            if worker.join().is_err() {
                tally.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        done.store(true, Ordering::Relaxed);
    });

    let stats = pool.stats();
    if !stats.is_consistent() {
        tally.inconsistent.fetch_add(1, Ordering::Relaxed);
    }

    Ok(StressReport {
        started_at,
        finished_at: Utc::now(),
        policy,
        threads,
        iterations,
        acquired: tally.acquired.into_inner(),
        exhausted: tally.exhausted.into_inner(),
        failed: tally.failed.into_inner(),
        double_issues: tally.double_issues.into_inner(),
        unreset: tally.unreset.into_inner(),
        inconsistent_snapshots: tally.inconsistent.into_inner(),
        stats,
    })
}

fn work(
    pool: &Pool<Scratch>,
    held: &Mutex<HashSet<ResourceId>>,
    tally: &Tally,
    iterations: usize,
) {
    for round in 0..iterations {
        let mut lease = match pool.acquire() {
            Ok(lease) => lease,
            Err(AcquireError::Exhausted(_)) => {
                tally.exhausted.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Err(e) => {
                debug!("Acquire failed: {}", e);
                tally.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let id = lease.id();
        if !held.lock().insert(id) {
            tally.double_issues.fetch_add(1, Ordering::Relaxed);
        }
        if !lease.buf.is_empty() {
            tally.unreset.fetch_add(1, Ordering::Relaxed);
        }

        lease.buf.extend_from_slice(&round.to_le_bytes());
        thread::yield_now();

        // Forget the id before the pool can issue it again.
        held.lock().remove(&id);
        if let Err(e) = pool.release(lease) {
            debug!("Release failed: {}", e);
            tally.failed.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        tally.acquired.fetch_add(1, Ordering::Relaxed);
    }
}

fn print_report(report: &StressReport) {
    let elapsed = report.finished_at - report.started_at;

    println!(
        "Stress run: {} ({} threads x {} iterations)",
        report.policy, report.threads, report.iterations
    );
    println!("  elapsed: {} ms", elapsed.num_milliseconds());
    println!("  acquired: {}", report.acquired);
    println!("  exhausted: {}", report.exhausted);
    println!("  failed: {}", report.failed);
    println!("  double issues: {}", report.double_issues);
    println!("  unreset resources: {}", report.unreset);
    println!("  inconsistent snapshots: {}", report.inconsistent_snapshots);
    println!(
        "  capacity: {} (high water mark {}), free: {}, outstanding: {}",
        report.stats.capacity,
        report.stats.high_water_mark,
        report.stats.free,
        report.stats.outstanding
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_run_is_clean_for_each_policy() {
        for pool_config in [
            PoolConfig::fail(2),
            PoolConfig::grow(1, 3),
            PoolConfig::block(2, Duration::from_secs(10)),
        ] {
            let report = run(pool_config, 4, 100).unwrap();
            assert_eq!(report.violations(), 0, "{:?}", report);
            assert_eq!(report.acquired + report.exhausted, 400);
            assert_eq!(report.stats.outstanding, 0);
        }
    }

    #[test]
    fn test_block_run_serves_everyone() {
        let report = run(PoolConfig::block(1, Duration::from_secs(10)), 4, 50).unwrap();
        assert_eq!(report.acquired, 200);
        assert_eq!(report.exhausted, 0);
        assert_eq!(report.stats.capacity, 1);
    }
}
