//! The object-pool walkthrough.
//!
//! Two resources are acquired from an empty pool (so both are built), given
//! values, and released. Acquiring again reuses the same instances in the
//! order they came back, with their values reset to zero.

use anyhow::{Context, Result};
use clap::Args;
use tarn_pool::{Lease, Pool, PoolConfig, ResetOutcome, Resource};

/// Arguments for the demo command
#[derive(Args)]
pub struct DemoArgs {
    /// Resources to build up front; the rest are built on demand
    #[clap(long, default_value_t = 0)]
    initial_size: usize,
}

/// A resource holding one value that resets to zero
#[derive(Debug, Default)]
pub struct Slot {
    value: i32,
}

impl Resource for Slot {
    fn reset(&mut self) -> ResetOutcome {
        self.value = 0;
        ResetOutcome::Reuse
    }
}

fn acquire(pool: &Pool<Slot>) -> Result<Lease<Slot>> {
    let created_before = pool.stats().created;
    let lease = pool.acquire().context("failed to acquire a resource")?;

    if pool.stats().created > created_before {
        println!("Creating new.");
    } else {
        println!("Reusing existing.");
    }
    Ok(lease)
}

/// Implementation of the demo command
pub fn execute(args: &DemoArgs) -> Result<()> {
    let pool = Pool::with_fn(PoolConfig::grow_unbounded(args.initial_size), Slot::default)
        .context("failed to build the demo pool")?;

    let mut one = acquire(&pool)?;
    one.value = 10;
    println!("one = {} [{}]", one.value, one.id());

    let mut two = acquire(&pool)?;
    two.value = 20;
    println!("two = {} [{}]", two.value, two.id());

    pool.release(one)?;
    pool.release(two)?;
    println!("Released both resources.");

    let one = acquire(&pool)?;
    println!("one = {} [{}]", one.value, one.id());

    let two = acquire(&pool)?;
    println!("two = {} [{}]", two.value, two.id());

    let stats = pool.stats();
    println!(
        "capacity = {}, free = {}, outstanding = {}, high water mark = {}",
        stats.capacity, stats.free, stats.outstanding, stats.high_water_mark
    );
    Ok(())
}
