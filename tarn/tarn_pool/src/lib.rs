#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Tarn Pool
//!
//! A bounded pool of reusable resources.
//!
//! Callers `acquire` a resource, use it through a [`Lease`], and `release`
//! it (or drop the lease). The pool resets every returned resource before it
//! is reused, and applies an [`ExhaustionPolicy`] when demand exceeds supply:
//!
//! - **Fail**: report exhaustion immediately
//! - **Grow**: construct more resources, up to an optional high-water mark
//! - **Block**: wait for a release, in FIFO order, until a timeout
//!
//! Pools are explicitly constructed and shared by cloning the [`Pool`]
//! handle; there is no global instance.
//!
//! ## Example
//!
//! ```
//! use tarn_pool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! let pool = Pool::with_fn(PoolConfig::block(1, Duration::from_millis(20)), String::new).unwrap();
//!
//! let mut line = pool.acquire().unwrap();
//! line.push_str("in use");
//!
//! // The only resource is leased, so a second acquire waits and times out.
//! assert!(pool.acquire().unwrap_err().is_timeout());
//!
//! drop(line);
//! assert_eq!(*pool.acquire().unwrap(), "");
//! ```

/// Pool configuration and TOML loading
pub mod config;

/// Error types for pool operations
pub mod error;

/// Identifiers for pools and pooled resources
pub mod id;

/// The pool, its leases, policies and statistics
pub mod pool;

pub use config::PoolConfig;
pub use error::{
    AcquireError, BoxError, ConfigError, ConstructionError, ExhaustionError, MisuseError,
    PoolError, Result,
};
pub use id::{PoolId, ResourceId};
pub use pool::{Detached, ExhaustionPolicy, Lease, Pool, PoolStats, ResetOutcome, Resource};
