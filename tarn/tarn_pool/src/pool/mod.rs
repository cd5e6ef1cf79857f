//! Resource pooling and reuse of expensive resources.
//!
//! - [`Resource`]: the reset/close contract a pooled value implements
//! - [`ExhaustionPolicy`]: what `acquire` does when nothing is free
//! - [`Pool`] and [`Lease`]: the pool itself and the guard for a held resource
//! - [`Detached`]: a resource taken out of its lease, owed back to the pool
//! - [`PoolStats`]: a consistent snapshot of the pool's accounting

pub mod bounded;
pub mod lease;
pub mod policy;
pub mod resource;
pub mod stats;

pub use bounded::Pool;
pub use lease::{Detached, Lease};
pub use policy::ExhaustionPolicy;
pub use resource::{ResetOutcome, Resource};
pub use stats::PoolStats;
