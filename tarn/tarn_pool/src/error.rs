//! Error types for the resource pool.
//!
//! Each failure mode has its own type so callers can match on exactly what
//! went wrong: running out of resources ([`ExhaustionError`]), breaking the
//! release contract ([`MisuseError`]), a failing factory
//! ([`ConstructionError`]) or a bad configuration ([`ConfigError`]).
//! [`PoolError`] wraps all of them for uniform handling at the top level.

use crate::id::ResourceId;
use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by a resource factory.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// No resource is available and the exhaustion policy forbids waiting longer.
///
/// Recoverable: the caller may retry later.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExhaustionError {
    /// The free set is empty and the policy does not construct new resources
    #[error("resource pool exhausted")]
    Empty,

    /// The pool has grown to its high-water mark
    #[error("resource pool exhausted at its maximum capacity of {max}")]
    AtCapacity {
        /// The configured maximum capacity
        max: usize,
    },

    /// A blocked acquire was not served before its timeout
    #[error("timeout after {0:?} waiting for resource")]
    Timeout(Duration),
}

/// The caller broke the release contract.
///
/// These are programming errors and are never retried by the pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MisuseError {
    /// The resource belongs to a different pool
    #[error("resource {0} was issued by a different pool")]
    ForeignPool(ResourceId),

    /// This pool never issued a resource with that id
    #[error("resource {0} was never issued by this pool")]
    NotIssued(ResourceId),

    /// The resource was already returned
    #[error("resource {0} has already been released")]
    AlreadyReleased(ResourceId),

    /// The pool was shut down while callers still held resources
    #[error("pool shut down with {0} resources still outstanding")]
    OutstandingAtShutdown(usize),
}

/// The resource factory failed while the pool was constructing a resource.
///
/// The failed attempt never counts towards the pool's capacity.
#[derive(Error, Debug)]
#[error("failed to create resource: {source}")]
pub struct ConstructionError {
    #[source]
    source: BoxError,
}

impl ConstructionError {
    /// Wrap a factory error.
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Unwrap the factory error.
    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

/// Error returned when a resource cannot be acquired from the pool
#[derive(Error, Debug)]
pub enum AcquireError {
    /// No resource available under the pool's exhaustion policy
    #[error(transparent)]
    Exhausted(#[from] ExhaustionError),

    /// Growing the pool failed because the factory failed
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// The pool is shut down
    #[error("resource pool is shut down")]
    Shutdown,
}

impl AcquireError {
    /// Whether this error is a (retryable) exhaustion error.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// Whether this error came from a blocked acquire timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Exhausted(ExhaustionError::Timeout(_)))
    }
}

/// Invalid pool configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The grow policy maximum is smaller than the number of eager resources
    #[error("maximum capacity {max} is below the initial size {initial_size}")]
    MaxBelowInitial {
        /// Configured maximum capacity
        max: usize,
        /// Configured initial size
        initial_size: usize,
    },

    /// The pool could never hand out a resource
    #[error("pool limit is zero, no resource could ever be acquired")]
    ZeroCapacity,

    /// The block policy needs a non-zero timeout
    #[error("block policy timeout must be greater than zero")]
    ZeroTimeout,

    /// The configuration text could not be parsed
    #[error("failed to parse pool configuration: {0}")]
    Parse(String),
}

/// Root error type for pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Acquire failed
    #[error("Acquire error: {0}")]
    Acquire(#[from] AcquireError),

    /// Release contract violation
    #[error("Misuse error: {0}")]
    Misuse(#[from] MisuseError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Eager construction failed while building the pool
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),
}

/// Result type for pool operations.
pub type Result<T, E = PoolError> = std::result::Result<T, E>;
