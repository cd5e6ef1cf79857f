//! Exhaustion policies.
//!
//! A policy decides what `acquire` does when the free set is empty: fail
//! immediately, construct another resource up to a high-water mark, or block
//! until another caller releases one.

use crate::error::ExhaustionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Strategy applied when an acquire finds no free resource.
///
/// The policy is fixed for the lifetime of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Return an exhaustion error immediately
    Fail,

    /// Construct a new resource while capacity is below `max_capacity`
    ///
    /// `None` grows without bound.
    Grow {
        /// High-water mark for the pool's capacity
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_capacity: Option<usize>,
    },

    /// Wait for a release, in FIFO order, for at most `timeout`
    Block {
        /// How long a blocked acquire waits before giving up
        #[serde(rename = "timeout_ms", with = "millis")]
        timeout: Duration,
    },
}

impl ExhaustionPolicy {
    /// Grow up to `max_capacity` resources.
    pub fn grow(max_capacity: usize) -> Self {
        Self::Grow {
            max_capacity: Some(max_capacity),
        }
    }

    /// Grow without a high-water mark.
    pub fn grow_unbounded() -> Self {
        Self::Grow { max_capacity: None }
    }

    /// Block for at most `timeout`.
    pub fn block(timeout: Duration) -> Self {
        Self::Block { timeout }
    }

    /// The most resources a pool with this policy may hold at once.
    ///
    /// Fail and Block pools never hold more than their eager `initial_size`;
    /// they only construct to replace discarded resources. `None` means
    /// unbounded.
    pub fn limit(&self, initial_size: usize) -> Option<usize> {
        match self {
            Self::Fail | Self::Block { .. } => Some(initial_size),
            Self::Grow { max_capacity } => *max_capacity,
        }
    }

    /// Whether acquires under this policy may suspend.
    pub fn may_wait(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// The configured wait for Block pools.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Block { timeout } => Some(*timeout),
            _ => None,
        }
    }

    /// The error reported when an acquire gives up without waiting.
    pub(crate) fn exhausted(&self) -> ExhaustionError {
        match self {
            Self::Grow {
                max_capacity: Some(max),
            } => ExhaustionError::AtCapacity { max: *max },
            _ => ExhaustionError::Empty,
        }
    }
}

impl Default for ExhaustionPolicy {
    fn default() -> Self {
        Self::Fail
    }
}

impl fmt::Display for ExhaustionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Grow {
                max_capacity: Some(max),
            } => write!(f, "grow(max={})", max),
            Self::Grow { max_capacity: None } => write!(f, "grow(unbounded)"),
            Self::Block { timeout } => write!(f, "block(timeout={:?})", timeout),
        }
    }
}

/// Serde adapter storing a `Duration` as whole milliseconds.
///
/// Sub-millisecond parts round up, so a non-zero timeout never renders as 0.
mod millis {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_nanos().div_ceil(1_000_000);
        let millis = u64::try_from(millis).map_err(S::Error::custom)?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
