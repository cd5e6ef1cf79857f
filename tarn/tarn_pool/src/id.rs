//! Strongly-typed identifiers for pools and the resources they issue.
//!
//! Every pool is tagged with a random [`PoolId`]. Resources constructed by a
//! pool are numbered sequentially inside it, so a [`ResourceId`] is the pair
//! of the owning pool and that sequence number. This lets a pool recognise
//! resources it never issued, or that another pool issued.
//!
//! # Examples
//!
//! ```
//! use tarn_pool::id::PoolId;
//! use std::str::FromStr;
//!
//! let id_str = "550e8400-e29b-41d4-a716-446655440000";
//! let pool_id = PoolId::from_str(id_str).unwrap();
//! assert_eq!(pool_id.to_string(), id_str);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a single pool instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(Uuid);

impl PoolId {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an identifier from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PoolId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PoolId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

/// Identifier of one resource issued by a pool.
///
/// Identity is by construction, not by value: two resources with equal
/// contents still carry different ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pool: PoolId,
    sequence: u64,
}

impl ResourceId {
    /// Create a resource identifier. Only pools number their resources.
    pub(crate) fn new(pool: PoolId, sequence: u64) -> Self {
        Self { pool, sequence }
    }

    /// The pool that issued this resource.
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// The construction order of this resource inside its pool.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.pool, self.sequence)
    }
}
