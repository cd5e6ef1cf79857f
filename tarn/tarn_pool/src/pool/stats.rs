//! Point-in-time pool statistics.

use serde::{Deserialize, Serialize};

/// Snapshot of a pool's accounting, taken under the pool lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Resources ready to be acquired
    pub free: usize,

    /// Resources currently held by callers
    pub outstanding: usize,

    /// Live resources the pool has constructed
    pub capacity: usize,

    /// Callers blocked in acquire
    pub waiting: usize,

    /// Constructions currently running outside the lock
    pub pending: usize,

    /// Largest capacity the pool has reached
    pub high_water_mark: usize,

    /// Resources constructed over the pool's lifetime
    pub created: u64,

    /// Acquires served by an existing resource
    pub reused: u64,

    /// Resources dropped because they could not be reset
    pub discarded: u64,

    /// Releases handed directly to a blocked caller
    pub handoffs: u64,

    /// Blocked acquires that gave up
    pub timeouts: u64,
}

impl PoolStats {
    /// Whether `free + outstanding == capacity`.
    pub fn is_consistent(&self) -> bool {
        self.free + self.outstanding == self.capacity
    }

    /// Whether the pool stays within `limit` (`None` is unbounded).
    pub fn within(&self, limit: Option<usize>) -> bool {
        limit.map_or(true, |max| {
            self.capacity <= max && self.high_water_mark <= max
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency() {
        let stats = PoolStats {
            free: 1,
            outstanding: 2,
            capacity: 3,
            high_water_mark: 3,
            ..Default::default()
        };
        assert!(stats.is_consistent());
        assert!(stats.within(Some(3)));
        assert!(!stats.within(Some(2)));
        assert!(stats.within(None));

        let broken = PoolStats {
            capacity: 4,
            ..stats
        };
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_serializes_field_names() {
        let json = serde_json::to_value(PoolStats::default()).unwrap();
        assert_eq!(json["high_water_mark"], 0);
        assert_eq!(json["outstanding"], 0);
    }
}
