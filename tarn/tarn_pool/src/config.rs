//! Pool configuration.
//!
//! A [`PoolConfig`] pairs the number of resources built eagerly with the
//! [`ExhaustionPolicy`] used once they run out. Configurations can be written
//! in code or loaded from TOML:
//!
//! ```
//! use tarn_pool::{ExhaustionPolicy, PoolConfig};
//! use std::time::Duration;
//!
//! let config = PoolConfig::from_toml_str(
//!     r#"
//!     initial_size = 2
//!
//!     [policy]
//!     kind = "block"
//!     timeout_ms = 50
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.initial_size, 2);
//! assert_eq!(config.policy, ExhaustionPolicy::block(Duration::from_millis(50)));
//! ```

use crate::error::ConfigError;
use crate::pool::ExhaustionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a resource pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Number of resources constructed when the pool is created
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,

    /// What acquire does when no resource is free
    #[serde(default)]
    pub policy: ExhaustionPolicy,
}

fn default_initial_size() -> usize {
    5
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: default_initial_size(),
            policy: ExhaustionPolicy::default(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration.
    pub fn new(initial_size: usize, policy: ExhaustionPolicy) -> Self {
        Self {
            initial_size,
            policy,
        }
    }

    /// A fixed-size pool that fails fast when exhausted.
    pub fn fail(initial_size: usize) -> Self {
        Self::new(initial_size, ExhaustionPolicy::Fail)
    }

    /// A pool that grows up to `max_capacity` resources.
    pub fn grow(initial_size: usize, max_capacity: usize) -> Self {
        Self::new(initial_size, ExhaustionPolicy::grow(max_capacity))
    }

    /// A pool that grows whenever it runs out.
    pub fn grow_unbounded(initial_size: usize) -> Self {
        Self::new(initial_size, ExhaustionPolicy::grow_unbounded())
    }

    /// A fixed-size pool whose acquires wait up to `timeout` for a release.
    pub fn block(initial_size: usize, timeout: Duration) -> Self {
        Self::new(initial_size, ExhaustionPolicy::block(timeout))
    }

    /// Maximum number of live resources, `None` if unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.policy.limit(self.initial_size)
    }

    /// Check that the configuration describes a usable pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.policy {
            ExhaustionPolicy::Grow {
                max_capacity: Some(max),
            } if max < self.initial_size => {
                return Err(ConfigError::MaxBelowInitial {
                    max,
                    initial_size: self.initial_size,
                });
            }
            ExhaustionPolicy::Block { timeout } if timeout.is_zero() => {
                return Err(ConfigError::ZeroTimeout);
            }
            _ => {}
        }

        if self.limit() == Some(0) {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(())
    }

    /// Parse and validate a TOML configuration.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
