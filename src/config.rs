//! Strategy configuration.

use std::time::Duration;

use crate::types::{PartitionError, Result};

/// Tunables for the HDRF strategy.
///
/// Validated once in [`Hdrf::new`](crate::Hdrf::new), never per edge.
#[derive(Debug, Clone)]
pub struct HdrfConfig {
    /// Number of logical partitions edges are assigned to. Must be positive.
    pub partitions: u32,
    /// Balance weight λ: 0 ignores load entirely, larger values push edges
    /// toward underloaded partitions. Must be finite and non-negative.
    pub lambda: f64,
    /// Try-lock attempts per endpoint before a processing call reports
    /// [`PartitionError::LockTimeout`]. Must be positive.
    pub max_lock_attempts: u32,
    /// Sleep after the first failed lock attempt; doubles per retry.
    pub initial_backoff: Duration,
    /// Backoff ceiling; doubling stops here.
    pub max_backoff: Duration,
    /// Fixed seed for the tie-breaking RNG. `None` seeds from entropy;
    /// setting it makes assignment sequences reproducible in tests.
    pub seed: Option<u64>,
}

impl Default for HdrfConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            lambda: 1.0,
            max_lock_attempts: 16,
            initial_backoff: Duration::from_micros(2),
            max_backoff: Duration::from_millis(1),
            seed: None,
        }
    }
}

impl HdrfConfig {
    /// Default knobs with an explicit partition count.
    pub fn with_partitions(partitions: u32) -> Self {
        Self {
            partitions,
            ..Self::default()
        }
    }

    /// Checks the configuration for values the strategy cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(PartitionError::Config("partition count must be positive"));
        }
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(PartitionError::Config(
                "lambda must be finite and non-negative",
            ));
        }
        if self.max_lock_attempts == 0 {
            return Err(PartitionError::Config("lock retry budget must be positive"));
        }
        Ok(())
    }
}
