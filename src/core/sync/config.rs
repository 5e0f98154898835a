/*!
 * Adaptive Lock Configuration
 *
 * Seed values for the predictors of an adaptive lock
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Initial predictor estimates for an adaptive lock
///
/// The predictors adapt on their own; seeding only shortens the warm-up.
/// With both estimates at zero a contended hybrid lock blocks on its first
/// failed attempt and an aversion lock starts on its spin path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockConfig {
    /// Initial spin estimate (spin budget is twice this)
    pub initial_spin_estimate: Duration,
    /// Initial block estimate (aversion locks only; hold time for adaptive block locks)
    pub initial_block_estimate: Duration,
}

impl LockConfig {
    /// Configuration for short critical sections (< 10µs hold time expected)
    pub const fn low_latency() -> Self {
        Self {
            initial_spin_estimate: Duration::from_micros(5),
            initial_block_estimate: Duration::from_micros(50),
        }
    }

    /// Configuration for long critical sections (> 1ms hold time expected)
    pub const fn long_hold() -> Self {
        Self {
            initial_spin_estimate: Duration::from_micros(100),
            initial_block_estimate: Duration::from_micros(10),
        }
    }
}
