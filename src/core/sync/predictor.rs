/*!
 * Elapsed-Time Predictor
 *
 * Exponential moving average of a duration, shared lock-free between all
 * threads touching one lock.
 *
 * # Design: Eventually-Consistent Estimate
 *
 * The estimate is a single `AtomicI64` of nanoseconds. `update` performs a
 * relaxed load followed by a relaxed `fetch_add` of the weighted delta, so
 * two racing updates may both apply a delta computed from the same stale
 * value. The estimate stays within the range of recent measurements and
 * converges on stable input; exactness is not required by any caller.
 */

use crate::core::limits::EMA_WEIGHT_DIVISOR;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Exponential moving average estimator of elapsed time
#[derive(Debug)]
pub struct Predictor {
    estimate_ns: AtomicI64,
}

impl Predictor {
    /// Create a predictor with a zero estimate
    #[inline]
    pub const fn new() -> Self {
        Self::with_estimate_ns(0)
    }

    /// Create a predictor seeded with an initial estimate
    #[inline]
    pub fn with_estimate(initial: Duration) -> Self {
        Self::with_estimate_ns(duration_to_ns(initial))
    }

    #[inline]
    pub(crate) const fn with_estimate_ns(initial: i64) -> Self {
        Self {
            estimate_ns: AtomicI64::new(initial),
        }
    }

    /// Record a reference timestamp for a new measurement
    #[inline(always)]
    pub fn start(&self) -> Sample {
        Sample {
            started: Instant::now(),
        }
    }

    /// Fold a measurement into the estimate, returning the new estimate
    #[inline]
    pub fn update(&self, measurement: Duration) -> Duration {
        ns_to_duration(self.update_ns(duration_to_ns(measurement)))
    }

    #[inline]
    pub(crate) fn update_ns(&self, measurement: i64) -> i64 {
        let current = self.estimate_ns.load(Ordering::Relaxed);
        let delta = (measurement - current) / EMA_WEIGHT_DIVISOR;
        self.estimate_ns.fetch_add(delta, Ordering::Relaxed) + delta
    }

    /// Current estimate
    #[inline(always)]
    pub fn value(&self) -> Duration {
        ns_to_duration(self.value_ns())
    }

    #[inline(always)]
    pub(crate) fn value_ns(&self) -> i64 {
        self.estimate_ns.load(Ordering::Relaxed)
    }

    /// Overwrite the estimate
    pub fn reset(&self, estimate: Duration) {
        self.estimate_ns
            .store(duration_to_ns(estimate), Ordering::Relaxed);
    }
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new()
    }
}

/// A started measurement
///
/// Each acquirer keeps its own start time so concurrent measurements on the
/// same predictor never clobber one another.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    started: Instant,
}

impl Sample {
    /// Time since `Predictor::start`
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[inline(always)]
    pub(crate) fn elapsed_ns(&self) -> i64 {
        duration_to_ns(self.started.elapsed())
    }
}

/// Nanoseconds since a process-wide epoch, for timestamps stored in atomics
#[inline]
pub(crate) fn monotonic_ns() -> i64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    duration_to_ns(EPOCH.get_or_init(Instant::now).elapsed())
}

#[inline(always)]
pub(crate) fn duration_to_ns(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

#[inline(always)]
pub(crate) fn ns_to_duration(ns: i64) -> Duration {
    Duration::from_nanos(ns.max(0) as u64)
}
