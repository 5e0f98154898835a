/*!
 * Hybrid Spin-Then-Block Lock
 *
 * Spins on `try_lock` for up to twice the predicted spin time, then parks on
 * the underlying blocking mutex. Every acquisition feeds the observed spin
 * time back into the predictor, so the spin budget follows the lock's
 * actual contention.
 */

use super::super::config::LockConfig;
use super::super::predictor::{ns_to_duration, Predictor};
use super::super::probe::Probe;
use crate::core::limits::SPIN_BUDGET_FACTOR;
use parking_lot::lock_api::{self, RawMutex};
use std::fmt;
use std::hint;
use std::time::Duration;

/// Raw hybrid lock over a blocking primitive `R`
///
/// Implements `lock_api::RawMutex`, so it slots into `lock_api::Mutex` or
/// can be driven directly through `lock`/`try_lock`/`unlock`.
pub struct RawHybridMutex<R: RawMutex = parking_lot::RawMutex> {
    inner: R,
    spin: Predictor,
    probe: Probe,
}

impl<R: RawMutex> RawHybridMutex<R> {
    /// Create an unlocked mutex with a cold predictor and no probe
    #[inline]
    pub const fn new() -> Self {
        Self {
            inner: R::INIT,
            spin: Predictor::new(),
            probe: Probe::none(),
        }
    }

    /// Create an unlocked mutex with a seeded predictor
    pub fn with_config(config: LockConfig) -> Self {
        Self {
            inner: R::INIT,
            spin: Predictor::with_estimate(config.initial_spin_estimate),
            probe: Probe::none(),
        }
    }

    /// Attach an instrumentation probe
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    /// Current spin estimate
    #[inline]
    pub fn spin_estimate(&self) -> Duration {
        self.spin.value()
    }

    fn acquire(&self) {
        let sample = self.spin.start();
        let mut spun = 0i64;
        let mut did_block = false;

        while !self.inner.try_lock() {
            spun = sample.elapsed_ns();

            let budget = self
                .spin
                .value_ns()
                .saturating_mul(SPIN_BUDGET_FACTOR as i64);
            if spun < budget {
                hint::spin_loop();
                continue;
            }

            self.inner.lock();
            did_block = true;
            break;
        }

        let spin_estimate = self.spin.update_ns(spun);
        self.probe
            .emit(did_block, ns_to_duration(spin_estimate), Duration::ZERO);
    }
}

impl<R: RawMutex> Default for RawHybridMutex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RawMutex> fmt::Debug for RawHybridMutex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawHybridMutex")
            .field("locked", &self.inner.is_locked())
            .field("spin_estimate", &self.spin.value())
            .field("probe", &self.probe)
            .finish()
    }
}

// Safety: mutual exclusion is delegated entirely to `R`; the predictor only
// changes how long we poll before calling `R::lock`.
unsafe impl<R: RawMutex> lock_api::RawMutex for RawHybridMutex<R> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = R::GuardMarker;

    #[inline]
    fn lock(&self) {
        self.acquire();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.inner.try_lock()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.inner.unlock();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

/// Hybrid lock protecting a value
pub type HybridMutex<T> = lock_api::Mutex<RawHybridMutex, T>;

/// Scoped guard of a `HybridMutex`
pub type HybridMutexGuard<'a, T> = lock_api::MutexGuard<'a, RawHybridMutex, T>;
