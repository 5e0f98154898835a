/*!
 * Aversion-Hybrid Lock
 *
 * A hybrid lock that also learns what blocking costs. Before each
 * acquisition the two estimates are compared:
 *
 * - spin estimate > block estimate: blocking has been cheaper lately, so the
 *   lock parks straight away and only the block predictor learns
 * - otherwise: spin with the hybrid budget, falling back to a timed block;
 *   the spin predictor always learns and the block predictor learns whenever
 *   the fallback ran
 *
 * Spinning is gated on the comparison rather than attempted first; a lock
 * whose holders routinely sleep stops burning CPU on spin attempts entirely.
 */

use super::super::config::LockConfig;
use super::super::predictor::{ns_to_duration, Predictor};
use super::super::probe::Probe;
use crate::core::limits::SPIN_BUDGET_FACTOR;
use parking_lot::lock_api::{self, RawMutex};
use std::fmt;
use std::hint;
use std::time::Duration;

/// Raw aversion-hybrid lock over a blocking primitive `R`
pub struct RawAversionMutex<R: RawMutex = parking_lot::RawMutex> {
    inner: R,
    spin: Predictor,
    block: Predictor,
    probe: Probe,
}

impl<R: RawMutex> RawAversionMutex<R> {
    /// Create an unlocked mutex with cold predictors and no probe
    #[inline]
    pub const fn new() -> Self {
        Self {
            inner: R::INIT,
            spin: Predictor::new(),
            block: Predictor::new(),
            probe: Probe::none(),
        }
    }

    /// Create an unlocked mutex with seeded predictors
    pub fn with_config(config: LockConfig) -> Self {
        Self {
            inner: R::INIT,
            spin: Predictor::with_estimate(config.initial_spin_estimate),
            block: Predictor::with_estimate(config.initial_block_estimate),
            probe: Probe::none(),
        }
    }

    /// Attach an instrumentation probe
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    #[inline]
    pub fn spin_estimate(&self) -> Duration {
        self.spin.value()
    }

    #[inline]
    pub fn block_estimate(&self) -> Duration {
        self.block.value()
    }

    /// Park on the inner mutex, feeding the wait into the block predictor
    #[inline]
    fn timed_block(&self) -> i64 {
        let sample = self.block.start();
        self.inner.lock();
        self.block.update_ns(sample.elapsed_ns())
    }

    fn acquire(&self) {
        if self.spin.value_ns() > self.block.value_ns() {
            let block_estimate = self.timed_block();
            self.probe
                .emit(true, self.spin.value(), ns_to_duration(block_estimate));
            return;
        }

        let sample = self.spin.start();
        let mut spun = 0i64;
        let mut did_block = false;
        let mut block_estimate = self.block.value_ns();

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

            block_estimate = self.timed_block();
            did_block = true;
            break;
        }

        let spin_estimate = self.spin.update_ns(spun);
        self.probe.emit(
            did_block,
            ns_to_duration(spin_estimate),
            ns_to_duration(block_estimate),
        );
    }
}

impl<R: RawMutex> Default for RawAversionMutex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RawMutex> fmt::Debug for RawAversionMutex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAversionMutex")
            .field("locked", &self.inner.is_locked())
            .field("spin_estimate", &self.spin.value())
            .field("block_estimate", &self.block.value())
            .field("probe", &self.probe)
            .finish()
    }
}

// Safety: mutual exclusion is delegated entirely to `R`.
unsafe impl<R: RawMutex> lock_api::RawMutex for RawAversionMutex<R> {
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

/// Aversion-hybrid lock protecting a value
pub type AversionMutex<T> = lock_api::Mutex<RawAversionMutex, T>;

/// Scoped guard of an `AversionMutex`
pub type AversionMutexGuard<'a, T> = lock_api::MutexGuard<'a, RawAversionMutex, T>;
