/*!
 * Flag-Based Spin Locks
 *
 * Locks built directly on an atomic flag instead of an OS mutex:
 * - `RawSpinMutex`: pure test-and-test-and-set spinning
 * - `RawAdaptiveSpinMutex`: spins for twice the predicted wait, then backs
 *   off with short sleeps until the flag frees up
 * - `RawAdaptiveBlockMutex`: sleeps between attempts for the predicted hold
 *   time, which `unlock` measures
 *
 * None of these queue waiters; a sleeping waiter simply retries.
 */

use super::super::config::LockConfig;
use super::super::predictor::{monotonic_ns, ns_to_duration, Predictor};
use super::super::probe::Probe;
use crate::core::limits::{ADAPTIVE_SPIN_BACKOFF, SPIN_BUDGET_FACTOR};
use parking_lot::lock_api::{self, GuardSend};
use std::hint;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Shared flag operations
#[derive(Debug)]
struct Flag(AtomicBool);

impl Flag {
    const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline(always)]
    fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline(always)]
    fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[inline(always)]
    fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// =============================================================================
// SPIN
// =============================================================================

/// Pure spin lock
///
/// When a probe is attached, the time spent spinning is reported as the spin
/// value of each event; otherwise no clock is read.
#[derive(Debug)]
pub struct RawSpinMutex {
    flag: Flag,
    probe: Probe,
}

impl RawSpinMutex {
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: Flag::new(),
            probe: Probe::none(),
        }
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }
}

impl Default for RawSpinMutex {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for RawSpinMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    fn lock(&self) {
        let started = self.probe.is_enabled().then(Instant::now);

        while !self.flag.try_acquire() {
            // Wait on a plain load to keep the cache line shared while held
            while self.flag.is_set() {
                hint::spin_loop();
            }
        }

        if let Some(started) = started {
            self.probe.emit(false, started.elapsed(), Duration::ZERO);
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.flag.try_acquire()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.flag.release();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.flag.is_set()
    }
}

// =============================================================================
// ADAPTIVE SPIN
// =============================================================================

/// Spin lock that learns how long to spin before backing off
#[derive(Debug)]
pub struct RawAdaptiveSpinMutex {
    flag: Flag,
    spin: Predictor,
    probe: Probe,
}

impl RawAdaptiveSpinMutex {
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: Flag::new(),
            spin: Predictor::new(),
            probe: Probe::none(),
        }
    }

    pub fn with_config(config: LockConfig) -> Self {
        Self {
            flag: Flag::new(),
            spin: Predictor::with_estimate(config.initial_spin_estimate),
            probe: Probe::none(),
        }
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    #[inline]
    pub fn spin_estimate(&self) -> Duration {
        self.spin.value()
    }
}

impl Default for RawAdaptiveSpinMutex {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for RawAdaptiveSpinMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    fn lock(&self) {
        let sample = self.spin.start();
        let mut spun = 0i64;
        let mut did_block = false;

        while !self.flag.try_acquire() {
            spun = sample.elapsed_ns();

            let budget = self
                .spin
                .value_ns()
                .saturating_mul(SPIN_BUDGET_FACTOR as i64);
            if spun < budget {
                hint::spin_loop();
                continue;
            }

            thread::sleep(ADAPTIVE_SPIN_BACKOFF);
            did_block = true;
        }

        let spin_estimate = self.spin.update_ns(spun);
        self.probe
            .emit(did_block, ns_to_duration(spin_estimate), Duration::ZERO);
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.flag.try_acquire()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.flag.release();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.flag.is_set()
    }
}

// =============================================================================
// ADAPTIVE BLOCK
// =============================================================================

/// Lock whose waiters sleep for the predicted hold time between attempts
///
/// The hold-time estimate is reported as the block value of probe events.
#[derive(Debug)]
pub struct RawAdaptiveBlockMutex {
    flag: Flag,
    hold: Predictor,
    acquired_at_ns: AtomicI64,
    probe: Probe,
}

impl RawAdaptiveBlockMutex {
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: Flag::new(),
            hold: Predictor::new(),
            acquired_at_ns: AtomicI64::new(0),
            probe: Probe::none(),
        }
    }

    pub fn with_config(config: LockConfig) -> Self {
        Self {
            flag: Flag::new(),
            hold: Predictor::with_estimate(config.initial_block_estimate),
            acquired_at_ns: AtomicI64::new(0),
            probe: Probe::none(),
        }
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    /// Predicted time the lock stays held
    #[inline]
    pub fn hold_estimate(&self) -> Duration {
        self.hold.value()
    }
}

impl Default for RawAdaptiveBlockMutex {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for RawAdaptiveBlockMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    fn lock(&self) {
        let mut did_block = false;

        while !self.flag.try_acquire() {
            let hold = self.hold.value();
            if hold.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(hold);
            }
            did_block = true;
        }

        self.probe.emit(did_block, Duration::ZERO, self.hold.value());
        self.acquired_at_ns.store(monotonic_ns(), Ordering::Relaxed);
    }

    #[inline]
    fn try_lock(&self) -> bool {
        if self.flag.try_acquire() {
            self.acquired_at_ns.store(monotonic_ns(), Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    #[inline]
    unsafe fn unlock(&self) {
        let held = monotonic_ns() - self.acquired_at_ns.load(Ordering::Relaxed);
        self.hold.update_ns(held);
        self.flag.release();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.flag.is_set()
    }
}

/// Spin lock protecting a value
pub type SpinMutex<T> = lock_api::Mutex<RawSpinMutex, T>;

/// Adaptive spin lock protecting a value
pub type AdaptiveSpinMutex<T> = lock_api::Mutex<RawAdaptiveSpinMutex, T>;

/// Adaptive block lock protecting a value
pub type AdaptiveBlockMutex<T> = lock_api::Mutex<RawAdaptiveBlockMutex, T>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::probe::ProbeTrace;
    use parking_lot::lock_api::RawMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn hammer<R: RawMutex + Send + Sync + 'static>(lock: Arc<lock_api::Mutex<R, u64>>) -> usize {
        let inside = Arc::new(AtomicUsize::new(0));
        let violated = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                let inside = inside.clone();
                let violated = violated.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let mut guard = lock.lock();
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            violated.fetch_add(1, Ordering::SeqCst);
                        }
                        *guard += 1;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*lock.lock(), 4000);
        violated.load(Ordering::SeqCst)
    }

    #[test]
    fn test_spin_mutual_exclusion() {
        assert_eq!(hammer(Arc::new(SpinMutex::new(0))), 0);
    }

    #[test]
    fn test_adaptive_spin_mutual_exclusion() {
        assert_eq!(hammer(Arc::new(AdaptiveSpinMutex::new(0))), 0);
    }

    #[test]
    fn test_adaptive_block_mutual_exclusion() {
        assert_eq!(hammer(Arc::new(AdaptiveBlockMutex::new(0))), 0);
    }

    #[test]
    fn test_try_lock_fails_while_held() {
        let m = RawSpinMutex::new();
        assert!(m.try_lock());
        assert!(m.is_locked());
        assert!(!m.try_lock());
        unsafe { m.unlock() };
        assert!(!m.is_locked());
    }

    #[test]
    fn test_spin_probe_reports_no_block() {
        let trace = ProbeTrace::new();
        let m = RawSpinMutex::new().with_probe(trace.probe());
        m.lock();
        unsafe { m.unlock() };

        let events = trace.drain();
        assert_eq!(events.len(), 1);
        assert!(!events[0].did_block);
    }

    #[test]
    fn test_adaptive_spin_backs_off_when_held() {
        let trace = ProbeTrace::new();
        let m = Arc::new(RawAdaptiveSpinMutex::new().with_probe(trace.probe()));

        m.lock();
        let waiter = {
            let m = m.clone();
            thread::spawn(move || {
                m.lock();
                unsafe { m.unlock() };
            })
        };

        thread::sleep(Duration::from_millis(50));
        unsafe { m.unlock() };
        waiter.join().unwrap();

        let events = trace.drain();
        assert_eq!(events.len(), 2);
        assert!(events[1].did_block);
        assert!(m.spin_estimate() > Duration::ZERO);
    }

    #[test]
    fn test_adaptive_block_learns_hold_time() {
        let m = RawAdaptiveBlockMutex::new();
        for _ in 0..4 {
            m.lock();
            thread::sleep(Duration::from_millis(2));
            unsafe { m.unlock() };
        }

        // Four updates toward >= 2ms: at least 2ms * (1 - (7/8)^4) ~ 0.83ms
        assert!(m.hold_estimate() >= Duration::from_micros(800));
    }
}
