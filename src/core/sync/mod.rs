/*!
 * Synchronization Primitives
 *
 * Adaptive spin-then-block locks and the pieces they are built from:
 * - `Predictor`: lock-free EMA of elapsed time
 * - `Probe`: optional post-acquisition instrumentation
 * - `LockConfig`: predictor seeding
 *
 * # Architecture
 *
 * Each lock owns its predictors, so contention is learned per instance.
 * Predictor updates are relaxed atomics and never synchronize with the lock
 * itself; mutual exclusion always comes from the underlying flag or mutex.
 */

mod config;
mod locks;
mod predictor;
mod probe;

pub use config::LockConfig;
pub use locks::{
    AdaptiveBlockMutex, AdaptiveSpinMutex, AversionMutex, AversionMutexGuard, HybridMutex,
    HybridMutexGuard, RawAdaptiveBlockMutex, RawAdaptiveSpinMutex, RawAversionMutex,
    RawHybridMutex, RawSpinMutex, SpinMutex,
};
pub use predictor::{Predictor, Sample};
pub use probe::{Probe, ProbeEvent, ProbeSnapshot, ProbeStats, ProbeTrace};
