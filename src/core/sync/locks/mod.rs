/*!
 * Adaptive Lock Family
 *
 * Mutual-exclusion primitives that tune their waiting strategy per instance:
 * - Hybrid: spin for a learned budget, then block on an OS mutex
 * - Aversion-hybrid: also learns block latency and skips spinning when
 *   blocking has been cheaper
 * - Flag-based spin, adaptive spin and adaptive block locks
 *
 * Every raw type implements `lock_api::RawMutex`; the `*Mutex<T>` aliases
 * wrap them in `lock_api::Mutex` for guard-based access. Use
 * `lock_api::Mutex::from_raw` to build a typed mutex around a raw lock
 * carrying a config or probe.
 */

mod aversion;
mod hybrid;
mod spin;

// Re-export public API
pub use aversion::{AversionMutex, AversionMutexGuard, RawAversionMutex};
pub use hybrid::{HybridMutex, HybridMutexGuard, RawHybridMutex};
pub use spin::{
    AdaptiveBlockMutex, AdaptiveSpinMutex, RawAdaptiveBlockMutex, RawAdaptiveSpinMutex,
    RawSpinMutex, SpinMutex,
};
