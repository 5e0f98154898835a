/*!
 * Adaptive Sync Library
 * Adaptive spin-then-block locks and serial task execution
 */

pub mod core;
pub mod serial;

// Re-exports
pub use crate::core::errors::{QueueError, QueueResult};
pub use crate::core::sync::{
    AdaptiveBlockMutex, AdaptiveSpinMutex, AversionMutex, AversionMutexGuard, HybridMutex,
    HybridMutexGuard, LockConfig, Predictor, Probe, ProbeEvent, ProbeSnapshot, ProbeStats,
    ProbeTrace, RawAdaptiveBlockMutex, RawAdaptiveSpinMutex, RawAversionMutex, RawHybridMutex,
    RawSpinMutex, Sample, SpinMutex,
};
pub use serial::{
    BackendType, ParseBackendError, QueueConfig, QueueMonitor, QueueState, QueueStats,
    SerialQueue, SerialWrapper, TaskHandle,
};
