/*!
 * Tuning Limits and Constants
 *
 * Centralized location for the thresholds and magic numbers used by the
 * adaptive locks and the serial queue backends.
 *
 * - Performance-critical constants are marked with [PERF]
 */

use std::time::Duration;

// =============================================================================
// PREDICTOR / ADAPTIVE LOCKS
// =============================================================================

/// EMA weight divisor (1/8)
/// Each measurement moves the estimate by (measurement - estimate) / 8.
/// A larger divisor smooths more; 4 would settle faster on stable contention.
pub const EMA_WEIGHT_DIVISOR: i64 = 8;

/// Spin budget factor (2x the spin estimate)
/// [PERF] Spinning past twice the predicted wait gives up to a blocking acquire
pub const SPIN_BUDGET_FACTOR: u32 = 2;

/// Sleep between retries once an adaptive spin lock exhausts its spin budget
/// [PERF] Short enough to behave like a yield on most schedulers
pub const ADAPTIVE_SPIN_BACKOFF: Duration = Duration::from_micros(1);

/// Default capacity of a `ProbeTrace` event log
/// Events past this are counted and dropped until drained
pub const DEFAULT_PROBE_TRACE_CAPACITY: usize = 4096;

// =============================================================================
// SERIAL QUEUES
// =============================================================================

/// Thread name used by dedicated serial queue workers
pub const DEFAULT_WORKER_THREAD_NAME: &str = "serial-queue";

/// Thread name used by the shared work pool
pub const WORK_POOL_THREAD_NAME: &str = "serial-work-pool";

/// Upper bound on OS threads in the shared work pool
/// The pool is the blocking pool of a current-thread tokio runtime that is
/// never driven, so these are the only threads it ever starts.
/// Each active work-queue backed serial queue occupies at most one of them.
pub const WORK_POOL_MAX_THREADS: usize = 64;

/// How long an idle work pool thread lingers before exiting
pub const WORK_POOL_KEEP_ALIVE: Duration = Duration::from_secs(10);

/// Environment variable selecting the serial queue backend
pub const BACKEND_ENV_VAR: &str = "SERIAL_QUEUE_BACKEND";
