/*!
 * Lock Instrumentation
 *
 * Optional post-acquisition hook for adaptive locks, plus two ready-made
 * accumulators that callers own explicitly:
 * - `ProbeStats`: atomic counters and the latest estimates
 * - `ProbeTrace`: bounded lock-free log of individual events
 *
 * An unset `Probe` costs one predictable branch per blocking acquisition.
 */

use crate::core::limits::DEFAULT_PROBE_TRACE_CAPACITY;
use crossbeam_queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One acquisition as seen by the lock's predictors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeEvent {
    /// Whether the acquisition fell back to (or went straight to) blocking
    pub did_block: bool,
    /// Spin estimate after this acquisition
    pub spin_estimate: Duration,
    /// Block estimate after this acquisition (zero for single-predictor locks)
    pub block_estimate: Duration,
}

type ProbeFn = dyn Fn(ProbeEvent) + Send + Sync;

/// Optional instrumentation callback
///
/// The callback runs synchronously on the acquiring thread while the lock
/// is held. It must not block and must not panic.
#[derive(Clone, Default)]
pub struct Probe {
    hook: Option<Arc<ProbeFn>>,
}

impl Probe {
    /// A probe that does nothing
    #[inline]
    pub const fn none() -> Self {
        Self { hook: None }
    }

    /// Wrap a callback
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(ProbeEvent) + Send + Sync + 'static,
    {
        Self {
            hook: Some(Arc::new(hook)),
        }
    }

    /// Whether a callback is installed
    #[inline(always)]
    pub fn is_enabled(&self) -> bool {
        self.hook.is_some()
    }

    #[inline(always)]
    pub(crate) fn emit(&self, did_block: bool, spin_estimate: Duration, block_estimate: Duration) {
        if let Some(hook) = &self.hook {
            hook(ProbeEvent {
                did_block,
                spin_estimate,
                block_estimate,
            });
        }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Running counters fed by a probe
#[derive(Debug, Default)]
pub struct ProbeStats {
    acquisitions: AtomicU64,
    blocked: AtomicU64,
    last_spin_ns: AtomicU64,
    last_block_ns: AtomicU64,
}

/// Point-in-time copy of `ProbeStats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProbeSnapshot {
    pub acquisitions: u64,
    pub blocked: u64,
    pub last_spin_estimate: Duration,
    pub last_block_estimate: Duration,
}

impl ProbeSnapshot {
    /// Fraction of acquisitions that blocked (0.0 when nothing was recorded)
    pub fn block_ratio(&self) -> f64 {
        if self.acquisitions == 0 {
            0.0
        } else {
            self.blocked as f64 / self.acquisitions as f64
        }
    }
}

impl ProbeStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fold one event into the counters
    #[inline]
    pub fn record(&self, event: ProbeEvent) {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        if event.did_block {
            self.blocked.fetch_add(1, Ordering::Relaxed);
        }
        self.last_spin_ns
            .store(event.spin_estimate.as_nanos() as u64, Ordering::Relaxed);
        self.last_block_ns
            .store(event.block_estimate.as_nanos() as u64, Ordering::Relaxed);
    }

    /// A probe that records into these counters
    pub fn probe(self: &Arc<Self>) -> Probe {
        let stats = Arc::clone(self);
        Probe::new(move |event| stats.record(event))
    }

    pub fn snapshot(&self) -> ProbeSnapshot {
        ProbeSnapshot {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            last_spin_estimate: Duration::from_nanos(self.last_spin_ns.load(Ordering::Relaxed)),
            last_block_estimate: Duration::from_nanos(self.last_block_ns.load(Ordering::Relaxed)),
        }
    }
}

/// Bounded event log fed by a probe
///
/// Pushing never blocks: once full, further events are counted and dropped
/// until `drain` makes room.
#[derive(Debug)]
pub struct ProbeTrace {
    events: ArrayQueue<ProbeEvent>,
    dropped: AtomicU64,
}

impl ProbeTrace {
    pub fn new() -> Arc<Self> {
        Self::with_capacity(DEFAULT_PROBE_TRACE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            events: ArrayQueue::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn record(&self, event: ProbeEvent) {
        if self.events.push(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A probe that appends into this log
    pub fn probe(self: &Arc<Self>) -> Probe {
        let trace = Arc::clone(self);
        Probe::new(move |event| trace.record(event))
    }

    /// Take every recorded event in arrival order
    pub fn drain(&self) -> Vec<ProbeEvent> {
        let mut out = Vec::with_capacity(self.events.len());
        while let Some(event) = self.events.pop() {
            out.push(event);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events lost because the log was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
