/*!
 * Queue Lifecycle
 *
 * State and counters shared between a serial queue, its worker and any
 * `QueueMonitor`. Idle/Draining is derived from the counters, so every
 * backend gets the same state machine without extra transitions:
 *
 * ```text
 * Idle --submit--> Draining --last task done--> Idle
 *   \                 |
 *    `----drop--------+--> ShuttingDown --drained--> Stopped
 * ```
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Observable state of a serial queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// No task pending or running
    Idle,
    /// At least one submitted task has not finished
    Draining,
    /// Queue dropped; remaining tasks are still being run
    ShuttingDown,
    /// Worker released; every submitted task ran
    Stopped,
}

/// Task counters of a serial queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks accepted by `submit`
    pub submitted: u64,
    /// Tasks that ran to completion or panicked
    pub completed: u64,
    /// Completed tasks that panicked
    pub failed: u64,
}

impl QueueStats {
    /// Tasks submitted but not yet finished
    #[inline]
    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.completed)
    }
}

const PHASE_RUNNING: u8 = 0;
const PHASE_SHUTTING_DOWN: u8 = 1;
const PHASE_STOPPED: u8 = 2;

/// Shared lifecycle record
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    phase: AtomicU8,
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Lifecycle {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[inline]
    pub(crate) fn record_submit(&self) {
        self.submitted.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn record_outcome(&self, panicked: bool) {
        if panicked {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn begin_shutdown(&self) {
        let _ = self.phase.compare_exchange(
            PHASE_RUNNING,
            PHASE_SHUTTING_DOWN,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub(crate) fn stop(&self) {
        self.phase.store(PHASE_STOPPED, Ordering::Release);
    }

    pub(crate) fn state(&self) -> QueueState {
        match self.phase.load(Ordering::Acquire) {
            PHASE_RUNNING => {
                // Completed first: it can only trail submitted
                let completed = self.completed.load(Ordering::Acquire);
                let submitted = self.submitted.load(Ordering::Acquire);
                if submitted > completed {
                    QueueState::Draining
                } else {
                    QueueState::Idle
                }
            }
            PHASE_SHUTTING_DOWN => QueueState::ShuttingDown,
            _ => QueueState::Stopped,
        }
    }

    pub(crate) fn stats(&self) -> QueueStats {
        let completed = self.completed.load(Ordering::Acquire);
        QueueStats {
            submitted: self.submitted.load(Ordering::Acquire),
            completed,
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Read-only view of a queue's lifecycle that outlives the queue
#[derive(Debug, Clone)]
pub struct QueueMonitor {
    lifecycle: Arc<Lifecycle>,
}

impl QueueMonitor {
    pub(crate) fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn state(&self) -> QueueState {
        self.lifecycle.state()
    }

    pub fn stats(&self) -> QueueStats {
        self.lifecycle.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_draining_derived_from_counters() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), QueueState::Idle);

        lc.record_submit();
        lc.record_submit();
        assert_eq!(lc.state(), QueueState::Draining);

        lc.record_outcome(false);
        assert_eq!(lc.state(), QueueState::Draining);

        lc.record_outcome(true);
        assert_eq!(lc.state(), QueueState::Idle);

        let stats = lc.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending(), 0);
    }

    #[test]
    fn test_shutdown_phases() {
        let lc = Lifecycle::new();
        lc.record_submit();
        lc.begin_shutdown();
        assert_eq!(lc.state(), QueueState::ShuttingDown);

        lc.stop();
        assert_eq!(lc.state(), QueueState::Stopped);

        // A late shutdown request never resurrects a stopped queue
        lc.begin_shutdown();
        assert_eq!(lc.state(), QueueState::Stopped);
    }

    #[test]
    fn test_monitor_shares_lifecycle() {
        let lc = Lifecycle::new();
        let monitor = QueueMonitor::new(lc.clone());
        lc.record_submit();
        assert_eq!(monitor.stats().pending(), 1);
        assert_eq!(monitor.state(), QueueState::Draining);
    }
}
