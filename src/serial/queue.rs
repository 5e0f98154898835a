/*!
 * Serial Queue
 *
 * Runs submitted closures one at a time, in submission order, on a
 * backend-provided execution context. Submitting never waits for task
 * execution; waiting happens only through the returned `TaskHandle`.
 *
 * Dropping a queue runs every task submitted before the drop.
 */

use super::backends::ExecutorImpl;
use super::config::{BackendType, QueueConfig};
use super::state::{QueueMonitor, QueueState, QueueStats};
use super::task::{Task, TaskHandle};
use super::traits::SerialExecutor;
use crate::core::errors::QueueResult;
use std::fmt;

/// FIFO single-consumer task executor
pub struct SerialQueue {
    executor: ExecutorImpl,
    backend: BackendType,
}

impl SerialQueue {
    /// Queue with a private worker
    pub fn new() -> QueueResult<Self> {
        Self::with_config(QueueConfig::default())
    }

    /// Queue sharing its worker with every queue named `name`
    pub fn named(name: impl Into<String>) -> QueueResult<Self> {
        Self::with_config(QueueConfig::named(name))
    }

    /// Queue using the backend `config` resolves to
    ///
    /// Fails with `ResourceExhaustion` when the worker thread or work pool
    /// cannot be started.
    pub fn with_config(config: QueueConfig) -> QueueResult<Self> {
        let (executor, backend) = ExecutorImpl::from_config(&config)?;
        Ok(Self { executor, backend })
    }

    /// Enqueue `f` behind every task already submitted
    ///
    /// # Performance
    ///
    /// Hot path: boxes the closure, allocates a one-slot result channel and
    /// enqueues. Never waits on a running task.
    pub fn submit<F, T>(&self, f: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (task, handle) = Task::packaged(f);
        self.executor.dispatch(task);
        handle
    }

    /// Submit `f` and block until it has run
    ///
    /// Must not be called from a task of the same queue: the caller would
    /// wait on a task queued behind itself.
    pub fn sync<F, T>(&self, f: F) -> QueueResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit(f).wait()
    }

    pub fn state(&self) -> QueueState {
        self.executor.lifecycle().state()
    }

    pub fn stats(&self) -> QueueStats {
        self.executor.lifecycle().stats()
    }

    /// Backend this queue resolved to
    pub fn backend(&self) -> BackendType {
        self.backend
    }

    /// Lifecycle view that stays valid after the queue is dropped
    pub fn monitor(&self) -> QueueMonitor {
        QueueMonitor::new(self.executor.lifecycle().clone())
    }

    /// Whether the calling thread is running one of this queue's tasks
    pub fn is_current(&self) -> bool {
        self.executor.is_current()
    }

    /// Drain every submitted task, then release the worker
    pub fn shutdown(self) -> QueueStats {
        let monitor = self.monitor();
        drop(self);
        monitor.stats()
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("backend", &self.backend)
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::QueueError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    fn backends() -> Vec<QueueConfig> {
        vec![
            QueueConfig::default().with_backend(BackendType::Portable),
            QueueConfig::default().with_backend(BackendType::WorkQueue),
            QueueConfig::named("queue-unit-tests"),
        ]
    }

    #[test]
    fn test_backend_resolution() {
        assert_eq!(SerialQueue::new().unwrap().backend(), BackendType::Portable);
        assert_eq!(
            SerialQueue::named("queue-resolution").unwrap().backend(),
            BackendType::Named
        );
        let q = SerialQueue::with_config(
            QueueConfig::default().with_backend(BackendType::WorkQueue),
        )
        .unwrap();
        assert_eq!(q.backend(), BackendType::WorkQueue);
    }

    #[test]
    fn test_nul_names_fail_without_panicking() {
        let err = SerialQueue::named("db\0cache").unwrap_err();
        assert!(matches!(err, QueueError::InvalidName { .. }));

        let config = QueueConfig::default().with_thread_name("w\0");
        let err = SerialQueue::with_config(config).unwrap_err();
        assert!(matches!(err, QueueError::InvalidName { .. }));

        // The failed attempt left nothing behind
        assert!(SerialQueue::named("db").unwrap().sync(|| true).unwrap());
    }

    #[test]
    fn test_submit_and_wait() {
        for config in backends() {
            let q = SerialQueue::with_config(config).unwrap();
            let handle = q.submit(|| 40 + 2);
            assert_eq!(handle.wait(), Ok(42));
            assert_eq!(q.sync(|| "hi"), Ok("hi"));
        }
    }

    #[test]
    fn test_panic_does_not_stop_queue() {
        for config in backends() {
            let q = SerialQueue::with_config(config).unwrap();
            let before = q.stats();

            let failed = q.submit(|| -> u32 { panic!("task failed") });
            let after = q.submit(|| 7u32);

            assert!(failed.wait().unwrap_err().is_task_failure());
            assert_eq!(after.wait(), Ok(7));

            let stats = q.stats();
            assert_eq!(stats.failed - before.failed, 1);
        }
    }

    #[test]
    fn test_state_transitions() {
        let q = SerialQueue::new().unwrap();
        let monitor = q.monitor();
        assert_eq!(q.state(), QueueState::Idle);

        let (release_tx, release_rx) = mpsc::channel::<()>();
        let blocker = q.submit(move || release_rx.recv().is_ok());
        assert_eq!(q.state(), QueueState::Draining);

        release_tx.send(()).unwrap();
        assert_eq!(blocker.wait(), Ok(true));

        // The worker records completion right after delivering the result
        for _ in 0..200 {
            if q.state() == QueueState::Idle {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(q.state(), QueueState::Idle);

        let stats = q.shutdown();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(monitor.state(), QueueState::Stopped);
    }

    #[test]
    fn test_shutdown_drains_everything() {
        for config in backends() {
            let q = SerialQueue::with_config(config).unwrap();
            let before = q.stats();
            let ran = Arc::new(AtomicUsize::new(0));

            for _ in 0..50 {
                let ran = ran.clone();
                drop(q.submit(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                }));
            }

            let stats = q.shutdown();
            assert_eq!(ran.load(Ordering::SeqCst), 50);
            assert!(stats.completed - before.completed >= 50);
        }
    }

    #[test]
    fn test_submit_never_waits_on_running_task() {
        for config in backends() {
            let q = SerialQueue::with_config(config).unwrap();
            let release = Arc::new(AtomicBool::new(false));

            let blocker = q.submit({
                let release = release.clone();
                move || {
                    while !release.load(Ordering::SeqCst) {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
            });

            // Would hang here if submit waited on the blocker
            let queued: Vec<_> = (0..10).map(|i| q.submit(move || i)).collect();
            assert!(!queued[0].is_finished());

            release.store(true, Ordering::SeqCst);
            blocker.wait().unwrap();
            let values: Vec<_> = queued.into_iter().map(|h| h.wait().unwrap()).collect();
            assert_eq!(values, (0..10).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_is_current() {
        for config in backends() {
            let q = Arc::new(SerialQueue::with_config(config).unwrap());
            assert!(!q.is_current());
            let inner = q.clone();
            assert_eq!(q.sync(move || inner.is_current()), Ok(true));
        }
    }

    #[test]
    fn test_drop_inside_own_task() {
        for config in backends() {
            let q = Arc::new(SerialQueue::with_config(config).unwrap());
            let inner = q.clone();

            let handle = q.submit(move || {
                thread::sleep(Duration::from_millis(10));
                drop(inner);
            });
            drop(q);

            assert_eq!(handle.wait(), Ok(()));
        }
    }

    #[test]
    fn test_result_survives_queue_drop() {
        let q = SerialQueue::new().unwrap();
        let handle = q.submit(|| 5);
        drop(q);
        assert!(handle.is_finished());
        assert_eq!(handle.wait(), Ok(5));
    }
}
