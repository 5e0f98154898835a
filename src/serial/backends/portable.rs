/*!
 * Portable Backend
 *
 * One dedicated worker thread per queue. Pending tasks sit in a
 * `parking_lot::Mutex<VecDeque>`; the condvar signals "non-empty or
 * shutting down". The worker pops one task under the lock, releases it,
 * then runs the task, so submitters never wait on a task body.
 */

use super::super::state::Lifecycle;
use super::super::task::Task;
use super::super::traits::SerialExecutor;
use crate::core::errors::{QueueError, QueueResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct Pending {
    tasks: VecDeque<Task>,
    closing: bool,
}

#[derive(Debug)]
struct Shared {
    pending: Mutex<Pending>,
    ready: Condvar,
    lifecycle: Arc<Lifecycle>,
}

/// Dedicated-thread serial executor
#[derive(Debug)]
pub(crate) struct PortableExecutor {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl PortableExecutor {
    /// Start the worker thread
    ///
    /// Fails with `InvalidName` if `thread_name` holds a NUL byte, which the
    /// OS cannot carry in a thread name.
    pub(crate) fn spawn(thread_name: &str) -> QueueResult<Self> {
        if thread_name.contains('\0') {
            return Err(QueueError::invalid_name(thread_name, "contains a NUL byte"));
        }

        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending::default()),
            ready: Condvar::new(),
            lifecycle: Lifecycle::new(),
        });

        let worker = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn({
                let shared = shared.clone();
                move || run_worker(&shared)
            })
            .map_err(|e| QueueError::resource_exhaustion("portable", e))?;

        let worker_id = worker.thread().id();
        debug!(thread = thread_name, "Serial queue worker started");

        Ok(Self {
            shared,
            worker: Some(worker),
            worker_id,
        })
    }
}

fn run_worker(shared: &Shared) {
    loop {
        let mut pending = shared.pending.lock();
        while pending.tasks.is_empty() && !pending.closing {
            trace!("Serial queue idle");
            shared.ready.wait(&mut pending);
        }

        let Some(task) = pending.tasks.pop_front() else {
            // Closing and fully drained
            break;
        };
        drop(pending);

        let panicked = task.run();
        shared.lifecycle.record_outcome(panicked);
    }

    shared.lifecycle.stop();
    debug!("Serial queue worker stopped");
}

impl SerialExecutor for PortableExecutor {
    fn dispatch(&self, task: Task) {
        self.shared.lifecycle.record_submit();
        self.shared.pending.lock().tasks.push_back(task);
        self.shared.ready.notify_one();
    }

    #[inline]
    fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.shared.lifecycle
    }

    #[inline]
    fn is_current(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    fn name(&self) -> &'static str {
        "portable"
    }
}

impl Drop for PortableExecutor {
    fn drop(&mut self) {
        self.shared.lifecycle.begin_shutdown();
        self.shared.pending.lock().closing = true;
        self.shared.ready.notify_one();

        let Some(worker) = self.worker.take() else {
            return;
        };

        if self.is_current() {
            // Joining ourselves would deadlock; the loop drains and exits alone
            debug!("Serial queue dropped from its own worker, detaching");
            return;
        }

        if worker.join().is_err() {
            warn!("Serial queue worker exited abnormally");
            self.shared.lifecycle.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::state::QueueState;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_runs_in_dispatch_order() {
        let exec = PortableExecutor::spawn("portable-test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let log = log.clone();
                let (task, handle) = Task::packaged(move || log.lock().push(i));
                exec.dispatch(task);
                handle
            })
            .collect();

        for handle in handles {
            handle.wait().unwrap();
        }

        assert_eq!(*log.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_worker_thread_is_named() {
        let exec = PortableExecutor::spawn("named-worker").unwrap();
        let (task, handle) = Task::packaged(|| thread::current().name().map(str::to_string));
        exec.dispatch(task);
        assert_eq!(handle.wait().unwrap().as_deref(), Some("named-worker"));
    }

    #[test]
    fn test_nul_in_thread_name_is_rejected() {
        let err = PortableExecutor::spawn("w\0").unwrap_err();
        assert!(matches!(err, QueueError::InvalidName { ref name, .. } if name == "w\0"));
    }

    #[test]
    fn test_drop_drains_pending_tasks() {
        let exec = PortableExecutor::spawn("portable-drain").unwrap();
        let lifecycle = exec.lifecycle().clone();
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let ran = ran.clone();
            let (task, _handle) = Task::packaged(move || {
                thread::sleep(Duration::from_millis(2));
                ran.fetch_add(1, Ordering::SeqCst);
            });
            exec.dispatch(task);
        }
        drop(exec);

        assert_eq!(ran.load(Ordering::SeqCst), 10);
        assert_eq!(lifecycle.state(), QueueState::Stopped);
        assert_eq!(lifecycle.stats().completed, 10);
    }

    #[test]
    fn test_drop_from_worker_detaches() {
        let exec = Arc::new(PortableExecutor::spawn("portable-self").unwrap());
        let lifecycle = exec.lifecycle().clone();

        // The last reference is released inside a task
        let (task, handle) = Task::packaged({
            let exec = exec.clone();
            move || drop(exec)
        });
        exec.dispatch(task);
        drop(exec);
        handle.wait().unwrap();

        for _ in 0..200 {
            if lifecycle.state() == QueueState::Stopped {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(lifecycle.state(), QueueState::Stopped);
    }
}
