/*!
 * Work-Queue Backend
 *
 * Tasks go onto a lock-free `SegQueue`; an atomic pending count elects a
 * single drain job at a time. The submitter that moves the count from 0 to
 * 1 hands a drain job to the process-wide work pool (the blocking pool of a
 * lazily built tokio runtime). The drainer pops and runs tasks until its
 * own decrement brings the count back to 0.
 *
 * # Single Drainer
 *
 * A task is pushed before it is counted, so whenever the count is non-zero
 * and the drainer has finished everything it popped, at least one counted
 * task is already visible in the queue.
 */

use super::super::state::{Lifecycle, QueueState};
use super::super::task::Task;
use super::super::traits::SerialExecutor;
use crate::core::errors::{QueueError, QueueResult};
use crate::core::limits::{WORK_POOL_KEEP_ALIVE, WORK_POOL_MAX_THREADS, WORK_POOL_THREAD_NAME};
use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::hint;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, trace};

static WORK_POOL: OnceLock<Runtime> = OnceLock::new();
static WORK_POOL_INIT: Mutex<()> = Mutex::new(());

thread_local! {
    /// Address of the executor whose drain job this thread is running
    static DRAINING: Cell<usize> = const { Cell::new(0) };
}

/// Handle to the shared work pool, building it on first use
fn work_pool() -> QueueResult<Handle> {
    if let Some(runtime) = WORK_POOL.get() {
        return Ok(runtime.handle().clone());
    }

    let _init = WORK_POOL_INIT.lock();
    if let Some(runtime) = WORK_POOL.get() {
        return Ok(runtime.handle().clone());
    }

    // Nothing is ever spawned as an async task; only the blocking pool runs
    let runtime = Builder::new_current_thread()
        .thread_name(WORK_POOL_THREAD_NAME)
        .max_blocking_threads(WORK_POOL_MAX_THREADS)
        .thread_keep_alive(WORK_POOL_KEEP_ALIVE)
        .build()
        .map_err(|e| QueueError::resource_exhaustion("work_queue", e))?;

    debug!(
        max_threads = WORK_POOL_MAX_THREADS,
        "Serial queue work pool started"
    );
    Ok(WORK_POOL.get_or_init(|| runtime).handle().clone())
}

#[derive(Debug)]
struct Shared {
    tasks: SegQueue<Task>,
    pending: AtomicUsize,
    lifecycle: Arc<Lifecycle>,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

impl Shared {
    fn key(&self) -> usize {
        self as *const Shared as usize
    }
}

/// Serial executor multiplexed onto the shared work pool
#[derive(Debug)]
pub(crate) struct WorkQueueExecutor {
    shared: Arc<Shared>,
    pool: Handle,
}

impl WorkQueueExecutor {
    pub(crate) fn new() -> QueueResult<Self> {
        Ok(Self {
            shared: Arc::new(Shared {
                tasks: SegQueue::new(),
                pending: AtomicUsize::new(0),
                lifecycle: Lifecycle::new(),
                idle_lock: Mutex::new(()),
                idle: Condvar::new(),
            }),
            pool: work_pool()?,
        })
    }
}

fn drain(shared: &Shared) {
    trace!("Serial queue drain started");
    DRAINING.with(|current| current.set(shared.key()));

    loop {
        let Some(task) = shared.tasks.pop() else {
            // Only reachable while a counted push is still publishing
            hint::spin_loop();
            continue;
        };

        let panicked = task.run();
        shared.lifecycle.record_outcome(panicked);

        if shared.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            break;
        }
    }

    DRAINING.with(|current| current.set(0));
    trace!("Serial queue drain finished");

    if shared.lifecycle.state() == QueueState::ShuttingDown {
        shared.lifecycle.stop();
    }

    let _idle = shared.idle_lock.lock();
    shared.idle.notify_all();
}

impl SerialExecutor for WorkQueueExecutor {
    fn dispatch(&self, task: Task) {
        self.shared.lifecycle.record_submit();
        self.shared.tasks.push(task);

        if self.shared.pending.fetch_add(1, Ordering::AcqRel) == 0 {
            let shared = self.shared.clone();
            // Detached; completion is tracked through `pending`
            drop(self.pool.spawn_blocking(move || drain(&shared)));
        }
    }

    #[inline]
    fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.shared.lifecycle
    }

    fn is_current(&self) -> bool {
        DRAINING.with(|current| current.get() == self.shared.key())
    }

    fn name(&self) -> &'static str {
        "work_queue"
    }
}

impl Drop for WorkQueueExecutor {
    fn drop(&mut self) {
        self.shared.lifecycle.begin_shutdown();

        if self.is_current() {
            // Waiting would count the running task against itself
            debug!("Work-queue serial queue dropped from its own drain job");
            return;
        }

        let mut idle = self.shared.idle_lock.lock();
        while self.shared.pending.load(Ordering::Acquire) != 0 {
            self.shared.idle.wait(&mut idle);
        }
        drop(idle);

        self.shared.lifecycle.stop();
    }
}
