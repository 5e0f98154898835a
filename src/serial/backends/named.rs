/*!
 * Named Backend
 *
 * Queues created with the same name share one FIFO worker. A process-wide
 * registry maps names to weak references of the shared worker; the worker
 * lives as long as some handle does.
 *
 * Dropping a handle waits on a barrier task, so everything that handle
 * submitted has run before the drop returns. The barrier is counted in
 * the shared statistics like any other task.
 */

use super::super::state::Lifecycle;
use super::super::task::Task;
use super::super::traits::SerialExecutor;
use super::portable::PortableExecutor;
use crate::core::errors::QueueResult;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, LazyLock, Weak};
use tracing::debug;

type Registry = DashMap<String, Weak<PortableExecutor>, RandomState>;

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| DashMap::with_hasher(RandomState::new()));

/// Handle onto a shared, named worker
#[derive(Debug)]
pub(crate) struct NamedExecutor {
    name: String,
    lifecycle: Arc<Lifecycle>,
    worker: Option<Arc<PortableExecutor>>,
}

impl NamedExecutor {
    /// Join the worker registered under `name`, starting it if needed
    pub(crate) fn attach(name: &str) -> QueueResult<Self> {
        let worker = match REGISTRY.entry(name.to_string()) {
            Entry::Occupied(mut entry) => match entry.get().upgrade() {
                Some(worker) => {
                    debug!(queue = name, "Joined named serial queue");
                    worker
                }
                None => {
                    let worker = Arc::new(PortableExecutor::spawn(name)?);
                    entry.insert(Arc::downgrade(&worker));
                    debug!(queue = name, "Restarted named serial queue");
                    worker
                }
            },
            Entry::Vacant(entry) => {
                let worker = Arc::new(PortableExecutor::spawn(name)?);
                entry.insert(Arc::downgrade(&worker));
                debug!(queue = name, "Registered named serial queue");
                worker
            }
        };

        Ok(Self {
            name: name.to_string(),
            lifecycle: worker.lifecycle().clone(),
            worker: Some(worker),
        })
    }

    /// Number of live handles sharing this worker
    #[cfg(test)]
    pub(crate) fn handle_count(&self) -> usize {
        self.worker.as_ref().map_or(0, Arc::strong_count)
    }
}

/// Whether a live worker is registered under `name`
#[cfg(test)]
pub(crate) fn is_registered(name: &str) -> bool {
    REGISTRY
        .get(name)
        .is_some_and(|worker| worker.strong_count() > 0)
}

impl SerialExecutor for NamedExecutor {
    fn dispatch(&self, task: Task) {
        if let Some(worker) = &self.worker {
            worker.dispatch(task);
        }
    }

    #[inline]
    fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    fn is_current(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| worker.is_current())
    }

    fn name(&self) -> &'static str {
        "named"
    }
}

impl Drop for NamedExecutor {
    fn drop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        if !worker.is_current() {
            let (barrier, done) = Task::packaged(|| ());
            worker.dispatch(barrier);
            let _ = done.wait();
        }

        // Releasing the last reference stops and joins the worker
        drop(worker);
        if REGISTRY
            .remove_if(&self.name, |_, worker| worker.strong_count() == 0)
            .is_some()
        {
            debug!(queue = %self.name, "Unregistered named serial queue");
        }
    }
}
