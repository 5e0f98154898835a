/*!
 * Serial Queue Backends
 *
 * Three interchangeable executors behind `SerialExecutor`, dispatched
 * through `ExecutorImpl` so the queue pays no virtual call per submit.
 */

mod named;
mod portable;
mod work_queue;

use super::config::{BackendType, QueueConfig};
use super::state::Lifecycle;
use super::task::Task;
use super::traits::SerialExecutor;
use crate::core::errors::QueueResult;
use std::sync::Arc;
use tracing::debug;

use named::NamedExecutor;
use portable::PortableExecutor;
use work_queue::WorkQueueExecutor;

/// Concrete executor chosen at construction
#[derive(Debug)]
pub(crate) enum ExecutorImpl {
    Portable(PortableExecutor),
    WorkQueue(WorkQueueExecutor),
    Named(NamedExecutor),
}

impl ExecutorImpl {
    /// Build the executor `config` resolves to, returning the backend used
    pub(crate) fn from_config(config: &QueueConfig) -> QueueResult<(Self, BackendType)> {
        let backend = config.select_backend();
        let executor = match (backend, config.name.as_deref()) {
            (BackendType::WorkQueue, _) => ExecutorImpl::WorkQueue(WorkQueueExecutor::new()?),
            (BackendType::Named, Some(name)) => ExecutorImpl::Named(NamedExecutor::attach(name)?),
            _ => ExecutorImpl::Portable(PortableExecutor::spawn(&config.thread_name)?),
        };

        debug!(backend = executor.name(), "Serial queue created");
        Ok((executor, backend))
    }
}

impl SerialExecutor for ExecutorImpl {
    #[inline]
    fn dispatch(&self, task: Task) {
        match self {
            ExecutorImpl::Portable(e) => e.dispatch(task),
            ExecutorImpl::WorkQueue(e) => e.dispatch(task),
            ExecutorImpl::Named(e) => e.dispatch(task),
        }
    }

    #[inline]
    fn lifecycle(&self) -> &Arc<Lifecycle> {
        match self {
            ExecutorImpl::Portable(e) => e.lifecycle(),
            ExecutorImpl::WorkQueue(e) => e.lifecycle(),
            ExecutorImpl::Named(e) => e.lifecycle(),
        }
    }

    #[inline]
    fn is_current(&self) -> bool {
        match self {
            ExecutorImpl::Portable(e) => e.is_current(),
            ExecutorImpl::WorkQueue(e) => e.is_current(),
            ExecutorImpl::Named(e) => e.is_current(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ExecutorImpl::Portable(e) => e.name(),
            ExecutorImpl::WorkQueue(e) => e.name(),
            ExecutorImpl::Named(e) => e.name(),
        }
    }
}
