/*!
 * Serial Wrapper
 *
 * Confines a value to a private serial queue instead of locking it. All
 * access goes through closures run on the queue, so no two closures ever
 * observe the value at the same time and each one sees every write made
 * by the closures before it.
 */

use super::config::QueueConfig;
use super::queue::SerialQueue;
use super::state::{QueueState, QueueStats};
use super::task::TaskHandle;
use crate::core::errors::QueueResult;
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::Arc;

/// Value only ever touched from inside its owning queue
struct Confined<T>(UnsafeCell<T>);

// Safety: every access happens inside a task of the owning queue, which
// runs at most one task at a time and orders tasks with release/acquire
// hand-offs; `into_inner` reads only after the queue has been drained.
unsafe impl<T: Send> Sync for Confined<T> {}

/// Value protected by serial execution rather than a lock
///
/// ```ignore
/// let cache = SerialWrapper::new(HashMap::new())?;
/// cache.apply(|map| map.insert("42", "value"));
/// let hit = cache.apply_sync(|map| map.get("42").copied())?;
/// ```
pub struct SerialWrapper<T: Send + 'static> {
    // Declared first so the queue drains before the value is released
    queue: SerialQueue,
    value: Arc<Confined<T>>,
}

impl<T: Send + 'static> SerialWrapper<T> {
    /// Wrap `value` behind a private queue
    pub fn new(value: T) -> QueueResult<Self> {
        Self::with_config(value, QueueConfig::default())
    }

    /// Wrap `value` behind a queue built from `config`
    pub fn with_config(value: T, config: QueueConfig) -> QueueResult<Self> {
        Ok(Self {
            queue: SerialQueue::with_config(config)?,
            value: Arc::new(Confined(UnsafeCell::new(value))),
        })
    }

    /// Build the value by running `init` on the wrapper's own queue
    ///
    /// Useful for values that must be created on the context that will use
    /// them. A panic in `init` is returned as `TaskPanicked`.
    pub fn construct<F>(init: F, config: QueueConfig) -> QueueResult<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let queue = SerialQueue::with_config(config)?;
        let value = queue.sync(init)?;
        Ok(Self {
            queue,
            value: Arc::new(Confined(UnsafeCell::new(value))),
        })
    }

    /// Run `f` against the value after every previously applied closure
    pub fn apply<F, R>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        let value = self.value.clone();
        self.queue.submit(move || {
            // Safety: this task is the only one running on the queue
            let value = unsafe { &mut *value.0.get() };
            f(value)
        })
    }

    /// `apply`, then wait for the result
    pub fn apply_sync<F, R>(&self, f: F) -> QueueResult<R>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.apply(f).wait()
    }

    pub fn state(&self) -> QueueState {
        self.queue.state()
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Drain the queue and take the value back
    ///
    /// Returns `None` when called from a task of the wrapper's own queue,
    /// since queued closures may still reference the value.
    pub fn into_inner(self) -> Option<T> {
        let SerialWrapper { queue, value } = self;
        drop(queue);
        Arc::try_unwrap(value)
            .ok()
            .map(|confined| confined.0.into_inner())
    }
}

impl<T: Send + 'static> fmt::Debug for SerialWrapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialWrapper")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
