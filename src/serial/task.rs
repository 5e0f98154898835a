/*!
 * Tasks and Result Handles
 *
 * A `Task` is a single-invocation boxed closure. Packaging a closure
 * yields the task plus a `TaskHandle` connected by a one-slot flume
 * channel; the task catches its own panic so the worker that runs it
 * never unwinds.
 */

use crate::core::errors::{QueueError, QueueResult};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Unit of work executed by a serial queue worker
pub(crate) struct Task {
    job: Box<dyn FnOnce() -> bool + Send + 'static>,
}

impl Task {
    /// Wrap `f` into a task and the handle that receives its result
    pub(crate) fn packaged<F, T>(f: F) -> (Task, TaskHandle<T>)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = flume::bounded(1);

        let job = move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                warn!(panic = %message, "Serial queue task panicked");
                QueueError::TaskPanicked { message }
            });
            let panicked = outcome.is_err();
            // Nobody waiting is fine; the result is simply discarded
            let _ = tx.send(outcome);
            panicked
        };

        (Task { job: Box::new(job) }, TaskHandle { rx })
    }

    /// Run the task; returns `true` if its body panicked
    #[inline]
    pub(crate) fn run(self) -> bool {
        (self.job)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Pending result of a submitted task
///
/// Dropping the handle does not cancel the task; it still runs in order and
/// its result is discarded.
pub struct TaskHandle<T> {
    rx: flume::Receiver<QueueResult<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task has run
    pub fn wait(self) -> QueueResult<T> {
        self.rx.recv().unwrap_or(Err(QueueError::Abandoned))
    }

    /// Await the task without blocking a thread
    pub async fn wait_async(self) -> QueueResult<T> {
        self.rx
            .into_recv_async()
            .await
            .unwrap_or(Err(QueueError::Abandoned))
    }

    /// Whether `wait` would return immediately
    pub fn is_finished(&self) -> bool {
        !self.rx.is_empty() || self.rx.is_disconnected()
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_packaged_delivers_value() {
        let (task, handle) = Task::packaged(|| 6 * 7);
        assert!(!handle.is_finished());
        assert!(!task.run());
        assert!(handle.is_finished());
        assert_eq!(handle.wait(), Ok(42));
    }

    #[test]
    fn test_panic_is_captured() {
        let (task, handle) = Task::packaged(|| -> u32 { panic!("bad input") });
        assert!(task.run());
        assert_eq!(
            handle.wait(),
            Err(QueueError::TaskPanicked {
                message: "bad input".into()
            })
        );
    }

    #[test]
    fn test_formatted_panic_message() {
        let (task, handle) = Task::packaged(|| -> u8 { panic!("code {}", 7) });
        task.run();
        assert_eq!(
            handle.wait(),
            Err(QueueError::TaskPanicked {
                message: "code 7".into()
            })
        );
    }

    #[test]
    fn test_dropped_task_abandons_handle() {
        let (task, handle) = Task::packaged(|| "never");
        drop(task);
        assert!(handle.is_finished());
        assert_eq!(handle.wait(), Err(QueueError::Abandoned));
    }

    #[test]
    fn test_dropped_handle_still_runs() {
        let (task, handle) = Task::packaged(|| 1);
        drop(handle);
        assert!(!task.run());
    }

    #[tokio::test]
    async fn test_wait_async() {
        let (task, handle) = Task::packaged(|| String::from("done"));
        std::thread::spawn(move || task.run());
        assert_eq!(handle.wait_async().await, Ok("done".to_string()));
    }
}
