/*!
 * Serial Executor Trait
 *
 * Capability shared by every serial queue backend
 */

use super::state::Lifecycle;
use super::task::Task;
use std::sync::Arc;

/// FIFO single-consumer executor behind a `SerialQueue`
///
/// Implementations run tasks one at a time, in `dispatch` order, and never
/// hold an internal lock while a task body runs. Dropping an executor runs
/// every task dispatched before the drop.
pub(crate) trait SerialExecutor: Send + Sync {
    /// Enqueue a task behind everything already dispatched
    ///
    /// # Performance
    ///
    /// Hot path: a short critical section or a lock-free push, never a wait
    /// on task execution.
    fn dispatch(&self, task: Task);

    /// Lifecycle record updated by the worker
    fn lifecycle(&self) -> &Arc<Lifecycle>;

    /// Whether the calling thread is currently running a task of this executor
    fn is_current(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
