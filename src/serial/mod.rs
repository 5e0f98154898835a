/*!
 * Serial Execution
 *
 * Serial queues run submitted closures one at a time in FIFO order on a
 * worker owned by the queue. A `SerialWrapper` confines a value to such a
 * queue so it can be shared without a lock.
 *
 * # Backends
 *
 * - `Portable`: dedicated worker thread per queue
 * - `WorkQueue`: drain jobs multiplexed onto a shared blocking pool
 * - `Named`: one worker per name, shared by every queue with that name
 */

mod backends;
mod config;
mod queue;
mod state;
mod task;
mod traits;
mod wrapper;

pub use config::{BackendType, ParseBackendError, QueueConfig};
pub use queue::SerialQueue;
pub use state::{QueueMonitor, QueueState, QueueStats};
pub use task::TaskHandle;
pub use wrapper::SerialWrapper;
