//! Priority load queues.
//!
//! The streaming session runs two instances: a thumbnail queue with generous
//! concurrency and a full-quality queue that is throttled hard while the
//! camera moves. Both admit work by [`Priority`], FIFO among equals.

mod load_queue;
mod priority;

pub use load_queue::{
    LoadQueue, QueueConfig, QueueError, QueueStats, TaskHandle, DEFAULT_FULL_CONCURRENCY,
    DEFAULT_FULL_MOVING_CONCURRENCY, DEFAULT_FULL_TIMEOUT, DEFAULT_THUMBNAIL_CONCURRENCY,
    DEFAULT_THUMBNAIL_MOVING_CONCURRENCY, DEFAULT_THUMBNAIL_TIMEOUT, DEFAULT_WATCHDOG_INTERVAL,
};
pub use priority::{Pending, PendingQueue, Priority};
