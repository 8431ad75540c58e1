//! Bounded-concurrency priority load queue.
//!
//! A `LoadQueue` admits submitted work in priority order while never letting
//! more than the effective concurrency limit run at once. Admission happens
//! in *service passes*:
//!
//! ```text
//! submit ──► pending (priority, FIFO) ──► service pass ──► spawned task
//!                  ▲                           │                │
//!                  │                           │  in_flight < limit
//!                  └────── request_service ◄───┴── slot released ┘
//! ```
//!
//! Passes are spawned on the runtime rather than called recursively from
//! completions. A pass that is already running absorbs new requests through
//! a reprocess flag and loops once more before exiting.
//!
//! The effective limit is the external override when one is set (the movement
//! throttle), otherwise the base limit. Lowering either only affects future
//! admissions; running work is never cancelled.
//!
//! A watchdog forces a pass if work is pending, nothing is in flight, and no
//! progress has been made for a full interval.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::priority::{Pending, PendingQueue, Priority};
use crate::cache::BoxFuture;

/// Default watchdog period.
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(1);

/// Default steady-state concurrency of the thumbnail queue.
pub const DEFAULT_THUMBNAIL_CONCURRENCY: usize = 8;
/// Thumbnail concurrency while the camera moves.
pub const DEFAULT_THUMBNAIL_MOVING_CONCURRENCY: usize = 6;
/// Per-task timeout of the thumbnail queue.
pub const DEFAULT_THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(15);

/// Default steady-state concurrency of the full-quality queue.
pub const DEFAULT_FULL_CONCURRENCY: usize = 4;
/// Full-quality concurrency while the camera moves.
pub const DEFAULT_FULL_MOVING_CONCURRENCY: usize = 1;
/// Per-task timeout of the full-quality queue.
pub const DEFAULT_FULL_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

/// Load queue settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Name used in logs and stats.
    pub name: String,

    /// Base concurrency limit.
    pub concurrency: usize,

    /// Limit applied by the movement throttle while the camera moves.
    ///
    /// `None` makes the queue insensitive to movement.
    pub moving_concurrency: Option<usize>,

    /// How often the watchdog checks for a stalled queue.
    pub watchdog_interval: Duration,

    /// Upper bound on a single task's run time. `None` disables it.
    pub task_timeout: Option<Duration>,
}

impl QueueConfig {
    /// Thumbnail queue defaults: 8 steady, 6 while moving.
    pub fn thumbnail() -> Self {
        Self {
            name: "thumbnail".to_string(),
            concurrency: DEFAULT_THUMBNAIL_CONCURRENCY,
            moving_concurrency: Some(DEFAULT_THUMBNAIL_MOVING_CONCURRENCY),
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            task_timeout: Some(DEFAULT_THUMBNAIL_TIMEOUT),
        }
    }

    /// Full-quality queue defaults: 4 steady, 1 while moving.
    pub fn full_quality() -> Self {
        Self {
            name: "full".to_string(),
            concurrency: DEFAULT_FULL_CONCURRENCY,
            moving_concurrency: Some(DEFAULT_FULL_MOVING_CONCURRENCY),
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            task_timeout: Some(DEFAULT_FULL_TIMEOUT),
        }
    }

    /// Sets the base concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the per-task timeout.
    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }
}

// =============================================================================
// Errors and handles
// =============================================================================

/// Reasons a queued task did not produce its output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The task exceeded the queue's per-task timeout.
    #[error("task timed out after {0:?}")]
    TimedOut(Duration),

    /// The task panicked or was dropped before completing.
    #[error("task aborted before completion")]
    Aborted,

    /// The queue was shut down before the task was submitted.
    #[error("queue is shut down")]
    Closed,
}

/// Future resolving to the output of a submitted task.
///
/// Each handle resolves independently: one task failing never affects
/// another task's handle.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, QueueError>>,
}

impl<T> TaskHandle<T> {
    fn rejected(error: QueueError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(error));
        Self { rx }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueueError::Aborted)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Snapshot of queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    /// Limit currently enforced (override or base).
    pub concurrency_limit: usize,
    pub base_concurrency_limit: usize,
    pub peak_in_flight: usize,
    pub completed: u64,
    pub timed_out: u64,
}

// =============================================================================
// Queue internals
// =============================================================================

enum JobOutcome {
    Completed,
    TimedOut,
}

type Job = BoxFuture<'static, JobOutcome>;

struct QueueState {
    pending: PendingQueue<Job>,
    in_flight: usize,
    base_limit: usize,
    override_limit: Option<usize>,
    /// A pass is executing right now.
    running: bool,
    /// A request arrived while a pass was running.
    reprocess: bool,
    /// A pass has been spawned but has not started.
    pass_scheduled: bool,
    closed: bool,
    last_progress: Instant,
    peak_in_flight: usize,
    completed: u64,
    timed_out: u64,
}

impl QueueState {
    fn limit(&self) -> usize {
        self.override_limit.unwrap_or(self.base_limit)
    }
}

struct QueueInner {
    name: String,
    state: Mutex<QueueState>,
    runtime: Handle,
    shutdown: CancellationToken,
    task_timeout: Option<Duration>,
    watchdog_interval: Duration,
}

impl QueueInner {
    fn request_service(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            if state.running {
                state.reprocess = true;
                return;
            }
            if state.pass_scheduled {
                return;
            }
            state.pass_scheduled = true;
        }

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            inner.service_pass();
        });
    }

    fn service_pass(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.pass_scheduled = false;
            if state.running {
                state.reprocess = true;
                return;
            }
            state.running = true;
        }

        loop {
            let mut admitted = Vec::new();
            {
                let mut state = self.state.lock();
                state.reprocess = false;
                while !state.closed && state.in_flight < state.limit() {
                    let Some(next) = state.pending.pop() else {
                        break;
                    };
                    state.in_flight += 1;
                    state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
                    admitted.push(next);
                }
                if !admitted.is_empty() {
                    state.last_progress = Instant::now();
                }
            }

            for pending in admitted {
                self.spawn_task(pending);
            }

            let mut state = self.state.lock();
            if !state.reprocess {
                state.running = false;
                break;
            }
        }
    }

    fn spawn_task(self: &Arc<Self>, pending: Pending<Job>) {
        trace!(
            queue = %self.name,
            priority = %pending.priority,
            waited_ms = pending.wait_time().as_millis() as u64,
            "Admitting load task"
        );

        let slot = SlotGuard {
            inner: Arc::clone(self),
            outcome: None,
        };
        let job = pending.payload;
        self.runtime.spawn(async move {
            let mut slot = slot;
            slot.outcome = Some(job.await);
        });
    }

    fn release_slot(self: &Arc<Self>, outcome: Option<JobOutcome>) {
        let aborted = outcome.is_none();
        {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.last_progress = Instant::now();
            match outcome {
                Some(JobOutcome::Completed) => state.completed += 1,
                Some(JobOutcome::TimedOut) => {
                    state.completed += 1;
                    state.timed_out += 1;
                }
                None => {}
            }
        }
        if aborted {
            warn!(queue = %self.name, "Load task aborted");
        }
        self.request_service();
    }

    /// True if work is waiting but nothing moved for a full interval.
    fn is_stalled(&self) -> bool {
        let state = self.state.lock();
        !state.closed
            && !state.pending.is_empty()
            && state.in_flight == 0
            && state.last_progress.elapsed() >= self.watchdog_interval
    }

    fn force_pass(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.pass_scheduled = false;
            state.last_progress = Instant::now();
        }
        self.service_pass();
    }
}

/// Releases a concurrency slot when the task finishes, panics or is dropped.
struct SlotGuard {
    inner: Arc<QueueInner>,
    outcome: Option<JobOutcome>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.inner.release_slot(self.outcome.take());
    }
}

fn spawn_watchdog(inner: &Arc<QueueInner>) {
    let weak: Weak<QueueInner> = Arc::downgrade(inner);
    let token = inner.shutdown.clone();
    let period = inner.watchdog_interval;

    inner.runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(inner) = weak.upgrade() else {
                break;
            };
            if inner.is_stalled() {
                let pending = inner.state.lock().pending.len();
                warn!(queue = %inner.name, pending, "Load queue stalled, forcing service pass");
                inner.force_pass();
            }
        }
        trace!("Load queue watchdog stopped");
    });
}

// =============================================================================
// Public queue
// =============================================================================

/// Priority queue with bounded concurrency.
///
/// Cloning is cheap; clones share the same queue.
#[derive(Clone)]
pub struct LoadQueue {
    inner: Arc<QueueInner>,
    moving_concurrency: Option<usize>,
}

impl LoadQueue {
    /// Starts a queue on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(config: QueueConfig) -> Self {
        Self::start_on(config, Handle::current())
    }

    /// Starts a queue whose tasks and passes run on `runtime`.
    pub fn start_on(config: QueueConfig, runtime: Handle) -> Self {
        let context = runtime.clone();
        let _guard = context.enter();
        let base_limit = config.concurrency.max(1);
        let inner = Arc::new(QueueInner {
            name: config.name,
            state: Mutex::new(QueueState {
                pending: PendingQueue::new(),
                in_flight: 0,
                base_limit,
                override_limit: None,
                running: false,
                reprocess: false,
                pass_scheduled: false,
                closed: false,
                last_progress: Instant::now(),
                peak_in_flight: 0,
                completed: 0,
                timed_out: 0,
            }),
            runtime,
            shutdown: CancellationToken::new(),
            task_timeout: config.task_timeout,
            watchdog_interval: config.watchdog_interval,
        });

        spawn_watchdog(&inner);

        debug!(
            queue = %inner.name,
            concurrency = base_limit,
            moving = ?config.moving_concurrency,
            "Load queue started"
        );

        Self {
            inner,
            moving_concurrency: config.moving_concurrency,
        }
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Limit the movement throttle applies, if the queue is movement-sensitive.
    pub fn moving_concurrency(&self) -> Option<usize> {
        self.moving_concurrency
    }

    /// Submits work and returns a handle to its output.
    ///
    /// Work is not polled until it is admitted.
    pub fn submit<T, F>(&self, work: F, priority: Priority) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let Some(handle) = self.enqueue(work, priority) else {
            return TaskHandle::rejected(QueueError::Closed);
        };
        self.inner.request_service();
        handle
    }

    fn enqueue<T, F>(&self, work: F, priority: Priority) -> Option<TaskHandle<T>>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let timeout = self.inner.task_timeout;
        let name = self.inner.name.clone();

        let job: Job = Box::pin(async move {
            let (result, outcome) = match timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(output) => (Ok(output), JobOutcome::Completed),
                    Err(_) => {
                        warn!(queue = %name, timeout_ms = limit.as_millis() as u64, "Load task timed out");
                        (Err(QueueError::TimedOut(limit)), JobOutcome::TimedOut)
                    }
                },
                None => (Ok(work.await), JobOutcome::Completed),
            };
            // Receiver may have been dropped; the work still counts as done
            let _ = tx.send(result);
            outcome
        });

        let mut state = self.inner.state.lock();
        if state.closed {
            return None;
        }
        state.pending.push(priority, job);
        Some(TaskHandle { rx })
    }

    /// Sets the base concurrency limit (minimum 1).
    ///
    /// An active external override keeps precedence until cleared.
    pub fn set_concurrency_limit(&self, limit: usize) {
        let limit = limit.max(1);
        {
            let mut state = self.inner.state.lock();
            state.base_limit = limit;
        }
        debug!(queue = %self.inner.name, limit, "Base concurrency changed");
        self.inner.request_service();
    }

    /// Sets or clears a transient limit that overrides the base.
    pub fn set_external_override(&self, limit: Option<usize>) {
        let limit = limit.map(|l| l.max(1));
        {
            let mut state = self.inner.state.lock();
            if state.override_limit == limit {
                return;
            }
            state.override_limit = limit;
        }
        debug!(queue = %self.inner.name, limit = ?limit, "Concurrency override changed");
        self.inner.request_service();
    }

    /// Limit currently enforced.
    pub fn concurrency_limit(&self) -> usize {
        self.inner.state.lock().limit()
    }

    /// Limit in force when no override is set.
    pub fn base_concurrency_limit(&self) -> usize {
        self.inner.state.lock().base_limit
    }

    /// Returns a snapshot of the queue state.
    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock();
        QueueStats {
            pending: state.pending.len(),
            in_flight: state.in_flight,
            concurrency_limit: state.limit(),
            base_concurrency_limit: state.base_limit,
            peak_in_flight: state.peak_in_flight,
            completed: state.completed,
            timed_out: state.timed_out,
        }
    }

    /// Stops the watchdog, rejects new submissions and drops pending work.
    ///
    /// Running tasks are left to finish. Handles of dropped tasks resolve
    /// with [`QueueError::Aborted`].
    pub fn shutdown(&self) {
        let dropped = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.pending.drain()
        };
        self.inner.shutdown.cancel();
        info!(queue = %self.inner.name, dropped = dropped.len(), "Load queue shut down");
    }

    /// Pushes work without requesting a pass, leaving it for the watchdog.
    #[cfg(test)]
    fn enqueue_silently<T, F>(&self, work: F, priority: Priority) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        self.enqueue(work, priority)
            .unwrap_or_else(|| TaskHandle::rejected(QueueError::Closed))
    }
}

impl std::fmt::Debug for LoadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadQueue")
            .field("name", &self.inner.name)
            .field("stats", &self.stats())
            .finish()
    }
}
