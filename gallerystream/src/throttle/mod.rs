//! Movement-driven concurrency throttling.
//!
//! While the camera moves, heavy fetches compete with frame rendering. The
//! [`MovementThrottle`] watches camera speed through a [`MovementDetector`]
//! and, on each transition, applies or clears an external concurrency
//! override on every bound queue.
//!
//! Queues are bound through the [`ConcurrencyControl`] trait so the throttle
//! does not depend on the concrete queue type.
//!
//! # Example
//!
//! ```ignore
//! use gallerystream::throttle::MovementThrottle;
//!
//! let throttle = MovementThrottle::new(Default::default())
//!     .bind(Arc::new(full_queue.clone()), Some(1))
//!     .bind(Arc::new(thumbnail_queue.clone()), Some(6));
//!
//! // once per rendered frame
//! throttle.on_frame_speed(camera_speed);
//! ```

mod movement;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::geometry::Position;
use crate::queue::LoadQueue;

pub use movement::{
    MotionState, MovementConfig, MovementDetector, MovementSignal, DEFAULT_MOVING_SPEED,
    DEFAULT_SETTLE_SPEED,
};

/// A concurrency limit that can be overridden from outside.
pub trait ConcurrencyControl: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Sets or clears the transient override.
    fn set_external_override(&self, limit: Option<usize>);

    /// Limit currently enforced.
    fn concurrency_limit(&self) -> usize;
}

impl ConcurrencyControl for LoadQueue {
    fn name(&self) -> &str {
        LoadQueue::name(self)
    }

    fn set_external_override(&self, limit: Option<usize>) {
        LoadQueue::set_external_override(self, limit)
    }

    fn concurrency_limit(&self) -> usize {
        LoadQueue::concurrency_limit(self)
    }
}

struct Binding {
    target: Arc<dyn ConcurrencyControl>,
    moving_limit: Option<usize>,
}

/// Applies per-queue moving limits while the camera moves.
pub struct MovementThrottle {
    detector: Mutex<MovementDetector>,
    signal: MovementSignal,
    bindings: Vec<Binding>,
}

impl MovementThrottle {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            detector: Mutex::new(MovementDetector::new(config)),
            signal: MovementSignal::new(),
            bindings: Vec::new(),
        }
    }

    /// Binds a queue. `None` leaves it insensitive to movement.
    pub fn bind(mut self, target: Arc<dyn ConcurrencyControl>, moving_limit: Option<usize>) -> Self {
        self.bindings.push(Binding {
            target,
            moving_limit,
        });
        self
    }

    /// Shared movement flag.
    pub fn signal(&self) -> MovementSignal {
        self.signal.clone()
    }

    /// Current motion state.
    pub fn state(&self) -> MotionState {
        self.detector.lock().state()
    }

    /// Feeds a per-frame speed measurement.
    ///
    /// Returns the new state on a transition.
    pub fn on_frame_speed(&self, speed: f32) -> Option<MotionState> {
        // Held through apply so concurrent transitions land in order
        let mut detector = self.detector.lock();
        let transition = detector.update_speed(speed);
        if let Some(state) = transition {
            self.apply(state, speed);
        }
        transition
    }

    /// Feeds the camera position at the end of a frame lasting `dt`.
    pub fn on_camera_moved(
        &self,
        position: Position,
        dt: std::time::Duration,
    ) -> Option<MotionState> {
        let mut detector = self.detector.lock();
        let transition = detector.update_position(position, dt);
        if let Some(state) = transition {
            self.apply(state, detector.last_speed());
        }
        transition
    }

    fn apply(&self, state: MotionState, speed: f32) {
        self.signal.store(state.is_moving());

        for binding in &self.bindings {
            let Some(moving_limit) = binding.moving_limit else {
                continue;
            };
            let limit = state.is_moving().then_some(moving_limit);
            binding.target.set_external_override(limit);
        }

        info!(
            state = %state,
            speed = format!("{:.2}", speed),
            queues = self.bindings.len(),
            "Camera movement changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records overrides without running anything.
    struct FakeControl {
        base: usize,
        current: AtomicUsize,
    }

    impl FakeControl {
        fn new(base: usize) -> Arc<Self> {
            Arc::new(Self {
                base,
                current: AtomicUsize::new(base),
            })
        }
    }

    impl ConcurrencyControl for FakeControl {
        fn name(&self) -> &str {
            "fake"
        }

        fn set_external_override(&self, limit: Option<usize>) {
            self.current
                .store(limit.unwrap_or(self.base), Ordering::SeqCst);
        }

        fn concurrency_limit(&self) -> usize {
            self.current.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_moving_applies_override() {
        let full = FakeControl::new(4);
        let throttle = MovementThrottle::new(MovementConfig::default()).bind(full.clone(), Some(1));

        assert_eq!(throttle.on_frame_speed(5.0), Some(MotionState::Moving));
        assert_eq!(full.concurrency_limit(), 1);
        assert!(throttle.signal().is_moving());

        assert_eq!(throttle.on_frame_speed(0.1), Some(MotionState::Settled));
        assert_eq!(full.concurrency_limit(), 4);
        assert!(!throttle.signal().is_moving());
    }

    #[test]
    fn test_insensitive_queue_untouched() {
        let thumbs = FakeControl::new(8);
        let throttle = MovementThrottle::new(MovementConfig::default()).bind(thumbs.clone(), None);

        throttle.on_frame_speed(5.0);
        assert_eq!(thumbs.concurrency_limit(), 8);
    }

    #[test]
    fn test_no_transition_no_change() {
        let full = FakeControl::new(4);
        let throttle = MovementThrottle::new(MovementConfig::default()).bind(full.clone(), Some(1));

        assert_eq!(throttle.on_frame_speed(1.0), None);
        assert_eq!(full.concurrency_limit(), 4);
        assert_eq!(throttle.state(), MotionState::Settled);
    }

    #[test]
    fn test_concurrent_transitions_leave_limit_consistent() {
        let full = FakeControl::new(4);
        let throttle = Arc::new(
            MovementThrottle::new(MovementConfig::default()).bind(full.clone(), Some(1)),
        );

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let throttle = Arc::clone(&throttle);
                std::thread::spawn(move || {
                    for i in 0..2_000 {
                        let speed = if (i + worker) % 2 == 0 { 5.0 } else { 0.1 };
                        throttle.on_frame_speed(speed);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let expected = if throttle.state().is_moving() { 1 } else { 4 };
        assert_eq!(full.concurrency_limit(), expected);
        assert_eq!(throttle.signal().is_moving(), throttle.state().is_moving());
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttles_real_queue() {
        use crate::queue::QueueConfig;

        let queue = LoadQueue::start(QueueConfig::full_quality());
        let throttle = MovementThrottle::new(MovementConfig::default())
            .bind(Arc::new(queue.clone()), queue.moving_concurrency());

        throttle.on_frame_speed(10.0);
        assert_eq!(queue.concurrency_limit(), 1);
        assert_eq!(queue.base_concurrency_limit(), 4);

        throttle.on_frame_speed(0.0);
        tokio::task::yield_now().await;
        assert_eq!(queue.stats().concurrency_limit, 4);
    }
}
