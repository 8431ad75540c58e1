//! Camera movement detection.
//!
//! Tracks whether the camera is moving or settled from per-frame speed
//! measurements. The two states use separate thresholds:
//!
//! ```text
//! Settled → Moving:  speed > moving_speed
//! Moving  → Settled: speed < settle_speed   (settle_speed < moving_speed)
//! ```
//!
//! Speeds between the two thresholds keep the current state, so a camera
//! drifting around a single threshold does not flicker the signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::geometry::Position;

/// Default speed above which the camera counts as moving (scene units/s).
pub const DEFAULT_MOVING_SPEED: f32 = 2.0;

/// Default speed below which a moving camera counts as settled.
pub const DEFAULT_SETTLE_SPEED: f32 = 0.5;

/// Camera motion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    /// Camera at rest or drifting slowly.
    #[default]
    Settled,

    /// Camera panning or flying through the scene.
    Moving,
}

impl MotionState {
    pub fn is_moving(&self) -> bool {
        matches!(self, MotionState::Moving)
    }
}

impl std::fmt::Display for MotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionState::Settled => write!(f, "settled"),
            MotionState::Moving => write!(f, "moving"),
        }
    }
}

/// Movement thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementConfig {
    /// Speed above which a settled camera becomes moving.
    pub moving_speed: f32,
    /// Speed below which a moving camera becomes settled.
    pub settle_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            moving_speed: DEFAULT_MOVING_SPEED,
            settle_speed: DEFAULT_SETTLE_SPEED,
        }
    }
}

impl MovementConfig {
    /// True if the settle threshold sits strictly below the moving threshold.
    pub fn is_valid(&self) -> bool {
        self.settle_speed >= 0.0 && self.settle_speed < self.moving_speed
    }
}

/// Shared, lock-free view of the camera movement flag.
///
/// Written once per frame by the camera controller, read by anything that
/// wants to back off while the camera moves.
#[derive(Debug, Clone, Default)]
pub struct MovementSignal(Arc<AtomicBool>);

impl MovementSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while the camera is moving.
    pub fn is_moving(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn store(&self, moving: bool) {
        self.0.store(moving, Ordering::Release);
    }
}

/// Hysteresis state machine over measured camera speed.
#[derive(Debug)]
pub struct MovementDetector {
    config: MovementConfig,
    state: MotionState,
    last_position: Option<Position>,
    last_speed: f32,
}

impl MovementDetector {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            state: MotionState::Settled,
            last_position: None,
            last_speed: 0.0,
        }
    }

    /// Current motion state.
    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Most recent speed measurement.
    pub fn last_speed(&self) -> f32 {
        self.last_speed
    }

    /// Feeds one speed sample.
    ///
    /// Returns the new state if this sample caused a transition.
    pub fn update_speed(&mut self, speed: f32) -> Option<MotionState> {
        self.last_speed = speed;
        let next = match self.state {
            MotionState::Settled if speed > self.config.moving_speed => MotionState::Moving,
            MotionState::Moving if speed < self.config.settle_speed => MotionState::Settled,
            current => current,
        };

        if next == self.state {
            return None;
        }
        self.state = next;
        Some(next)
    }

    /// Feeds the camera position at the end of a frame lasting `dt`.
    ///
    /// The first call only records the position. Zero-length frames are
    /// ignored.
    pub fn update_position(&mut self, position: Position, dt: Duration) -> Option<MotionState> {
        let previous = self.last_position.replace(position)?;
        let seconds = dt.as_secs_f32();
        if seconds <= 0.0 {
            return None;
        }
        self.update_speed(previous.distance_to(position) / seconds)
    }
}

impl Default for MovementDetector {
    fn default() -> Self {
        Self::new(MovementConfig::default())
    }
}
