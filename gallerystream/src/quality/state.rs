//! Per-asset tier state machine.
//!
//! Pure state, no I/O. The target tier for a distance `d` is, in order:
//!
//! 1. sticky and `d < high_downgrade` → High
//! 2. `d < thumb_upgrade` → Medium
//! 3. currently Medium and `d < medium_downgrade` → Medium
//! 4. otherwise → Thumbnail

use super::thresholds::QualityThresholds;
use super::tier::QualityTier;

/// Tier state of one displayed asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetQualityState {
    current_tier: QualityTier,
    sticky_high: bool,
    last_distance: f32,
}

impl Default for AssetQualityState {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetQualityState {
    /// New assets start at thumbnail, not selected, infinitely far away.
    pub fn new() -> Self {
        Self {
            current_tier: QualityTier::Thumbnail,
            sticky_high: false,
            last_distance: f32::INFINITY,
        }
    }

    pub fn current_tier(&self) -> QualityTier {
        self.current_tier
    }

    pub fn is_sticky_high(&self) -> bool {
        self.sticky_high
    }

    /// Distance passed to the most recent [`advance`](Self::advance) or
    /// [`observe`](Self::observe).
    pub fn last_distance(&self) -> f32 {
        self.last_distance
    }

    /// Tier this asset should be at for `distance`, without changing state.
    pub fn target_tier(&self, distance: f32, thresholds: &QualityThresholds) -> QualityTier {
        if self.sticky_high && distance < thresholds.high_downgrade {
            QualityTier::High
        } else if distance < thresholds.thumb_upgrade {
            QualityTier::Medium
        } else if self.current_tier == QualityTier::Medium && distance < thresholds.medium_downgrade
        {
            QualityTier::Medium
        } else {
            QualityTier::Thumbnail
        }
    }

    /// Moves to the target tier for `distance`.
    ///
    /// Returns the new tier if it changed.
    pub fn advance(&mut self, distance: f32, thresholds: &QualityThresholds) -> Option<QualityTier> {
        self.last_distance = distance;
        let target = self.target_tier(distance, thresholds);
        if target == self.current_tier {
            return None;
        }
        self.current_tier = target;
        Some(target)
    }

    /// Records `distance` without moving between tiers.
    pub fn observe(&mut self, distance: f32) {
        self.last_distance = distance;
    }

    /// Records an explicit user selection. Never cleared automatically.
    pub fn mark_selected(&mut self) {
        self.sticky_high = true;
    }
}
