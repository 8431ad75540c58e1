//! Distance thresholds for tier selection.
//!
//! Each tier has an "up" threshold (distance below which it becomes
//! eligible) and a farther "down" threshold (distance above which it is
//! left). The gap between the two is the hysteresis band.
//!
//! ```text
//!   0 ──── high_eligible ──── thumb_upgrade ──── medium_downgrade ── high_downgrade ──►  d
//!          (15)               (50)               (65)                (80)
//! ```

use crate::config::ConfigError;

/// Default distance below which medium becomes the target.
pub const DEFAULT_THUMB_UPGRADE: f32 = 50.0;
/// Default distance below which high may be requested.
pub const DEFAULT_HIGH_ELIGIBLE: f32 = 15.0;
/// Default distance above which a medium asset falls back to thumbnail.
pub const DEFAULT_MEDIUM_DOWNGRADE: f32 = 65.0;
/// Default distance above which a sticky-high asset leaves high.
pub const DEFAULT_HIGH_DOWNGRADE: f32 = 80.0;
/// Default number of frames between evaluations.
pub const DEFAULT_CHECK_INTERVAL_FRAMES: u32 = 90;

/// Tier selection thresholds, in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    /// Below this distance medium is the target.
    pub thumb_upgrade: f32,

    /// Below this distance high is eligible on explicit request.
    ///
    /// Informational: high is never entered automatically.
    pub high_eligible: f32,

    /// A medium asset stays medium until it moves past this distance.
    pub medium_downgrade: f32,

    /// A selected asset stays high until it moves past this distance.
    pub high_downgrade: f32,

    /// Frames between evaluations in [`QualitySelector::on_frame`].
    ///
    /// [`QualitySelector::on_frame`]: super::QualitySelector::on_frame
    pub check_interval_frames: u32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            thumb_upgrade: DEFAULT_THUMB_UPGRADE,
            high_eligible: DEFAULT_HIGH_ELIGIBLE,
            medium_downgrade: DEFAULT_MEDIUM_DOWNGRADE,
            high_downgrade: DEFAULT_HIGH_DOWNGRADE,
            check_interval_frames: DEFAULT_CHECK_INTERVAL_FRAMES,
        }
    }
}

impl QualityThresholds {
    /// Checks that every down threshold sits beyond its up threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("quality.thumb_upgrade", self.thumb_upgrade),
            ("quality.high_eligible", self.high_eligible),
            ("quality.medium_downgrade", self.medium_downgrade),
            ("quality.high_downgrade", self.high_downgrade),
        ];
        for (key, value) in values {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a positive distance, got {}",
                    key, value
                )));
            }
        }

        if self.high_eligible >= self.thumb_upgrade {
            return Err(ConfigError::Invalid(format!(
                "quality.high_eligible ({}) must be below quality.thumb_upgrade ({})",
                self.high_eligible, self.thumb_upgrade
            )));
        }
        if self.medium_downgrade <= self.thumb_upgrade {
            return Err(ConfigError::Invalid(format!(
                "quality.medium_downgrade ({}) must be above quality.thumb_upgrade ({})",
                self.medium_downgrade, self.thumb_upgrade
            )));
        }
        if self.high_downgrade <= self.high_eligible {
            return Err(ConfigError::Invalid(format!(
                "quality.high_downgrade ({}) must be above quality.high_eligible ({})",
                self.high_downgrade, self.high_eligible
            )));
        }
        if self.check_interval_frames == 0 {
            return Err(ConfigError::Invalid(
                "quality.check_interval_frames must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(QualityThresholds::default().validate().is_ok());
    }

    #[test]
    fn test_medium_band_must_be_wider() {
        let thresholds = QualityThresholds {
            medium_downgrade: 50.0,
            ..Default::default()
        };
        assert!(matches!(
            thresholds.validate(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_high_band_must_be_wider() {
        let thresholds = QualityThresholds {
            high_downgrade: 10.0,
            ..Default::default()
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_rejects_nonsense() {
        let thresholds = QualityThresholds {
            thumb_upgrade: f32::NAN,
            ..Default::default()
        };
        assert!(thresholds.validate().is_err());

        let thresholds = QualityThresholds {
            check_interval_frames: 0,
            ..Default::default()
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_short_high_band_is_allowed() {
        // high_downgrade below thumb_upgrade is unusual but consistent
        let thresholds = QualityThresholds {
            high_downgrade: 40.0,
            ..Default::default()
        };
        assert!(thresholds.validate().is_ok());
    }
}
