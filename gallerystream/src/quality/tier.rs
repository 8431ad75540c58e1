//! Resolution tiers.

use std::fmt;

use crate::queue::Priority;

/// Quality level of a displayed image.
///
/// Ordered from cheapest to most expensive, so `High > Medium > Thumbnail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum QualityTier {
    /// Small placeholder, always requested first.
    #[default]
    Thumbnail,
    /// Downscaled rendition for planes near the camera.
    Medium,
    /// Original upload; only on explicit selection.
    High,
}

impl QualityTier {
    /// All tiers, lowest first.
    pub const ALL: [QualityTier; 3] = [
        QualityTier::Thumbnail,
        QualityTier::Medium,
        QualityTier::High,
    ];

    /// Position in [`ALL`](Self::ALL).
    pub fn index(self) -> usize {
        match self {
            QualityTier::Thumbnail => 0,
            QualityTier::Medium => 1,
            QualityTier::High => 2,
        }
    }

    /// Queue priority for fetches of this tier.
    pub fn priority(self) -> Priority {
        match self {
            QualityTier::Thumbnail => Priority::THUMBNAIL,
            QualityTier::Medium => Priority::MEDIUM,
            QualityTier::High => Priority::ORIGINAL,
        }
    }

    /// True for tiers fetched through the full-quality queue.
    pub fn is_full_quality(self) -> bool {
        !matches!(self, QualityTier::Thumbnail)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Thumbnail => "thumbnail",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "thumbnail" | "thumb" => Ok(QualityTier::Thumbnail),
            "medium" => Ok(QualityTier::Medium),
            "high" | "original" => Ok(QualityTier::High),
            other => Err(format!("unknown quality tier '{}'", other)),
        }
    }
}
