//! Distance-driven quality selection.
//!
//! Each displayed asset owns a [`QualitySelector`] that decides which
//! rendition to fetch and show based on camera distance and explicit user
//! selection. The decision itself is the pure [`AssetQualityState`] state
//! machine; the selector adds fetching, display fallback and release.

mod selector;
mod state;
mod thresholds;
mod tier;
mod variants;

pub use selector::{DisplayedResource, QualitySelector};
pub use state::AssetQualityState;
pub use thresholds::{
    QualityThresholds, DEFAULT_CHECK_INTERVAL_FRAMES, DEFAULT_HIGH_DOWNGRADE,
    DEFAULT_HIGH_ELIGIBLE, DEFAULT_MEDIUM_DOWNGRADE, DEFAULT_THUMB_UPGRADE,
};
pub use tier::QualityTier;
pub use variants::{AssetVariants, VariantMode};
