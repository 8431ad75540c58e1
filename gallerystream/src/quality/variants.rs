//! Available renditions of an uploaded image.

use super::tier::QualityTier;

/// URLs of the renditions the storage backend holds for one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetVariants {
    pub thumbnail_url: Option<String>,
    pub medium_url: Option<String>,
    pub original_url: Option<String>,
    /// Animated uploads are never resized; only the original plays.
    pub animated: bool,
}

/// How an asset is streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantMode {
    /// Thumbnail, medium and high are fetched independently.
    Tiered,
    /// Only one URL exists (or only one may be shown).
    Single(String),
    /// Nothing to fetch.
    Empty,
}

impl AssetVariants {
    /// Variants with a thumbnail and a medium rendition.
    pub fn tiered(thumbnail_url: impl Into<String>, medium_url: impl Into<String>) -> Self {
        Self {
            thumbnail_url: Some(thumbnail_url.into()),
            medium_url: Some(medium_url.into()),
            ..Default::default()
        }
    }

    /// Adds the original upload.
    pub fn with_original(mut self, original_url: impl Into<String>) -> Self {
        self.original_url = Some(original_url.into());
        self
    }

    /// An asset with only its original upload.
    pub fn original_only(original_url: impl Into<String>, animated: bool) -> Self {
        Self {
            original_url: Some(original_url.into()),
            animated,
            ..Default::default()
        }
    }

    /// Streaming mode for these variants.
    pub fn mode(&self) -> VariantMode {
        if self.animated {
            if let Some(url) = &self.original_url {
                return VariantMode::Single(url.clone());
            }
        }
        if self.thumbnail_url.is_some() || self.medium_url.is_some() {
            return VariantMode::Tiered;
        }
        match &self.original_url {
            Some(url) => VariantMode::Single(url.clone()),
            None => VariantMode::Empty,
        }
    }

    /// URL to fetch for `tier` in tiered mode.
    ///
    /// A missing thumbnail falls back to the medium rendition and a missing
    /// original falls back to medium.
    pub fn url_for(&self, tier: QualityTier) -> Option<&str> {
        match tier {
            QualityTier::Thumbnail => self.thumbnail_url.as_deref().or(self.medium_url.as_deref()),
            QualityTier::Medium => self.medium_url.as_deref(),
            QualityTier::High => self.original_url.as_deref().or(self.medium_url.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiered_urls() {
        let variants = AssetVariants::tiered("t.webp", "m.webp").with_original("o.jpg");
        assert_eq!(variants.mode(), VariantMode::Tiered);
        assert_eq!(variants.url_for(QualityTier::Thumbnail), Some("t.webp"));
        assert_eq!(variants.url_for(QualityTier::Medium), Some("m.webp"));
        assert_eq!(variants.url_for(QualityTier::High), Some("o.jpg"));
    }

    #[test]
    fn test_high_falls_back_to_medium() {
        let variants = AssetVariants::tiered("t.webp", "m.webp");
        assert_eq!(variants.url_for(QualityTier::High), Some("m.webp"));
    }

    #[test]
    fn test_original_only_is_single() {
        let variants = AssetVariants::original_only("o.png", false);
        assert_eq!(variants.mode(), VariantMode::Single("o.png".to_string()));
    }

    #[test]
    fn test_animated_always_uses_original() {
        let variants = AssetVariants {
            animated: true,
            ..AssetVariants::tiered("t.webp", "m.webp").with_original("o.gif")
        };
        assert_eq!(variants.mode(), VariantMode::Single("o.gif".to_string()));
    }

    #[test]
    fn test_empty() {
        assert_eq!(AssetVariants::default().mode(), VariantMode::Empty);
    }
}
