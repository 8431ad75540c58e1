//! Per-asset quality selection and resource lifecycle.
//!
//! A `QualitySelector` owns the loaded resources of one displayed asset.
//! The scene calls [`on_frame`](QualitySelector::on_frame) with the camera
//! distance every frame; every `check_interval_frames` frames the selector
//! re-evaluates the target tier and requests any variant it is missing.
//!
//! Fetches complete on the runtime and are delivered back through a
//! channel; [`pump`](QualitySelector::pump) applies them without blocking,
//! [`next_update`](QualitySelector::next_update) waits for the next one.
//!
//! # Display rule
//!
//! The displayed resource is the target tier if it is loaded, otherwise the
//! best loaded tier. Once the target is shown, tiers above it are released.
//! Lower tiers are kept as fallbacks. While a high fetch is in flight a
//! loaded medium stays on screen rather than dropping to the thumbnail.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::state::AssetQualityState;
use super::thresholds::QualityThresholds;
use super::tier::QualityTier;
use super::variants::{AssetVariants, VariantMode};
use crate::fetch::FetchError;
use crate::resource::Resource;
use crate::session::StreamingSession;

/// The resource the renderer should draw for an asset.
#[derive(Debug, Clone, Copy)]
pub struct DisplayedResource<'a> {
    pub tier: QualityTier,
    pub resource: &'a Resource,
}

#[derive(Debug, Default)]
struct TierSlot {
    loaded: Option<Resource>,
    requested: bool,
    failed: bool,
}

struct TierUpdate {
    tier: QualityTier,
    url: String,
    result: Result<Resource, FetchError>,
}

/// Tier selection and loaded resources for one asset.
pub struct QualitySelector {
    session: Arc<StreamingSession>,
    variants: AssetVariants,
    mode: VariantMode,
    thresholds: QualityThresholds,
    state: AssetQualityState,
    slots: [TierSlot; 3],
    frames_since_check: u32,
    evaluated: bool,
    in_flight: usize,
    disposed: bool,
    updates_tx: mpsc::UnboundedSender<TierUpdate>,
    updates_rx: mpsc::UnboundedReceiver<TierUpdate>,
}

impl QualitySelector {
    /// Creates a selector and requests the base placeholder.
    pub fn new(session: Arc<StreamingSession>, variants: AssetVariants) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let thresholds = session.config().quality;
        let mode = variants.mode();

        let mut selector = Self {
            session,
            variants,
            mode,
            thresholds,
            state: AssetQualityState::new(),
            slots: Default::default(),
            frames_since_check: 0,
            evaluated: false,
            in_flight: 0,
            disposed: false,
            updates_tx,
            updates_rx,
        };
        selector.request_base();
        selector
    }

    /// Target tier. A single-rendition asset is always at High.
    pub fn tier(&self) -> QualityTier {
        match self.mode {
            VariantMode::Single(_) => QualityTier::High,
            _ => self.state.current_tier(),
        }
    }

    pub fn state(&self) -> &AssetQualityState {
        &self.state
    }

    pub fn variants(&self) -> &AssetVariants {
        &self.variants
    }

    pub fn mode(&self) -> &VariantMode {
        &self.mode
    }

    /// Fetches requested but not yet applied.
    pub fn pending_loads(&self) -> usize {
        self.in_flight
    }

    /// True if `tier` currently holds a loaded resource.
    pub fn is_loaded(&self, tier: QualityTier) -> bool {
        self.slots[tier.index()].loaded.is_some()
    }

    /// True if `tier` failed to load or has no URL.
    pub fn is_failed(&self, tier: QualityTier) -> bool {
        self.slots[tier.index()].failed
    }

    /// Counts a rendered frame, evaluating on the first frame and then every
    /// `check_interval_frames` frames.
    ///
    /// Returns the new target tier if it changed.
    pub fn on_frame(&mut self, distance: f32) -> Option<QualityTier> {
        self.frames_since_check += 1;
        if self.evaluated && self.frames_since_check < self.thresholds.check_interval_frames {
            return None;
        }
        self.frames_since_check = 0;
        self.evaluate(distance)
    }

    /// Re-evaluates the target tier at `distance` now.
    pub fn evaluate(&mut self, distance: f32) -> Option<QualityTier> {
        if self.disposed {
            return None;
        }
        self.evaluated = true;

        if self.mode != VariantMode::Tiered {
            // Nothing to switch between
            self.state.observe(distance);
            return None;
        }

        let changed = self.state.advance(distance, &self.thresholds);
        if let Some(tier) = changed {
            debug!(
                asset = self.label(),
                tier = %tier,
                distance,
                sticky = self.state.is_sticky_high(),
                "Target tier changed"
            );
        }

        let target = self.tier();
        if target > QualityTier::Thumbnail {
            self.request(target);
        }
        self.release_superseded();
        changed
    }

    /// Records an explicit user selection and re-evaluates at the last
    /// measured distance.
    pub fn select(&mut self) -> Option<QualityTier> {
        self.state.mark_selected();
        let distance = self.state.last_distance();
        self.evaluate(distance)
    }

    /// Applies completed fetches without waiting. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates_rx.try_recv() {
            self.apply(update);
            applied += 1;
        }
        applied
    }

    /// Waits for the next completed fetch and applies it.
    ///
    /// Returns false if no fetch is outstanding.
    pub async fn next_update(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.updates_rx.recv().await {
            Some(update) => {
                self.apply(update);
                true
            }
            None => false,
        }
    }

    /// Resource the renderer should draw, or `None` to draw nothing.
    pub fn display(&self) -> Option<DisplayedResource<'_>> {
        let target = self.tier();
        if let Some(resource) = &self.slots[target.index()].loaded {
            return Some(DisplayedResource {
                tier: target,
                resource,
            });
        }

        QualityTier::ALL.iter().rev().find_map(|&tier| {
            self.slots[tier.index()]
                .loaded
                .as_ref()
                .map(|resource| DisplayedResource { tier, resource })
        })
    }

    /// Releases every loaded resource. Later fetch results are discarded.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for slot in &mut self.slots {
            if let Some(mut resource) = slot.loaded.take() {
                resource.release();
            }
        }
        trace!(asset = self.label(), "Selector disposed");
    }

    fn label(&self) -> &str {
        self.variants
            .thumbnail_url
            .as_deref()
            .or(self.variants.original_url.as_deref())
            .unwrap_or("<empty>")
    }

    /// Requests the placeholder every asset starts with.
    fn request_base(&mut self) {
        match self.mode.clone() {
            VariantMode::Tiered => self.request(QualityTier::Thumbnail),
            VariantMode::Single(url) => {
                // The original is the only rendition; it lives in the high slot
                // but is fetched at medium weight.
                self.start_fetch(QualityTier::High, url, QualityTier::Medium);
            }
            VariantMode::Empty => {
                for slot in &mut self.slots {
                    slot.failed = true;
                }
            }
        }
    }

    fn request(&mut self, tier: QualityTier) {
        if self.mode != VariantMode::Tiered {
            return;
        }
        let slot = &self.slots[tier.index()];
        if slot.requested || slot.failed || slot.loaded.is_some() {
            return;
        }

        match self.variants.url_for(tier) {
            Some(url) => {
                let url = url.to_string();
                self.start_fetch(tier, url, tier);
            }
            None => {
                debug!(asset = self.label(), tier = %tier, "No URL for tier");
                self.slots[tier.index()].failed = true;
            }
        }
    }

    fn start_fetch(&mut self, slot_tier: QualityTier, url: String, route: QualityTier) {
        let slot = &mut self.slots[slot_tier.index()];
        if slot.requested || slot.failed || slot.loaded.is_some() {
            return;
        }
        slot.requested = true;
        self.in_flight += 1;

        trace!(url = %url, tier = %slot_tier, "Requesting tier");
        let load = self.session.load(&url, route);
        let tx = self.updates_tx.clone();
        self.session.spawn(async move {
            let result = load.await;
            // Selector may be gone; the bytes are cached either way
            let _ = tx.send(TierUpdate {
                tier: slot_tier,
                url,
                result,
            });
        });
    }

    fn apply(&mut self, update: TierUpdate) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let slot = &mut self.slots[update.tier.index()];
        slot.requested = false;

        match update.result {
            Ok(mut resource) if self.disposed => resource.release(),
            Ok(mut resource) => match resource.dimensions() {
                Ok((width, height)) => {
                    trace!(url = %update.url, tier = %update.tier, width, height, "Tier loaded");
                    slot.loaded = Some(resource);
                }
                Err(error) => {
                    slot.failed = true;
                    resource.release();
                    self.session.invalidate(&update.url, &error);
                }
            },
            Err(_) => {
                // Logged and recorded by the session
                slot.failed = true;
            }
        }

        self.release_superseded();
    }

    /// Releases tiers above the target once the target itself is shown.
    fn release_superseded(&mut self) {
        let target = self.tier();
        if self.slots[target.index()].loaded.is_none() {
            return;
        }
        for tier in QualityTier::ALL {
            if tier <= target {
                continue;
            }
            if let Some(mut resource) = self.slots[tier.index()].loaded.take() {
                trace!(tier = %tier, resource = %resource.id(), "Releasing superseded tier");
                resource.release();
            }
        }
    }
}

impl Drop for QualitySelector {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for QualitySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualitySelector")
            .field("asset", &self.label())
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
