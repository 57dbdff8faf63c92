/// Headless presenter: keeps overlay state in memory without drawing.
///
/// Useful for dedicated servers, replays and tests. Optionally restricted to
/// a catalog of known asset names so that missing assets fail to load the
/// way they would in a real asset pipeline.

use glam::{Quat, Vec3};
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::error::Result;
use crate::engine_bail;
use super::presenter::{OverlayDesc, OverlayHandle, OverlayPresenter};

/// State of one overlay instance
#[derive(Debug, Clone)]
pub struct OverlayState {
    pub desc: OverlayDesc,
    pub position: Vec3,
    pub orientation: Quat,
    /// Number of `set_overlay_transform` calls for this overlay
    pub updates: u64,
}

pub struct HeadlessPresenter {
    overlays: SlotMap<OverlayHandle, OverlayState>,
    /// Known asset names; `None` accepts everything
    catalog: Option<FxHashSet<String>>,
    loads: u64,
    releases: u64,
}

impl HeadlessPresenter {
    /// Presenter that accepts any asset name
    pub fn new() -> Self {
        Self {
            overlays: SlotMap::with_key(),
            catalog: None,
            loads: 0,
            releases: 0,
        }
    }

    /// Presenter that only loads the listed assets (and sprites)
    pub fn with_catalog<I, S>(assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog: Some(assets.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// Add an asset to the catalog (no-op for an unrestricted presenter)
    pub fn add_asset(&mut self, name: &str) {
        if let Some(catalog) = &mut self.catalog {
            catalog.insert(name.to_string());
        }
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<&OverlayState> {
        self.overlays.get(handle)
    }

    /// Live overlays
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Successful loads so far
    pub fn load_count(&self) -> u64 {
        self.loads
    }

    pub fn release_count(&self) -> u64 {
        self.releases
    }

    fn is_known(&self, name: &str) -> bool {
        self.catalog.as_ref().map_or(true, |c| c.contains(name))
    }
}

impl Default for HeadlessPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayPresenter for HeadlessPresenter {
    fn load_overlay_asset(&mut self, desc: &OverlayDesc) -> Result<OverlayHandle> {
        if !self.is_known(&desc.asset) {
            engine_bail!(ResourceLoadFailed, "sightline::HeadlessPresenter",
                "overlay asset '{}' not found", desc.asset);
        }
        if let Some(sprite) = &desc.sprite {
            if !self.is_known(sprite) {
                engine_bail!(ResourceLoadFailed, "sightline::HeadlessPresenter",
                    "overlay sprite '{}' not found", sprite);
            }
        }

        self.loads += 1;
        Ok(self.overlays.insert(OverlayState {
            desc: desc.clone(),
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            updates: 0,
        }))
    }

    fn set_overlay_transform(
        &mut self,
        overlay: OverlayHandle,
        position: Vec3,
        orientation: Quat,
    ) -> Result<()> {
        match self.overlays.get_mut(overlay) {
            Some(state) => {
                state.position = position;
                state.orientation = orientation;
                state.updates += 1;
                Ok(())
            }
            None => engine_bail!(ResourceLoadFailed, "sightline::HeadlessPresenter",
                "overlay {:?} was released", overlay),
        }
    }

    fn release_overlay(&mut self, overlay: OverlayHandle) {
        if self.overlays.remove(overlay).is_some() {
            self.releases += 1;
        }
    }
}

#[cfg(test)]
#[path = "headless_presenter_tests.rs"]
mod tests;
