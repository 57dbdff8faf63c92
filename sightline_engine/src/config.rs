//! Scanner configuration

use glam::{Quat, Vec3};
use crate::error::Result;
use crate::engine_bail;
use crate::presentation::OverlayDesc;

/// Visibility scanner configuration
///
/// The sensing radius belongs to the observer (see `Observer::sense_radius`);
/// everything here is fixed for the lifetime of a scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Assets each presentation agent loads on creation
    pub overlay: OverlayDesc,
    /// Overlay position relative to the entity's world position
    pub overlay_offset: Vec3,
    /// Overlay orientation (world space, normalized on validation)
    pub overlay_rotation: Quat,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            overlay: OverlayDesc::default(),
            overlay_offset: Vec3::new(0.8, 0.0, 0.0),
            overlay_rotation: Quat::from_xyzw(0.8, 0.0, 0.8, 0.0).normalize(),
        }
    }
}

impl ScannerConfig {
    /// Check the configuration and return it with a normalized rotation.
    pub fn validated(mut self) -> Result<Self> {
        if self.overlay.asset.trim().is_empty() {
            engine_bail!(InvalidConfiguration, "sightline::ScannerConfig",
                "overlay asset name is empty");
        }
        if !self.overlay_offset.is_finite() {
            engine_bail!(InvalidConfiguration, "sightline::ScannerConfig",
                "overlay offset {} is not finite", self.overlay_offset);
        }
        let length = self.overlay_rotation.length();
        if !length.is_finite() || length < 1e-6 {
            engine_bail!(InvalidConfiguration, "sightline::ScannerConfig",
                "overlay rotation {} cannot be normalized", self.overlay_rotation);
        }
        if !self.overlay_rotation.is_normalized() {
            self.overlay_rotation = self.overlay_rotation.normalize();
        }
        Ok(self)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
