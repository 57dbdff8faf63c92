/// Presentation interface: what an agent needs from the host's UI layer.

use glam::{Quat, Vec3};
use slotmap::new_key_type;
use crate::error::Result;

new_key_type! {
    /// Handle to an overlay instance owned by a presenter.
    pub struct OverlayHandle;
}

/// Which assets make up an interaction overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayDesc {
    /// Overlay prefab / widget asset
    pub asset: String,
    /// Optional sprite applied to the overlay's image
    pub sprite: Option<String>,
}

impl Default for OverlayDesc {
    fn default() -> Self {
        Self {
            asset: "InteractableOverlay".to_string(),
            sprite: Some("SpriteOverlay".to_string()),
        }
    }
}

/// Host rendering/UI collaborator that owns overlay visuals.
///
/// Called from the scanner's thread only: `load_overlay_asset` when an
/// agent is first created, `set_overlay_transform` from the agent's
/// visibility handler during `fire()`.
pub trait OverlayPresenter: Send {
    /// Instantiate an overlay (asset + sprite) and return its handle.
    fn load_overlay_asset(&mut self, desc: &OverlayDesc) -> Result<OverlayHandle>;

    /// Place an overlay for this frame.
    fn set_overlay_transform(
        &mut self,
        overlay: OverlayHandle,
        position: Vec3,
        orientation: Quat,
    ) -> Result<()>;

    /// Destroy an overlay whose entity left the registry.
    fn release_overlay(&mut self, _overlay: OverlayHandle) {}
}
