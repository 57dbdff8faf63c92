/// Presentation agent: per-entity overlay owner and visibility handler.
///
/// Created the first time its entity passes both visibility gates and kept
/// for as long as the entity stays registered, so the overlay asset is
/// loaded exactly once no matter how many visibility windows follow.
///
/// The agent's handler reads the entity's transform when it is notified,
/// not when it is activated.

use std::sync::{Arc, Mutex};
use glam::{Quat, Vec3};
use crate::config::ScannerConfig;
use crate::error::Result;
use crate::{engine_debug, engine_err, engine_warn};
use crate::scene::{EntityKey, World};
use crate::visibility::{ListenerId, VisibilityBroadcaster, VisibilityListener};
use super::presenter::{OverlayHandle, OverlayPresenter};

const SOURCE: &str = "sightline::Agent";

/// Handler subscribed to the broadcaster while the entity is visible
struct OverlayHandler {
    entity: EntityKey,
    overlay: OverlayHandle,
    offset: Vec3,
    rotation: Quat,
    world: Arc<Mutex<dyn World>>,
    presenter: Arc<Mutex<dyn OverlayPresenter>>,
}

impl OverlayHandler {
    fn draw_overlay(&self) -> Result<()> {
        let position = {
            let world = self.world.lock()
                .map_err(|_| engine_err!(LockPoisoned, SOURCE, "world mutex poisoned"))?;
            world.position(self.entity)
                .ok_or_else(|| engine_err!(EntityNotFound, SOURCE,
                    "entity {:?} vanished before its overlay was drawn", self.entity))?
        };

        let mut presenter = self.presenter.lock()
            .map_err(|_| engine_err!(LockPoisoned, SOURCE, "presenter mutex poisoned"))?;
        presenter.set_overlay_transform(self.overlay, position + self.offset, self.rotation)
    }
}

impl VisibilityListener for OverlayHandler {
    fn on_visible(&self) {
        // One bad overlay must not stop the fan-out.
        if let Err(err) = self.draw_overlay() {
            engine_warn!(SOURCE, "overlay for {:?} not drawn: {}", self.entity, err);
        }
    }
}

/// Owner of one entity's overlay and its visibility subscription.
pub struct PresentationAgent {
    listener_id: ListenerId,
    handler: Arc<OverlayHandler>,
}

impl PresentationAgent {
    /// Load the overlay for `entity` and build its handler.
    ///
    /// # Errors
    ///
    /// `ResourceLoadFailed` if the presenter cannot load the overlay assets,
    /// `LockPoisoned` if the presenter mutex is poisoned.
    pub fn new(
        entity: EntityKey,
        world: Arc<Mutex<dyn World>>,
        presenter: Arc<Mutex<dyn OverlayPresenter>>,
        config: &ScannerConfig,
    ) -> Result<Self> {
        let overlay = presenter.lock()
            .map_err(|_| engine_err!(LockPoisoned, SOURCE, "presenter mutex poisoned"))?
            .load_overlay_asset(&config.overlay)?;

        engine_debug!(SOURCE, "created agent for {:?} (overlay {:?})", entity, overlay);

        Ok(Self {
            listener_id: ListenerId::next(),
            handler: Arc::new(OverlayHandler {
                entity,
                overlay,
                offset: config.overlay_offset,
                rotation: config.overlay_rotation,
                world,
                presenter,
            }),
        })
    }

    pub fn entity(&self) -> EntityKey {
        self.handler.entity
    }

    pub fn overlay(&self) -> OverlayHandle {
        self.handler.overlay
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }

    /// Subscribe the handler. Returns false if it was already subscribed.
    pub fn activate(&self, broadcaster: &VisibilityBroadcaster) -> bool {
        let handler: Arc<dyn VisibilityListener> = self.handler.clone();
        broadcaster.subscribe(self.listener_id, handler)
    }

    /// Unsubscribe the handler. Idempotent: returns false if it was not subscribed.
    pub fn deactivate(&self, broadcaster: &VisibilityBroadcaster) -> bool {
        broadcaster.unsubscribe(self.listener_id)
    }

    pub fn is_active(&self, broadcaster: &VisibilityBroadcaster) -> bool {
        broadcaster.is_subscribed(self.listener_id)
    }

    /// Place the overlay from the entity's current transform right now.
    pub fn on_visible(&self) -> Result<()> {
        self.handler.draw_overlay()
    }

    /// Unsubscribe and hand the overlay back to the presenter.
    pub(crate) fn release(self, broadcaster: &VisibilityBroadcaster) {
        self.deactivate(broadcaster);
        match self.handler.presenter.lock() {
            Ok(mut presenter) => presenter.release_overlay(self.handler.overlay),
            Err(_) => engine_warn!(SOURCE,
                "presenter mutex poisoned, overlay {:?} leaked", self.handler.overlay),
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
