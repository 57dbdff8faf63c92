/// World enumeration interface.
///
/// The scanner never owns entities. It asks a `World` for the root entity
/// list once at startup, and for each candidate's current position and
/// bounds every tick. Hosts adapt their own scene graph to this trait;
/// [`Scene`](super::Scene) is the in-memory implementation.

use bitflags::bitflags;
use glam::Vec3;
use slotmap::new_key_type;
use super::bounds::AABB;

new_key_type! {
    /// Stable handle to a world entity.
    ///
    /// Stays valid for the entity's lifetime; a despawned entity's key
    /// never resolves again (generational slot map).
    pub struct EntityKey;
}

bitflags! {
    /// Capabilities attached to an entity when it is created.
    ///
    /// Checked once, when the scanner builds its registry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// Eligible for visibility scanning and overlay presentation
        const INTERACTABLE = 1 << 0;
    }
}

/// Read-only view of the host's world, as seen by the scanner and agents.
pub trait World: Send {
    /// All root-level entities, in a stable enumeration order.
    fn root_entities(&self) -> Vec<EntityKey>;

    /// Whether the entity is active in the hierarchy (itself and all ancestors).
    fn is_active(&self, entity: EntityKey) -> bool;

    /// Whether the entity carries every flag in `capability`.
    fn has_capability(&self, entity: EntityKey, capability: Capabilities) -> bool;

    /// Current world-space position, `None` if the entity no longer exists.
    fn position(&self, entity: EntityKey) -> Option<Vec3>;

    /// Current world-space bounds, `None` if the entity has no bounding volume.
    fn world_bounds(&self, entity: EntityKey) -> Option<AABB>;
}
