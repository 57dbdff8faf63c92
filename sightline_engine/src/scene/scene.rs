/// Scene: an in-memory entity hierarchy implementing [`World`].
///
/// Uses a SlotMap for O(1) insert/remove with stable keys. Root order is
/// tracked separately so `root_entities()` enumerates in spawn order even
/// after slots are recycled.

use glam::{Mat4, Quat, Vec3};
use slotmap::SlotMap;
use crate::error::Result;
use crate::engine_bail;
use super::bounds::AABB;
use super::world::{Capabilities, EntityKey, World};

/// Descriptor for spawning an entity
#[derive(Debug, Clone)]
pub struct EntityDesc {
    /// Debug name
    pub name: String,
    /// Local position (world position for roots)
    pub position: Vec3,
    /// Local rotation
    pub rotation: Quat,
    /// Bounding volume in local space, if the entity has a collider
    pub bounds: Option<AABB>,
    /// Capability flags, fixed at spawn
    pub capabilities: Capabilities,
    /// Self-active flag
    pub active: bool,
}

impl Default for EntityDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            bounds: None,
            capabilities: Capabilities::empty(),
            active: true,
        }
    }
}

impl EntityDesc {
    /// Interactable entity with a unit cube collider at `position`.
    pub fn interactable(name: &str, position: Vec3) -> Self {
        Self {
            name: name.to_string(),
            position,
            bounds: Some(AABB::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5))),
            capabilities: Capabilities::INTERACTABLE,
            ..Default::default()
        }
    }
}

/// A single entity stored in a Scene
#[derive(Debug, Clone)]
pub struct SceneEntity {
    name: String,
    position: Vec3,
    rotation: Quat,
    bounds: Option<AABB>,
    capabilities: Capabilities,
    active: bool,
    parent: Option<EntityKey>,
    children: Vec<EntityKey>,
}

impl SceneEntity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_position(&self) -> Vec3 {
        self.position
    }

    pub fn local_rotation(&self) -> Quat {
        self.rotation
    }

    pub fn local_bounds(&self) -> Option<&AABB> {
        self.bounds.as_ref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Self-active flag (ignores ancestors)
    pub fn active_self(&self) -> bool {
        self.active
    }

    pub fn parent(&self) -> Option<EntityKey> {
        self.parent
    }

    pub fn children(&self) -> &[EntityKey] {
        &self.children
    }

    fn local_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    fn from_desc(desc: EntityDesc, parent: Option<EntityKey>) -> Self {
        Self {
            name: desc.name,
            position: desc.position,
            rotation: desc.rotation,
            bounds: desc.bounds,
            capabilities: desc.capabilities,
            active: desc.active,
            parent,
            children: Vec::new(),
        }
    }
}

/// In-memory world
pub struct Scene {
    entities: SlotMap<EntityKey, SceneEntity>,
    roots: Vec<EntityKey>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self {
            entities: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    /// Spawn a root entity
    pub fn spawn(&mut self, desc: EntityDesc) -> EntityKey {
        let key = self.entities.insert(SceneEntity::from_desc(desc, None));
        self.roots.push(key);
        key
    }

    /// Spawn an entity parented to `parent`. Its pose is relative to the parent.
    pub fn spawn_child(&mut self, parent: EntityKey, desc: EntityDesc) -> Result<EntityKey> {
        if !self.entities.contains_key(parent) {
            engine_bail!(EntityNotFound, "sightline::Scene", "parent {:?} does not exist", parent);
        }
        let key = self.entities.insert(SceneEntity::from_desc(desc, Some(parent)));
        if let Some(p) = self.entities.get_mut(parent) {
            p.children.push(key);
        }
        Ok(key)
    }

    /// Remove an entity and all of its descendants. Returns false if the key is invalid.
    pub fn despawn(&mut self, key: EntityKey) -> bool {
        let entity = match self.entities.remove(key) {
            Some(entity) => entity,
            None => return false,
        };

        match entity.parent {
            Some(parent) => {
                if let Some(p) = self.entities.get_mut(parent) {
                    p.children.retain(|&c| c != key);
                }
            }
            None => self.roots.retain(|&r| r != key),
        }

        let mut stack = entity.children;
        while let Some(child) = stack.pop() {
            if let Some(removed) = self.entities.remove(child) {
                stack.extend(removed.children);
            }
        }
        true
    }

    /// Get an entity by key
    pub fn entity(&self, key: EntityKey) -> Option<&SceneEntity> {
        self.entities.get(key)
    }

    /// Set an entity's local position. Returns false if the key is invalid.
    pub fn set_position(&mut self, key: EntityKey, position: Vec3) -> bool {
        match self.entities.get_mut(key) {
            Some(entity) => {
                entity.position = position;
                true
            }
            None => false,
        }
    }

    /// Set an entity's local rotation. Returns false if the key is invalid.
    pub fn set_rotation(&mut self, key: EntityKey, rotation: Quat) -> bool {
        match self.entities.get_mut(key) {
            Some(entity) => {
                entity.rotation = rotation;
                true
            }
            None => false,
        }
    }

    /// Set an entity's self-active flag. Returns false if the key is invalid.
    pub fn set_active(&mut self, key: EntityKey, active: bool) -> bool {
        match self.entities.get_mut(key) {
            Some(entity) => {
                entity.active = active;
                true
            }
            None => false,
        }
    }

    /// Replace an entity's local bounds. Returns false if the key is invalid.
    pub fn set_bounds(&mut self, key: EntityKey, bounds: Option<AABB>) -> bool {
        match self.entities.get_mut(key) {
            Some(entity) => {
                entity.bounds = bounds;
                true
            }
            None => false,
        }
    }

    /// Local-to-world matrix, composed through the parent chain.
    pub fn world_matrix(&self, key: EntityKey) -> Option<Mat4> {
        let mut entity = self.entities.get(key)?;
        let mut matrix = entity.local_matrix();
        while let Some(parent) = entity.parent {
            entity = self.entities.get(parent)?;
            matrix = entity.local_matrix() * matrix;
        }
        Some(matrix)
    }

    /// Number of entities (roots and children)
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entities.clear();
        self.roots.clear();
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl World for Scene {
    fn root_entities(&self) -> Vec<EntityKey> {
        self.roots.clone()
    }

    fn is_active(&self, entity: EntityKey) -> bool {
        let mut current = self.entities.get(entity);
        while let Some(e) = current {
            if !e.active {
                return false;
            }
            current = match e.parent {
                Some(parent) => self.entities.get(parent),
                None => return true,
            };
        }
        false
    }

    fn has_capability(&self, entity: EntityKey, capability: Capabilities) -> bool {
        self.entities
            .get(entity)
            .map_or(false, |e| e.capabilities.contains(capability))
    }

    fn position(&self, entity: EntityKey) -> Option<Vec3> {
        self.world_matrix(entity).map(|m| m.col(3).truncate())
    }

    fn world_bounds(&self, entity: EntityKey) -> Option<AABB> {
        let bounds = self.entities.get(entity)?.bounds?;
        let matrix = self.world_matrix(entity)?;
        Some(bounds.transformed(&matrix))
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
