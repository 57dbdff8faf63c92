//! Scene module
//!
//! The world-enumeration side of the visibility pipeline: entity handles,
//! capability flags, bounding volumes, the `World` trait consumed by the
//! scanner, and an in-memory `Scene` implementing it.

mod bounds;
mod scene;
mod world;

pub use bounds::AABB;
pub use scene::{Scene, SceneEntity, EntityDesc};
pub use world::{World, EntityKey, Capabilities};
