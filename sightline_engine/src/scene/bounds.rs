/// Axis-aligned bounding volumes used for view-volume containment tests.

use glam::{Mat4, Vec3};

/// Axis-Aligned Bounding Box
///
/// Entities store their bounds in local space; `World::world_bounds`
/// returns them transformed by the entity's current pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    /// Box from explicit corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` extending `half_extents` along each axis.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half the size along each axis.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Finite corners with `min <= max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
    }

    /// Transform this local-space AABB by a matrix, returning a new AABB.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the AABB extents
    /// for a tight result without transforming all 8 corners.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        AABB { min: new_min, max: new_max }
    }

    /// Returns `true` if `point` lies inside or on the box.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && point.cmple(self.max).all()
    }

    /// Returns `true` if the two AABBs overlap or touch.
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

#[cfg(test)]
#[path = "bounds_tests.rs"]
mod tests;
