/// Frustum: the observer's view volume as six clipping planes.
///
/// Each plane is a Vec4 (A, B, C, D): (A, B, C) is the unit inward normal and
/// a point P is inside the half-space when `dot(normal, P) + D >= 0`.
/// The scanner rebuilds it from the observer every tick and never caches it.

use glam::{Mat4, Vec3, Vec4};
use crate::scene::AABB;

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

/// Six inward-facing planes: left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract the planes from a view-projection matrix (Gribb & Hartmann).
    ///
    /// Assumes clip-space depth in [0, 1], as produced by glam's `*_rh`
    /// projections, so the near plane is row 2 alone.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let (r0, r1, r2, r3) = (vp.row(0), vp.row(1), vp.row(2), vp.row(3));

        let mut planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2];
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Signed distance from `point` to a plane (positive = inside half-space).
    pub fn signed_distance(&self, plane: usize, point: Vec3) -> f32 {
        let p = self.planes[plane];
        p.truncate().dot(point) + p.w
    }

    /// Test if a point lies inside all six planes.
    pub fn contains_point(&self, point: Vec3) -> bool {
        (0..6).all(|i| self.signed_distance(i, point) >= 0.0)
    }

    /// Test an AABB against the view volume.
    ///
    /// The box is rejected only when its corner furthest along some plane's
    /// normal (the positive vertex) is behind that plane, i.e. the whole box
    /// is outside a single plane. Boxes straddling a plane count as visible.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        (0..6).all(|i| {
            let normal = self.planes[i].truncate();
            let positive = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            self.signed_distance(i, positive) >= 0.0
        })
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
