/// Observer interface and the engine's reference camera.
///
/// The scanner sees the viewpoint only through [`Observer`]: a position, a
/// view-projection matrix to derive the six planes from, and the sensing
/// radius. The host owns the observer and hands the scanner a reference
/// for each tick.

use glam::{Mat4, Quat, Vec3};
use crate::error::Result;
use crate::engine_bail;
use super::frustum::Frustum;

/// A single viewpoint the scanner tests candidates against.
pub trait Observer {
    /// World-space eye position (origin of the distance test).
    fn position(&self) -> Vec3;

    /// Combined projection * view matrix for the current pose.
    fn view_projection_matrix(&self) -> Mat4;

    /// Maximum distance at which an entity can be considered visible.
    fn sense_radius(&self) -> f32;

    /// View volume for the current pose.
    fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection_matrix())
    }
}

/// Projection parameters (right-handed, depth in [0, 1]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        z_near: f32,
        z_far: f32,
    },
}

impl Projection {
    /// Projection matrix for these parameters.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective { fov_y, aspect_ratio, z_near, z_far } => {
                Mat4::perspective_rh(fov_y, aspect_ratio, z_near, z_far)
            }
            Projection::Orthographic { left, right, bottom, top, z_near, z_far } => {
                Mat4::orthographic_rh(left, right, bottom, top, z_near, z_far)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Projection::Perspective { fov_y, aspect_ratio, z_near, z_far } => {
                if !(fov_y > 0.0 && fov_y < std::f32::consts::PI) {
                    engine_bail!(InvalidConfiguration, "sightline::Camera",
                        "field of view {} must be in (0, PI)", fov_y);
                }
                if !(aspect_ratio > 0.0 && aspect_ratio.is_finite()) {
                    engine_bail!(InvalidConfiguration, "sightline::Camera",
                        "aspect ratio {} must be positive", aspect_ratio);
                }
                if !(z_near > 0.0 && z_far > z_near && z_far.is_finite()) {
                    engine_bail!(InvalidConfiguration, "sightline::Camera",
                        "clip range [{}, {}] is invalid for a perspective projection", z_near, z_far);
                }
            }
            Projection::Orthographic { left, right, bottom, top, z_near, z_far } => {
                if !(right > left && top > bottom && z_far > z_near) {
                    engine_bail!(InvalidConfiguration, "sightline::Camera",
                        "orthographic volume is empty or inverted");
                }
            }
        }
        Ok(())
    }
}

/// Perspective or orthographic camera with a pose and a sensing radius.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    rotation: Quat,
    projection: Projection,
    sense_radius: f32,
}

impl Camera {
    /// Create a camera. Identity rotation looks down -Z with +Y up.
    pub fn new(position: Vec3, rotation: Quat, projection: Projection, sense_radius: f32) -> Result<Self> {
        projection.validate()?;
        validate_sense_radius(sense_radius)?;
        Ok(Self {
            position,
            rotation: validated_rotation(rotation)?,
            projection,
            sense_radius,
        })
    }

    /// Create a camera at `eye` facing `target`.
    ///
    /// Fails if `eye == target` or `up` is parallel to the view direction.
    pub fn looking_at(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        projection: Projection,
        sense_radius: f32,
    ) -> Result<Self> {
        let view = Mat4::look_at_rh(eye, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        Self::new(eye, rotation, projection, sense_radius)
    }

    // ===== GETTERS =====

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Quat) -> Result<()> {
        self.rotation = validated_rotation(rotation)?;
        Ok(())
    }

    /// Re-aim the camera at `target` without moving it.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) -> Result<()> {
        let view = Mat4::look_at_rh(self.position, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.set_rotation(rotation)
    }

    pub fn set_projection(&mut self, projection: Projection) -> Result<()> {
        projection.validate()?;
        self.projection = projection;
        Ok(())
    }

    /// Change the sensing radius (designer-tunable, world units).
    pub fn set_sense_radius(&mut self, sense_radius: f32) -> Result<()> {
        validate_sense_radius(sense_radius)?;
        self.sense_radius = sense_radius;
        Ok(())
    }
}

impl Observer for Camera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    fn sense_radius(&self) -> f32 {
        self.sense_radius
    }
}

fn validated_rotation(rotation: Quat) -> Result<Quat> {
    let length = rotation.length();
    if !length.is_finite() || length < 1e-6 {
        engine_bail!(InvalidConfiguration, "sightline::Camera",
            "rotation {} is degenerate", rotation);
    }
    Ok(rotation.normalize())
}

fn validate_sense_radius(sense_radius: f32) -> Result<()> {
    if !(sense_radius >= 0.0 && sense_radius.is_finite()) {
        engine_bail!(InvalidConfiguration, "sightline::Camera",
            "sense radius {} must be finite and non-negative", sense_radius);
    }
    Ok(())
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
