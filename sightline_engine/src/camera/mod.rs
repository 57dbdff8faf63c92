//! Camera module: observer interface, reference camera and view volume.
//!
//! The engine does NOT store cameras. The host owns the observer and passes
//! it to `VisibilityScanner::scan` for each tick.

mod camera;
mod frustum;

pub use camera::{Camera, Observer, Projection};
pub use frustum::{
    Frustum,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
