//! Presentation module: per-entity overlay agents and the host presenter seam.
//!
//! The engine never draws anything itself. An `OverlayPresenter` owns the
//! visuals; a `PresentationAgent` owns one entity's overlay handle and its
//! subscription to the visibility broadcaster.

mod agent;
mod headless_presenter;
mod presenter;

pub use agent::PresentationAgent;
pub use headless_presenter::{HeadlessPresenter, OverlayState};
pub use presenter::{OverlayDesc, OverlayHandle, OverlayPresenter};
