/*!
# Sightline Engine

Interest management for interactable entities.

Each tick the engine decides which registered entities are both within an
observer's sensing radius and inside its view volume, and notifies only
those entities' presentation agents, which place an interaction overlay over
the entity. Scene enumeration, overlay rendering and the host's frame loop
stay outside the crate behind the `World`, `Observer` and
`OverlayPresenter` traits.

## Architecture

- **VisibilityScanner**: candidate registry and the per-tick
  activate / fire / deactivate protocol
- **VisibilityBroadcaster**: explicitly owned multicast channel
- **PresentationAgent**: lazily created per-entity overlay owner
- **Scene / Camera / HeadlessPresenter**: in-memory implementations of the
  collaborator traits

Logging goes through the engine's pluggable logger (see [`sightline::Engine`]).
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod camera;
pub mod scene;
pub mod presentation;
pub mod visibility;

// Main sightline namespace module
pub mod sightline {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logging)
    pub use crate::engine::Engine;

    // Scanner configuration
    pub use crate::config::ScannerConfig;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Presentation sub-module
    pub mod presentation {
        pub use crate::presentation::*;
    }

    // Visibility sub-module
    pub mod visibility {
        pub use crate::visibility::*;
    }
}

// Re-export math library at crate root
pub use glam;
