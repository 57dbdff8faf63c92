//! Visibility module: the broadcaster channel and the per-tick scanner.

mod broadcaster;
mod scanner;

pub use broadcaster::{ListenerId, VisibilityBroadcaster, VisibilityListener};
pub use scanner::{ScanStats, VisibilityScanner};
