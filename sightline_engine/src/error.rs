//! Error types for the Sightline engine
//!
//! This module defines the error types produced while registering candidate
//! entities, scanning them against the observer and acquiring overlay resources.

use std::fmt;

/// Result type for Sightline engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Sightline engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed candidate or configuration (missing bounds, non-finite values, etc.)
    InvalidConfiguration(String),

    /// Overlay asset could not be loaded or updated by the presenter
    ResourceLoadFailed(String),

    /// Entity handle no longer resolves in the world
    EntityNotFound(String),

    /// A shared collaborator (world, presenter) mutex was poisoned
    LockPoisoned(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::ResourceLoadFailed(msg) => write!(f, "Resource load failed: {}", msg),
            Error::EntityNotFound(msg) => write!(f, "Entity not found: {}", msg),
            Error::LockPoisoned(msg) => write!(f, "Lock poisoned: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Build an [`Error`] and log it at ERROR severity in one step.
///
/// ```ignore
/// let err = engine_err!(InvalidConfiguration, "sightline::Scanner", "entity {:?} has no bounds", key);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($kind:ident, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::sightline::Error::$kind(message)
    }};
}

/// Log and return an [`Error`] from the enclosing function.
#[macro_export]
macro_rules! engine_bail {
    ($kind:ident, $source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($kind, $source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
