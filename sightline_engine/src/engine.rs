/// Sightline Engine - process-wide diagnostics
///
/// The visibility pipeline itself carries no global state: scanners,
/// broadcasters and agents are owned by the caller. The only process-wide
/// service is the logger, stored here behind an RwLock so any component can
/// report without threading a logger handle through every call.

use std::sync::{OnceLock, RwLock};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::SystemTime;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Minimum severity forwarded to the logger (stored as the enum discriminant)
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(LogSeverity::Debug as u8);

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

fn severity_from_u8(value: u8) -> LogSeverity {
    match value {
        0 => LogSeverity::Trace,
        1 => LogSeverity::Debug,
        2 => LogSeverity::Info,
        3 => LogSeverity::Warn,
        _ => LogSeverity::Error,
    }
}

// ===== PUBLIC API =====

/// Process-wide diagnostics entry point
///
/// # Example
///
/// ```no_run
/// use sightline_engine::sightline::Engine;
/// use sightline_engine::sightline::log::LogSeverity;
///
/// Engine::set_log_level(LogSeverity::Info);
/// Engine::log(LogSeverity::Info, "host::Game", "level loaded".to_string());
/// ```
pub struct Engine;

impl Engine {
    /// Replace the global logger
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Reset the global logger to DefaultLogger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Set the minimum severity that reaches the logger.
    ///
    /// Defaults to `Debug`, so per-entity `Trace` output is off unless asked for.
    pub fn set_log_level(severity: LogSeverity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    /// Current minimum severity
    pub fn log_level() -> LogSeverity {
        severity_from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Whether a message of this severity would be forwarded
    pub fn is_enabled(severity: LogSeverity) -> bool {
        severity >= Self::log_level()
    }

    /// Log a message without location (used by engine_info!, engine_warn!, etc.)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(severity, source, message, None, None);
    }

    /// Log a message with file:line (used by engine_error!)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(severity, source, message, Some(file), Some(line));
    }

    fn dispatch(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: Option<&'static str>,
        line: Option<u32>,
    ) {
        if !Self::is_enabled(severity) {
            return;
        }
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file,
                line,
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
