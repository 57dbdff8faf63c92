//! Logging for the Sightline engine
//!
//! The scanner, agents and broadcaster report through a single pluggable
//! logger owned by [`Engine`](crate::sightline::Engine):
//! - Custom sinks via the Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error) with a global minimum level
//! - Colored console output by default
//! - File and line information for ERROR logs

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Hosts that already own a logging pipeline forward entries to it by
/// implementing this trait and calling `Engine::set_logger`.
///
/// # Example
///
/// ```no_run
/// use sightline_engine::sightline::log::{Logger, LogEntry};
///
/// struct HostLogger;
///
/// impl Logger for HostLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}: {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Handle one log entry
    fn log(&self, entry: &LogEntry);
}

/// A single log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Creation time
    pub timestamp: SystemTime,

    /// Emitting component (e.g., "sightline::Scanner", "sightline::Agent")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-entity, per-tick detail
    Trace,

    /// Per-tick summaries and lifecycle detail
    Debug,

    /// Registry population and other one-off events
    Info,

    /// Skipped entities, stale handles
    Warn,

    /// Malformed candidates, failed resource loads
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the console logger
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Console logger with colored severities
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl DefaultLogger {
    /// Entry timestamp in local time, `YYYY-MM-DD HH:MM:SS.mmm`
    pub fn format_timestamp(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let timestamp = Self::format_timestamp(entry);

        let label = entry.severity.label();
        let severity_str = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };

        let source = entry.source.bright_blue();

        match (entry.file, entry.line) {
            (Some(file), Some(line)) => println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            ),
            _ => println!(
                "[{}] [{}] [{}] {}",
                timestamp, severity_str, source, entry.message
            ),
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// ```ignore
/// engine_trace!("sightline::Scanner", "entity {:?} out of range", key);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::sightline::Engine::log(
            $crate::sightline::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::sightline::Engine::log(
            $crate::sightline::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::sightline::Engine::log(
            $crate::sightline::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::sightline::Engine::log(
            $crate::sightline::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::sightline::Engine::log_detailed(
            $crate::sightline::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
