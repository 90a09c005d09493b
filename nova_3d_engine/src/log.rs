//! Internal logging system for the Nova3D engine
//!
//! This module provides:
//! - Customizable logger via the Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - A bridge to the `log` crate facade for applications using env_logger
//! - File and line information for ERROR logs

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Implement this trait to route engine logs somewhere else (file, overlay, test capture).
///
/// # Example
///
/// ```no_run
/// use nova_3d_engine::nova3d::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "nova3d::gpu", "nova3d::d3d12")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Very verbose information (per-frame fence values, barriers)
    Trace,

    /// Development information (heap placements, adapter list)
    Debug,

    /// Important events (adapter chosen, swap chain resized)
    Info,

    /// Potential issues (frame dropped, feature level fallback)
    Warn,

    /// Failures, logged with file:line
    Error,
}

impl LogSeverity {
    /// Matching level of the `log` crate facade
    pub fn to_log_level(self) -> ::log::Level {
        match self {
            LogSeverity::Trace => ::log::Level::Trace,
            LogSeverity::Debug => ::log::Level::Debug,
            LogSeverity::Info => ::log::Level::Info,
            LogSeverity::Warn => ::log::Level::Warn,
            LogSeverity::Error => ::log::Level::Error,
        }
    }
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl DefaultLogger {
    /// Render an entry the way it is printed (without colors when disabled)
    pub fn format_entry(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            )
        } else {
            format!("[{}] [{}] [{}] {}", timestamp, severity_str, source, entry.message)
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        println!("{}", Self::format_entry(entry));
    }
}

/// Logger forwarding engine entries to the `log` crate facade
///
/// Install this when the application already initializes a `log` backend
/// (env_logger in the demo). The entry source becomes the log target.
pub struct LogFacadeLogger;

impl Logger for LogFacadeLogger {
    fn log(&self, entry: &LogEntry) {
        let level = entry.severity.to_log_level();
        match (entry.file, entry.line) {
            (Some(file), Some(line)) => {
                ::log::log!(target: entry.source.as_str(), level, "{} ({}:{})", entry.message, file, line)
            }
            _ => ::log::log!(target: entry.source.as_str(), level, "{}", entry.message),
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, per-frame details)
///
/// # Example
///
/// ```no_run
/// # use nova_3d_engine::engine_trace;
/// engine_trace!("nova3d::gpu::fence", "Signaled fence {} with {}", 0, 12);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova3d::Engine::log(
            $crate::nova3d::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova3d::Engine::log(
            $crate::nova3d::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
///
/// # Example
///
/// ```no_run
/// # use nova_3d_engine::engine_info;
/// engine_info!("nova3d::gpu", "Swap chain resized to {}x{}", 1920, 1080);
/// ```
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova3d::Engine::log(
            $crate::nova3d::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova3d::Engine::log(
            $crate::nova3d::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::nova3d::Engine::log_detailed(
            $crate::nova3d::log::LogSeverity::Error,
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
