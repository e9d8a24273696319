//! Logging side channel
//!
//! Degraded states (invalid program, missing capability, zero-size upload)
//! are reported here rather than through panics. The sink is a process-wide
//! `Logger`, stderr with colors by default, replaceable with `set_logger`.
//! ERROR entries carry the file and line that emitted them.

use colored::*;
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use chrono::{DateTime, Local};

static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Destination for log entries
///
/// ```no_run
/// use swapgpu::log::{Logger, LogEntry, LogSeverity};
///
/// struct ErrorsOnly;
///
/// impl Logger for ErrorsOnly {
///     fn log(&self, entry: &LogEntry) {
///         if entry.severity == LogSeverity::Error {
///             eprintln!("{}: {}", entry.source, entry.message);
///         }
///     }
/// }
///
/// swapgpu::log::set_logger(ErrorsOnly);
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Emitting type, e.g. "swapgpu::RenderTarget"
    pub source: String,
    pub message: String,
    /// Set on ERROR entries
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Trace,
    Debug,
    Info,
    /// Degraded but functional
    Warn,
    Error,
}

impl LogSeverity {
    /// Fixed-width tag used in rendered lines
    fn tag(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }

    fn colored_tag(self) -> ColoredString {
        let tag = self.tag();
        match self {
            LogSeverity::Trace => tag.bright_black(),
            LogSeverity::Debug => tag.cyan(),
            LogSeverity::Info => tag.green(),
            LogSeverity::Warn => tag.yellow(),
            LogSeverity::Error => tag.red().bold(),
        }
    }
}

/// Writes `[timestamp] [SEVERITY] [source] message (file:line)` to stderr
pub struct DefaultLogger;

impl DefaultLogger {
    /// The line `log` prints, without colors
    pub fn format_plain(entry: &LogEntry) -> String {
        render(entry, entry.severity.tag(), &entry.source)
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let line = render(entry, entry.severity.colored_tag(), entry.source.bright_blue());
        eprintln!("{}", line);
    }
}

fn render(entry: &LogEntry, severity: impl std::fmt::Display, source: impl std::fmt::Display) -> String {
    let datetime: DateTime<Local> = entry.timestamp.into();
    let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");
    match (entry.file, entry.line) {
        (Some(file), Some(line)) => format!(
            "[{}] [{}] [{}] {} ({}:{})",
            timestamp, severity, source, entry.message, file, line
        ),
        _ => format!("[{}] [{}] [{}] {}", timestamp, severity, source, entry.message),
    }
}

// ===== LOGGER API =====

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Route every later entry to `new_logger`
pub fn set_logger<L: Logger + 'static>(new_logger: L) {
    if let Ok(mut lock) = logger().write() {
        *lock = Box::new(new_logger);
    }
}

/// Go back to `DefaultLogger`
pub fn reset_logger() {
    if let Ok(mut lock) = logger().write() {
        *lock = Box::new(DefaultLogger);
    }
}

fn dispatch(severity: LogSeverity, source: &str, message: String, location: Option<(&'static str, u32)>) {
    if let Ok(lock) = logger().read() {
        lock.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: location.map(|(file, _)| file),
            line: location.map(|(_, line)| line),
        });
    }
}

/// Emit an entry without a source location (backs the `gpu_*!` macros)
pub fn log(severity: LogSeverity, source: &str, message: String) {
    dispatch(severity, source, message, None);
}

/// Emit an entry tagged with `file:line`
pub fn log_detailed(severity: LogSeverity, source: &str, message: String, file: &'static str, line: u32) {
    dispatch(severity, source, message, Some((file, line)));
}

// ===== LOGGING MACROS =====

#[doc(hidden)]
#[macro_export]
macro_rules! gpu_log {
    ($severity:ident, $source:expr, $($arg:tt)*) => {
        $crate::log::log($crate::log::LogSeverity::$severity, $source, format!($($arg)*))
    };
}

/// ```ignore
/// gpu_trace!("swapgpu::Drawable", "Binding vertex array {:?}", vertex_array);
/// ```
#[macro_export]
macro_rules! gpu_trace {
    ($source:expr, $($arg:tt)*) => { $crate::gpu_log!(Trace, $source, $($arg)*) };
}

#[macro_export]
macro_rules! gpu_debug {
    ($source:expr, $($arg:tt)*) => { $crate::gpu_log!(Debug, $source, $($arg)*) };
}

#[macro_export]
macro_rules! gpu_info {
    ($source:expr, $($arg:tt)*) => { $crate::gpu_log!(Info, $source, $($arg)*) };
}

#[macro_export]
macro_rules! gpu_warn {
    ($source:expr, $($arg:tt)*) => { $crate::gpu_log!(Warn, $source, $($arg)*) };
}

/// ERROR with the caller's file:line
#[macro_export]
macro_rules! gpu_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR and build an `Error::InvalidResource` carrying the message
#[macro_export]
macro_rules! gpu_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::log::log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::error::Error::InvalidResource(message)
    }};
}

/// Log an ERROR and return early with `Err(Error::InvalidResource(..))`
#[macro_export]
macro_rules! gpu_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::gpu_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
