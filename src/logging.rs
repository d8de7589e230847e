/// Structured logging for the stats aggregator
///
/// Provides context-rich logging tagged with the pipeline component and an
/// optional variable/place identifier, with timestamps and severity levels.
/// Supports console output and an append-only log file.
///
/// Console lines always go to stderr; stdout belongs to the program's own
/// output (the CLI prints JSON there).

use crate::model::StatsError;
use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(StatsError::ConfigError(format!("unknown log level '{}'", other))),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Fetch,
    PerCapita,
    Dates,
    Config,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Fetch => write!(f, "FETCH"),
            Component::PerCapita => write!(f, "CAPITA"),
            Component::Dates => write!(f, "DATES"),
            Component::Config => write!(f, "CONFIG"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the backend does not know the variable or place
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, component: &Component, context: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        let context_part = context.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, component, context_part, message
        );

        if let Some(line) = self.console_line(level, component, &context_part, message, &log_entry) {
            eprintln!("{}", line);
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    /// Console rendering of one entry, or `None` when the console skips it.
    fn console_line(
        &self,
        level: LogLevel,
        component: &Component,
        context_part: &str,
        message: &str,
        log_entry: &str,
    ) -> Option<String> {
        if self.console_timestamps {
            return Some(log_entry.to_string());
        }
        match level {
            LogLevel::Error => Some(format!("   ✗ {}{}: {}", component, context_part, message)),
            LogLevel::Warning => Some(format!("   ⚠ {}{}: {}", component, context_part, message)),
            LogLevel::Info => Some(format!("   {}", message)),
            LogLevel::Debug => None, // Skip debug in non-timestamp mode
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, component: Component, context: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &component, context, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, context: Option<&str>, message: &str) {
    emit(LogLevel::Info, component, context, message);
}

/// Log a warning message
pub fn warn(component: Component, context: Option<&str>, message: &str) {
    emit(LogLevel::Warning, component, context, message);
}

/// Log an error message
pub fn error(component: Component, context: Option<&str>, message: &str) {
    emit(LogLevel::Error, component, context, message);
}

/// Log a debug message
pub fn debug(component: Component, context: Option<&str>, message: &str) {
    emit(LogLevel::Debug, component, context, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a stats API failure by its error kind
pub fn classify_fetch_failure(err: &StatsError) -> FailureType {
    match err {
        // The endpoint answers 404 for variables it has never heard of
        StatsError::HttpError(404) => FailureType::Expected,
        StatsError::HttpError(code) if *code >= 500 => FailureType::Unexpected,
        StatsError::HttpError(_) => FailureType::Unknown,
        StatsError::RequestFailed(msg) if msg.contains("timed out") => FailureType::Unexpected,
        StatsError::RequestFailed(_) => FailureType::Unknown,
        // Parse errors suggest API changes or bugs
        StatsError::ParseError(_) => FailureType::Unexpected,
        StatsError::ConfigError(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a stats API failure with automatic classification
pub fn log_fetch_failure(variable: &str, operation: &str, err: &StatsError) {
    let failure_type = classify_fetch_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(Component::Fetch, Some(variable), &message),
        FailureType::Unexpected => error(Component::Fetch, Some(variable), &message),
        FailureType::Unknown => warn(Component::Fetch, Some(variable), &message),
    }
}

/// Log a summary of one fetch cycle
pub fn log_fetch_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Fetch complete: {}/{} variables successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(Component::Fetch, None, &message);
    } else if successful == 0 {
        error(Component::Fetch, None, &message);
    } else {
        warn(Component::Fetch, None, &message);
    }
}
