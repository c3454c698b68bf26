//! Diagnostic output plumbing.
//!
//! The library emits its diagnostics (apply, broadcast, persist)
//! through the `log` facade; this module supplies the stderr backend
//! and the verbosity knob, so an embedding binary gets operator-visible
//! output from a single `init_logger` call in `main`.

use std::env;
use std::fmt;

use log::LevelFilter;

/// How much diagnostic output to emit.
///
/// Levels compare by verbosity, so `Quiet < Normal < Verbose` holds and
/// "at least normal" can be written as a plain comparison.
///
/// # Examples
///
/// ```
/// use confreg::LogLevel;
///
/// assert!(LogLevel::Quiet < LogLevel::Verbose);
/// assert_eq!(LogLevel::Normal.to_string(), "normal");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Errors only.
    Quiet,
    /// Errors and warnings.
    Normal,
    /// Everything down to debug traces.
    Verbose,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quiet => write!(f, "quiet"),
            Self::Normal => write!(f, "normal"),
            Self::Verbose => write!(f, "verbose"),
        }
    }
}

impl LogLevel {
    /// Parse a level name, ignoring case.
    ///
    /// The accepted names are the `Display` forms: `quiet`, `normal`
    /// and `verbose`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the rejected input.
    ///
    /// # Examples
    ///
    /// ```
    /// use confreg::LogLevel;
    ///
    /// assert_eq!(LogLevel::parse("Verbose").unwrap(), LogLevel::Verbose);
    /// assert!(LogLevel::parse("chatty").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "normal" => Ok(Self::Normal),
            "verbose" => Ok(Self::Verbose),
            _ => Err(format!("invalid log level: {s}")),
        }
    }

    /// The `log` facade filter this level maps to.
    #[must_use]
    pub const fn filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Error,
            Self::Normal => LevelFilter::Warn,
            Self::Verbose => LevelFilter::Debug,
        }
    }
}

/// Facade backend that writes `level: message` lines to stderr.
///
/// Records above the configured verbosity are dropped in `enabled`.
pub struct Logger {
    level: LogLevel,
}

impl Logger {
    /// A logger at the given verbosity.
    #[must_use]
    pub const fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// The configured verbosity.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Normal)
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.level.filter()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the stderr backend and resolve the verbosity.
///
/// The level comes from, in order: the `verbose` flag, then the `quiet`
/// flag, then a valid `CONFREG_LOG_MODE` environment value, then
/// `Normal`. A second call is a no-op apart from returning the resolved
/// level, since the facade backend can only be installed once per
/// process.
///
/// # Examples
///
/// ```
/// use confreg::{init_logger, LogLevel};
///
/// let level = init_logger(true, false);
/// assert_eq!(level, LogLevel::Verbose);
/// ```
pub fn init_logger(verbose: bool, quiet: bool) -> LogLevel {
    let level = if verbose {
        LogLevel::Verbose
    } else if quiet {
        LogLevel::Quiet
    } else {
        env::var("CONFREG_LOG_MODE")
            .ok()
            .and_then(|value| LogLevel::parse(&value).ok())
            .unwrap_or(LogLevel::Normal)
    };

    if log::set_boxed_logger(Box::new(Logger::new(level))).is_ok() {
        log::set_max_level(level.filter());
    }

    level
}
