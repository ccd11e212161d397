//! Tracing subscriber setup for the command-line tool
//!
//! Log output always goes to stderr. Stdout is reserved for the single result
//! line a `run` child prints for its parent.

use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{BenchError, Result};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line output with colors, for interactive use
    Pretty,
    /// One line per event
    #[default]
    Compact,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is unset
    pub level: Level,
    pub format: LogFormat,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: Level::INFO, format: LogFormat::Compact, with_ansi: true }
    }
}

impl LogConfig {
    pub fn new(level: Level) -> Self {
        Self { level, ..Default::default() }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("framebench={}", level_name(self.level))))
    }
}

/// Install the global subscriber.
///
/// Calling this again after a subscriber is installed is a no-op.
pub fn init(config: &LogConfig) -> Result<()> {
    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_ansi(config.with_ansi)
            .with_filter(config.filter())
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(config.with_ansi)
            .with_target(false)
            .with_filter(config.filter())
            .boxed(),
    };

    match tracing_subscriber::registry().with(layer).try_init() {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(BenchError::config(format!("failed to initialize logging: {e}"))),
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Parse a level name as accepted on the command line.
pub fn parse_level(name: &str) -> Result<Level> {
    name.parse::<Level>()
        .map_err(|_| BenchError::config(format!("invalid log level '{name}'")))
}
