//! Log level/format parsing and subscriber setup.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log filter when neither the CLI nor RUST_LOG sets one
pub const DEFAULT_LOG_FILTER: &str = "appkit=info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}', expected text or json")),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Parse one of `error`, `warn`, `info`, `debug`.
///
/// Unknown input yields `(Level::ERROR, false)`.
pub fn parse_level(level: &str) -> (Level, bool) {
    match level {
        "error" => (Level::ERROR, true),
        "warn" => (Level::WARN, true),
        "info" => (Level::INFO, true),
        "debug" => (Level::DEBUG, true),
        _ => (Level::ERROR, false),
    }
}

/// Turn a CLI level into a filter directive; anything else is passed through
/// as a full `EnvFilter` directive string.
pub fn filter_directive(level: &str) -> String {
    match parse_level(level) {
        (level, true) => format!("appkit={}", level.to_string().to_ascii_lowercase()),
        (_, false) => level.to_string(),
    }
}

/// Install the global subscriber.
pub fn init_tracing(filter: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
