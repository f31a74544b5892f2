//! Error taxonomy shared by the registry, the server controller and the
//! application bootstrap.
//!
//! Registration and lookup errors are returned to the caller untouched; the
//! library never logs them. Lifecycle errors happen on background tasks and are
//! logged by the server controller instead of being returned.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Errors raised while creating, registering or reading configuration sources.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("environment configuration does not define keys")]
    EmptyKeySet,

    #[error("cannot bind environment key {0:?}")]
    InvalidEnvironmentKey(String),

    #[error("environment is already registered")]
    EnvironmentAlreadyRegistered,

    #[error("environment is not registered")]
    EnvironmentNotRegistered,

    #[error("configuration '{0}' already exists")]
    FileConfigurationExists(String),

    #[error("configuration '{0}' not found")]
    FileConfigurationNotFound(String),

    #[error("configuration '{0}' is still loading")]
    FileConfigurationPending(String),

    #[error("configuration '{name}' failed to load: {source}")]
    FileConfigurationUnusable {
        name: String,
        #[source]
        source: Arc<ConfigurationError>,
    },

    #[error("config file '{file}' not found in {searched:?}")]
    FileNotFound { file: String, searched: Vec<PathBuf> },

    #[error("unsupported config type '{0}'")]
    UnsupportedFormat(String),

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error("failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        ConfigurationError::Extract(Box::new(e))
    }
}

/// Errors raised by the server lifecycle controller.
///
/// None of these cross the `run` boundary: they are produced on background
/// tasks and reported through `tracing`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("could not start server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load TLS key pair: {0}")]
    Tls(#[source] std::io::Error),

    #[error("could not shutdown server: {0}")]
    Shutdown(String),

    #[error("graceful shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Errors raised while building the outbound HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Top-level error for the application bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
