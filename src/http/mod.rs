//! HTTP server lifecycle.
//!
//! [`HttpServer`] wraps one axum listener (plain HTTP, or HTTPS when a
//! certificate/key pair is configured) and owns its shutdown:
//! - SIGHUP/SIGINT/SIGTERM/SIGQUIT or caller cancellation start a graceful shutdown
//! - in-flight requests get a grace period (30 seconds by default)
//! - past the grace period the process is torn down

mod monitor;
mod server;
mod shutdown;

pub use monitor::{ServerMonitor, ServerState};
pub use server::{
    HttpServer, ServerConfig, TlsKeyPair, DEFAULT_ADDRESS, DEFAULT_GRACE_PERIOD, DEFAULT_PORT,
    FORCED_EXIT_CODE,
};
pub use shutdown::termination_signal;
