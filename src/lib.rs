//! appkit - bootstrap kit for command-line applications.
//!
//! Wires a clap command line to a configuration registry (one environment
//! source plus named file sources) and provides an HTTP(S) server whose
//! shutdown is driven by termination signals with a bounded grace period.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod paths;
pub mod routes;

pub use app::Application;
pub use config::Registry;
pub use error::*;
pub use http::{HttpServer, ServerState};
