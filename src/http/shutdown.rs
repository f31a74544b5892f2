//! Termination signal handling.
//!
//! SIGHUP, SIGINT, SIGTERM and SIGQUIT all request shutdown. A handler that
//! cannot be installed is logged and simply never fires.

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Resolve once the process receives a termination signal.
#[cfg(unix)]
pub async fn termination_signal() {
    let mut hangup = install(SignalKind::hangup(), "SIGHUP");
    let mut interrupt = install(SignalKind::interrupt(), "SIGINT");
    let mut terminate = install(SignalKind::terminate(), "SIGTERM");
    let mut quit = install(SignalKind::quit(), "SIGQUIT");

    let name = tokio::select! {
        _ = recv(&mut hangup) => "SIGHUP",
        _ = recv(&mut interrupt) => "SIGINT",
        _ = recv(&mut terminate) => "SIGTERM",
        _ = recv(&mut quit) => "SIGQUIT",
    };

    tracing::info!(signal = name, "Received termination signal");
}

#[cfg(unix)]
fn install(kind: SignalKind, name: &'static str) -> Option<Signal> {
    match signal(kind) {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::error!(signal = name, error = %e, "Failed to install signal handler");
            None
        }
    }
}

#[cfg(unix)]
async fn recv(stream: &mut Option<Signal>) {
    if let Some(stream) = stream {
        if stream.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Resolve once the process receives Ctrl+C.
#[cfg(not(unix))]
pub async fn termination_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "ctrl-c", "Received termination signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await
        }
    }
}
