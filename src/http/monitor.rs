//! Observable server lifecycle state.

use std::fmt;
use std::net::SocketAddr;

use axum_server::Handle;
use tokio::sync::watch;

/// Lifecycle of one [`HttpServer`](super::HttpServer).
///
/// `Created → Running → ShuttingDown → {Stopped, ForcedExit}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Configured, not accepting connections yet
    Created,
    /// The listener task has been launched
    Running,
    /// A termination trigger was observed and the grace period is running
    ShuttingDown,
    /// The listener task ended within the grace period.
    ///
    /// This is also reported when the listener task failed or panicked while
    /// draining (the failure is logged), so it does not guarantee every
    /// connection closed cleanly.
    Stopped,
    /// The grace period elapsed and the forced-exit path ran
    ForcedExit,
}

impl ServerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ServerState::Stopped | ServerState::ForcedExit)
    }
}

/// Read-only view on a running server.
///
/// Obtained from [`HttpServer::monitor`](super::HttpServer::monitor) before
/// `run` consumes the server.
#[derive(Clone)]
pub struct ServerMonitor {
    state: watch::Receiver<ServerState>,
    start_failed: watch::Receiver<bool>,
    handle: Handle,
}

impl fmt::Debug for ServerMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerMonitor")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl ServerMonitor {
    pub(super) fn new(
        state: watch::Receiver<ServerState>,
        start_failed: watch::Receiver<bool>,
        handle: Handle,
    ) -> Self {
        Self {
            state,
            start_failed,
            handle,
        }
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Wait until the server reaches `target` or a terminal state.
    pub async fn wait_for(&mut self, target: ServerState) -> ServerState {
        let reached = self
            .state
            .wait_for(|s| *s == target || s.is_terminal())
            .await
            .map(|state| *state);
        reached.unwrap_or_else(|_| *self.state.borrow())
    }

    /// Address the listener is bound to, once it is listening.
    ///
    /// Returns `None` when the listener could not start: unresolvable
    /// address, unreadable TLS key pair or a failed bind. Also `None` if the
    /// server was dropped before it ever listened.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let mut start_failed = self.start_failed.clone();
        tokio::select! {
            biased;
            addr = self.handle.listening() => addr,
            _ = start_failed.wait_for(|failed| *failed) => None,
        }
    }

    /// Number of connections currently open on the listener.
    pub fn connection_count(&self) -> usize {
        self.handle.connection_count()
    }
}
