//! HTTP/HTTPS server lifecycle controller.
//!
//! [`HttpServer`] runs an axum router on a background listener task and
//! coordinates shutdown: the first of {termination signal, caller
//! cancellation} starts a graceful shutdown, and if the listener has not
//! drained within the grace period the forced-exit hook runs (by default the
//! process exits with status 1).

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use serde::Deserialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::ServerError;

use super::monitor::{ServerMonitor, ServerState};
use super::shutdown;

/// Time given to in-flight requests once shutdown starts.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Default listen address (all interfaces).
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Exit status used by the default forced-exit hook.
pub const FORCED_EXIT_CODE: i32 = 1;

type ForcedExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Listener settings as read from a configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_address")]
    pub address: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    /// PEM certificate chain; TLS needs both this and `key_path`
    #[serde(default)]
    pub cert_path: Option<String>,
    /// PEM private key
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default = "ServerConfig::default_grace_period")]
    pub grace_period_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
            port: Self::default_port(),
            cert_path: None,
            key_path: None,
            grace_period_seconds: Self::default_grace_period(),
        }
    }
}

impl ServerConfig {
    fn default_address() -> String {
        DEFAULT_ADDRESS.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_PORT
    }

    fn default_grace_period() -> u64 {
        DEFAULT_GRACE_PERIOD.as_secs()
    }
}

/// Certificate and key file paths for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsKeyPair {
    pub cert_path: String,
    pub key_path: String,
}

/// One HTTP(S) listener and its shutdown policy.
pub struct HttpServer {
    address: String,
    port: u16,
    router: Router,
    tls: Option<TlsKeyPair>,
    grace_period: Duration,
    forced_exit: ForcedExitHook,
    handle: Handle,
    state: watch::Sender<ServerState>,
    start_failed: watch::Sender<bool>,
}

impl fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpServer")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("grace_period", &self.grace_period)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl HttpServer {
    /// Plain HTTP server on `address:port`.
    pub fn new(address: impl Into<String>, port: u16, router: Router) -> Self {
        let (state, _) = watch::channel(ServerState::Created);
        let (start_failed, _) = watch::channel(false);
        Self {
            address: address.into(),
            port,
            router,
            tls: None,
            grace_period: DEFAULT_GRACE_PERIOD,
            forced_exit: Arc::new(exit_process),
            handle: Handle::new(),
            state,
            start_failed,
        }
    }

    /// HTTPS server; TLS is enabled only when both paths are non-empty.
    pub fn with_tls(
        address: impl Into<String>,
        port: u16,
        cert_path: impl Into<String>,
        key_path: impl Into<String>,
        router: Router,
    ) -> Self {
        let cert_path = cert_path.into();
        let key_path = key_path.into();
        let mut server = Self::new(address, port, router);
        if !cert_path.is_empty() && !key_path.is_empty() {
            server.tls = Some(TlsKeyPair {
                cert_path,
                key_path,
            });
        }
        server
    }

    pub fn from_config(config: &ServerConfig, router: Router) -> Self {
        Self::with_tls(
            config.address.clone(),
            config.port,
            config.cert_path.clone().unwrap_or_default(),
            config.key_path.clone().unwrap_or_default(),
            router,
        )
        .grace_period(Duration::from_secs(config.grace_period_seconds))
    }

    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Replace the action taken when the grace period runs out.
    ///
    /// The hook receives the exit status. The default calls
    /// [`std::process::exit`]; if a hook returns, the listener is stopped
    /// immediately and `run` reports [`ServerState::ForcedExit`].
    pub fn on_forced_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.forced_exit = Arc::new(hook);
        self
    }

    pub fn use_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn monitor(&self) -> ServerMonitor {
        ServerMonitor::new(
            self.state.subscribe(),
            self.start_failed.subscribe(),
            self.handle.clone(),
        )
    }

    fn url(&self) -> String {
        let scheme = if self.use_tls() { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.address, self.port)
    }

    /// Serve until a termination signal arrives or `cancel` fires.
    ///
    /// Returns the terminal state.
    pub async fn run(self, cancel: CancellationToken) -> ServerState {
        self.run_until(cancel, shutdown::termination_signal()).await
    }

    /// Like [`run`](Self::run), with `signal` standing in for OS signals.
    pub async fn run_until<F>(self, cancel: CancellationToken, signal: F) -> ServerState
    where
        F: Future<Output = ()>,
    {
        let url = self.url();
        let server_cancel = cancel.child_token();

        tracing::info!(address = %url, "Server starting");
        self.state.send_replace(ServerState::Running);
        let mut listener = tokio::spawn(listen(
            self.address.clone(),
            self.port,
            self.router.clone(),
            self.tls.clone(),
            self.handle.clone(),
            self.start_failed.clone(),
        ));

        tokio::select! {
            _ = signal => {}
            _ = server_cancel.cancelled() => {
                tracing::debug!(address = %url, "Server cancelled by caller");
            }
        }

        self.state.send_replace(ServerState::ShuttingDown);
        tracing::info!(
            address = %url,
            grace_period = ?self.grace_period,
            "Shutting down server"
        );
        self.handle.graceful_shutdown(None);

        match tokio::time::timeout(self.grace_period, &mut listener).await {
            Ok(Ok(())) => {
                tracing::info!(address = %url, "Server stopped");
            }
            Ok(Err(e)) => {
                let err = ServerError::Shutdown(e.to_string());
                tracing::error!(address = %url, error = %err, "Could not shutdown server");
            }
            Err(_) => {
                let err = ServerError::ShutdownTimeout(self.grace_period);
                tracing::error!(address = %url, error = %err, "Graceful shutdown timed out");
                (self.forced_exit)(FORCED_EXIT_CODE);

                self.handle.shutdown();
                listener.abort();
                self.state.send_replace(ServerState::ForcedExit);
                return ServerState::ForcedExit;
            }
        }

        server_cancel.cancel();
        self.state.send_replace(ServerState::Stopped);
        ServerState::Stopped
    }
}

fn exit_process(code: i32) {
    std::process::exit(code)
}

/// Listener task body. Start-up failures are logged, not returned: nobody is
/// waiting on this task until shutdown. They are flagged on `start_failed`
/// because resolve and TLS errors never reach the `Handle`.
async fn listen(
    address: String,
    port: u16,
    router: Router,
    tls: Option<TlsKeyPair>,
    handle: Handle,
    start_failed: watch::Sender<bool>,
) {
    if let Err(e) = serve(&address, port, router, tls, handle).await {
        tracing::error!(address = %address, port, error = %e, "Could not start server");
        start_failed.send_replace(true);
    }
}

async fn serve(
    address: &str,
    port: u16,
    router: Router,
    tls: Option<TlsKeyPair>,
    handle: Handle,
) -> Result<(), ServerError> {
    let addr = resolve(address, port).await?;
    let service = router.into_make_service();

    let result = match tls {
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(service)
                .await
        }
        Some(pair) => {
            // Several rustls providers can be compiled in; pin one
            let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

            let config = RustlsConfig::from_pem_file(&pair.cert_path, &pair.key_path)
                .await
                .map_err(ServerError::Tls)?;
            tracing::debug!(cert = %pair.cert_path, key = %pair.key_path, "Loaded TLS key pair");

            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(service)
                .await
        }
    };

    result.map_err(|source| ServerError::Bind { addr, source })
}

async fn resolve(address: &str, port: u16) -> Result<SocketAddr, ServerError> {
    let host = if address.is_empty() { DEFAULT_ADDRESS } else { address };
    tokio::net::lookup_host((host, port))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ServerError::InvalidAddress(format!("{host}:{port}")))
}
