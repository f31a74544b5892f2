//! Routes served by the `appkit serve` demo command.

use std::sync::Arc;

use axum::{extract::State, middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::app::Version;
use crate::config::Registry;
use crate::middleware::request_id_layer;

#[derive(Clone)]
struct RouteState {
    version: Arc<Version>,
    registry: Arc<Registry>,
}

/// Router with `/health`, `/version` and `/configurations`.
pub fn create_router(version: Version, registry: Arc<Registry>) -> Router {
    let state = RouteState {
        version: Arc::new(version),
        registry,
    };

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version_details))
        .route("/configurations", get(configurations))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_layer))
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

async fn version_details(State(state): State<RouteState>) -> String {
    state.version.details()
}

/// Names of the registered file configurations, one per line.
async fn configurations(State(state): State<RouteState>) -> String {
    state.registry.file_names().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpServer, ServerState};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_routes_respond() {
        let version = Version {
            semver: "0.0.1".to_string(),
            commit: "deadbeef".to_string(),
            date: "today".to_string(),
        };
        let router = create_router(version, Arc::new(Registry::new()));

        let server = HttpServer::new("127.0.0.1", 0, router);
        let monitor = server.monitor();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(server.run_until(cancel.clone(), std::future::pending::<()>()));

        let addr = monitor.local_addr().await.unwrap();
        let client = reqwest::Client::new();

        let health = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .unwrap();
        assert!(health.headers().contains_key("x-request-id"));
        assert_eq!(health.text().await.unwrap(), "ok");

        let version = client
            .get(format!("http://{addr}/version"))
            .header("x-request-id", "fixed-id")
            .send()
            .await
            .unwrap();
        assert_eq!(version.headers()["x-request-id"], "fixed-id");
        assert!(version.text().await.unwrap().contains("Commit: deadbeef"));

        cancel.cancel();
        assert_eq!(task.await.unwrap(), ServerState::Stopped);
    }
}
