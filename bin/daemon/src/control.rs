//! Daemon control routes: status, health and remote shutdown.

use axum::{
    Extension, Json,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use inertia_access::Principal;
use inertia_core::MessageResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::gateway::Gateway;

/// Body of the `/status` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
}

/// Handle used to request and await a graceful shutdown.
///
/// A request made before anyone waits is not lost.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests shutdown.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

/// Registers the control routes on `gateway`.
#[must_use]
pub fn attach(gateway: Gateway, shutdown: Shutdown) -> Gateway {
    gateway
        .attach_public("/status", get(status))
        .attach_public("/health", get(health))
        .attach_admin_restricted("/shutdown", post(request_shutdown).layer(Extension(shutdown)))
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn health() -> &'static str {
    "ok"
}

async fn request_shutdown(
    Extension(shutdown): Extension<Shutdown>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    if shutdown.is_triggered() {
        info!("Shutdown already in progress");
    } else {
        warn!(
            by = principal.username().unwrap_or("service-token"),
            "Shutdown requested"
        );
        shutdown.trigger();
    }
    (
        StatusCode::ACCEPTED,
        Json(MessageResponse::new("Shutting down")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AppState, CredentialStore};
    use crate::config::SessionConfig;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use inertia_access::{ServiceTokenVerifier, SessionCodec, SharedSecret, SigningKey};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_gateway(dir: &TempDir, shutdown: Shutdown) -> axum::Router {
        let store = CredentialStore::open(&dir.path().join("users.db"), 5)
            .await
            .expect("open store");
        let config = SessionConfig::default();
        let state = Arc::new(AppState::new(
            store,
            SessionCodec::new(SigningKey::generate(), config.lifetime()),
            ServiceTokenVerifier::new(SharedSecret::new(Some("token".to_string()))),
            config,
        ));
        attach(Gateway::new(state), shutdown).into_router()
    }

    #[tokio::test]
    async fn trigger_before_wait_is_observed() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait())
            .await
            .expect("wait resolves");
    }

    #[tokio::test]
    async fn status_and_health_are_public() {
        let dir = TempDir::new().expect("tempdir");
        let router = test_gateway(&dir, Shutdown::new()).await;

        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/status").body(Body::empty()).expect("request"))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let status: StatusResponse = serde_json::from_slice(&body).expect("decode");
        assert_eq!(status.name, "inertia-daemon");
    }

    #[tokio::test]
    async fn shutdown_requires_admin() {
        let dir = TempDir::new().expect("tempdir");
        let shutdown = Shutdown::new();
        let router = test_gateway(&dir, shutdown.clone()).await;

        let response = router
            .clone()
            .oneshot(Request::post("/shutdown").body(Body::empty()).expect("request"))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!shutdown.is_triggered());

        let response = router
            .oneshot(
                Request::post("/shutdown")
                    .header(header::AUTHORIZATION, "Bearer token")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(shutdown.is_triggered());
    }
}
