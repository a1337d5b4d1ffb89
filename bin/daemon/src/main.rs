use axum::Router;
use inertia_access::{ServiceTokenVerifier, SessionCodec};
use inertia_daemon::{
    auth::{AppState, CredentialStore},
    config::DaemonConfig,
    control::{self, Shutdown},
    gateway::Gateway,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = match DaemonConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(?config, "Loaded configuration");

    let signing_key = match config.session.signing_key() {
        Ok(key) => key,
        Err(report) => {
            error!(error = %report.current_context(), "Invalid session signing key");
            return ExitCode::FAILURE;
        }
    };
    if config.session.signing_key.is_none() {
        warn!("No session signing key configured; sessions end when the daemon restarts");
    }

    let store = match CredentialStore::open(&config.users_db, config.session.max_login_attempts)
        .await
    {
        Ok(store) => store,
        Err(report) => {
            error!(error = %report.current_context(), "Failed to open credential store");
            return ExitCode::FAILURE;
        }
    };

    let service_token = config.service_token_lookup();
    let service_tokens = if service_token.is_configured() {
        ServiceTokenVerifier::new(service_token)
    } else {
        warn!("No service token configured; admin routes accept admin sessions only");
        ServiceTokenVerifier::deny_all()
    };

    // Create application state
    let state = Arc::new(AppState::new(
        store,
        SessionCodec::new(signing_key, config.session.lifetime()),
        service_tokens,
        config.session.clone(),
    ));

    let shutdown = Shutdown::new();
    let (gateway, routes) = control::attach(Gateway::new(state.clone()), shutdown.clone())
        .into_parts();
    for (path, level) in routes.iter() {
        debug!(path, %level, "Registered route");
    }

    let mut app = match config.mount_prefix() {
        Some(prefix) => {
            info!(prefix = %prefix, "Mounting gateway under prefix");
            Router::new().nest(&prefix, gateway)
        }
        None => gateway,
    };
    if let Some(web_root) = &config.web_root {
        info!(web_root = %web_root.display(), "Serving web client");
        app = app.fallback_service(ServeDir::new(web_root));
    }
    let app = app.layer(TraceLayer::new_for_http());

    let listener = match TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %config.bind_addr, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!("listening on http://{}", config.bind_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await;

    // In-flight requests have drained once `serve` returns.
    if let Err(report) = state.store.close().await {
        error!(error = %report.current_context(), "Failed to close credential store");
    }

    match served {
        Ok(()) => {
            info!("Daemon stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

/// Resolves on SIGINT, SIGTERM or a `/shutdown` request.
async fn shutdown_signal(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received interrupt, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
        () = shutdown.wait() => info!("Shutdown requested, shutting down"),
    }
}
