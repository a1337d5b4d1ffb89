//! Authentication module for the inertia daemon.
//!
//! This module provides:
//! - The SQLite-backed credential store
//! - Extractors and middleware enforcing route trust levels
//! - The built-in `/user/*` control routes
//!
//! # Session Model
//!
//! Browser sessions are stateless, HMAC-signed cookies (see
//! [`inertia_access::SessionCodec`]). The gateway re-reads the user record on
//! every restricted request, so removing a user or revoking admin takes
//! effect immediately, but logout only asks the browser to drop its cookie.

pub mod middleware;
pub mod routes;
pub mod store;

use crate::config::SessionConfig;
use inertia_access::{ServiceTokenVerifier, SessionCodec};

pub use middleware::{AuthRejection, RequireAdmin, RequireAuth};
pub use store::{CredentialCheck, CredentialStore, RejectReason};

/// Name of the cookie carrying the session token. Shared with the CLI and
/// web client.
pub const SESSION_COOKIE: &str = "ubclaunchpad-inertia";

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Credential store.
    pub store: CredentialStore,
    /// Session signer and verifier.
    pub sessions: SessionCodec,
    /// Service-token verifier for CLI callers.
    pub service_tokens: ServiceTokenVerifier,
    /// Cookie settings.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        store: CredentialStore,
        sessions: SessionCodec,
        service_tokens: ServiceTokenVerifier,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            service_tokens,
            session_config,
        }
    }
}
