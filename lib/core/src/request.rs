//! Request and response bodies for the daemon's `/user` endpoints.
//!
//! Field names are part of the wire contract with the CLI and the web client
//! and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `login`, `adduser` and `removeuser` requests.
///
/// `removeuser` only sends `username`, so the other fields default.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserRequest {
    /// The account name.
    pub username: String,
    /// The plaintext password, only ever sent over the wire.
    #[serde(default)]
    pub password: String,
    /// Whether the account should be created with admin privileges.
    #[serde(default)]
    pub admin: bool,
}

impl UserRequest {
    /// Creates a request carrying credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>, admin: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            admin,
        }
    }
}

impl fmt::Debug for UserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("admin", &self.admin)
            .finish()
    }
}

/// A plain acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of a successful `listusers` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<String>,
}
