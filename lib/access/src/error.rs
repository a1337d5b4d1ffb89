//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthenticationError`: identity could not be established (session
//!   cookie, service token) or a session could not be issued
//! - `AuthorizationError`: identity is known but insufficient
//! - `StoreError`: credential store failures
//!
//! Variants keep the precise reason for logs and tests. The HTTP layer
//! collapses authentication reasons into one generic response so callers
//! cannot enumerate usernames.

use std::fmt;

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// Session token could not be decoded.
    MalformedSession { reason: String },
    /// Session token signature did not match its payload.
    BadSignature,
    /// Session token was valid but has passed its expiry.
    SessionExpired { username: String },
    /// Service token was absent or rejected by the lookup.
    InvalidServiceToken,
    /// Session signing key could not be used.
    InvalidSigningKey { reason: String },
    /// Password hashing failed.
    HashingFailed { reason: String },
    /// Session lifetime is not positive or pushes expiry out of range.
    InvalidLifetime { reason: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedSession { reason } => write!(f, "malformed session token: {reason}"),
            Self::BadSignature => write!(f, "session token signature mismatch"),
            Self::SessionExpired { username } => {
                write!(f, "session for '{username}' has expired")
            }
            Self::InvalidServiceToken => write!(f, "invalid service token"),
            Self::InvalidSigningKey { reason } => write!(f, "invalid signing key: {reason}"),
            Self::HashingFailed { reason } => write!(f, "password hashing failed: {reason}"),
            Self::InvalidLifetime { reason } => write!(f, "invalid session lifetime: {reason}"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The user is authenticated but not an administrator.
    AdminRequired { username: String },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdminRequired { username } => {
                write!(f, "user '{username}' lacks admin privileges")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Errors from credential store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A username or password failed validation.
    InvalidInput { field: &'static str, reason: String },
    /// A user with this name already exists.
    DuplicateUser { username: String },
    /// No user with this name exists.
    UnknownUser { username: String },
    /// The backing database could not be read or written.
    StorageFailure { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::DuplicateUser { username } => write!(f, "user '{username}' already exists"),
            Self::UnknownUser { username } => write!(f, "user '{username}' not found"),
            Self::StorageFailure { details } => write!(f, "credential storage failure: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expired_display_names_user() {
        let err = AuthenticationError::SessionExpired {
            username: "bobheadxi".to_string(),
        };
        assert!(err.to_string().contains("bobheadxi"));
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn admin_required_display() {
        let err = AuthorizationError::AdminRequired {
            username: "bobheadxi".to_string(),
        };
        assert!(err.to_string().contains("lacks admin"));
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::DuplicateUser {
            username: "jimmyneutron".to_string(),
        };
        assert!(err.to_string().contains("already exists"));

        let err = StoreError::InvalidInput {
            field: "username",
            reason: "must not be empty".to_string(),
        };
        assert_eq!(err.to_string(), "invalid username: must not be empty");
    }
}
