//! HTTP-facing error type for daemon handlers.
//!
//! Domain errors carry precise reasons for logging; `ApiError` decides what
//! the caller is allowed to learn and which status it gets.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inertia_access::StoreError;
use inertia_core::MessageResponse;
use rootcause::prelude::Report;
use std::fmt;

/// Errors returned by the `/user` handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Request body or fields were malformed.
    InvalidInput { reason: String },
    /// Credentials, session or service token were not accepted.
    AuthenticationFailed,
    /// The user already exists.
    DuplicateUser { username: String },
    /// The user does not exist.
    UnknownUser { username: String },
    /// The credential store failed.
    StorageFailure { details: String },
    /// Any other server-side failure, such as signing a session.
    Internal { details: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { reason } => write!(f, "invalid request: {reason}"),
            Self::AuthenticationFailed => write!(f, "authentication failed"),
            Self::DuplicateUser { username } => write!(f, "user '{username}' already exists"),
            Self::UnknownUser { username } => write!(f, "user '{username}' not found"),
            Self::StorageFailure { details } => write!(f, "storage failure: {details}"),
            Self::Internal { details } => write!(f, "internal error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Returns the status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            Self::DuplicateUser { .. } => StatusCode::CONFLICT,
            Self::UnknownUser { .. } => StatusCode::NOT_FOUND,
            Self::StorageFailure { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the message shown to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::StorageFailure { .. } | Self::Internal { .. } => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput { field, reason } => Self::InvalidInput {
                reason: format!("{field} {reason}"),
            },
            StoreError::DuplicateUser { username } => Self::DuplicateUser { username },
            StoreError::UnknownUser { username } => Self::UnknownUser { username },
            StoreError::StorageFailure { details } => Self::StorageFailure { details },
        }
    }
}

impl From<Report<StoreError>> for ApiError {
    fn from(report: Report<StoreError>) -> Self {
        Self::from(report.current_context().clone())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::StorageFailure { details } => {
                tracing::error!(details = %details, "Credential store failure");
            }
            Self::Internal { details } => {
                tracing::error!(details = %details, "Request failed");
            }
            _ => {}
        }
        (self.status(), Json(MessageResponse::new(self.public_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (
                StoreError::InvalidInput {
                    field: "username",
                    reason: "must not be empty".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::DuplicateUser {
                    username: "bob".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                StoreError::UnknownUser {
                    username: "bob".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                StoreError::StorageFailure {
                    details: "disk full".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (store_error, status) in cases {
            assert_eq!(ApiError::from(store_error).status(), status);
        }
    }

    #[test]
    fn storage_details_are_not_exposed() {
        let err = ApiError::StorageFailure {
            details: "/var/lib/inertia/users.db: permission denied".to_string(),
        };
        assert!(!err.public_message().contains("permission denied"));
    }

    #[test]
    fn invalid_input_names_the_field() {
        let err = ApiError::from(StoreError::InvalidInput {
            field: "password",
            reason: "must not be empty".to_string(),
        });
        assert_eq!(err.to_string(), "invalid request: password must not be empty");
    }
}
