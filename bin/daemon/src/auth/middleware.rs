//! Authentication middleware and extractors for Axum.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use inertia_access::{AuthenticatedUser, Principal, StoreError, TrustLevel, bearer_token};
use inertia_core::MessageResponse;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{AppState, SESSION_COOKIE};

/// Extractor for requiring an authenticated user.
///
/// Verifies the session cookie and re-reads the user record, so a removed
/// user's cookie stops working immediately.
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::InternalError)?;

        // Get session token from cookie
        let session_cookie = jar
            .get(SESSION_COOKIE)
            .ok_or(AuthRejection::NotAuthenticated)?;

        let claims = app_state
            .sessions
            .verify(session_cookie.value())
            .map_err(|report| {
                debug!(reason = %report.current_context(), "Rejected session cookie");
                AuthRejection::InvalidSession
            })?;

        // Load user from the credential store
        let user = match app_state.store.get_user(claims.username()).await {
            Ok(user) => user,
            Err(report) => match report.current_context() {
                StoreError::UnknownUser { username } => {
                    debug!(username = %username, "Session refers to a removed user");
                    return Err(AuthRejection::InvalidSession);
                }
                other => {
                    error!(error = %other, "Failed to load session user");
                    return Err(AuthRejection::InternalError);
                }
            },
        };

        Ok(RequireAuth(AuthenticatedUser::new(claims, user)))
    }
}

/// Extractor for requiring an administrator.
///
/// Accepts a valid service token in `Authorization: Bearer`, or else a
/// session belonging to an admin user.
pub struct RequireAdmin(pub Principal);

impl<S> FromRequestParts<S> for RequireAdmin
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        let token_rejected = match parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
        {
            Some(token) => {
                if app_state.service_tokens.verify(Some(token)).is_ok() {
                    return Ok(RequireAdmin(Principal::Service));
                }
                debug!("Rejected service token");
                true
            }
            None => false,
        };

        match RequireAuth::from_request_parts(parts, state).await {
            Ok(RequireAuth(user)) => {
                let principal = Principal::User(Box::new(user));
                match principal.authorize(TrustLevel::Admin) {
                    Ok(()) => Ok(RequireAdmin(principal)),
                    Err(denied) => {
                        warn!(
                            error = %denied.current_context(),
                            "Non-admin user attempted admin operation"
                        );
                        Err(AuthRejection::AdminRequired)
                    }
                }
            }
            Err(AuthRejection::NotAuthenticated) if token_rejected => {
                Err(AuthRejection::InvalidServiceToken)
            }
            Err(rejection) => Err(rejection),
        }
    }
}

/// Middleware admitting only requests with a valid session.
///
/// The resolved [`Principal`] is added to the request extensions.
pub async fn require_user(
    RequireAuth(user): RequireAuth,
    mut request: Request,
    next: Next,
) -> Response {
    request
        .extensions_mut()
        .insert(Principal::User(Box::new(user)));
    next.run(request).await
}

/// Middleware admitting only admins and service-token callers.
///
/// The resolved [`Principal`] is added to the request extensions.
pub async fn require_admin(
    RequireAdmin(principal): RequireAdmin,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(principal);
    next.run(request).await
}

/// Rejection type for authentication extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session cookie was presented.
    NotAuthenticated,
    /// The session cookie was forged, malformed, expired or names a removed user.
    InvalidSession,
    /// A valid user without admin privileges tried an admin route.
    AdminRequired,
    /// A bearer token was presented and rejected.
    InvalidServiceToken,
    /// The credential store could not be consulted.
    InternalError,
}

impl AuthRejection {
    /// Returns true if no usable identity was presented.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::InvalidSession | Self::InvalidServiceToken
        )
    }

    /// Returns true if the caller had a valid identity but insufficient
    /// privilege.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::AdminRequired)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        debug!(rejection = ?self, "Request rejected by gateway");
        let (status, message) = match self {
            Self::NotAuthenticated | Self::InvalidSession | Self::InvalidServiceToken => {
                (StatusCode::FORBIDDEN, "Access denied")
            }
            Self::AdminRequired => (StatusCode::FORBIDDEN, "Admin access required"),
            Self::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_and_forbidden_share_a_status() {
        let unauthenticated = AuthRejection::NotAuthenticated.into_response();
        let forbidden = AuthRejection::AdminRequired.into_response();
        assert_eq!(unauthenticated.status(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn rejections_stay_distinct_internally() {
        assert!(AuthRejection::AdminRequired.is_forbidden());
        assert!(!AuthRejection::AdminRequired.is_unauthenticated());
        assert!(!AuthRejection::NotAuthenticated.is_forbidden());
        assert!(AuthRejection::InvalidSession.is_unauthenticated());
        assert!(AuthRejection::InvalidServiceToken.is_unauthenticated());
        assert!(!AuthRejection::InternalError.is_unauthenticated());
        assert!(!AuthRejection::InternalError.is_forbidden());
    }

    #[test]
    fn internal_error_is_server_error() {
        assert_eq!(
            AuthRejection::InternalError.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
