//! Built-in `/user/*` routes: login, session checks and user management.
//!
//! Request bodies are parsed from raw bytes rather than through
//! `axum::Json`, because the CLI does not always send a `Content-Type`.

use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use inertia_access::{Principal, SessionToken};
use inertia_core::{MessageResponse, UserListResponse, UserRequest};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{debug, info, warn};

use super::{AppState, CredentialCheck, SESSION_COOKIE};
use crate::config::SessionConfig;
use crate::error::ApiError;

/// Logs a user in and sets the session cookie.
///
/// Unknown users, wrong passwords and locked accounts all answer the same
/// `401`; the reason is only logged.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_user_request(&body)?;

    let user = match state
        .store
        .check_credentials(&request.username, &request.password)
        .await?
    {
        CredentialCheck::Accepted(user) => user,
        CredentialCheck::Rejected(reason) => {
            if reason.is_alarming() {
                warn!(
                    username = %request.username,
                    reason = reason.as_str(),
                    "Login rejected"
                );
            } else {
                debug!(
                    username = %request.username,
                    reason = reason.as_str(),
                    "Login rejected"
                );
            }
            return Err(ApiError::AuthenticationFailed);
        }
    };

    let token = state
        .sessions
        .issue(user.username())
        .map_err(|report| ApiError::Internal {
            details: report.current_context().to_string(),
        })?;

    info!(username = %user.username(), admin = user.is_admin(), "User logged in");

    let cookie = session_cookie(&state.session_config, &token);
    Ok((
        jar.add(cookie),
        Json(MessageResponse::new("Logged in")),
    ))
}

/// Confirms the caller holds a valid session.
pub async fn validate(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    let message = match principal.username() {
        Some(username) => format!("Session valid for {username}"),
        None => "Session valid".to_string(),
    };
    Json(MessageResponse::new(message))
}

/// Tells the browser to drop its session cookie.
///
/// The token itself stays verifiable until it expires.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(username) = principal.username() {
        info!(username = %username, "User logged out");
    }
    let cookie = session_cookie(&state.session_config, &state.sessions.invalidate());
    (jar.add(cookie), Json(MessageResponse::new("Logged out")))
}

/// Creates a user.
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_user_request(&body)?;
    state
        .store
        .add_user(&request.username, &request.password, request.admin)
        .await?;

    info!(
        username = %request.username,
        admin = request.admin,
        by = caller(&principal),
        "User added"
    );
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "User {} added",
            request.username
        ))),
    ))
}

/// Deletes a user. Only `username` is read from the body.
pub async fn remove_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_user_request(&body)?;
    state.store.remove_user(&request.username).await?;

    info!(username = %request.username, by = caller(&principal), "User removed");
    Ok(Json(MessageResponse::new(format!(
        "User {} removed",
        request.username
    ))))
}

/// Lists usernames.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(UserListResponse { users }))
}

/// Deletes every user.
pub async fn reset_users(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.store.reset_all().await?;

    warn!(removed, by = caller(&principal), "All users reset");
    Ok(Json(MessageResponse::new(format!("Removed {removed} users"))))
}

fn parse_user_request(body: &[u8]) -> Result<UserRequest, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidInput {
        reason: e.to_string(),
    })
}

fn caller(principal: &Principal) -> &str {
    principal.username().unwrap_or("service-token")
}

/// Builds the session cookie carrying `token`.
fn session_cookie(config: &SessionConfig, token: &SessionToken) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, token.value().to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Strict)
        .max_age(TimeDuration::seconds(token.max_age().num_seconds()));

    if let Some(domain) = &config.cookie_domain {
        cookie = cookie.domain(domain.clone());
    }

    cookie.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use inertia_access::{SessionCodec, SigningKey};

    fn codec() -> SessionCodec {
        SessionCodec::new(SigningKey::generate(), Duration::minutes(30))
    }

    #[test]
    fn session_cookie_attributes() {
        let token = codec().issue("bobheadxi").expect("issue");
        let config = SessionConfig {
            cookie_domain: Some("inertia.example".to_string()),
            ..SessionConfig::default()
        };
        let cookie = session_cookie(&config, &token);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.domain(), Some("inertia.example"));
        assert_eq!(cookie.max_age(), Some(TimeDuration::minutes(30)));
    }

    #[test]
    fn logout_cookie_expires_immediately() {
        let cookie = session_cookie(&SessionConfig::default(), &codec().invalidate());
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(TimeDuration::seconds(-1)));
        assert!(cookie.to_string().contains("Max-Age=-1"));
    }

    #[test]
    fn malformed_body_is_invalid_input() {
        let err = parse_user_request(b"not json").expect_err("should fail");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(parse_user_request(br#"{"username":"bob"}"#).is_ok());
    }
}
