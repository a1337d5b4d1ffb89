//! Identities resolved by the gateway.
//!
//! After a restricted route admits a request, the gateway attaches a
//! [`Principal`] to it so the inner handler can tell who is calling.

use inertia_core::Result;

use crate::error::AuthorizationError;
use crate::role::{Role, TrustLevel};
use crate::session::{SessionClaims, SessionId};
use crate::user::User;

/// A browser user whose session cookie verified and whose account still
/// exists.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The verified session claims.
    claims: SessionClaims,
    /// The account as currently stored.
    user: User,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user context.
    #[must_use]
    pub fn new(claims: SessionClaims, user: User) -> Self {
        Self { claims, user }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.user.username()
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.claims.session_id()
    }

    #[must_use]
    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the user's role from the stored record, not from the token.
    #[must_use]
    pub fn role(&self) -> Role {
        self.user.role()
    }
}

/// Who is making a restricted request.
#[derive(Debug, Clone)]
pub enum Principal {
    /// A browser user with a session cookie.
    User(Box<AuthenticatedUser>),
    /// The CLI or another caller holding the service token.
    Service,
}

impl Principal {
    /// Checks that this principal may use routes at `level`.
    ///
    /// Service-token callers pass every level.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizationError::AdminRequired` for a session user whose
    /// role the level does not admit.
    pub fn authorize(&self, level: TrustLevel) -> Result<(), AuthorizationError> {
        match self {
            Self::Service => Ok(()),
            Self::User(user) if level.admits(user.role()) => Ok(()),
            Self::User(user) => Err(AuthorizationError::AdminRequired {
                username: user.username().to_string(),
            }
            .into()),
        }
    }

    /// Returns the username for session principals.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::User(user) => Some(user.username()),
            Self::Service => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionCodec, SigningKey};
    use chrono::Duration;

    fn claims_for(username: &str) -> SessionClaims {
        let codec = SessionCodec::new(SigningKey::generate(), Duration::hours(1));
        let token = codec.issue(username).expect("issue");
        codec.verify(token.value()).expect("verify")
    }

    #[test]
    fn authenticated_user_reads_role_from_record() {
        let user = User::new("bobheadxi".to_string(), "hash".to_string(), false);
        let auth_user = AuthenticatedUser::new(claims_for("bobheadxi"), user);

        assert_eq!(auth_user.username(), "bobheadxi");
        assert_eq!(auth_user.role(), Role::User);
    }

    #[test]
    fn principal_admin_checks() {
        let admin = User::new("root".to_string(), "hash".to_string(), true);
        let principal = Principal::User(Box::new(AuthenticatedUser::new(
            claims_for("root"),
            admin,
        )));
        assert!(principal.authorize(TrustLevel::Admin).is_ok());
        assert_eq!(principal.username(), Some("root"));

        assert!(Principal::Service.authorize(TrustLevel::Admin).is_ok());
        assert_eq!(Principal::Service.username(), None);
    }

    #[test]
    fn plain_user_is_refused_admin_level() {
        let user = User::new("bobheadxi".to_string(), "hash".to_string(), false);
        let principal = Principal::User(Box::new(AuthenticatedUser::new(
            claims_for("bobheadxi"),
            user,
        )));
        assert!(principal.authorize(TrustLevel::User).is_ok());
        let denied = principal
            .authorize(TrustLevel::Admin)
            .expect_err("should be refused");
        assert_eq!(
            denied.current_context(),
            &AuthorizationError::AdminRequired {
                username: "bobheadxi".to_string()
            }
        );
    }
}
