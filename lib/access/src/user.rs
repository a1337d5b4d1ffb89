//! User record and credential validation rules.
//!
//! A `User` is the credential store's view of an account. The password hash
//! stays inside the daemon: it is never serialized, never part of `Debug`
//! output and never returned by any endpoint.

use chrono::{DateTime, Utc};
use rootcause::prelude::Report;

use crate::error::StoreError;
use crate::role::Role;

/// Longest accepted username, in characters.
pub const MAX_USERNAME_CHARS: usize = 64;

/// Longest accepted password, in bytes. Bounds the hashing cost of one request.
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// An account in the credential store.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Unique, immutable account name.
    username: String,
    /// Argon2 PHC string. Never the plaintext.
    password_hash: String,
    /// Whether the account may use admin-restricted routes.
    is_admin: bool,
    /// Consecutive failed logins since the last success.
    login_attempts: u32,
    /// When the record was created.
    created_at: DateTime<Utc>,
}

impl User {
    /// Creates a fresh record for a newly added account.
    #[must_use]
    pub fn new(username: String, password_hash: String, is_admin: bool) -> Self {
        Self {
            username,
            password_hash,
            is_admin,
            login_attempts: 0,
            created_at: Utc::now(),
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    pub fn with_all_fields(
        username: String,
        password_hash: String,
        is_admin: bool,
        login_attempts: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            username,
            password_hash,
            is_admin,
            login_attempts,
            created_at,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the stored PHC hash string.
    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.is_admin)
    }

    #[must_use]
    pub fn login_attempts(&self) -> u32 {
        self.login_attempts
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true once `login_attempts` has reached `max_attempts`.
    ///
    /// A limit of zero disables lockout.
    #[must_use]
    pub fn is_locked_out(&self, max_attempts: u32) -> bool {
        max_attempts > 0 && self.login_attempts >= max_attempts
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("is_admin", &self.is_admin)
            .field("login_attempts", &self.login_attempts)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Checks that a username can be stored.
///
/// # Errors
///
/// Returns `StoreError::InvalidInput` if the name is empty, too long, or
/// contains whitespace or control characters.
pub fn validate_username(username: &str) -> Result<(), Report<StoreError>> {
    let reason = if username.is_empty() {
        Some("must not be empty".to_string())
    } else if username.chars().count() > MAX_USERNAME_CHARS {
        Some(format!("must be at most {MAX_USERNAME_CHARS} characters"))
    } else if username
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        Some("must not contain whitespace or control characters".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidInput {
            field: "username",
            reason,
        }
        .into()),
        None => Ok(()),
    }
}

/// Checks that a password can be hashed.
///
/// # Errors
///
/// Returns `StoreError::InvalidInput` if the password is empty or longer than
/// [`MAX_PASSWORD_BYTES`].
pub fn validate_password(password: &str) -> Result<(), Report<StoreError>> {
    if password.is_empty() {
        return Err(StoreError::InvalidInput {
            field: "password",
            reason: "must not be empty".to_string(),
        }
        .into());
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(StoreError::InvalidInput {
            field: "password",
            reason: format!("must be at most {MAX_PASSWORD_BYTES} bytes"),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(result: Result<(), Report<StoreError>>) -> &'static str {
        match result.expect_err("should be rejected").current_context() {
            StoreError::InvalidInput { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn new_user_starts_without_failed_attempts() {
        let user = User::new("bobheadxi".to_string(), "$argon2id$...".to_string(), false);
        assert_eq!(user.username(), "bobheadxi");
        assert_eq!(user.login_attempts(), 0);
        assert_eq!(user.role(), Role::User);
        assert!(!user.is_locked_out(5));
    }

    #[test]
    fn lockout_threshold() {
        let user = User::with_all_fields(
            "bobheadxi".to_string(),
            "hash".to_string(),
            true,
            5,
            Utc::now(),
        );
        assert!(user.is_locked_out(5));
        assert!(!user.is_locked_out(6));
        assert!(!user.is_locked_out(0));
    }

    #[test]
    fn debug_output_omits_hash() {
        let user = User::new("bobheadxi".to_string(), "secret-hash".to_string(), false);
        let debug = format!("{user:?}");
        assert!(debug.contains("bobheadxi"));
        assert!(!debug.contains("secret-hash"));
    }

    #[test]
    fn usernames_are_validated() {
        assert!(validate_username("jimmyneutron").is_ok());
        assert_eq!(invalid_field(validate_username("")), "username");
        assert_eq!(invalid_field(validate_username("jimmy neutron")), "username");
        assert_eq!(invalid_field(validate_username("jimmy\u{7}")), "username");
        assert_eq!(
            invalid_field(validate_username(&"a".repeat(MAX_USERNAME_CHARS + 1))),
            "username"
        );
    }

    #[test]
    fn passwords_are_validated() {
        assert!(validate_password("asfasdlfjk").is_ok());
        assert_eq!(invalid_field(validate_password("")), "password");
        assert_eq!(
            invalid_field(validate_password(&"p".repeat(MAX_PASSWORD_BYTES + 1))),
            "password"
        );
    }
}
