//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, so the salt and parameters travel with
//! the hash. Both hashing and verification are deliberately slow; callers on
//! an async runtime should run them on a blocking thread.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use inertia_core::Result;
use std::sync::OnceLock;

use crate::error::AuthenticationError;

/// Hashes a password with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthenticationError::HashingFailed` if Argon2 rejects the input.
pub fn hash(password: &str) -> Result<String, AuthenticationError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthenticationError::HashingFailed {
            reason: e.to_string(),
        })?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC string.
///
/// A stored hash that cannot be parsed never verifies.
#[must_use]
pub fn verify(password: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| hash("inertia-timing-equalizer").ok())
        .as_deref()
}

/// Builds the dummy hash used by [`burn`].
///
/// Call once at startup so the first unknown-user check does not also pay
/// for a full hash.
pub fn prepare_burn() {
    let _ = dummy_hash();
}

/// Spends the same work as a real verification and discards the result.
///
/// Used when the username is unknown, so that response timing does not
/// reveal whether an account exists.
pub fn burn(password: &str) {
    if let Some(dummy) = dummy_hash() {
        let _ = verify(password, dummy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_not_plaintext() {
        let hashed = hash("wowgreat").expect("hash");
        assert!(!hashed.contains("wowgreat"));
        assert!(hashed.starts_with("$argon2id$"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("wowgreat").expect("hash");
        let b = hash("wowgreat").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn verify_accepts_correct_and_rejects_wrong() {
        let hashed = hash("wowgreat").expect("hash");
        assert!(verify("wowgreat", &hashed));
        assert!(!verify("wowbad", &hashed));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify("wowgreat", "not-a-phc-string"));
    }

    #[test]
    fn prepared_dummy_hash_is_a_real_argon2_hash() {
        prepare_burn();
        let dummy = DUMMY_HASH.get().expect("initialized").as_deref();
        assert!(dummy.is_some_and(|h| h.starts_with("$argon2id$")));
        assert!(dummy.is_some_and(|h| verify("inertia-timing-equalizer", h)));
        burn("anything");
    }
}
