//! Service-token verification for the CLI and other operator tooling.
//!
//! The verifier does not know where secrets live. The daemon hands it a
//! [`TokenLookup`] at construction, which may compare against a configured
//! secret, an environment variable or an external secret manager.

use inertia_core::Result;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::AuthenticationError;

/// Decides whether a presented service token is acceptable.
pub trait TokenLookup: Send + Sync {
    fn lookup(&self, token: &str) -> bool;
}

impl<F> TokenLookup for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn lookup(&self, token: &str) -> bool {
        self(token)
    }
}

/// Validates bearer tokens against an injected lookup.
#[derive(Clone)]
pub struct ServiceTokenVerifier {
    lookup: Arc<dyn TokenLookup>,
}

impl ServiceTokenVerifier {
    /// Creates a verifier backed by `lookup`.
    pub fn new(lookup: impl TokenLookup + 'static) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// Creates a verifier that rejects every token.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::new(|_: &str| false)
    }

    /// Verifies a presented token.
    ///
    /// A missing token and a wrong token fail identically.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError::InvalidServiceToken`.
    pub fn verify(&self, presented: Option<&str>) -> Result<(), AuthenticationError> {
        match presented {
            Some(token) if !token.is_empty() && self.lookup.lookup(token) => Ok(()),
            _ => Err(AuthenticationError::InvalidServiceToken.into()),
        }
    }
}

impl std::fmt::Debug for ServiceTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTokenVerifier").finish_non_exhaustive()
    }
}

/// Lookup comparing against one shared secret.
///
/// An unset or empty secret rejects everything.
#[derive(Clone, Default)]
pub struct SharedSecret(Option<String>);

impl SharedSecret {
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        Self(secret.filter(|s| !s.is_empty()))
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }
}

impl TokenLookup for SharedSecret {
    fn lookup(&self, token: &str) -> bool {
        self.0
            .as_deref()
            .is_some_and(|secret| bool::from(secret.as_bytes().ct_eq(token.as_bytes())))
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedSecret")
            .field(&self.0.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_lookup() {
        let verifier = ServiceTokenVerifier::new(|token: &str| token == "daemon-token");
        assert!(verifier.verify(Some("daemon-token")).is_ok());
        assert!(verifier.verify(Some("wrong")).is_err());
    }

    #[test]
    fn missing_and_wrong_tokens_fail_alike() {
        let verifier = ServiceTokenVerifier::new(SharedSecret::new(Some("s3cret".to_string())));
        let missing = verifier.verify(None).expect_err("missing");
        let wrong = verifier.verify(Some("guess")).expect_err("wrong");
        assert_eq!(missing.current_context(), wrong.current_context());
        assert_eq!(
            missing.current_context(),
            &AuthenticationError::InvalidServiceToken
        );
    }

    #[test]
    fn empty_token_is_rejected_even_if_lookup_accepts() {
        let verifier = ServiceTokenVerifier::new(|_: &str| true);
        assert!(verifier.verify(Some("")).is_err());
    }

    #[test]
    fn deny_all_rejects_everything() {
        assert!(ServiceTokenVerifier::deny_all().verify(Some("x")).is_err());
    }

    #[test]
    fn unset_shared_secret_rejects() {
        let secret = SharedSecret::new(Some(String::new()));
        assert!(!secret.is_configured());
        assert!(!secret.lookup(""));
        assert!(!SharedSecret::default().lookup("anything"));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer  "), None);
    }

    #[test]
    fn shared_secret_matches_exactly() {
        let secret = SharedSecret::new(Some("s3cret".to_string()));
        assert!(secret.lookup("s3cret"));
        assert!(!secret.lookup("s3creT"));
        assert!(!secret.lookup("s3cret-and-more"));
        assert!(!secret.lookup("s3"));
    }
}
