//! Stateless browser sessions.
//!
//! A session token is `base64url(claims) "." base64url(hmac)`, where the MAC
//! is HMAC-SHA256 over the encoded claims under a process-wide signing key.
//! The server keeps no session table: a token is valid if its signature
//! matches and its expiry has not passed.
//!
//! Because nothing is stored, logout cannot revoke a token the client has
//! already copied elsewhere. Logout only tells the browser to drop the
//! cookie, and the token stays verifiable until `exp`. Keep the session
//! lifetime short to bound that window.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use inertia_core::Result;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use ulid::Ulid;

use crate::error::AuthenticationError;

type HmacSha256 = Hmac<Sha256>;

/// Unique identifier for an issued session, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Ulid);

impl SessionId {
    /// Creates a new session ID with a randomly generated ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess_{}", self.0)
    }
}

/// Key used to sign session tokens.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Minimum accepted key length in bytes.
    pub const MIN_LEN: usize = 32;

    /// Generates a random key from the OS RNG.
    ///
    /// Sessions signed with a generated key do not survive a daemon restart.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; Self::MIN_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Decodes a standard base64 key.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError::InvalidSigningKey` if the value is not
    /// base64 or decodes to fewer than [`Self::MIN_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, AuthenticationError> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            AuthenticationError::InvalidSigningKey {
                reason: e.to_string(),
            }
        })?;
        if bytes.len() < Self::MIN_LEN {
            return Err(AuthenticationError::InvalidSigningKey {
                reason: format!(
                    "key is {} bytes, need at least {}",
                    bytes.len(),
                    Self::MIN_LEN
                ),
            }
            .into());
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Payload carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    sid: SessionId,
    sub: String,
    iat: i64,
    exp: i64,
}

impl SessionClaims {
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.sid
    }

    /// Returns the username the session was issued to.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.sub
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Returns true if the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// A token ready to be placed in a cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    value: String,
    max_age: Duration,
}

impl SessionToken {
    /// Returns the opaque cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns how long the client should keep the cookie.
    ///
    /// Negative for the logout marker.
    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

/// Issues and verifies session tokens.
///
/// The key is fixed for the lifetime of the codec.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    key: SigningKey,
    lifetime: Duration,
}

impl SessionCodec {
    /// Creates a codec issuing sessions valid for `lifetime`.
    #[must_use]
    pub fn new(key: SigningKey, lifetime: Duration) -> Self {
        Self { key, lifetime }
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a session for `username`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLifetime` if the lifetime is not positive or the
    /// expiry cannot be represented. Otherwise fails only if the claims
    /// cannot be serialized or the key is unusable.
    pub fn issue(&self, username: &str) -> Result<SessionToken, AuthenticationError> {
        self.issue_at(username, Utc::now())
    }

    /// Issues a session as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`Self::issue`].
    pub fn issue_at(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AuthenticationError> {
        if self.lifetime <= Duration::zero() {
            return Err(AuthenticationError::InvalidLifetime {
                reason: "must be positive".to_string(),
            }
            .into());
        }
        let expires = now.checked_add_signed(self.lifetime).ok_or_else(|| {
            AuthenticationError::InvalidLifetime {
                reason: "expiry is out of range".to_string(),
            }
        })?;
        let claims = SessionClaims {
            sid: SessionId::new(),
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|e| {
            AuthenticationError::MalformedSession {
                reason: e.to_string(),
            }
        })?;
        let payload = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(SessionToken {
            value: format!("{payload}.{signature}"),
            max_age: self.lifetime,
        })
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `MalformedSession`, `BadSignature` or `SessionExpired`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthenticationError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`Self::verify`].
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, AuthenticationError> {
        let (payload, signature) =
            token
                .split_once('.')
                .ok_or_else(|| AuthenticationError::MalformedSession {
                    reason: "missing signature".to_string(),
                })?;

        // Check the MAC before parsing anything the client controls.
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthenticationError::BadSignature)?;
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthenticationError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|e| {
            AuthenticationError::MalformedSession {
                reason: e.to_string(),
            }
        })?;
        let claims: SessionClaims = serde_json::from_slice(&payload).map_err(|e| {
            AuthenticationError::MalformedSession {
                reason: e.to_string(),
            }
        })?;

        if claims.is_expired_at(now) {
            return Err(AuthenticationError::SessionExpired {
                username: claims.sub,
            }
            .into());
        }
        Ok(claims)
    }

    /// Returns the marker that makes a client discard its session cookie.
    ///
    /// This does not revoke the previous token server-side.
    #[must_use]
    pub fn invalidate(&self) -> SessionToken {
        SessionToken {
            value: String::new(),
            max_age: Duration::seconds(-1),
        }
    }

    fn mac(&self) -> Result<HmacSha256, AuthenticationError> {
        let mac = HmacSha256::new_from_slice(&self.key.0).map_err(|e| {
            AuthenticationError::InvalidSigningKey {
                reason: e.to_string(),
            }
        })?;
        Ok(mac)
    }
}
