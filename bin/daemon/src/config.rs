//! Centralized daemon configuration.
//!
//! This module provides strongly-typed configuration for the daemon,
//! loaded via the `config` crate from environment variables prefixed with
//! `INERTIA_`. Nested keys use `__`, e.g. `INERTIA_SESSION__DURATION_MINUTES`.

use inertia_access::{AuthenticationError, SharedSecret, SigningKey};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Daemon configuration.
#[derive(Clone, Deserialize)]
pub struct DaemonConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path of the users database.
    #[serde(default = "default_users_db")]
    pub users_db: PathBuf,

    /// Path prefix the gateway is nested under, e.g. `/web`.
    #[serde(default)]
    pub mount_prefix: Option<String>,

    /// Directory holding the web client bundle, served as the fallback.
    #[serde(default)]
    pub web_root: Option<PathBuf>,

    /// Shared secret accepted as a service token. Unset disables service
    /// tokens entirely.
    #[serde(default)]
    pub service_token: Option<String>,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Session-related configuration.
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Session duration in minutes.
    /// Sessions cannot be revoked server-side, so this bounds how long a
    /// copied cookie stays usable after logout.
    #[serde(default = "default_session_duration_minutes")]
    pub duration_minutes: i64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Domain attribute for the session cookie.
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Base64 session signing key. When unset a random key is generated and
    /// sessions end when the daemon restarts.
    #[serde(default)]
    pub signing_key: Option<String>,

    /// Consecutive failed logins before an account locks. Zero disables.
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
}

/// Longest accepted session, one year.
pub const MAX_SESSION_MINUTES: i64 = 525_600;

fn default_bind_addr() -> String {
    "0.0.0.0:4303".to_string()
}

fn default_users_db() -> PathBuf {
    PathBuf::from("users.db")
}

fn default_session_duration_minutes() -> i64 {
    60
}

fn default_secure_cookies() -> bool {
    true
}

fn default_max_login_attempts() -> u32 {
    5
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_session_duration_minutes(),
            secure_cookies: default_secure_cookies(),
            cookie_domain: None,
            signing_key: None,
            max_login_attempts: default_max_login_attempts(),
        }
    }
}

impl SessionConfig {
    /// Checks values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// Returns an error if `duration_minutes` is outside
    /// `1..=MAX_SESSION_MINUTES`.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(1..=MAX_SESSION_MINUTES).contains(&self.duration_minutes) {
            return Err(config::ConfigError::Message(format!(
                "session.duration_minutes must be between 1 and {MAX_SESSION_MINUTES}, got {}",
                self.duration_minutes
            )));
        }
        Ok(())
    }

    /// Returns the session lifetime.
    #[must_use]
    pub fn lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.duration_minutes)
    }

    /// Returns the configured signing key, or a fresh random one.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured key is not valid base64 or too short.
    pub fn signing_key(&self) -> Result<SigningKey, Report<AuthenticationError>> {
        match self.signing_key.as_deref() {
            Some(encoded) => SigningKey::from_base64(encoded),
            None => Ok(SigningKey::generate()),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("duration_minutes", &self.duration_minutes)
            .field("secure_cookies", &self.secure_cookies)
            .field("cookie_domain", &self.cookie_domain)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("max_login_attempts", &self.max_login_attempts)
            .finish()
    }
}

impl DaemonConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(Self::environment())
    }

    /// The environment source used by [`Self::from_env`].
    #[must_use]
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix("INERTIA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Loads configuration from a specific environment source.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is present but invalid.
    pub fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        config.session.validate()?;
        Ok(config)
    }

    /// Returns the normalized mount prefix, or `None` to mount at the root.
    #[must_use]
    pub fn mount_prefix(&self) -> Option<String> {
        let prefix = self.mount_prefix.as_deref()?.trim().trim_end_matches('/');
        if prefix.is_empty() {
            return None;
        }
        if prefix.starts_with('/') {
            Some(prefix.to_string())
        } else {
            Some(format!("/{prefix}"))
        }
    }

    /// Returns the service-token lookup built from `service_token`.
    #[must_use]
    pub fn service_token_lookup(&self) -> SharedSecret {
        SharedSecret::new(self.service_token.clone())
    }
}

impl fmt::Debug for DaemonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonConfig")
            .field("bind_addr", &self.bind_addr)
            .field("users_db", &self.users_db)
            .field("mount_prefix", &self.mount_prefix)
            .field("web_root", &self.web_root)
            .field(
                "service_token",
                &self.service_token.as_ref().map(|_| "<redacted>"),
            )
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inertia_access::TokenLookup;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> DaemonConfig {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_environment(DaemonConfig::environment().source(Some(source)))
            .expect("load config")
    }

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.duration_minutes, 60);
        assert!(config.secure_cookies);
        assert_eq!(config.max_login_attempts, 5);
        assert_eq!(config.lifetime(), chrono::Duration::hours(1));
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]);
        assert_eq!(config.bind_addr, "0.0.0.0:4303");
        assert_eq!(config.users_db, PathBuf::from("users.db"));
        assert!(config.mount_prefix().is_none());
        assert!(!config.service_token_lookup().is_configured());
    }

    #[test]
    fn nested_keys_are_read() {
        let config = load(&[
            ("INERTIA_BIND_ADDR", "127.0.0.1:8080"),
            ("INERTIA_SERVICE_TOKEN", "s3cret"),
            ("INERTIA_SESSION__DURATION_MINUTES", "15"),
            ("INERTIA_SESSION__SECURE_COOKIES", "false"),
        ]);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.session.duration_minutes, 15);
        assert!(!config.session.secure_cookies);
        assert!(config.service_token_lookup().lookup("s3cret"));
    }

    #[test]
    fn session_duration_out_of_range_is_rejected() {
        for minutes in ["0", "-5", "525601", "9223372036854775807"] {
            let source: HashMap<String, String> =
                [("INERTIA_SESSION__DURATION_MINUTES".to_string(), minutes.to_string())]
                    .into_iter()
                    .collect();
            let result =
                DaemonConfig::from_environment(DaemonConfig::environment().source(Some(source)));
            assert!(result.is_err(), "accepted duration {minutes}");
        }

        let config = load(&[("INERTIA_SESSION__DURATION_MINUTES", "525600")]);
        assert_eq!(config.session.duration_minutes, MAX_SESSION_MINUTES);
    }

    #[test]
    fn mount_prefix_is_normalized() {
        let mut config = load(&[]);
        config.mount_prefix = Some("web/".to_string());
        assert_eq!(config.mount_prefix().as_deref(), Some("/web"));
        config.mount_prefix = Some("/".to_string());
        assert!(config.mount_prefix().is_none());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = load(&[("INERTIA_SERVICE_TOKEN", "s3cret")]);
        config.session.signing_key = Some("a2V5".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("a2V5"));
    }

    #[test]
    fn short_signing_key_is_rejected() {
        let config = SessionConfig {
            signing_key: Some("c2hvcnQ=".to_string()),
            ..SessionConfig::default()
        };
        assert!(config.signing_key().is_err());
        assert!(SessionConfig::default().signing_key().is_ok());
    }
}
