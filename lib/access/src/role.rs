//! Roles and route trust levels.
//!
//! A user's role comes from the `is_admin` flag on their record. A route's
//! trust level is fixed when the route is attached to the gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege held by an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May use the web UI.
    User,
    /// May additionally manage users and control the daemon.
    Admin,
}

impl Role {
    /// Derives the role from a user record's admin flag.
    #[must_use]
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin { Self::Admin } else { Self::User }
    }

    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Identity required to reach a route.
///
/// Levels are ordered: `Public < User < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// No identity required.
    Public,
    /// A valid session cookie is required.
    User,
    /// An admin session or a service token is required.
    Admin,
}

impl TrustLevel {
    /// Returns true if a session holding `role` satisfies this level.
    #[must_use]
    pub fn admits(&self, role: Role) -> bool {
        match self {
            Self::Public | Self::User => true,
            Self::Admin => role.is_admin(),
        }
    }

    /// Returns the level's name as used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::User => "user-restricted",
            Self::Admin => "admin-restricted",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
