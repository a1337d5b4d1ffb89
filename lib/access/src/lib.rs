//! Authentication primitives for the inertia daemon.
//!
//! This crate provides:
//! - User records and credential validation (`User`)
//! - Password hashing with Argon2id (`password`)
//! - Stateless, HMAC-signed browser sessions (`SessionCodec`)
//! - Service-token verification for the CLI (`ServiceTokenVerifier`)
//! - Route trust levels and roles (`TrustLevel`, `Role`)
//!
//! Nothing here touches HTTP or storage; the daemon wires these pieces
//! into its gateway and credential store.
//!
//! # Access Control Model
//!
//! Every route belongs to exactly one trust level:
//! - `Public` routes are reachable by anyone
//! - `User` routes need a valid session cookie
//! - `Admin` routes need a session belonging to an admin, or a service token
//!
//! # Example
//!
//! ```
//! use chrono::Duration;
//! use inertia_access::{SessionCodec, SigningKey};
//!
//! let codec = SessionCodec::new(SigningKey::generate(), Duration::hours(1));
//! let token = codec.issue("bobheadxi").expect("issue");
//! let claims = codec.verify(token.value()).expect("verify");
//! assert_eq!(claims.username(), "bobheadxi");
//! ```

pub mod auth;
pub mod error;
pub mod password;
pub mod role;
pub mod session;
pub mod token;
pub mod user;

// Re-export main types at crate root
pub use auth::{AuthenticatedUser, Principal};
pub use error::{AuthenticationError, AuthorizationError, StoreError};
pub use role::{Role, TrustLevel};
pub use session::{SessionClaims, SessionCodec, SessionId, SessionToken, SigningKey};
pub use token::{ServiceTokenVerifier, SharedSecret, TokenLookup, bearer_token};
pub use user::User;
