//! Core types shared by the inertia daemon and its clients.
//!
//! This crate provides the error-handling foundation and the JSON request and
//! response bodies exchanged between the CLI, the web client and the daemon.

pub mod error;
pub mod request;

pub use error::Result;
pub use request::{MessageResponse, UserListResponse, UserRequest};
