//! inertia deployment daemon.
//!
//! This crate hosts the daemon's HTTP surface: the authorization gateway,
//! the built-in user-management routes, daemon control routes and the
//! SQLite-backed credential store.

pub mod auth;
pub mod config;
pub mod control;
pub mod error;
pub mod gateway;
