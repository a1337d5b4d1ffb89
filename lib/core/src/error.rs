//! Shared `Result` alias.
//!
//! Domain crates define their own error enums (see `inertia-access`) and
//! return them wrapped in a [`rootcause::Report`], so callers can read the
//! typed cause with `current_context()` while logs keep the full report.

use rootcause::Report;

/// `Result` carrying a [`Report`] over the context type `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
