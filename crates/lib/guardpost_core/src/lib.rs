//! # guardpost_core
//!
//! Core domain logic for Guardpost: the authentication gateway that binds
//! each request to a verified local user, and the duty session lifecycle
//! that keeps every guard to at most one open session.

pub mod duty;
pub mod identity;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
