//! Domain models.
//!
//! These are internal domain models, distinct from the API-facing bodies in
//! `guardpost_api::models` (which carry the camelCase wire shape).

pub mod duty;
pub mod user;
