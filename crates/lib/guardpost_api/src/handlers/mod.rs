//! Request handlers.

pub mod duty;
pub mod health;
pub mod profile;
