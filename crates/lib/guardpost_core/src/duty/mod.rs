//! Duty session lifecycle.
//!
//! Per user there are two states, off duty (no open session) and on duty
//! (exactly one open session). [`DutySessionManager`] owns the transitions;
//! [`SessionQuery`] is the read side.

pub mod manager;
pub mod query;

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

pub use manager::DutySessionManager;
pub use query::SessionQuery;

/// Duty session errors.
///
/// Everything except [`DutyError::Store`] is an expected business outcome
/// the caller can recover from.
#[derive(Debug, Error)]
pub enum DutyError {
    #[error("You are already on duty. Clock out before starting a new session.")]
    AlreadyOnDuty { session_id: Option<Uuid> },

    #[error("{0}")]
    InvalidReference(String),

    #[error("Duty session not found")]
    NotFound,

    #[error("Duty session is already closed")]
    AlreadyClosed,

    #[error("No active duty session")]
    NoActiveSession,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DutyError {
    /// Machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            DutyError::AlreadyOnDuty { .. } => "ALREADY_ON_DUTY",
            DutyError::InvalidReference(_) => "INVALID_REFERENCE",
            DutyError::NotFound => "NOT_FOUND",
            DutyError::AlreadyClosed => "ALREADY_CLOSED",
            DutyError::NoActiveSession => "NO_ACTIVE_SESSION",
            DutyError::Store(_) => "INTERNAL_ERROR",
        }
    }
}
