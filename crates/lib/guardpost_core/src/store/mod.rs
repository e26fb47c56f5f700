//! Persistence boundary for users and duty sessions.
//!
//! Both invariants this crate cares about are enforced here rather than in
//! the services above: one local user per external identity (find-or-create
//! on a unique key) and at most one open duty session per user (insert that
//! fails on the open-session constraint). Services never read-then-write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::duty::{DutySession, NewDutySession};
use crate::models::user::{NewUser, Role, User, UserProfile};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The user already has an open duty session.
    #[error("user {0} already has an open duty session")]
    OpenSessionExists(Uuid),

    /// A referenced location or shift row disappeared between check and insert.
    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of the conditional clock-out update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed(DutySession),
    /// Owned by the caller but already clocked out.
    AlreadyClosed,
    /// Absent, or owned by someone else.
    NotFound,
}

/// User persistence. Only the identity resolver writes through this.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by identity-provider subject.
    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>>;

    /// Atomic find-or-create keyed on `external_id`.
    ///
    /// Concurrent callers with the same `external_id` all receive the same
    /// row; exactly one of them creates it.
    async fn insert_user_if_absent(&self, new_user: &NewUser) -> StoreResult<User>;

    /// Create the user or overwrite its profile fields. Role and external id
    /// of an existing row are left untouched.
    async fn upsert_user_profile(
        &self,
        external_id: &str,
        profile: &UserProfile,
        role_if_new: Role,
    ) -> StoreResult<User>;
}

/// Duty session persistence. Only the duty session manager writes through this.
#[async_trait]
pub trait DutyStore: Send + Sync {
    /// Cheap liveness check.
    async fn ping(&self) -> StoreResult<()>;

    /// Whether the location exists and is active.
    async fn location_is_active(&self, location_id: Uuid) -> StoreResult<bool>;

    /// Whether the shift exists and is not archived.
    async fn shift_is_open(&self, shift_id: Uuid) -> StoreResult<bool>;

    /// The user's open session, if any.
    async fn find_open_session(&self, user_id: Uuid) -> StoreResult<Option<DutySession>>;

    /// Insert an open session. Fails with [`StoreError::OpenSessionExists`]
    /// when the user already has one, atomically with the insert.
    async fn insert_open_session(
        &self,
        new_session: &NewDutySession,
    ) -> StoreResult<DutySession>;

    /// Close the session if it exists, belongs to `user_id` and is open.
    ///
    /// The stored clock-out time is `max(now, clock_in_time)`. `notes`, when
    /// given, replaces the session notes.
    async fn close_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<CloseOutcome>;
}
