//! In-process store with the same atomicity guarantees as [`super::PgStore`].
//!
//! Each operation runs under one lock, so check-and-insert is atomic the way
//! the unique constraints make it atomic in PostgreSQL. Used by tests and by
//! the API server's `--memory-store` development mode.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CloseOutcome, DutyStore, StoreError, StoreResult, UserStore};
use crate::models::duty::{DutySession, NewDutySession};
use crate::models::user::{NewUser, Role, User, UserProfile};

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, User>,
    sessions: Vec<DutySession>,
    /// Location id → is_active.
    locations: HashMap<Uuid, bool>,
    /// Shift id → archived.
    shifts: HashMap<Uuid, bool>,
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a location.
    pub async fn add_location(&self, location_id: Uuid, active: bool) {
        self.state.lock().await.locations.insert(location_id, active);
    }

    /// Register a shift.
    pub async fn add_shift(&self, shift_id: Uuid, archived: bool) {
        self.state.lock().await.shifts.insert(shift_id, archived);
    }

    /// Number of user rows.
    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// All sessions owned by a user, oldest first.
    pub async fn sessions_for(&self, user_id: Uuid) -> Vec<DutySession> {
        self.state
            .lock()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(external_id).cloned())
    }

    async fn insert_user_if_absent(&self, new_user: &NewUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .entry(new_user.external_id.clone())
            .or_insert_with(|| {
                let now = Utc::now();
                User {
                    id: Uuid::new_v4(),
                    external_id: new_user.external_id.clone(),
                    profile: new_user.profile.clone(),
                    role: new_user.role,
                    created_at: now,
                    updated_at: now,
                }
            });
        Ok(user.clone())
    }

    async fn upsert_user_profile(
        &self,
        external_id: &str,
        profile: &UserProfile,
        role_if_new: Role,
    ) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let user = state
            .users
            .entry(external_id.to_string())
            .and_modify(|u| {
                u.profile = profile.clone();
                u.updated_at = now;
            })
            .or_insert_with(|| User {
                id: Uuid::new_v4(),
                external_id: external_id.to_string(),
                profile: profile.clone(),
                role: role_if_new,
                created_at: now,
                updated_at: now,
            });
        Ok(user.clone())
    }
}

#[async_trait]
impl DutyStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn location_is_active(&self, location_id: Uuid) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.locations.get(&location_id).copied().unwrap_or(false))
    }

    async fn shift_is_open(&self, shift_id: Uuid) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(matches!(state.shifts.get(&shift_id), Some(false)))
    }

    async fn find_open_session(&self, user_id: Uuid) -> StoreResult<Option<DutySession>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.is_open())
            .cloned())
    }

    async fn insert_open_session(
        &self,
        new_session: &NewDutySession,
    ) -> StoreResult<DutySession> {
        let mut state = self.state.lock().await;
        if state
            .sessions
            .iter()
            .any(|s| s.user_id == new_session.user_id && s.is_open())
        {
            return Err(StoreError::OpenSessionExists(new_session.user_id));
        }
        if let Some(id) = new_session.location_id
            && !state.locations.contains_key(&id)
        {
            return Err(StoreError::MissingReference(format!("location {id}")));
        }
        if let Some(id) = new_session.shift_id
            && !state.shifts.contains_key(&id)
        {
            return Err(StoreError::MissingReference(format!("shift {id}")));
        }

        let now = Utc::now();
        let session = DutySession {
            id: new_session.id,
            user_id: new_session.user_id,
            location_id: new_session.location_id,
            shift_id: new_session.shift_id,
            clock_in_time: new_session.clock_in_time,
            clock_out_time: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn close_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<CloseOutcome> {
        let mut state = self.state.lock().await;
        let Some(session) = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.user_id == user_id)
        else {
            return Ok(CloseOutcome::NotFound);
        };
        if !session.is_open() {
            return Ok(CloseOutcome::AlreadyClosed);
        }

        session.clock_out_time = Some(now.max(session.clock_in_time));
        if let Some(notes) = notes {
            session.notes = Some(notes.to_string());
        }
        session.updated_at = Utc::now();
        Ok(CloseOutcome::Closed(session.clone()))
    }
}
