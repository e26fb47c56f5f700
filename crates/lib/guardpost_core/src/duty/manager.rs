//! Clock-in / clock-out state machine.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::DutyError;
use crate::models::duty::{ClockIn, ClockOut, DutySession, NewDutySession};
use crate::models::user::User;
use crate::store::{CloseOutcome, DutyStore, StoreError};
use crate::uuid::uuidv7;

/// Sole writer of duty session state.
///
/// Each transition is one atomic store operation; the pre-checks here only
/// produce better errors and are not relied on for correctness.
#[derive(Clone)]
pub struct DutySessionManager {
    store: Arc<dyn DutyStore>,
}

impl DutySessionManager {
    pub fn new(store: Arc<dyn DutyStore>) -> Self {
        Self { store }
    }

    /// Start a duty session for `user`.
    pub async fn clock_in(&self, user: &User, input: ClockIn) -> Result<DutySession, DutyError> {
        if let Some(open) = self.store.find_open_session(user.id).await? {
            debug!(user_id = %user.id, session_id = %open.id, "clock-in refused: already on duty");
            return Err(DutyError::AlreadyOnDuty {
                session_id: Some(open.id),
            });
        }

        if let Some(location_id) = input.location_id
            && !self.store.location_is_active(location_id).await?
        {
            return Err(DutyError::InvalidReference(
                "Location not found or inactive".into(),
            ));
        }
        if let Some(shift_id) = input.shift_id
            && !self.store.shift_is_open(shift_id).await?
        {
            return Err(DutyError::InvalidReference("Shift not found".into()));
        }

        let new_session = NewDutySession {
            id: uuidv7(),
            user_id: user.id,
            location_id: input.location_id,
            shift_id: input.shift_id,
            clock_in_time: Utc::now(),
        };

        let session = match self.store.insert_open_session(&new_session).await {
            Ok(session) => session,
            Err(StoreError::OpenSessionExists(_)) => {
                debug!(user_id = %user.id, "clock-in lost race to a concurrent clock-in");
                return Err(DutyError::AlreadyOnDuty { session_id: None });
            }
            Err(StoreError::MissingReference(constraint)) => {
                warn!(user_id = %user.id, %constraint, "clock-in reference vanished before insert");
                return Err(DutyError::InvalidReference(
                    "Location or shift no longer exists".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            user_id = %user.id,
            session_id = %session.id,
            location_id = ?session.location_id,
            shift_id = ?session.shift_id,
            "clocked in"
        );
        Ok(session)
    }

    /// Close `input.duty_session_id`, which must be open and owned by `user`.
    pub async fn clock_out(&self, user: &User, input: ClockOut) -> Result<DutySession, DutyError> {
        let outcome = self
            .store
            .close_session(
                input.duty_session_id,
                user.id,
                input.notes.as_deref(),
                Utc::now(),
            )
            .await?;

        match outcome {
            CloseOutcome::Closed(session) => {
                info!(user_id = %user.id, session_id = %session.id, "clocked out");
                Ok(session)
            }
            CloseOutcome::AlreadyClosed => Err(DutyError::AlreadyClosed),
            CloseOutcome::NotFound => {
                debug!(
                    user_id = %user.id,
                    session_id = %input.duty_session_id,
                    "clock-out refused: session absent or not owned"
                );
                Err(DutyError::NotFound)
            }
        }
    }
}
