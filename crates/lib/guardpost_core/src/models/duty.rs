//! Duty session models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One continuous on-duty interval for a user.
///
/// A session is open while `clock_out_time` is `None`. Once closed it is never
/// reopened or modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub location_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub clock_in_time: DateTime<Utc>,
    pub clock_out_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DutySession {
    /// Whether the session has not been clocked out yet.
    pub fn is_open(&self) -> bool {
        self.clock_out_time.is_none()
    }
}

/// Row to insert on clock-in.
#[derive(Debug, Clone)]
pub struct NewDutySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub location_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub clock_in_time: DateTime<Utc>,
}

/// Clock-in parameters after request validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockIn {
    pub location_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
}

/// Clock-out parameters after request validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockOut {
    pub duty_session_id: Uuid,
    pub notes: Option<String>,
}
