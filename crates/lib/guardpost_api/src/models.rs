//! API request and response bodies.
//!
//! Everything on the wire is camelCase and wrapped in the uniform
//! `{ ok, data, message, code, meta }` envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use guardpost_core::models::duty::DutySession;
use guardpost_core::models::user::{Role, User};

use crate::validation::ValidationErrors;

/// Success envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data,
            message: None,
            meta: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Failure envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ErrorMeta>,
}

/// Field-level validation detail.
#[derive(Debug, Serialize)]
pub struct ErrorMeta {
    pub errors: ValidationErrors,
}

/// `POST /api/mobile/duty/clock-in` body, as read from `{locationId, shiftId}`.
#[derive(Debug, Default)]
pub struct ClockInRequest {
    pub location_id: Option<String>,
    pub shift_id: Option<String>,
}

/// `POST /api/mobile/duty/clock-out` body, as read from `{dutySessionId, notes}`.
#[derive(Debug, Default)]
pub struct ClockOutRequest {
    pub duty_session_id: Option<String>,
    pub notes: Option<String>,
}

/// Duty session as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DutySessionBody {
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

impl From<DutySession> for DutySessionBody {
    fn from(s: DutySession) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            location_id: s.location_id,
            shift_id: s.shift_id,
            clock_in_time: s.clock_in_time,
            clock_out_time: s.clock_out_time,
            notes: s.notes,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Authenticated user as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    pub id: Uuid,
    pub external_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserBody {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            external_id: u.external_id,
            email: u.profile.email,
            first_name: u.profile.first_name,
            last_name: u.profile.last_name,
            username: u.profile.username,
            phone_number: u.profile.phone_number,
            role: u.role,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// `GET /api/health` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBody {
    pub version: String,
    pub db_connected: bool,
}
