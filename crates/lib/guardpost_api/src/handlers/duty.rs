//! Duty session request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthenticatedUser, authenticate};
use crate::models::{ApiResponse, ClockInRequest, ClockOutRequest, DutySessionBody};

/// `GET /api/mobile/duty/active` — the caller's open session, or `null`.
pub async fn active_session_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Option<DutySessionBody>>>> {
    let session = state.sessions.active_session(&user).await?;
    Ok(Json(ApiResponse::ok(session.map(DutySessionBody::from))))
}

/// `POST /api/mobile/duty/clock-in` — open a session.
pub async fn clock_in_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<DutySessionBody>>> {
    let input = ClockInRequest::parse(&body)?;
    let user = authenticate(&state, &headers).await?;

    let session = state.duty.clock_in(&user, input).await?;
    Ok(Json(
        ApiResponse::ok(DutySessionBody::from(session)).with_message("Clocked in successfully"),
    ))
}

/// `POST /api/mobile/duty/clock-out` — close the caller's session.
pub async fn clock_out_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<DutySessionBody>>> {
    let input = ClockOutRequest::parse(&body)?;
    let user = authenticate(&state, &headers).await?;

    let session = state.duty.clock_out(&user, input).await?;
    Ok(Json(
        ApiResponse::ok(DutySessionBody::from(session)).with_message("Clocked out successfully"),
    ))
}
