//! Caller profile handlers.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthenticatedUser, authorization_header};
use crate::models::{ApiResponse, UserBody};

/// `GET /api/mobile/me` — the local user bound to the credential.
pub async fn me_handler(
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<UserBody>>> {
    Ok(Json(ApiResponse::ok(UserBody::from(user))))
}

/// `POST /api/mobile/profile/sync` — re-read the profile from the identity
/// provider. The local role is left as is.
pub async fn sync_profile_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<UserBody>>> {
    let user = state
        .gateway
        .authenticate_and_refresh(authorization_header(&headers))
        .await?;
    Ok(Json(ApiResponse::ok(UserBody::from(user)).with_message("Profile synchronized")))
}
