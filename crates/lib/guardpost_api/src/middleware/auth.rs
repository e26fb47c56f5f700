//! Authentication extractor: every protected handler goes through the gateway.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use guardpost_core::models::user::User;

use crate::AppState;
use crate::error::AppError;

/// Raw `Authorization` header value. A non-UTF-8 value reads as empty, which
/// the gateway rejects as malformed.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default())
}

/// Verified, locally provisioned caller.
///
/// Handlers that validate a body take the headers instead and call
/// [`authenticate`] after validation.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await.map(Self)
    }
}

/// Run the gateway against a request's headers.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    Ok(state.gateway.authenticate(authorization_header(headers)).await?)
}
