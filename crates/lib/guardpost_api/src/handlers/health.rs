//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{ApiResponse, HealthBody};

/// `GET /api/health` — reports version and store connectivity. No auth.
pub async fn health_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<HealthBody>>> {
    let db_connected = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("store ping failed: {e}");
            false
        }
    };

    Ok(Json(ApiResponse::ok(HealthBody {
        version: guardpost_core::version().to_string(),
        db_connected,
    })))
}
