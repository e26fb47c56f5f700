//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use guardpost_core::duty::DutyError;
use guardpost_core::identity::AuthRejection;

use crate::models::{ErrorMeta, ErrorResponse};
use crate::validation::ValidationErrors;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request data")]
    Validation(ValidationErrors),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{message}")]
    Rejected { code: &'static str, message: String },

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, code, meta) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Some("VALIDATION_ERROR"),
                Some(ErrorMeta { errors }),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, Some("UNAUTHORIZED"), None),
            AppError::Rejected { code, .. } => (StatusCode::BAD_REQUEST, Some(code), None),
            AppError::Internal(detail) => {
                error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, None, None)
            }
        };
        let body = Json(ErrorResponse {
            ok: false,
            message,
            code: code.map(str::to_string),
            meta,
        });
        (status, body).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        AppError::Validation(e)
    }
}

// The gateway has already logged the cause; callers only learn "unauthorized".
impl From<AuthRejection> for AppError {
    fn from(_: AuthRejection) -> Self {
        AppError::Unauthorized
    }
}

impl From<DutyError> for AppError {
    fn from(e: DutyError) -> Self {
        match e {
            DutyError::Store(e) => AppError::Internal(e.to_string()),
            other => AppError::Rejected {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use guardpost_core::identity::VerifyError;
    use guardpost_core::store::StoreError;

    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_detail_is_not_exposed() {
        let err = AppError::from(DutyError::Store(StoreError::Corrupt(
            "role column held 'ROOT'".into(),
        )));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["ok"], false);
        assert_eq!(json["message"], "Internal server error");
        assert!(json.get("code").is_none());
        assert!(!json.to_string().contains("ROOT"));
    }

    #[tokio::test]
    async fn business_errors_carry_code() {
        let resp = AppError::from(DutyError::AlreadyClosed).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["code"], "ALREADY_CLOSED");
        assert_eq!(json["message"], "Duty session is already closed");
    }

    #[tokio::test]
    async fn rejections_are_uniform() {
        let resp = AppError::from(AuthRejection::Credential(VerifyError::Expired)).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Unauthorized");
        assert_eq!(json["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn validation_lists_field_errors() {
        let mut errors = ValidationErrors::default();
        errors.add_field("dutySessionId", "Required");
        let resp = AppError::from(errors).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["meta"]["errors"]["fieldErrors"]["dutySessionId"][0], "Required");
        assert_eq!(json["meta"]["errors"]["formErrors"], serde_json::json!([]));
    }
}
