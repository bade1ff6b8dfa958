use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use snapdrive_services::auth::AuthError;
use snapdrive_services::drive::DriveError;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, auth) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Not authenticated".to_string(),
                Some("/auth".to_string()),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let body = ErrorResponse {
            ok: false,
            error: message,
            auth,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DriveError> for ApiError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Auth(AuthError::NotAuthenticated) => ApiError::Unauthorized,
            other => {
                // Full detail stays in the server log; the response body
                // carries only the summary line.
                error!("drive request failed: {other}");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAuthenticated => ApiError::Unauthorized,
            other => {
                error!("auth request failed: {other}");
                ApiError::Internal(other.to_string())
            }
        }
    }
}
