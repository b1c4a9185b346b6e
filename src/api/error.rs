use crate::services::signing::SignError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Error surface of `/api/media`. Only validation and authorization messages
/// reach the caller; store failures are logged and answered with a generic 500.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {message}")]
    BadRequest {
        code: &'static str,
        message: String,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl AppError {
    pub fn malformed_body(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            code: "MALFORMED_REQUEST",
            message: message.into(),
        }
    }
}

impl From<SignError> for AppError {
    fn from(err: SignError) -> Self {
        match err {
            SignError::Validation(e) => AppError::BadRequest {
                code: e.code,
                message: e.message,
            },
            SignError::Auth(msg) => AppError::Forbidden(msg),
            SignError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest { code, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "code": code }),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::Store(e) => {
                tracing::error!("Signing operation failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
