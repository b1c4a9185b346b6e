use crate::api::error::AppError;
use crate::models::{SignRequest, SignResponse};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

#[utoipa::path(
    post,
    path = "/api/media",
    request_body = SignRequest,
    responses(
        (status = 200, description = "Operation signed or performed", body = SignResponse),
        (status = 400, description = "Malformed tenant id or missing field"),
        (status = 403, description = "Tenant not allowed"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "media"
)]
pub async fn sign_media(
    State(state): State<crate::AppState>,
    payload: Result<Json<SignRequest>, JsonRejection>,
) -> Result<Json<SignResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::malformed_body(e.body_text()))?;

    let res = state.signing.sign(req).await?;
    Ok(Json(res))
}
