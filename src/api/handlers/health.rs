use crate::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" while the allow-list is empty and every tenant is refused
    pub status: String,
    pub allowed_tenants: usize,
    pub default_bucket: String,
    pub default_region: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Signing service readiness", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let allowed_tenants = state.signing.allow_list().len().await;
    let status = if allowed_tenants == 0 { "degraded" } else { "ok" };

    Json(HealthResponse {
        status: status.to_string(),
        allowed_tenants,
        default_bucket: state.config.default_bucket.clone(),
        default_region: state.config.default_region.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
