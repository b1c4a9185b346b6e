pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod uploader;
pub mod utils;

use crate::config::SigningConfig;
use crate::services::signing::SigningService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::media::sign_media,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::SignRequest,
            models::SignOperation,
            models::SignResponse,
            models::PutGrant,
            models::MultipartGrant,
            models::PartGrant,
            models::Ack,
            models::CompletedPart,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "media", description = "Presigned upload endpoints"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub signing: Arc<SigningService>,
    pub config: SigningConfig,
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/api/media", post(api::handlers::media::sign_media))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
