use crate::config::SigningConfig;
use crate::services::storage::S3ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub fn setup_object_store(config: &SigningConfig) -> Arc<S3ObjectStore> {
    match &config.s3_endpoint {
        Some(endpoint) => info!(
            "☁️  S3 Storage: {} (Default bucket: {}, path-style: {})",
            endpoint, config.default_bucket, config.s3_force_path_style
        ),
        None => info!(
            "☁️  S3 Storage: AWS {} (Default bucket: {})",
            config.default_region, config.default_bucket
        ),
    }

    Arc::new(S3ObjectStore::new(
        config.s3_endpoint.clone(),
        config.s3_force_path_style,
        Duration::from_secs(config.metadata_expiry_secs),
    ))
}
