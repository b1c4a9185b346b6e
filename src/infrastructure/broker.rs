use crate::config::SigningConfig;
use crate::services::credentials::{CachingCredentialBroker, CredentialBroker, StsCredentialBroker};
use aws_sdk_sts::config::Region;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Cached credentials are dropped this long before they expire.
const CREDENTIAL_REFRESH_MARGIN: Duration = Duration::from_secs(60);

pub async fn setup_credential_broker(config: &SigningConfig) -> Arc<dyn CredentialBroker> {
    // The service's own identity comes from the default provider chain
    // (env vars, profile, instance role).
    let sdk_config = aws_config::from_env()
        .region(Region::new(config.default_region.clone()))
        .load()
        .await;

    let sts = Arc::new(StsCredentialBroker::new(
        sdk_config,
        config.assume_role_name.clone(),
        Duration::from_secs(config.credential_duration_secs),
    ));

    info!(
        "🔑 Credential broker: STS assume-role '{}' ({}s sessions, cache: {})",
        config.assume_role_name, config.credential_duration_secs, config.cache_credentials
    );

    if config.cache_credentials {
        Arc::new(CachingCredentialBroker::new(sts, CREDENTIAL_REFRESH_MARGIN))
    } else {
        sts
    }
}
