use crate::config::SigningConfig;
use crate::services::allow_list::{AllowListCache, FileAllowListSource};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub async fn setup_allow_list(config: &SigningConfig) -> Arc<AllowListCache> {
    let cache = Arc::new(AllowListCache::new(
        Arc::new(FileAllowListSource::new(config.allow_list_path.clone())),
        Duration::from_secs(config.allow_list_ttl_secs),
    ));

    // Warm the snapshot so misconfiguration shows up at startup.
    let count = cache.refresh(Utc::now()).await;
    if count == 0 {
        warn!(
            "🚫 Allow-list {} is empty or unreadable, every tenant will be rejected",
            config.allow_list_path.display()
        );
    } else {
        info!(
            "📋 Allow-list: {} tenants from {} (TTL {}s)",
            count,
            config.allow_list_path.display(),
            config.allow_list_ttl_secs
        );
    }

    cache
}
