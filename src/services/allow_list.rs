use crate::models::TenantAuthorization;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Backing store of authorized tenant identifiers.
#[async_trait]
pub trait AllowListSource: Send + Sync {
    async fn load(&self) -> Result<Vec<String>>;
}

/// Reads a JSON array of tenant ids, e.g. `["123456789012"]`.
pub struct FileAllowListSource {
    path: PathBuf,
}

impl FileAllowListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AllowListSource for FileAllowListSource {
    async fn load(&self) -> Result<Vec<String>> {
        let raw = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading allow-list {}", self.path.display()))?;
        let tenants: Vec<String> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing allow-list {}", self.path.display()))?;
        Ok(tenants)
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    tenants: HashSet<String>,
    loaded_at: Option<DateTime<Utc>>,
}

/// Time-boxed view of the allow-list.
///
/// The snapshot is only reloaded once it is older than the TTL, and only when
/// someone asks. A failed reload installs an empty list so that a broken
/// backing store denies everyone instead of serving the old list forever.
/// Readers never wait on the source: while one caller reloads, the others
/// answer from the snapshot they already have.
pub struct AllowListCache {
    source: Arc<dyn AllowListSource>,
    ttl: Duration,
    snapshot: RwLock<Arc<Snapshot>>,
    refreshing: Mutex<()>,
}

impl AllowListCache {
    pub fn new(source: Arc<dyn AllowListSource>, ttl: std::time::Duration) -> Self {
        Self {
            source,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(60)),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            refreshing: Mutex::new(()),
        }
    }

    pub async fn get(&self, tenant_id: &str, now: DateTime<Utc>) -> bool {
        let current = self.snapshot.read().await.clone();

        if self.is_stale(&current, now) {
            if current.loaded_at.is_none() {
                // Nothing to fall back on yet: wait for whoever is loading.
                let _guard = self.refreshing.lock().await;
                let latest = self.snapshot.read().await.clone();
                if self.is_stale(&latest, now) {
                    self.reload(now).await;
                }
            } else if let Ok(_guard) = self.refreshing.try_lock() {
                self.reload(now).await;
            }
        }

        self.snapshot.read().await.tenants.contains(tenant_id)
    }

    pub async fn authorize(&self, tenant_id: &str, now: DateTime<Utc>) -> TenantAuthorization {
        TenantAuthorization {
            tenant_id: tenant_id.to_string(),
            allowed: self.get(tenant_id, now).await,
        }
    }

    /// Forces a reload from the backing store. Returns the number of tenants loaded.
    pub async fn refresh(&self, now: DateTime<Utc>) -> usize {
        let _guard = self.refreshing.lock().await;
        self.reload(now).await
    }

    pub async fn len(&self) -> usize {
        self.snapshot.read().await.tenants.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_stale(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> bool {
        match snapshot.loaded_at {
            Some(loaded_at) => now - loaded_at > self.ttl,
            None => true,
        }
    }

    async fn reload(&self, now: DateTime<Utc>) -> usize {
        let tenants: HashSet<String> = match self.source.load().await {
            Ok(list) => list.into_iter().map(|t| t.trim().to_string()).collect(),
            Err(e) => {
                tracing::warn!("Allow-list refresh failed, denying all tenants: {:#}", e);
                HashSet::new()
            }
        };

        let count = tenants.len();
        *self.snapshot.write().await = Arc::new(Snapshot {
            tenants,
            loaded_at: Some(now),
        });
        tracing::debug!("Allow-list refreshed with {} tenants", count);
        count
    }
}
