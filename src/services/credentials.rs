use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_sts::config::Region;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Short-lived storage credentials scoped to one tenant.
#[derive(Clone)]
pub struct TemporaryCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: String,
    pub expiry: DateTime<Utc>,
}

impl std::fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Exchanges a tenant identifier for temporary credentials.
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    async fn assume_role(&self, tenant_id: &str, region: &str) -> Result<TemporaryCredentials>;
}

/// Assumes `arn:aws:iam::<tenant>:role/<role_name>` through STS.
pub struct StsCredentialBroker {
    sdk_config: aws_config::SdkConfig,
    role_name: String,
    duration: std::time::Duration,
}

impl StsCredentialBroker {
    pub fn new(
        sdk_config: aws_config::SdkConfig,
        role_name: impl Into<String>,
        duration: std::time::Duration,
    ) -> Self {
        Self {
            sdk_config,
            role_name: role_name.into(),
            duration,
        }
    }

    pub fn role_arn(&self, tenant_id: &str) -> String {
        format!("arn:aws:iam::{}:role/{}", tenant_id, self.role_name)
    }

    /// Built per call; nothing is retained per region.
    fn client_for(&self, region: &str) -> aws_sdk_sts::Client {
        let config = aws_sdk_sts::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        aws_sdk_sts::Client::from_conf(config)
    }
}

#[async_trait]
impl CredentialBroker for StsCredentialBroker {
    async fn assume_role(&self, tenant_id: &str, region: &str) -> Result<TemporaryCredentials> {
        let role_arn = self.role_arn(tenant_id);
        let session_name = format!("upload-{}", Uuid::new_v4().simple());

        let output = self
            .client_for(region)
            .assume_role()
            .role_arn(&role_arn)
            .role_session_name(session_name)
            .duration_seconds(self.duration.as_secs() as i32)
            .send()
            .await
            .map_err(|e| anyhow!("assume role {} failed: {}", role_arn, e.into_service_error()))?;

        let credentials = output
            .credentials()
            .ok_or_else(|| anyhow!("assume role {} returned no credentials", role_arn))?;
        let expiration = credentials.expiration();

        Ok(TemporaryCredentials {
            access_key: credentials.access_key_id().to_string(),
            secret_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiry: DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
                .ok_or_else(|| anyhow!("assume role {} returned an invalid expiry", role_arn))?,
        })
    }
}

/// Most credential sets held at once; past this, fresh exchanges are handed
/// out without being cached.
pub const MAX_CACHED_CREDENTIALS: usize = 1024;

/// Reuses exchanged credentials per tenant and region until `refresh_margin`
/// before they expire. Concurrent misses for the same key share one exchange.
/// Stale entries and idle exchange locks are purged on every miss.
pub struct CachingCredentialBroker {
    inner: Arc<dyn CredentialBroker>,
    cache: DashMap<String, TemporaryCredentials>,
    exchanges: DashMap<String, Arc<Mutex<()>>>,
    refresh_margin: Duration,
}

impl CachingCredentialBroker {
    pub fn new(inner: Arc<dyn CredentialBroker>, refresh_margin: std::time::Duration) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
            exchanges: DashMap::new(),
            refresh_margin: Duration::from_std(refresh_margin)
                .unwrap_or_else(|_| Duration::minutes(1)),
        }
    }

    fn cached(&self, key: &str, now: DateTime<Utc>) -> Option<TemporaryCredentials> {
        self.cache
            .get(key)
            .filter(|c| c.expiry - self.refresh_margin > now)
            .map(|c| c.value().clone())
    }

    fn exchange_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.exchanges
            .entry(key.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Drops entries that can no longer be served, and idle exchange locks.
    pub fn purge_expired(&self, now: DateTime<Utc>) {
        self.cache.retain(|_, c| c.expiry - self.refresh_margin > now);
        self.exchanges.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

#[async_trait]
impl CredentialBroker for CachingCredentialBroker {
    async fn assume_role(&self, tenant_id: &str, region: &str) -> Result<TemporaryCredentials> {
        let key = format!("{}/{}", tenant_id, region);
        let now = Utc::now();

        if let Some(credentials) = self.cached(&key, now) {
            return Ok(credentials);
        }

        self.purge_expired(now);

        let exchange = self.exchange_lock(&key);
        let _guard = exchange.lock().await;
        if let Some(credentials) = self.cached(&key, Utc::now()) {
            return Ok(credentials);
        }

        let credentials = self.inner.assume_role(tenant_id, region).await?;
        if self.cache.len() < MAX_CACHED_CREDENTIALS {
            self.cache.insert(key, credentials.clone());
        }
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBroker {
        calls: AtomicUsize,
        lifetime: Duration,
    }

    #[async_trait]
    impl CredentialBroker for CountingBroker {
        async fn assume_role(&self, tenant_id: &str, _region: &str) -> Result<TemporaryCredentials> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TemporaryCredentials {
                access_key: format!("AKIA{}-{}", tenant_id, n),
                secret_key: "secret".to_string(),
                session_token: "token".to_string(),
                expiry: Utc::now() + self.lifetime,
            })
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = TemporaryCredentials {
            access_key: "AKIAEXAMPLE".to_string(),
            secret_key: "super-secret".to_string(),
            session_token: "session-token".to_string(),
            expiry: Utc::now(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("AKIAEXAMPLE"));
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("session-token"));
    }

    #[tokio::test]
    async fn test_cache_reuses_until_margin() {
        let inner = Arc::new(CountingBroker {
            calls: AtomicUsize::new(0),
            lifetime: Duration::minutes(15),
        });
        let broker =
            CachingCredentialBroker::new(inner.clone(), std::time::Duration::from_secs(60));

        let a = broker.assume_role("123456789012", "us-east-1").await.unwrap();
        let b = broker.assume_role("123456789012", "us-east-1").await.unwrap();
        assert_eq!(a.access_key, b.access_key);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // Separate entries per region and per tenant
        broker.assume_role("123456789012", "eu-west-1").await.unwrap();
        broker.assume_role("210987654321", "us-east-1").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_exchange() {
        let inner = Arc::new(CountingBroker {
            calls: AtomicUsize::new(0),
            lifetime: Duration::minutes(15),
        });
        let broker =
            CachingCredentialBroker::new(inner.clone(), std::time::Duration::from_secs(60));

        let (a, b) = tokio::join!(
            broker.assume_role("123456789012", "us-east-1"),
            broker.assume_role("123456789012", "us-east-1")
        );
        assert_eq!(a.unwrap().access_key, b.unwrap().access_key);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_skips_nearly_expired() {
        let inner = Arc::new(CountingBroker {
            calls: AtomicUsize::new(0),
            lifetime: Duration::seconds(30),
        });
        let broker =
            CachingCredentialBroker::new(inner.clone(), std::time::Duration::from_secs(60));

        broker.assume_role("123456789012", "us-east-1").await.unwrap();
        broker.assume_role("123456789012", "us-east-1").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        broker.purge_expired(Utc::now());
        assert!(broker.cache.is_empty());
        assert!(broker.exchanges.is_empty());
    }

    #[tokio::test]
    async fn test_misses_purge_stale_entries() {
        let inner = Arc::new(CountingBroker {
            calls: AtomicUsize::new(0),
            lifetime: Duration::seconds(30),
        });
        let broker =
            CachingCredentialBroker::new(inner.clone(), std::time::Duration::from_secs(60));

        for i in 0..500 {
            broker
                .assume_role("123456789012", &format!("zz-region-{}", i))
                .await
                .unwrap();
        }

        assert_eq!(inner.calls.load(Ordering::SeqCst), 500);
        assert!(broker.cache.len() <= 1);
        assert!(broker.exchanges.len() <= 1);
    }

    #[tokio::test]
    async fn test_cache_size_is_capped() {
        let inner = Arc::new(CountingBroker {
            calls: AtomicUsize::new(0),
            lifetime: Duration::minutes(15),
        });
        let broker =
            CachingCredentialBroker::new(inner.clone(), std::time::Duration::from_secs(60));

        for i in 0..MAX_CACHED_CREDENTIALS + 100 {
            broker
                .assume_role("123456789012", &format!("zz-region-{}", i))
                .await
                .unwrap();
        }

        assert_eq!(broker.cache.len(), MAX_CACHED_CREDENTIALS);
        assert!(broker.exchanges.len() <= 1);
    }

    #[test]
    fn test_role_arn() {
        let sdk_config = aws_config::SdkConfig::builder().build();
        let broker = StsCredentialBroker::new(
            sdk_config,
            "upload-signer",
            std::time::Duration::from_secs(900),
        );
        assert_eq!(
            broker.role_arn("123456789012"),
            "arn:aws:iam::123456789012:role/upload-signer"
        );
    }
}
