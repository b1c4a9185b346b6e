#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use presigned_uploader::config::SigningConfig;
use presigned_uploader::models::{CompletedPart, SignedOperation};
use presigned_uploader::services::allow_list::{AllowListCache, AllowListSource};
use presigned_uploader::services::credentials::{CredentialBroker, TemporaryCredentials};
use presigned_uploader::services::signing::SigningService;
use presigned_uploader::services::storage::{ObjectStore, StoreTarget};
use presigned_uploader::{AppState, create_app};
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const TENANT: &str = "123456789012";
pub const OTHER_TENANT: &str = "210987654321";

pub struct StaticAllowList(pub Vec<String>);

#[async_trait]
impl AllowListSource for StaticAllowList {
    async fn load(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct MockBroker {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl MockBroker {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialBroker for MockBroker {
    async fn assume_role(&self, tenant_id: &str, _region: &str) -> Result<TemporaryCredentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("AccessDenied for {}", tenant_id));
        }
        Ok(TemporaryCredentials {
            access_key: format!("ASIA{}", tenant_id),
            secret_key: "secret".to_string(),
            session_token: "token".to_string(),
            expiry: Utc::now() + ChronoDuration::minutes(15),
        })
    }
}

/// Records every store call as `"<op> <bucket>/<key>"`.
#[derive(Default)]
pub struct MockObjectStore {
    pub calls: Mutex<Vec<String>>,
    pub completed: Mutex<Vec<Vec<CompletedPart>>>,
    pub fail: AtomicBool,
}

impl MockObjectStore {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    fn record(&self, op: &str, target: &StoreTarget, key: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}/{}", op, target.bucket, key));
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("SlowDown: internal store detail"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn presign_put(
        &self,
        target: &StoreTarget,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> Result<SignedOperation> {
        self.record("put", target, key)?;
        Ok(SignedOperation {
            url: format!("https://store.test/{}/{}?X-Amz-Signature=abc", target.bucket, key),
            method: "PUT".to_string(),
            expires_at: Utc::now() + ChronoDuration::from_std(expires_in)?,
        })
    }

    async fn create_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        _content_type: &str,
    ) -> Result<String> {
        self.record("initiate", target, key)?;
        Ok(format!("upload-{}", key.len()))
    }

    async fn presign_upload_part(
        &self,
        target: &StoreTarget,
        key: &str,
        upload_id: &str,
        part_number: u32,
        _part_size: u64,
        expires_in: Duration,
    ) -> Result<SignedOperation> {
        self.record("presignPart", target, key)?;
        Ok(SignedOperation {
            url: format!(
                "https://store.test/{}/{}?partNumber={}&uploadId={}",
                target.bucket, key, part_number, upload_id
            ),
            method: "PUT".to_string(),
            expires_at: Utc::now() + ChronoDuration::from_std(expires_in)?,
        })
    }

    async fn complete_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        _upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()> {
        self.record("complete", target, key)?;
        self.completed.lock().unwrap().push(parts.to_vec());
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        _upload_id: &str,
    ) -> Result<()> {
        self.record("abort", target, key)
    }
}

pub struct TestApp {
    pub router: Router,
    pub broker: Arc<MockBroker>,
    pub store: Arc<MockObjectStore>,
}

pub fn test_app() -> TestApp {
    test_app_with_tenants(vec![TENANT.to_string()])
}

pub fn test_app_with_tenants(tenants: Vec<String>) -> TestApp {
    let config = SigningConfig::development();
    let broker = Arc::new(MockBroker::default());
    let store = Arc::new(MockObjectStore::default());
    let allow_list = Arc::new(AllowListCache::new(
        Arc::new(StaticAllowList(tenants)),
        Duration::from_secs(config.allow_list_ttl_secs),
    ));

    let signing = Arc::new(SigningService::new(
        allow_list,
        broker.clone(),
        store.clone(),
        config.clone(),
    ));

    TestApp {
        router: create_app(AppState { signing, config }),
        broker,
        store,
    }
}
