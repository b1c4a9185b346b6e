use crate::models::{CompletedPart, SignedOperation};
use crate::services::credentials::TemporaryCredentials;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::{PresignedRequest, PresigningConfig};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use chrono::Utc;
use std::time::{Duration, SystemTime};

/// Where and as whom a store operation runs.
#[derive(Debug, Clone)]
pub struct StoreTarget {
    pub bucket: String,
    pub region: String,
    pub credentials: TemporaryCredentials,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn presign_put(
        &self,
        target: &StoreTarget,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<SignedOperation>;

    async fn create_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        content_type: &str,
    ) -> Result<String>;

    async fn presign_upload_part(
        &self,
        target: &StoreTarget,
        key: &str,
        upload_id: &str,
        part_number: u32,
        part_size: u64,
        expires_in: Duration,
    ) -> Result<SignedOperation>;

    async fn complete_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()>;

    async fn abort_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        upload_id: &str,
    ) -> Result<()>;
}

/// S3 (or S3-compatible) store. A client is built per request from the
/// tenant's temporary credentials; nothing is shared between tenants.
pub struct S3ObjectStore {
    endpoint_url: Option<String>,
    force_path_style: bool,
    operation_timeout: Duration,
}

impl S3ObjectStore {
    pub fn new(
        endpoint_url: Option<String>,
        force_path_style: bool,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            endpoint_url,
            force_path_style,
            operation_timeout,
        }
    }

    fn client(&self, target: &StoreTarget) -> Client {
        let creds = &target.credentials;
        let expires_after = SystemTime::from(creds.expiry);

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(target.region.clone()))
            .credentials_provider(Credentials::new(
                creds.access_key.clone(),
                creds.secret_key.clone(),
                Some(creds.session_token.clone()),
                Some(expires_after),
                "credential-broker",
            ))
            .force_path_style(self.force_path_style)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(self.operation_timeout)
                    .build(),
            );

        if let Some(endpoint) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Client::from_conf(builder.build())
    }
}

fn signed_operation(request: PresignedRequest, expires_in: Duration) -> SignedOperation {
    SignedOperation {
        url: request.uri().to_string(),
        method: request.method().to_string(),
        expires_at: Utc::now()
            + chrono::Duration::from_std(expires_in).unwrap_or_else(|_| chrono::Duration::zero()),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_put(
        &self,
        target: &StoreTarget,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<SignedOperation> {
        let request = self
            .client(target)
            .put_object()
            .bucket(&target.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;

        Ok(signed_operation(request, expires_in))
    }

    async fn create_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        content_type: &str,
    ) -> Result<String> {
        let res = self
            .client(target)
            .create_multipart_upload()
            .bucket(&target.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await;

        match res {
            Ok(output) => output
                .upload_id()
                .map(|id| id.to_string())
                .ok_or_else(|| anyhow!("No upload ID")),
            Err(e) => {
                tracing::error!(
                    "S3 create_multipart_upload failed: bucket={}, key={}, error={:?}",
                    target.bucket,
                    key,
                    e
                );
                Err(e.into())
            }
        }
    }

    async fn presign_upload_part(
        &self,
        target: &StoreTarget,
        key: &str,
        upload_id: &str,
        part_number: u32,
        part_size: u64,
        expires_in: Duration,
    ) -> Result<SignedOperation> {
        let request = self
            .client(target)
            .upload_part()
            .bucket(&target.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number as i32)
            .content_length(part_size as i64)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;

        Ok(signed_operation(request, expires_in))
    }

    async fn complete_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()> {
        let completed_parts = parts
            .iter()
            .map(|p| {
                S3CompletedPart::builder()
                    .e_tag(format!("\"{}\"", p.etag))
                    .part_number(p.part_number as i32)
                    .build()
            })
            .collect();

        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        let res = self
            .client(target)
            .complete_multipart_upload()
            .bucket(&target.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 complete_multipart_upload failed: bucket={}, key={}, upload_id={}, error={:?}",
                target.bucket,
                key,
                upload_id,
                e
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        target: &StoreTarget,
        key: &str,
        upload_id: &str,
    ) -> Result<()> {
        self.client(target)
            .abort_multipart_upload()
            .bucket(&target.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await?;
        Ok(())
    }
}
