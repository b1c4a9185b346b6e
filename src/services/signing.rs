use crate::config::SigningConfig;
use crate::models::{
    Ack, MultipartGrant, PartGrant, PutGrant, SignOperation, SignRequest, SignResponse,
};
use crate::services::allow_list::AllowListCache;
use crate::services::credentials::CredentialBroker;
use crate::services::storage::{ObjectStore, StoreTarget};
use crate::utils::validation::{
    ValidationError, storage_key_for, validate_bucket_name, validate_completed_parts,
    validate_object_key, validate_part, validate_region, validate_tenant_id, validate_upload_id,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum SignError {
    #[error("{}", .0.message)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Auth(String),

    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Issues presigned URLs and runs the administrative multipart calls on
/// behalf of an allow-listed tenant.
pub struct SigningService {
    allow_list: Arc<AllowListCache>,
    broker: Arc<dyn CredentialBroker>,
    store: Arc<dyn ObjectStore>,
    config: SigningConfig,
}

impl SigningService {
    pub fn new(
        allow_list: Arc<AllowListCache>,
        broker: Arc<dyn CredentialBroker>,
        store: Arc<dyn ObjectStore>,
        config: SigningConfig,
    ) -> Self {
        Self {
            allow_list,
            broker,
            store,
            config,
        }
    }

    pub fn allow_list(&self) -> &Arc<AllowListCache> {
        &self.allow_list
    }

    pub async fn sign(&self, req: SignRequest) -> Result<SignResponse, SignError> {
        // 1. Syntactic validation
        validate_tenant_id(&req.tenant_id)?;
        validate_request_fields(&req)?;

        // 2. Authorization
        let auth = self.allow_list.authorize(&req.tenant_id, Utc::now()).await;
        if !auth.allowed {
            tracing::warn!("Rejected signing request for tenant {}", auth.tenant_id);
            return Err(SignError::Auth("tenant not allowed".to_string()));
        }

        // 3. Credential exchange
        let region = req
            .region
            .clone()
            .unwrap_or_else(|| self.config.default_region.clone());
        let bucket = req
            .bucket
            .clone()
            .unwrap_or_else(|| self.config.default_bucket.clone());

        let credentials = self
            .broker
            .assume_role(&req.tenant_id, &region)
            .await
            .map_err(|e| {
                tracing::error!("Credential exchange failed for tenant {}: {:#}", req.tenant_id, e);
                SignError::Auth("credential exchange failed".to_string())
            })?;

        let target = StoreTarget {
            bucket,
            region,
            credentials,
        };

        tracing::info!(
            "✍️  Signing {} for tenant {} in {}/{}",
            req.operation.name(),
            req.tenant_id,
            target.region,
            target.bucket
        );

        // 4. Operation-specific signing
        self.perform(&target, req.operation)
            .await
            .map_err(SignError::Store)
    }

    async fn perform(
        &self,
        target: &StoreTarget,
        operation: SignOperation,
    ) -> anyhow::Result<SignResponse> {
        match operation {
            SignOperation::Put {
                content_type,
                original_name,
            } => {
                let key = storage_key_for(original_name.as_deref(), content_type.as_deref());
                let op = self
                    .store
                    .presign_put(
                        target,
                        &key,
                        content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
                        Duration::from_secs(self.config.put_url_expiry_secs),
                    )
                    .await?;

                Ok(SignResponse::Put(PutGrant {
                    upload_url: op.url,
                    key,
                    method: op.method,
                    expires_at: op.expires_at,
                }))
            }
            SignOperation::Initiate {
                content_type,
                original_name,
            } => {
                let key = storage_key_for(original_name.as_deref(), content_type.as_deref());
                let upload_id = self
                    .store
                    .create_multipart_upload(
                        target,
                        &key,
                        content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
                    )
                    .await?;

                tracing::info!("📦 Multipart upload {} started for key {}", upload_id, key);
                Ok(SignResponse::Multipart(MultipartGrant { upload_id, key }))
            }
            SignOperation::PresignPart {
                key,
                upload_id,
                part_number,
                part_size,
            } => {
                let op = self
                    .store
                    .presign_upload_part(
                        target,
                        &key,
                        &upload_id,
                        part_number,
                        part_size,
                        Duration::from_secs(self.config.part_url_expiry_secs),
                    )
                    .await?;

                Ok(SignResponse::Part(PartGrant {
                    presigned_url: op.url,
                    method: op.method,
                    expires_at: op.expires_at,
                }))
            }
            SignOperation::Complete {
                key,
                upload_id,
                parts,
            } => {
                self.store
                    .complete_multipart_upload(target, &key, &upload_id, &parts)
                    .await?;

                tracing::info!(
                    "✅ Multipart upload {} completed for key {} ({} parts)",
                    upload_id,
                    key,
                    parts.len()
                );
                Ok(SignResponse::Ack(Ack { success: true }))
            }
            SignOperation::Abort { key, upload_id } => {
                self.store
                    .abort_multipart_upload(target, &key, &upload_id)
                    .await?;

                tracing::info!("🗑️  Multipart upload {} aborted for key {}", upload_id, key);
                Ok(SignResponse::Ack(Ack { success: true }))
            }
        }
    }
}

fn validate_request_fields(req: &SignRequest) -> Result<(), ValidationError> {
    if let Some(bucket) = &req.bucket {
        validate_bucket_name(bucket)?;
    }
    if let Some(region) = &req.region {
        validate_region(region)?;
    }

    match &req.operation {
        SignOperation::Put { original_name, .. } | SignOperation::Initiate { original_name, .. } => {
            if let Some(name) = original_name.as_deref().filter(|n| !n.is_empty()) {
                validate_object_key(name)?;
            }
        }
        SignOperation::PresignPart {
            key,
            upload_id,
            part_number,
            part_size,
        } => {
            validate_object_key(key)?;
            validate_upload_id(upload_id)?;
            validate_part(*part_number, *part_size)?;
        }
        SignOperation::Complete {
            key,
            upload_id,
            parts,
        } => {
            validate_object_key(key)?;
            validate_upload_id(upload_id)?;
            validate_completed_parts(parts)?;
        }
        SignOperation::Abort { key, upload_id } => {
            validate_object_key(key)?;
            validate_upload_id(upload_id)?;
        }
    }
    Ok(())
}
