use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the caller wants to store. Fixed for the lifetime of one upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadIntent {
    pub file_size: u64,
    pub content_type: Option<String>,
    pub original_name: Option<String>,
    pub tenant_id: String,
    pub bucket: Option<String>,
    pub region: Option<String>,
}

impl UploadIntent {
    pub fn new(tenant_id: impl Into<String>, file_size: u64) -> Self {
        Self {
            file_size,
            content_type: None,
            original_name: None,
            tenant_id: tenant_id.into(),
            bucket: None,
            region: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    SinglePut,
    Multipart,
}

impl UploadStrategy {
    /// Sizes up to and including `threshold` go through a single PUT.
    pub fn for_size(file_size: u64, threshold: u64) -> Self {
        if file_size > threshold {
            UploadStrategy::Multipart
        } else {
            UploadStrategy::SinglePut
        }
    }
}

/// A presigned request handed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedOperation {
    pub url: String,
    pub method: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantAuthorization {
    pub tenant_id: String,
    pub allowed: bool,
}

/// Body of `POST /api/media`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(flatten)]
    pub operation: SignOperation,
}

impl SignRequest {
    pub fn for_intent(intent: &UploadIntent, operation: SignOperation) -> Self {
        Self {
            tenant_id: intent.tenant_id.clone(),
            bucket: intent.bucket.clone(),
            region: intent.region.clone(),
            operation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SignOperation {
    #[serde(rename_all = "camelCase")]
    Put {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        original_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Initiate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        original_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PresignPart {
        key: String,
        upload_id: String,
        part_number: u32,
        part_size: u64,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        key: String,
        upload_id: String,
        parts: Vec<CompletedPart>,
    },
    #[serde(rename_all = "camelCase")]
    Abort { key: String, upload_id: String },
}

impl SignOperation {
    pub fn name(&self) -> &'static str {
        match self {
            SignOperation::Put { .. } => "put",
            SignOperation::Initiate { .. } => "initiate",
            SignOperation::PresignPart { .. } => "presignPart",
            SignOperation::Complete { .. } => "complete",
            SignOperation::Abort { .. } => "abort",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PutGrant {
    pub upload_url: String,
    pub key: String,
    pub method: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MultipartGrant {
    pub upload_id: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartGrant {
    pub presigned_url: String,
    pub method: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Ack {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum SignResponse {
    Put(PutGrant),
    Multipart(MultipartGrant),
    Part(PartGrant),
    Ack(Ack),
}
