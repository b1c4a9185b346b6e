//! Caller-side upload orchestration.
//!
//! Files up to the multipart threshold go up in one presigned PUT. Larger
//! files are split into fixed-size parts, each PUT through its own presigned
//! URL, then assembled with a single complete call. Once a multipart upload
//! has been initiated, any failure (including cancellation) aborts it before
//! the error is returned, so the store never keeps orphaned parts around.

pub mod error;
pub mod session;
pub mod signing_client;
pub mod source;
pub mod transport;

use crate::config::UploadConfig;
use crate::models::{
    MultipartGrant, PartGrant, PutGrant, SignOperation, SignRequest, SignResponse, UploadIntent,
    UploadStrategy,
};
use crate::utils::validation::{MAX_PART_NUMBER, MAX_PART_SIZE};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use error::UploadError;
pub use session::{MultipartSession, PartRange};
pub use signing_client::{HttpSigningClient, SigningClient};
pub use source::{BytesSource, FileSource, UploadSource};
pub use transport::{HttpTransport, ObjectTransport};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub struct Uploader {
    signer: Arc<dyn SigningClient>,
    transport: Arc<dyn ObjectTransport>,
    config: UploadConfig,
}

impl Uploader {
    pub fn new(
        signer: Arc<dyn SigningClient>,
        transport: Arc<dyn ObjectTransport>,
        config: UploadConfig,
    ) -> Self {
        Self {
            signer,
            transport,
            config,
        }
    }

    /// HTTP signing client and transport sharing one connection pool.
    pub fn from_config(config: UploadConfig) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let signer = HttpSigningClient::new(http.clone(), &config.signing_endpoint)?;

        Ok(Self::new(
            Arc::new(signer),
            Arc::new(HttpTransport::new(http)),
            config,
        ))
    }

    pub fn strategy_for(&self, file_size: u64) -> UploadStrategy {
        UploadStrategy::for_size(file_size, self.config.multipart_threshold)
    }

    pub async fn upload(
        &self,
        source: &dyn UploadSource,
        intent: &UploadIntent,
    ) -> Result<String, UploadError> {
        self.upload_with_cancel(source, intent, CancellationToken::new())
            .await
    }

    pub async fn upload_with_cancel(
        &self,
        source: &dyn UploadSource,
        intent: &UploadIntent,
        cancel: CancellationToken,
    ) -> Result<String, UploadError> {
        if source.len() != intent.file_size {
            return Err(UploadError::Integrity(format!(
                "declared size {} does not match actual size {}",
                intent.file_size,
                source.len()
            )));
        }

        match self.strategy_for(source.len()) {
            UploadStrategy::SinglePut => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(UploadError::Cancelled),
                    res = self.single_put(source, intent) => res,
                }
            }
            UploadStrategy::Multipart => self.multipart(source, intent, &cancel).await,
        }
    }

    async fn single_put(
        &self,
        source: &dyn UploadSource,
        intent: &UploadIntent,
    ) -> Result<String, UploadError> {
        let grant = expect_put(
            self.signer
                .sign(&SignRequest::for_intent(
                    intent,
                    SignOperation::Put {
                        content_type: intent.content_type.clone(),
                        original_name: intent.original_name.clone(),
                    },
                ))
                .await?,
        )?;

        let body = source
            .open_range(0, intent.file_size)
            .await
            .map_err(|e| UploadError::Validation(format!("reading source: {:#}", e)))?;
        let content_type = intent.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);

        self.transport
            .put(&grant.upload_url, body, intent.file_size, Some(content_type))
            .await?;

        tracing::info!(
            "✅ Uploaded {} bytes as {} (single PUT)",
            intent.file_size,
            grant.key
        );
        Ok(grant.key)
    }

    async fn multipart(
        &self,
        source: &dyn UploadSource,
        intent: &UploadIntent,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError> {
        let part_size = self.config.part_size;
        if part_size == 0 || part_size > MAX_PART_SIZE {
            return Err(UploadError::Validation(format!(
                "part size {} is outside 1..={}",
                part_size, MAX_PART_SIZE
            )));
        }
        let parts = session::total_parts(intent.file_size, part_size);
        if parts > MAX_PART_NUMBER as u64 {
            return Err(UploadError::Validation(format!(
                "{} parts of {} bytes exceed the {} part limit",
                parts, part_size, MAX_PART_NUMBER
            )));
        }

        let grant = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            res = self.initiate(intent) => res?,
        };

        let mut session =
            MultipartSession::new(grant.key, grant.upload_id, intent.file_size, part_size);
        tracing::info!(
            "📦 Multipart upload {} for {}: {} parts of {} bytes",
            session.upload_id(),
            session.storage_key(),
            session.total_parts(),
            session.part_size()
        );

        let result = match self.upload_parts(source, intent, &mut session, cancel).await {
            Ok(()) => self.complete(intent, &session).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    "✅ Uploaded {} bytes as {} ({} parts)",
                    intent.file_size,
                    session.storage_key(),
                    session.total_parts()
                );
                Ok(session.into_storage_key())
            }
            Err(e) => {
                tracing::error!(
                    "❌ Multipart upload {} failed: {}",
                    session.upload_id(),
                    e
                );
                self.abort(intent, &session).await;
                Err(e)
            }
        }
    }

    async fn initiate(&self, intent: &UploadIntent) -> Result<MultipartGrant, UploadError> {
        expect_multipart(
            self.signer
                .sign(&SignRequest::for_intent(
                    intent,
                    SignOperation::Initiate {
                        content_type: intent.content_type.clone(),
                        original_name: intent.original_name.clone(),
                    },
                ))
                .await?,
        )
    }

    /// Runs up to `part_concurrency` part uploads at once. Each finished part
    /// is recorded under its own number, so completion order is irrelevant.
    async fn upload_parts(
        &self,
        source: &dyn UploadSource,
        intent: &UploadIntent,
        session: &mut MultipartSession,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let key = session.storage_key().to_string();
        let upload_id = session.upload_id().to_string();
        let total = session.total_parts();
        let (key, upload_id) = (key.as_str(), upload_id.as_str());

        let mut uploads = futures::stream::iter(
            session
                .part_ranges()
                .into_iter()
                .map(move |range| self.upload_part(source, intent, key, upload_id, range)),
        )
        .buffer_unordered(self.config.part_concurrency.max(1));

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                next = uploads.next() => next,
            };

            match next {
                Some(Ok((part_number, etag))) => {
                    session.record(part_number, etag)?;
                    tracing::debug!(
                        "⬆️  Part {}/{} confirmed ({} done)",
                        part_number,
                        total,
                        session.completed_count()
                    );
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            }
        }
    }

    async fn upload_part(
        &self,
        source: &dyn UploadSource,
        intent: &UploadIntent,
        key: &str,
        upload_id: &str,
        range: PartRange,
    ) -> Result<(u32, String), UploadError> {
        let grant = expect_part(
            self.signer
                .sign(&SignRequest::for_intent(
                    intent,
                    SignOperation::PresignPart {
                        key: key.to_string(),
                        upload_id: upload_id.to_string(),
                        part_number: range.part_number,
                        part_size: range.len,
                    },
                ))
                .await?,
        )?;

        let body = source
            .open_range(range.offset, range.len)
            .await
            .map_err(|e| UploadError::Validation(format!("reading source: {:#}", e)))?;

        let etag = self
            .transport
            .put(&grant.presigned_url, body, range.len, None)
            .await?
            .as_deref()
            .and_then(transport::unquote_etag)
            .ok_or_else(|| {
                UploadError::Integrity(format!(
                    "store returned no ETag for part {}",
                    range.part_number
                ))
            })?;

        Ok((range.part_number, etag))
    }

    async fn complete(
        &self,
        intent: &UploadIntent,
        session: &MultipartSession,
    ) -> Result<(), UploadError> {
        let parts = session.completed_parts()?;
        let response = self
            .signer
            .sign(&SignRequest::for_intent(
                intent,
                SignOperation::Complete {
                    key: session.storage_key().to_string(),
                    upload_id: session.upload_id().to_string(),
                    parts,
                },
            ))
            .await?;
        expect_ack(response, "complete")
    }

    /// Best effort: a failed abort is logged, the original error still wins.
    async fn abort(&self, intent: &UploadIntent, session: &MultipartSession) {
        let res = self
            .signer
            .sign(&SignRequest::for_intent(
                intent,
                SignOperation::Abort {
                    key: session.storage_key().to_string(),
                    upload_id: session.upload_id().to_string(),
                },
            ))
            .await
            .and_then(|response| expect_ack(response, "abort"));

        match res {
            Ok(()) => tracing::info!("🗑️  Aborted multipart upload {}", session.upload_id()),
            Err(e) => tracing::warn!(
                "Failed to abort multipart upload {} for {}: {}",
                session.upload_id(),
                session.storage_key(),
                e
            ),
        }
    }
}

fn unexpected(operation: &str, response: &SignResponse) -> UploadError {
    UploadError::Transport(format!(
        "unexpected signing response for {}: {:?}",
        operation, response
    ))
}

fn expect_put(response: SignResponse) -> Result<PutGrant, UploadError> {
    match response {
        SignResponse::Put(grant) => Ok(grant),
        other => Err(unexpected("put", &other)),
    }
}

fn expect_multipart(response: SignResponse) -> Result<MultipartGrant, UploadError> {
    match response {
        SignResponse::Multipart(grant) => Ok(grant),
        other => Err(unexpected("initiate", &other)),
    }
}

fn expect_part(response: SignResponse) -> Result<PartGrant, UploadError> {
    match response {
        SignResponse::Part(grant) => Ok(grant),
        other => Err(unexpected("presignPart", &other)),
    }
}

fn expect_ack(response: SignResponse, operation: &str) -> Result<(), UploadError> {
    match response {
        SignResponse::Ack(ack) if ack.success => Ok(()),
        other => Err(unexpected(operation, &other)),
    }
}
