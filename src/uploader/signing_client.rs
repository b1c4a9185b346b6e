use crate::models::{SignRequest, SignResponse};
use crate::uploader::error::UploadError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

/// The orchestrator's view of the signing service.
#[async_trait]
pub trait SigningClient: Send + Sync {
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, UploadError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to `POST /api/media` over HTTP.
pub struct HttpSigningClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpSigningClient {
    pub fn new(http: reqwest::Client, endpoint: &str) -> Result<Self, UploadError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            UploadError::Validation(format!("invalid signing endpoint '{}': {}", endpoint, e))
        })?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl SigningClient for HttpSigningClient {
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, UploadError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response.json::<SignResponse>().await.map_err(|e| {
                UploadError::Transport(format!("unreadable signing response: {}", e))
            });
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| status.to_string());

        Err(match status {
            StatusCode::BAD_REQUEST => UploadError::Validation(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UploadError::Auth(message),
            _ => UploadError::Transport(format!(
                "signing service returned {}: {}",
                status, message
            )),
        })
    }
}
