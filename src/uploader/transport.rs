use crate::uploader::error::UploadError;
use crate::uploader::source::PartReader;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use tokio_util::io::ReaderStream;

/// Moves bytes straight to the object store through a presigned URL.
#[async_trait]
pub trait ObjectTransport: Send + Sync {
    /// PUTs exactly `len` bytes and returns the store's ETag header, if any.
    async fn put(
        &self,
        url: &str,
        body: PartReader,
        len: u64,
        content_type: Option<&str>,
    ) -> Result<Option<String>, UploadError>;
}

pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ObjectTransport for HttpTransport {
    async fn put(
        &self,
        url: &str,
        body: PartReader,
        len: u64,
        content_type: Option<&str>,
    ) -> Result<Option<String>, UploadError> {
        let mut request = self
            .http
            .put(url)
            .header(CONTENT_LENGTH, len)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(body)));

        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(UploadError::Transport(format!(
                "store rejected PUT with {}: {}",
                status,
                detail.chars().take(512).collect::<String>()
            )));
        }

        Ok(response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()))
    }
}

/// ETags arrive quoted (`"abc"`); the bare token is what gets recorded.
pub fn unquote_etag(raw: &str) -> Option<String> {
    let token = raw.trim().trim_start_matches("W/").trim_matches('"');
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
