mod common;

use async_trait::async_trait;
use common::{OTHER_TENANT, TENANT, test_app};
use presigned_uploader::config::UploadConfig;
use presigned_uploader::models::UploadIntent;
use presigned_uploader::uploader::source::PartReader;
use presigned_uploader::uploader::{
    BytesSource, HttpSigningClient, ObjectTransport, UploadError, Uploader,
};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;

/// Stands in for the object store: keeps each PUT body keyed by URL.
#[derive(Default)]
struct RecordingTransport {
    puts: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl ObjectTransport for RecordingTransport {
    async fn put(
        &self,
        url: &str,
        mut body: PartReader,
        _len: u64,
        _content_type: Option<&str>,
    ) -> Result<Option<String>, UploadError> {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let mut puts = self.puts.lock().unwrap();
        puts.push((url.to_string(), buf.len()));
        Ok(Some(format!("\"etag-{}\"", puts.len())))
    }
}

async fn spawn_server() -> (String, common::TestApp) {
    let app = test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}/api/media", addr), app)
}

fn uploader_for(endpoint: &str, transport: Arc<RecordingTransport>) -> Uploader {
    let config = UploadConfig {
        signing_endpoint: endpoint.to_string(),
        multipart_threshold: 1024,
        part_size: 300,
        part_concurrency: 2,
    };
    let signer = HttpSigningClient::new(reqwest::Client::new(), &config.signing_endpoint).unwrap();
    Uploader::new(Arc::new(signer), transport, config)
}

#[tokio::test]
async fn test_single_put_through_http() {
    let (endpoint, app) = spawn_server().await;
    let transport = Arc::new(RecordingTransport::default());
    let uploader = uploader_for(&endpoint, transport.clone());

    let intent = UploadIntent::new(TENANT, 512)
        .with_content_type("text/plain")
        .with_original_name("notes.txt");
    let key = uploader
        .upload(&BytesSource::new(vec![7u8; 512]), &intent)
        .await
        .unwrap();

    assert_eq!(key, "notes.txt");
    assert_eq!(app.store.calls(), vec!["put uploads/notes.txt"]);
    let puts = transport.puts.lock().unwrap().clone();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].1, 512);
}

#[tokio::test]
async fn test_multipart_through_http() {
    let (endpoint, app) = spawn_server().await;
    let transport = Arc::new(RecordingTransport::default());
    let uploader = uploader_for(&endpoint, transport.clone());

    let intent = UploadIntent::new(TENANT, 2000).with_content_type("application/zip");
    let key = uploader
        .upload(&BytesSource::new(vec![1u8; 2000]), &intent)
        .await
        .unwrap();

    assert!(key.ends_with(".zip"));
    assert_eq!(app.store.count("initiate"), 1);
    assert_eq!(app.store.count("presignPart"), 7);
    assert_eq!(app.store.count("complete"), 1);
    assert_eq!(app.store.count("abort"), 0);

    let total: usize = transport.puts.lock().unwrap().iter().map(|(_, n)| n).sum();
    assert_eq!(total, 2000);

    let completed = app.store.completed.lock().unwrap().clone();
    let numbers: Vec<u32> = completed[0].iter().map(|p| p.part_number).collect();
    assert_eq!(numbers, (1..=7).collect::<Vec<_>>());
    assert!(
        app.store
            .calls()
            .iter()
            .all(|c| c.ends_with(&format!("uploads/{}", key)))
    );
}

#[tokio::test]
async fn test_unlisted_tenant_maps_to_auth_error() {
    let (endpoint, app) = spawn_server().await;
    let transport = Arc::new(RecordingTransport::default());
    let uploader = uploader_for(&endpoint, transport.clone());

    let intent = UploadIntent::new(OTHER_TENANT, 10);
    let err = uploader
        .upload(&BytesSource::new(vec![0u8; 10]), &intent)
        .await
        .unwrap_err();

    assert_eq!(err, UploadError::Auth("tenant not allowed".to_string()));
    assert_eq!(app.broker.calls(), 0);
    assert!(transport.puts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_tenant_maps_to_validation_error() {
    let (endpoint, _app) = spawn_server().await;
    let transport = Arc::new(RecordingTransport::default());
    let uploader = uploader_for(&endpoint, transport);

    let intent = UploadIntent::new("12345", 10);
    let err = uploader
        .upload(&BytesSource::new(vec![0u8; 10]), &intent)
        .await
        .unwrap_err();

    assert_eq!(err, UploadError::Validation("bad tenant id".to_string()));
}

#[tokio::test]
async fn test_unreachable_signer_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/api/media", listener.local_addr().unwrap());
    drop(listener);

    let uploader = uploader_for(&endpoint, Arc::new(RecordingTransport::default()));
    let intent = UploadIntent::new(TENANT, 10);
    let err = uploader
        .upload(&BytesSource::new(vec![0u8; 10]), &intent)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}
