use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use presigned_uploader::config::{SigningConfig, UploadConfig};
use presigned_uploader::infrastructure::{allow_list, broker, storage};
use presigned_uploader::models::UploadIntent;
use presigned_uploader::services::signing::SigningService;
use presigned_uploader::uploader::{FileSource, UploadSource, Uploader};
use presigned_uploader::{AppState, create_app};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "presigned-uploader", version, about = "Presigned S3 upload signer and client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the signing service
    Serve {
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Upload a local file through the signing service
    Upload {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        tenant: String,

        #[arg(long)]
        content_type: Option<String>,

        /// Store under this exact key instead of a generated one
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        bucket: Option<String>,

        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "presigned_uploader=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Serve { port } => serve(port).await,
        Command::Upload {
            file,
            tenant,
            content_type,
            name,
            bucket,
            region,
        } => {
            let source = FileSource::open(&file).await?;
            let mut intent = UploadIntent::new(tenant, source.len());
            if let Some(content_type) = content_type {
                intent = intent.with_content_type(content_type);
            }
            if let Some(name) = name {
                intent = intent.with_original_name(name);
            }
            if let Some(bucket) = bucket {
                intent = intent.with_bucket(bucket);
            }
            if let Some(region) = region {
                intent = intent.with_region(region);
            }
            upload(&source, intent).await
        }
    }
}

async fn serve(port: u16) -> anyhow::Result<()> {
    info!("🚀 Starting presigned upload signer...");

    let config = SigningConfig::from_env();
    info!(
        "🛡️  Signing Config: PUT expiry={}s, part expiry={}s, role='{}'",
        config.put_url_expiry_secs, config.part_url_expiry_secs, config.assume_role_name
    );

    let allow_list = allow_list::setup_allow_list(&config).await;
    let credential_broker = broker::setup_credential_broker(&config).await;
    let object_store = storage::setup_object_store(&config);

    let signing = Arc::new(SigningService::new(
        allow_list,
        credential_broker,
        object_store,
        config.clone(),
    ));

    let state = AppState { signing, config };

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn upload(source: &FileSource, intent: UploadIntent) -> anyhow::Result<()> {
    let config = UploadConfig::from_env();
    info!(
        "📤 Uploading {} bytes for tenant {} via {}",
        intent.file_size, intent.tenant_id, config.signing_endpoint
    );

    let uploader = Uploader::from_config(config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });

    match uploader.upload_with_cancel(source, &intent, cancel).await {
        Ok(key) => {
            println!("{}", key);
            Ok(())
        }
        Err(e) => {
            error!("❌ Upload failed: {}", e);
            Err(e.into())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
