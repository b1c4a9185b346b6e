use std::env;
use std::path::PathBuf;

pub const MIB: u64 = 1024 * 1024;
pub const GIB: u64 = 1024 * MIB;

/// Signing service configuration
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Bucket used when the request carries no override
    pub default_bucket: String,

    /// Region used when the request carries no override (default: "us-east-1")
    pub default_region: String,

    /// JSON file holding the tenant allow-list
    pub allow_list_path: PathBuf,

    /// Allow-list snapshot time-to-live in seconds (default: 60)
    pub allow_list_ttl_secs: u64,

    /// Role assumed in the tenant account (default: "upload-signer")
    pub assume_role_name: String,

    /// Lifetime of exchanged credentials in seconds (default: 900)
    pub credential_duration_secs: u64,

    /// Reuse exchanged credentials until shortly before they expire (default: false)
    pub cache_credentials: bool,

    /// Single PUT URL expiry in seconds (default: 300)
    pub put_url_expiry_secs: u64,

    /// Part PUT URL expiry in seconds (default: 3600)
    pub part_url_expiry_secs: u64,

    /// Timeout for initiate / complete / abort in seconds (default: 60)
    pub metadata_expiry_secs: u64,

    /// Custom S3 endpoint (MinIO, LocalStack)
    pub s3_endpoint: Option<String>,

    /// Path-style bucket addressing, required by most S3 clones (default: false)
    pub s3_force_path_style: bool,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            default_bucket: "uploads".to_string(),
            default_region: "us-east-1".to_string(),
            allow_list_path: PathBuf::from("allowed-tenants.json"),
            allow_list_ttl_secs: 60,
            assume_role_name: "upload-signer".to_string(),
            credential_duration_secs: 15 * 60,
            cache_credentials: false,
            put_url_expiry_secs: 300,
            part_url_expiry_secs: 3600,
            metadata_expiry_secs: 60,
            s3_endpoint: None,
            s3_force_path_style: false,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl SigningConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading each key through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            default_bucket: lookup("DEFAULT_BUCKET").unwrap_or(default.default_bucket),

            default_region: lookup("DEFAULT_REGION").unwrap_or(default.default_region),

            allow_list_path: lookup("ALLOW_LIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.allow_list_path),

            allow_list_ttl_secs: lookup("ALLOW_LIST_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.allow_list_ttl_secs),

            assume_role_name: lookup("ASSUME_ROLE_NAME").unwrap_or(default.assume_role_name),

            credential_duration_secs: lookup("CREDENTIAL_DURATION_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.credential_duration_secs),

            cache_credentials: lookup("CACHE_CREDENTIALS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.cache_credentials),

            put_url_expiry_secs: lookup("PUT_URL_EXPIRY_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.put_url_expiry_secs),

            part_url_expiry_secs: lookup("PART_URL_EXPIRY_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.part_url_expiry_secs),

            metadata_expiry_secs: lookup("METADATA_EXPIRY_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.metadata_expiry_secs),

            s3_endpoint: lookup("S3_ENDPOINT").filter(|v| !v.is_empty()),

            s3_force_path_style: lookup("S3_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.s3_force_path_style),

            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Local MinIO setup: path-style addressing against localhost:9000
    pub fn development() -> Self {
        Self {
            s3_endpoint: Some("http://127.0.0.1:9000".to_string()),
            s3_force_path_style: true,
            ..Self::default()
        }
    }
}

/// Upload orchestrator configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Signing service endpoint (default: "http://127.0.0.1:3000/api/media")
    pub signing_endpoint: String,

    /// Largest size sent as a single PUT (default: 5 GiB)
    pub multipart_threshold: u64,

    /// Multipart part size in bytes (default: 100 MiB)
    pub part_size: u64,

    /// Part uploads in flight at once (default: 1)
    pub part_concurrency: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            signing_endpoint: "http://127.0.0.1:3000/api/media".to_string(),
            multipart_threshold: 5 * GIB,
            part_size: 100 * MIB,
            part_concurrency: 1,
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading each key through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            signing_endpoint: lookup("SIGNING_ENDPOINT").unwrap_or(default.signing_endpoint),

            multipart_threshold: lookup("MULTIPART_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.multipart_threshold),

            part_size: lookup("PART_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|v: &u64| *v > 0)
                .unwrap_or(default.part_size),

            part_concurrency: lookup("PART_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(default.part_concurrency),
        }
    }
}
