use crate::models::CompletedPart;
use uuid::Uuid;

/// Tenant identifiers are fixed-length account numbers.
pub const TENANT_ID_LEN: usize = 12;

/// Store-side limits for multipart uploads
pub const MAX_PART_NUMBER: u32 = 10_000;
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum object key length in bytes
pub const MAX_KEY_LEN: usize = 1024;

const DEFAULT_EXTENSION: &str = "bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_tenant_id(tenant_id: &str) -> Result<(), ValidationError> {
    if tenant_id.len() == TENANT_ID_LEN && tenant_id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("INVALID_TENANT", "bad tenant id"))
    }
}

/// S3 bucket naming rules: 3-63 chars of lowercase letters, digits, dots and
/// hyphens, starting and ending with a letter or digit.
pub fn validate_bucket_name(bucket: &str) -> Result<(), ValidationError> {
    let bytes = bucket.as_bytes();
    let valid_len = (3..=63).contains(&bytes.len());
    let valid_chars = bytes
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'.' || *b == b'-');
    let valid_edges = bytes
        .first()
        .zip(bytes.last())
        .map(|(f, l)| f.is_ascii_alphanumeric() && l.is_ascii_alphanumeric())
        .unwrap_or(false);

    if valid_len && valid_chars && valid_edges && !bucket.contains("..") {
        Ok(())
    } else {
        Err(ValidationError::new(
            "INVALID_BUCKET",
            format!("Bucket name '{}' is not valid", bucket),
        ))
    }
}

/// Region names look like `us-east-1` or `ap-southeast-2`.
pub fn validate_region(region: &str) -> Result<(), ValidationError> {
    let segments: Vec<&str> = region.split('-').collect();
    let valid = segments.len() >= 3
        && segments[..segments.len() - 1]
            .iter()
            .all(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase()))
        && segments
            .last()
            .map(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new(
            "INVALID_REGION",
            format!("Region '{}' is not valid", region),
        ))
    }
}

pub fn validate_object_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::new("MISSING_KEY", "key is required"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ValidationError::new(
            "KEY_TOO_LONG",
            format!("key exceeds {} bytes", MAX_KEY_LEN),
        ));
    }
    if key.chars().any(|c| c.is_control()) {
        return Err(ValidationError::new(
            "INVALID_KEY",
            "key contains control characters",
        ));
    }
    Ok(())
}

pub fn validate_upload_id(upload_id: &str) -> Result<(), ValidationError> {
    if upload_id.trim().is_empty() {
        return Err(ValidationError::new(
            "MISSING_UPLOAD_ID",
            "uploadId is required",
        ));
    }
    Ok(())
}

pub fn validate_part(part_number: u32, part_size: u64) -> Result<(), ValidationError> {
    if !(1..=MAX_PART_NUMBER).contains(&part_number) {
        return Err(ValidationError::new(
            "INVALID_PART_NUMBER",
            format!("partNumber must be between 1 and {}", MAX_PART_NUMBER),
        ));
    }
    if part_size == 0 || part_size > MAX_PART_SIZE {
        return Err(ValidationError::new(
            "INVALID_PART_SIZE",
            format!("partSize must be between 1 and {} bytes", MAX_PART_SIZE),
        ));
    }
    Ok(())
}

/// Parts handed to completion must be exactly 1..=n in ascending order.
pub fn validate_completed_parts(parts: &[CompletedPart]) -> Result<(), ValidationError> {
    if parts.is_empty() {
        return Err(ValidationError::new("MISSING_PARTS", "parts are required"));
    }
    for (index, part) in parts.iter().enumerate() {
        let expected = index as u32 + 1;
        if part.part_number != expected {
            return Err(ValidationError::new(
                "INVALID_PARTS",
                format!(
                    "parts must be contiguous and ascending: expected part {}, got {}",
                    expected, part.part_number
                ),
            ));
        }
        if part.etag.trim().is_empty() {
            return Err(ValidationError::new(
                "INVALID_PARTS",
                format!("part {} has an empty etag", part.part_number),
            ));
        }
    }
    Ok(())
}

/// Extension derived from a content type's subtype, `bin` when absent or unparseable.
pub fn extension_for_content_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.trim().parse::<mime::Mime>().ok())
        .map(|m| m.subtype().as_str().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext != "*")
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// An explicit name is used verbatim; otherwise a random key is synthesized.
pub fn storage_key_for(original_name: Option<&str>, content_type: Option<&str>) -> String {
    match original_name.filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => format!(
            "{}.{}",
            Uuid::new_v4(),
            extension_for_content_type(content_type)
        ),
    }
}
