use crate::models::CompletedPart;
use crate::uploader::error::UploadError;
use std::collections::BTreeMap;

/// Byte range of one part. Part numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    pub part_number: u32,
    pub offset: u64,
    pub len: u64,
}

pub fn total_parts(file_size: u64, part_size: u64) -> u64 {
    file_size.div_ceil(part_size)
}

/// Splits `file_size` into `part_size` chunks; only the last may be shorter.
pub fn plan_parts(file_size: u64, part_size: u64) -> Vec<PartRange> {
    (0..total_parts(file_size, part_size))
        .map(|index| {
            let offset = index * part_size;
            PartRange {
                part_number: index as u32 + 1,
                offset,
                len: part_size.min(file_size - offset),
            }
        })
        .collect()
}

/// State of one in-flight multipart upload, from a successful initiate until
/// complete or abort.
#[derive(Debug, Clone)]
pub struct MultipartSession {
    storage_key: String,
    upload_id: String,
    file_size: u64,
    part_size: u64,
    total_parts: u32,
    completed: BTreeMap<u32, String>,
}

impl MultipartSession {
    pub fn new(
        storage_key: impl Into<String>,
        upload_id: impl Into<String>,
        file_size: u64,
        part_size: u64,
    ) -> Self {
        Self {
            storage_key: storage_key.into(),
            upload_id: upload_id.into(),
            file_size,
            part_size,
            total_parts: total_parts(file_size, part_size) as u32,
            completed: BTreeMap::new(),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    pub fn total_parts(&self) -> u32 {
        self.total_parts
    }

    pub fn part_ranges(&self) -> Vec<PartRange> {
        plan_parts(self.file_size, self.part_size)
    }

    /// Records the store's confirmation of a part. Each part number in
    /// `1..=total_parts` may be recorded once.
    pub fn record(&mut self, part_number: u32, etag: impl Into<String>) -> Result<(), UploadError> {
        if part_number == 0 || part_number > self.total_parts {
            return Err(UploadError::Integrity(format!(
                "part {} is outside 1..={}",
                part_number, self.total_parts
            )));
        }
        if self.completed.contains_key(&part_number) {
            return Err(UploadError::Integrity(format!(
                "part {} was confirmed twice",
                part_number
            )));
        }
        self.completed.insert(part_number, etag.into());
        Ok(())
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.total_parts as usize
    }

    /// Parts in ascending part number order, only once every part is confirmed.
    pub fn completed_parts(&self) -> Result<Vec<CompletedPart>, UploadError> {
        if !self.is_complete() {
            return Err(UploadError::Integrity(format!(
                "only {} of {} parts confirmed",
                self.completed.len(),
                self.total_parts
            )));
        }
        Ok(self
            .completed
            .iter()
            .map(|(part_number, etag)| CompletedPart {
                part_number: *part_number,
                etag: etag.clone(),
            })
            .collect())
    }

    pub fn into_storage_key(self) -> String {
        self.storage_key
    }
}
