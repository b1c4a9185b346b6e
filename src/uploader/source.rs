use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

pub type PartReader = Box<dyn AsyncRead + Unpin + Send + Sync>;

/// Random-access view of the bytes being uploaded.
#[async_trait]
pub trait UploadSource: Send + Sync {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reader over exactly `len` bytes starting at `offset`.
    async fn open_range(&self, offset: u64, len: u64) -> Result<PartReader>;
}

pub struct FileSource {
    path: PathBuf,
    len: u64,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("reading metadata of {}", path.display()))?;
        Ok(Self {
            path,
            len: metadata.len(),
        })
    }
}

#[async_trait]
impl UploadSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn open_range(&self, offset: u64, len: u64) -> Result<PartReader> {
        let mut file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        file.seek(SeekFrom::Start(offset)).await?;
        Ok(Box::new(file.take(len)))
    }
}

/// In-memory body, mostly for small uploads and tests.
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl UploadSource for BytesSource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    async fn open_range(&self, offset: u64, len: u64) -> Result<PartReader> {
        let start = (offset as usize).min(self.data.len());
        let end = (offset.saturating_add(len) as usize).min(self.data.len());
        Ok(Box::new(std::io::Cursor::new(self.data.slice(start..end))))
    }
}
