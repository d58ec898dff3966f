//! Object storage layer
//!
//! The gateway talks to its backend through the [`ObjectStore`] trait:
//! - [`S3Store`] - MinIO / S3-compatible endpoint via `rust-s3`
//! - [`MemoryStore`] - in-process store for local runs and tests

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tracing::trace;

use crate::config::StorageConfig;
use crate::utils::filename::NAME_SEPARATOR;

pub mod memory;
pub mod s3_client;

pub use memory::MemoryStore;
pub use s3_client::S3Store;

/// Backend operations the gateway delegates to.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a bucket. Returns `true` when the bucket exists afterwards.
    async fn create_bucket(&self, bucket: &str) -> Result<bool, StorageError>;

    /// Store an uploaded file and return the object name assigned to it.
    async fn put_object(&self, bucket: &str, file: UploadedFile) -> Result<String, StorageError>;

    /// Open a read handle on an object.
    async fn get_object(&self, bucket: &str, object: &str) -> Result<ObjectStream, StorageError>;

    async fn remove_object(&self, bucket: &str, object: &str) -> Result<(), StorageError>;
}

/// Build the store selected by `STORAGE_PROVIDER`.
pub fn connect(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.provider.as_str() {
        "s3" | "minio" => Ok(Arc::new(S3Store::new(config)?)),
        "memory" => Ok(Arc::new(MemoryStore::with_bucket(&config.bucket))),
        other => Err(StorageError::Config(format!(
            "unknown storage provider '{}'",
            other
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A file received from a multipart upload. Dropped once the store accepts it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Content type to store the object with: guessed from the extension,
    /// then the client-declared type, then `application/octet-stream`.
    pub fn resolved_content_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first()
            .map(|m| m.essence_str().to_string())
            .or_else(|| self.content_type.clone())
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
    }
}

/// Assign a storage name to an uploaded file: `<stem>####<uuid>.<ext>`.
///
/// The stem before the separator is what previews and downloads show to the
/// client, so it is kept readable; the uuid keeps repeated uploads distinct.
pub fn assign_object_name(file_name: &str) -> String {
    // Old IE sends the full client path.
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let (stem, extension) = match base.rfind('.') {
        Some(idx) => (&base[..idx], Some(&base[idx + 1..])),
        None => (base, None),
    };
    let stem = if stem.is_empty() { "file" } else { stem };
    let id = uuid::Uuid::new_v4().simple();

    match extension {
        Some(ext) if !ext.is_empty() => format!("{}{}{}.{}", stem, NAME_SEPARATOR, id, ext),
        _ => format!("{}{}{}", stem, NAME_SEPARATOR, id),
    }
}

/// Open read handle on an object's bytes.
///
/// The backend reader is released when this value is dropped, on success
/// and error paths alike.
pub struct ObjectStream {
    name: String,
    reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl ObjectStream {
    pub fn new(name: impl Into<String>, reader: impl AsyncRead + Send + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::pin(reader),
        }
    }

    pub fn from_bytes(name: impl Into<String>, data: Bytes) -> Self {
        Self::new(name, io::Cursor::new(data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buffer the remaining bytes and release the handle.
    pub async fn read_all(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl AsyncRead for ObjectStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.get_mut().reader.as_mut().poll_read(cx, buf)
    }
}

impl Drop for ObjectStream {
    fn drop(&mut self) {
        trace!(object = %self.name, "Object stream released");
    }
}

impl std::fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStream").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_object_name_keeps_stem_and_extension() {
        let name = assign_object_name("report.PDF");
        assert!(name.starts_with("report####"));
        assert!(name.ends_with(".PDF"));
        assert_ne!(name, "report.PDF");
    }

    #[test]
    fn test_assign_object_name_is_unique_per_upload() {
        assert_ne!(assign_object_name("a.txt"), assign_object_name("a.txt"));
    }

    #[test]
    fn test_assign_object_name_strips_client_path() {
        let name = assign_object_name("C:\\fakepath\\photo.jpg");
        assert!(name.starts_with("photo####"));
        assert!(name.ends_with(".jpg"));

        let name = assign_object_name("/home/user/notes.md");
        assert!(name.starts_with("notes####"));
    }

    #[test]
    fn test_assign_object_name_multi_dot() {
        let name = assign_object_name("archive.tar.gz");
        assert!(name.starts_with("archive.tar####"));
        assert!(name.ends_with(".gz"));
    }

    #[test]
    fn test_assign_object_name_without_extension() {
        let name = assign_object_name("README");
        assert!(name.starts_with("README####"));
        assert!(!name.contains('.'));

        let name = assign_object_name("");
        assert!(name.starts_with("file####"));
    }

    #[test]
    fn test_resolved_content_type() {
        assert_eq!(
            UploadedFile::new("a.pdf", Bytes::new()).resolved_content_type(),
            "application/pdf"
        );
        assert_eq!(
            UploadedFile::new("blob", Bytes::new())
                .with_content_type("image/webp")
                .resolved_content_type(),
            "image/webp"
        );
        assert_eq!(
            UploadedFile::new("blob", Bytes::new()).resolved_content_type(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_object_stream_read_all() {
        let stream = ObjectStream::from_bytes("a####b.txt", Bytes::from_static(b"hello"));
        assert_eq!(stream.name(), "a####b.txt");
        assert_eq!(stream.read_all().await.unwrap(), b"hello");
    }
}
