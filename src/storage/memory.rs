// In-process object store, selected with STORAGE_PROVIDER=memory

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use super::{assign_object_name, ObjectStore, ObjectStream, StorageError, UploadedFile};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Buckets and objects held in memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, HashMap<String, StoredObject>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with `bucket` already created.
    pub fn with_bucket(bucket: &str) -> Self {
        let mut buckets = HashMap::new();
        buckets.insert(bucket.to_string(), HashMap::new());
        Self {
            buckets: RwLock::new(buckets),
        }
    }

    /// Put an object under an exact name, bypassing name assignment.
    pub async fn insert(
        &self,
        bucket: &str,
        object: &str,
        data: impl Into<Bytes>,
    ) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        objects.insert(
            object.to_string(),
            StoredObject {
                data: data.into(),
                content_type: mime::APPLICATION_OCTET_STREAM.to_string(),
            },
        );
        Ok(())
    }

    pub async fn contains(&self, bucket: &str, object: &str) -> bool {
        self.buckets
            .read()
            .await
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(object))
    }

    pub async fn bucket_exists(&self, bucket: &str) -> bool {
        self.buckets.read().await.contains_key(bucket)
    }

    pub async fn content_type(&self, bucket: &str, object: &str) -> Option<String> {
        self.buckets
            .read()
            .await
            .get(bucket)?
            .get(object)
            .map(|stored| stored.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn create_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default();
        Ok(true)
    }

    async fn put_object(&self, bucket: &str, file: UploadedFile) -> Result<String, StorageError> {
        let object_name = assign_object_name(&file.file_name);
        let content_type = file.resolved_content_type();

        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        objects.insert(
            object_name.clone(),
            StoredObject {
                data: file.data,
                content_type,
            },
        );

        debug!(bucket = %bucket, object = %object_name, "Object stored in memory");
        Ok(object_name)
    }

    async fn get_object(&self, bucket: &str, object: &str) -> Result<ObjectStream, StorageError> {
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        let stored = objects
            .get(object)
            .ok_or_else(|| StorageError::NotFound(object.to_string()))?;
        Ok(ObjectStream::from_bytes(object, stored.data.clone()))
    }

    async fn remove_object(&self, bucket: &str, object: &str) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        // Removing a missing key is not an error, as with S3 DeleteObject.
        objects.remove(object);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_create_bucket_is_idempotent() {
        let store = MemoryStore::new();
        assert!(store.create_bucket("photos").await.unwrap());
        assert!(store.create_bucket("photos").await.unwrap());
        assert!(store.bucket_exists("photos").await);
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = MemoryStore::with_bucket("uploads");
        let file = UploadedFile::new("notes.txt", Bytes::from_static(b"some notes"));

        let name = store.put_object("uploads", file).await.unwrap();
        assert_ne!(name, "notes.txt");
        assert_eq!(
            store.content_type("uploads", &name).await.as_deref(),
            Some("text/plain")
        );

        let stream = store.get_object("uploads", &name).await.unwrap();
        assert_eq!(stream.read_all().await.unwrap(), b"some notes");

        assert_ok!(store.remove_object("uploads", &name).await);
        assert!(!store.contains("uploads", &name).await);
        assert!(matches!(
            store.get_object("uploads", &name).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_missing_object_succeeds() {
        let store = MemoryStore::with_bucket("uploads");
        assert_ok!(store.remove_object("uploads", "ghost####1.txt").await);
    }

    #[tokio::test]
    async fn test_missing_bucket() {
        let store = MemoryStore::new();
        let file = UploadedFile::new("a.txt", Bytes::from_static(b"a"));
        assert!(matches!(
            store.put_object("nope", file).await,
            Err(StorageError::BucketNotFound(_))
        ));
        assert!(matches!(
            store.get_object("nope", "a").await,
            Err(StorageError::BucketNotFound(_))
        ));
    }
}
