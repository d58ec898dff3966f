// S3 / MinIO backed object store

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use super::{assign_object_name, ObjectStore, ObjectStream, StorageError, UploadedFile};
use crate::config::StorageConfig;

pub struct S3Store {
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(e.to_string()))?;

        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            path_style = config.path_style,
            "S3 store configured"
        );

        Ok(Self {
            region,
            credentials,
            path_style: config.path_style,
        })
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>, StorageError> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())?;
        if self.path_style {
            Ok(Box::new(bucket.with_path_style()))
        } else {
            Ok(Box::new(bucket))
        }
    }
}

/// Wrap an S3 body stream as an object read handle. Chunks are pulled from
/// the connection as the handle is read.
fn stream_reader<S>(object: &str, chunks: S) -> ObjectStream
where
    S: Stream<Item = Result<Bytes, S3Error>> + Send + 'static,
{
    ObjectStream::new(object, StreamReader::new(chunks.map_err(io::Error::other)))
}

/// Map an S3 failure to a storage error, keeping 404s distinguishable.
fn classify(error: S3Error, bucket: &str, object: &str) -> StorageError {
    match error {
        S3Error::HttpFailWithBody(404, body) if body.contains("NoSuchBucket") => {
            StorageError::BucketNotFound(bucket.to_string())
        }
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(object.to_string()),
        other => StorageError::S3(other),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn create_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        let config = BucketConfiguration::default();
        let result = if self.path_style {
            Bucket::create_with_path_style(
                bucket,
                self.region.clone(),
                self.credentials.clone(),
                config,
            )
            .await
        } else {
            Bucket::create(bucket, self.region.clone(), self.credentials.clone(), config).await
        };

        match result {
            Ok(response) => Ok(response.success()),
            // BucketAlreadyOwnedByYou / BucketAlreadyExists
            Err(S3Error::HttpFailWithBody(409, body)) => {
                debug!(bucket = %bucket, body = %body, "Bucket already exists");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(&self, bucket: &str, file: UploadedFile) -> Result<String, StorageError> {
        let object_name = assign_object_name(&file.file_name);
        let content_type = file.resolved_content_type();

        self.bucket(bucket)?
            .put_object_with_content_type(&object_name, &file.data, &content_type)
            .await
            .map_err(|e| classify(e, bucket, &object_name))?;

        debug!(
            bucket = %bucket,
            object = %object_name,
            size = file.data.len(),
            content_type = %content_type,
            "Object stored"
        );
        Ok(object_name)
    }

    async fn get_object(&self, bucket: &str, object: &str) -> Result<ObjectStream, StorageError> {
        let response = self
            .bucket(bucket)?
            .get_object_stream(object)
            .await
            .map_err(|e| classify(e, bucket, object))?;

        if response.status_code == 404 {
            return Err(StorageError::NotFound(object.to_string()));
        }

        Ok(stream_reader(object, response.bytes))
    }

    async fn remove_object(&self, bucket: &str, object: &str) -> Result<(), StorageError> {
        self.bucket(bucket)?
            .delete_object(object)
            .await
            .map_err(|e| classify(e, bucket, object))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_config() -> StorageConfig {
        StorageConfig {
            provider: "s3".to_string(),
            bucket: "uploads".to_string(),
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: Some("minioadmin".to_string()),
            secret_access_key: Some("minioadmin".to_string()),
            path_style: true,
        }
    }

    #[test]
    fn test_bucket_uses_path_style() {
        let store = S3Store::new(&storage_config()).unwrap();
        let bucket = store.bucket("uploads").unwrap();
        assert!(bucket.is_path_style());
        assert_eq!(bucket.name(), "uploads");
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify(
            S3Error::HttpFailWithBody(404, "<Code>NoSuchKey</Code>".to_string()),
            "uploads",
            "a####b.txt",
        );
        assert!(matches!(err, StorageError::NotFound(name) if name == "a####b.txt"));

        let err = classify(
            S3Error::HttpFailWithBody(404, "<Code>NoSuchBucket</Code>".to_string()),
            "uploads",
            "a####b.txt",
        );
        assert!(matches!(err, StorageError::BucketNotFound(name) if name == "uploads"));
    }

    #[tokio::test]
    async fn test_stream_reader_reads_chunks_in_order() {
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"first ")),
            Ok(Bytes::from_static(b"second")),
        ]);
        let stream = stream_reader("a####b.txt", chunks);

        assert_eq!(stream.name(), "a####b.txt");
        assert_eq!(stream.read_all().await.unwrap(), b"first second");
    }

    #[tokio::test]
    async fn test_stream_reader_surfaces_backend_failure_as_io_error() {
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(S3Error::HttpFailWithBody(500, "InternalError".to_string())),
        ]);
        let stream = stream_reader("a####b.txt", chunks);

        assert!(stream.read_all().await.is_err());
    }

    #[test]
    fn test_classify_other_errors_pass_through() {
        let err = classify(
            S3Error::HttpFailWithBody(403, "AccessDenied".to_string()),
            "uploads",
            "a####b.txt",
        );
        assert!(matches!(err, StorageError::S3(_)));
    }
}
