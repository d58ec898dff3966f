use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Config;
use crate::storage::ObjectStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    /// Bucket used by upload, preview, download and delete.
    pub fn bucket(&self) -> &str {
        &self.config.storage.bucket
    }
}

// API Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateBucketParams {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectParams {
    pub object_name: String,
}

/// Preview query. Thumbnails need both `width` and `height`; an empty value
/// counts as absent. Sizes outside what the renderer accepts are rejected at
/// render time, not here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewParams {
    pub object_name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub height: Option<i64>,
}

impl PreviewParams {
    pub fn thumbnail_size(&self) -> Option<(i64, i64)> {
        self.width.zip(self.height)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub bucket: String,
}
