use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: String,
    /// Default bucket for upload, preview, download and delete.
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub path_style: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            server: ServerConfig {
                port: var("PORT", "8080")
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: var("HOST", "0.0.0.0"),
                cors_allowed_origins: var("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            storage: StorageConfig {
                provider: var("STORAGE_PROVIDER", "s3").to_lowercase(),
                bucket: lookup("STORAGE_BUCKET")
                    .filter(|b| !b.trim().is_empty())
                    .context("STORAGE_BUCKET must be set")?,
                endpoint: var("S3_ENDPOINT", "http://localhost:9000"),
                region: var("S3_REGION", "us-east-1"),
                access_key_id: lookup("AWS_ACCESS_KEY_ID"),
                secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
                path_style: var("S3_PATH_STYLE", "true")
                    .parse()
                    .context("S3_PATH_STYLE must be true or false")?,
            },
            upload: UploadConfig {
                max_bytes: var("MAX_UPLOAD_BYTES", "104857600")
                    .parse()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("STORAGE_BUCKET", "uploads")])).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.cors_allowed_origins, vec!["*"]);
        assert_eq!(config.storage.provider, "s3");
        assert_eq!(config.storage.bucket, "uploads");
        assert_eq!(config.storage.endpoint, "http://localhost:9000");
        assert!(config.storage.path_style);
        assert!(config.storage.access_key_id.is_none());
        assert_eq!(config.upload.max_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("STORAGE_BUCKET", "docs"),
            ("PORT", "9100"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test"),
            ("STORAGE_PROVIDER", "Memory"),
            ("S3_PATH_STYLE", "false"),
            ("AWS_ACCESS_KEY_ID", "key"),
            ("MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://a.test", "http://b.test"]
        );
        assert_eq!(config.storage.provider, "memory");
        assert!(!config.storage.path_style);
        assert_eq!(config.storage.access_key_id.as_deref(), Some("key"));
        assert_eq!(config.upload.max_bytes, 1024);
    }

    #[test]
    fn test_bucket_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("STORAGE_BUCKET", "  ")])).is_err());
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("STORAGE_BUCKET", "b"), ("PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(Config::from_lookup(lookup(&[
            ("STORAGE_BUCKET", "b"),
            ("S3_PATH_STYLE", "yes")
        ]))
        .is_err());
    }
}
