//! Object storage abstraction for report media.
//!
//! Supports both local filesystem and S3-compatible object storage. The
//! backend is picked once at startup by [`build_storage`]; callers only ever
//! see a [`SharedStorage`].

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{StorageKind, StorageSettings};
use crate::{AppError, AppResult};

/// Shared handle to the configured storage backend.
pub type SharedStorage = Arc<dyn StorageBackend>;

/// Stored object metadata.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Storage key (path or object key).
    pub key: String,
    /// URL the object is reachable at. May be relative for local storage.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
}

/// Result of a write probe, reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StorageProbe {
    /// Backend kind (`local` or `s3`).
    pub backend: &'static str,
    /// Directory or bucket the backend writes to.
    pub location: String,
    /// Whether a probe object could be written and removed.
    pub writable: bool,
    /// Error raised by the probe, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<StoredObject>;

    /// Delete the object at `key`. Missing objects are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Backend kind name.
    fn kind(&self) -> &'static str;

    /// Human-readable location (directory or bucket).
    fn location(&self) -> String;

    /// Write and remove a small object to check permissions.
    async fn probe(&self) -> StorageProbe {
        let key = format!(".healthcheck/probe-{}.txt", uuid::Uuid::new_v4().simple());
        let result = match self.put(&key, b"ok", "text/plain").await {
            Ok(_) => self.delete(&key).await,
            Err(e) => Err(e),
        };

        StorageProbe {
            backend: self.kind(),
            location: self.location(),
            writable: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        }
    }
}

/// Build the storage backend selected in configuration.
pub async fn build_storage(settings: &StorageSettings) -> AppResult<SharedStorage> {
    match settings.backend {
        StorageKind::Local => Ok(Arc::new(LocalStorage::new(
            settings.local.base_path.clone(),
            settings.local.base_url.clone(),
        ))),
        #[cfg(feature = "s3")]
        StorageKind::S3 => {
            let s3 = settings.s3.as_ref().ok_or_else(|| {
                AppError::Config("storage.backend is s3 but [storage.s3] is missing".to_string())
            })?;
            let storage = S3Storage::new(
                &s3.endpoint,
                s3.bucket.clone(),
                &s3.region,
                &s3.access_key_id,
                &s3.secret_access_key,
                s3.custom_domain.clone(),
                s3.prefix.clone(),
            )
            .await?;
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "s3"))]
        StorageKind::S3 => Err(AppError::Config(
            "storage.backend is s3 but the server was built without the `s3` feature".to_string(),
        )),
    }
}

/// Validate a storage key: relative, `/`-separated, no `..` segments.
pub fn sanitize_key(key: &str) -> AppResult<&str> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(AppError::Storage(format!("Invalid storage key: {key}")));
    }
    Ok(key)
}

/// Reduce an uploaded file name to a safe base name.
///
/// Directory components are dropped. The stem keeps letters and digits in
/// any script plus `.`, `-` and `_`; everything else becomes `_`. The
/// extension survives even when the stem is empty, which falls back to
/// `file`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    const MAX: usize = 200;

    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, ext),
        _ => (base, ""),
    };

    let stem: String = stem
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = match stem.trim_matches('.') {
        "" => "file",
        trimmed => trimmed,
    };

    let extension: String = extension
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(16)
        .collect();

    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{extension}")
    }
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self { base_path, base_url }
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        Ok(self.base_path.join(sanitize_key(key)?))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> AppResult<StoredObject> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete file: {e}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat file: {e}")))
    }

    fn kind(&self) -> &'static str {
        "local"
    }

    fn location(&self) -> String {
        self.base_path.display().to_string()
    }
}

/// S3-compatible object storage backend.
#[cfg(feature = "s3")]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    endpoint: String,
    bucket: String,
    custom_domain: Option<String>,
    prefix: Option<String>,
}

#[cfg(feature = "s3")]
impl S3Storage {
    /// Create a new S3 storage backend.
    pub async fn new(
        endpoint: &str,
        bucket: String,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
        custom_domain: Option<String>,
        prefix: Option<String>,
    ) -> AppResult<Self> {
        use aws_config::Region;
        use aws_sdk_s3::config::Credentials;

        let credentials =
            Credentials::new(access_key_id, secret_access_key, None, None, "cozum-var");

        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .behavior_version_latest()
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket,
            custom_domain,
            prefix,
        })
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_matches('/'), key),
            None => key.to_string(),
        }
    }
}

#[cfg(feature = "s3")]
#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<StoredObject> {
        use aws_sdk_s3::primitives::ByteStream;

        let full_key = self.full_key(sanitize_key(key)?);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_key = self.full_key(sanitize_key(key)?);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        let full_key = self.full_key(key);
        match &self.custom_domain {
            Some(domain) if domain.starts_with("http://") || domain.starts_with("https://") => {
                format!("{}/{}", domain.trim_end_matches('/'), full_key)
            }
            Some(domain) => format!("https://{}/{}", domain.trim_end_matches('/'), full_key),
            None => format!("{}/{}/{}", self.endpoint, self.bucket, full_key),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_key = self.full_key(sanitize_key(key)?);

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let message = e.to_string();
                if message.contains("NotFound") || message.contains("404") {
                    Ok(false)
                } else {
                    Err(AppError::Storage(format!("S3 head_object failed: {message}")))
                }
            }
        }
    }

    fn kind(&self) -> &'static str {
        "s3"
    }

    fn location(&self) -> String {
        format!("{}/{}", self.endpoint, self.bucket)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_storage() -> (LocalStorage, PathBuf) {
        let dir = std::env::temp_dir().join(format!("cozum-storage-{}", uuid::Uuid::new_v4()));
        (
            LocalStorage::new(dir.clone(), "/media/".to_string()),
            dir,
        )
    }

    #[test]
    fn test_sanitize_key() {
        assert!(sanitize_key("reports/2025/01/02/abc/photo.jpg").is_ok());
        assert!(sanitize_key("../etc/passwd").is_err());
        assert!(sanitize_key("/abs/path").is_err());
        assert!(sanitize_key("a//b").is_err());
        assert!(sanitize_key("a\\b").is_err());
        assert!(sanitize_key("").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pot hole.png"), "pot_hole.png");
        assert_eq!(sanitize_file_name("../../secret.jpg"), "secret.jpg");
        assert_eq!(sanitize_file_name(".hidden.jpg"), "hidden.jpg");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("photo."), "photo");
    }

    #[test]
    fn test_sanitize_file_name_keeps_extension_and_letters() {
        assert_eq!(sanitize_file_name("....jpg"), "file.jpg");
        assert_eq!(sanitize_file_name(".jpg"), "file.jpg");
        assert_eq!(sanitize_file_name("çukur.jpg"), "çukur.jpg");
        assert_eq!(sanitize_file_name("yol çöküntüsü.JPEG"), "yol_çöküntüsü.JPEG");
        assert_eq!(sanitize_file_name("rapor.2025.png"), "rapor.2025.png");
    }

    #[tokio::test]
    async fn test_local_put_exists_delete() {
        let (storage, dir) = temp_storage();
        let key = "reports/2025/01/02/r1/photo.jpg";

        let stored = storage.put(key, b"bytes", "image/jpeg").await.unwrap();
        assert_eq!(stored.key, key);
        assert_eq!(stored.size, 5);
        assert_eq!(stored.url, "/media/reports/2025/01/02/r1/photo.jpg");
        assert!(storage.exists(key).await.unwrap());

        storage.delete(key).await.unwrap();
        assert!(!storage.exists(key).await.unwrap());

        // Deleting twice is fine
        storage.delete(key).await.unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_local_rejects_traversal() {
        let (storage, _dir) = temp_storage();
        assert!(storage.put("../escape.jpg", b"x", "image/jpeg").await.is_err());
    }

    #[tokio::test]
    async fn test_local_probe_writable() {
        let (storage, dir) = temp_storage();
        let probe = storage.probe().await;
        assert_eq!(probe.backend, "local");
        assert!(probe.writable);
        assert!(probe.error.is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_local_probe_unwritable() {
        // A regular file where the base directory should be makes every write fail.
        let file = std::env::temp_dir().join(format!("cozum-blocker-{}", uuid::Uuid::new_v4()));
        std::fs::write(&file, b"not a directory").unwrap();
        let storage = LocalStorage::new(file.clone(), "/media".to_string());

        let probe = storage.probe().await;
        assert!(!probe.writable);
        assert!(probe.error.is_some());

        let _ = std::fs::remove_file(file);
    }

    #[tokio::test]
    async fn test_build_local_storage() {
        let settings = StorageSettings::default();
        let storage = build_storage(&settings).await.unwrap();
        assert_eq!(storage.kind(), "local");
        assert_eq!(storage.public_url("a/b.jpg"), "/media/a/b.jpg");
    }
}
