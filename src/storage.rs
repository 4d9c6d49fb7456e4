use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Presigned upload URLs stay valid for ten minutes.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);
/// Download URLs stay valid for an hour.
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(3600);

/// Every uploaded image lives under this prefix.
const UPLOAD_PREFIX: &str = "photos/";

/// StorageError
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("presigning failed: {0}")]
    Presign(String),
}

/// image_extension
///
/// Maps an accepted image MIME type to the file extension used in the object
/// key. Only png and jpg uploads are allowed.
pub fn image_extension(content_type: &str) -> Result<&'static str, StorageError> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/png" => Ok("png"),
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        other => Err(StorageError::UnsupportedType(other.to_string())),
    }
}

/// upload_key
///
/// Fresh object key for an image with the given extension.
pub fn upload_key(extension: &str) -> String {
    format!("{}{}.{}", UPLOAD_PREFIX, Uuid::new_v4(), extension)
}

/// is_upload_key
///
/// True for keys of the shape `upload_key` produces:
/// `photos/<hyphenated uuid>.png` or `.jpg`.
pub fn is_upload_key(key: &str) -> bool {
    let Some((stem, extension)) = key
        .strip_prefix(UPLOAD_PREFIX)
        .and_then(|name| name.rsplit_once('.'))
    else {
        return false;
    };

    matches!(extension, "png" | "jpg")
        && stem.len() == 36
        && Uuid::try_parse(stem).is_ok()
}

/// ImageStore
///
/// Object storage for photo files. Clients upload directly with a presigned
/// URL; the API only ever stores the resulting key on the photo.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Creates the bucket when it is missing. Used against local MinIO only.
    async fn ensure_bucket_exists(&self);

    /// Returns a time-limited PUT URL for `key`, pinned to `content_type`.
    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, StorageError>;

    /// Returns a time-limited GET URL for reading `key` back.
    async fn presign_download(&self, key: &str) -> Result<String, StorageError>;
}

/// StorageState
pub type StorageState = Arc<dyn ImageStore>;

// 1. S3 / MinIO

/// S3ImageStore
///
/// Path-style addressing is forced so MinIO and other S3-compatible gateways work.
#[derive(Clone)]
pub struct S3ImageStore {
    client: s3::Client,
    bucket_name: String,
}

impl S3ImageStore {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str, bucket: &str) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // Already-exists errors land here too.
            tracing::debug!(bucket = %self.bucket_name, "create_bucket: {:?}", e);
        }
    }

    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        image_extension(content_type)?;

        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn presign_download(&self, key: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(DOWNLOAD_URL_TTL)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

// 2. Mock

/// MockImageStore
///
/// Offline stand-in for tests. Produces deterministic URLs, or fails every
/// call when built with `failing()`.
#[derive(Clone, Default)]
pub struct MockImageStore {
    pub should_fail: bool,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn ensure_bucket_exists(&self) {}

    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        image_extension(content_type)?;
        if self.should_fail {
            return Err(StorageError::Presign("mock storage failure".to_string()));
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            key
        ))
    }

    async fn presign_download(&self, key: &str) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Presign("mock storage failure".to_string()));
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake&method=get",
            key
        ))
    }
}
