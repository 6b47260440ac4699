//! # Storage Abstraction Module
//!
//! Unified access to the places an ADCP dataset (or a rendered figure) can
//! live: the local filesystem, plain HTTP(S) servers and Amazon S3. The
//! backend is picked from the path scheme.
//!
//! ## Path Patterns
//!
//! - **S3 paths**: `s3://bucket-name/path/to/file.nc`
//! - **HTTP paths**: `https://thredds.example.org/thredds/fileServer/file.nc`
//! - **Local paths**: `/absolute/path/to/file.nc` or `relative/path/to/file.nc`
//!
//! OPeNDAP endpoints (`.../dodsC/...`) are HTTP URLs too, but they are not
//! downloaded: libnetcdf speaks the protocol itself, see
//! [`StorageFactory::is_opendap_url`].
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use adcp_qcplot::storage::{StorageFactory, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = StorageFactory::from_path("s3://my-bucket/adcp.nc").await?;
//!     let data = storage.read("s3://my-bucket/adcp.nc").await?;
//!     storage.write("s3://my-bucket/adcp_copy.nc", &data).await?;
//!     Ok(())
//! }
//! ```

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use log::debug;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("AWS S3 GetObject error: {0}")]
    S3GetObject(#[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>),

    #[error("AWS S3 PutObject error: {0}")]
    S3PutObject(#[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::put_object::PutObjectError>),

    #[error("AWS S3 HeadObject error: {0}")]
    S3HeadObject(#[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::head_object::HeadObjectError>),

    #[error("AWS ByteStream error: {0}")]
    ByteStream(String),

    #[error("Invalid S3 path format: {0}")]
    InvalidS3Path(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Operation not supported by {backend} storage: {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Interface shared by all storage backends.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads the entire contents of a file
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Writes data to a file, creating it (and its parents) if needed
    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Checks if a file exists at the given path
    async fn exists(&self, path: &str) -> StorageResult<bool>;
}

/// Local filesystem storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage;

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::PathNotFound(path.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(StorageError::PermissionDenied(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(StorageError::Io)?;
        }

        match fs::write(path, data).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(StorageError::PermissionDenied(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// Read-only storage over plain HTTP(S), e.g. a THREDDS `fileServer` URL.
#[derive(Debug, Clone)]
pub struct HttpStorage {
    client: reqwest::Client,
}

impl HttpStorage {
    pub fn new() -> Self {
        HttpStorage {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StorageBackend for HttpStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        debug!("GET {}", path);
        let response = self.client.get(path).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::PathNotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::HttpStatus {
                url: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn write(&self, _path: &str, _data: &[u8]) -> StorageResult<()> {
        Err(StorageError::Unsupported {
            backend: "HTTP",
            operation: "write",
        })
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let response = self.client.head(path).send().await?;
        Ok(response.status().is_success())
    }
}

/// Amazon S3 storage backend
///
/// Credentials come from the usual AWS sources: environment variables, the
/// shared credentials file, or an instance role.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    /// Creates a new S3Storage instance with default AWS configuration
    pub async fn new() -> StorageResult<Self> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let client = S3Client::new(&config);

        Ok(S3Storage { client })
    }

    /// Creates a new S3Storage instance with custom configuration
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        let client = S3Client::new(config);
        S3Storage { client }
    }

    /// Splits `s3://bucket/key` into `(bucket, key)`.
    fn parse_s3_path(s3_path: &str) -> StorageResult<(String, String)> {
        let Some(path_without_scheme) = s3_path.strip_prefix("s3://") else {
            return Err(StorageError::InvalidS3Path(format!(
                "S3 path must start with 's3://': {}",
                s3_path
            )));
        };

        let parts: Vec<&str> = path_without_scheme.splitn(2, '/').collect();

        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(StorageError::InvalidS3Path(format!(
                "Invalid S3 path format. Expected 's3://bucket/key': {}",
                s3_path
            )));
        }

        Ok((parts[0].to_string(), parts[1].to_string()))
    }
}

#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let (bucket, key) = Self::parse_s3_path(path)?;

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                aws_sdk_s3::error::SdkError::ServiceError(service_err)
                    if service_err.err().is_no_such_key() =>
                {
                    StorageError::PathNotFound(path.to_string())
                }
                _ => StorageError::S3GetObject(e),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ByteStream(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let (bucket, key) = Self::parse_s3_path(path)?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(StorageError::S3PutObject)?;

        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let (bucket, key) = Self::parse_s3_path(path)?;

        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(aws_sdk_s3::error::SdkError::ServiceError(service_err))
                if service_err.err().is_not_found() =>
            {
                Ok(false)
            }
            Err(e) => Err(StorageError::S3HeadObject(e)),
        }
    }
}

/// Storage backend selected from a path.
#[derive(Debug)]
pub enum Storage {
    Local(LocalStorage),
    Http(HttpStorage),
    S3(S3Storage),
}

#[async_trait::async_trait]
impl StorageBackend for Storage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        match self {
            Storage::Local(storage) => storage.read(path).await,
            Storage::Http(storage) => storage.read(path).await,
            Storage::S3(storage) => storage.read(path).await,
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        match self {
            Storage::Local(storage) => storage.write(path, data).await,
            Storage::Http(storage) => storage.write(path, data).await,
            Storage::S3(storage) => storage.write(path, data).await,
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        match self {
            Storage::Local(storage) => storage.exists(path).await,
            Storage::Http(storage) => storage.exists(path).await,
            Storage::S3(storage) => storage.exists(path).await,
        }
    }
}

/// Picks a storage backend from the path scheme:
/// `s3://` uses [`S3Storage`], `http://` and `https://` use [`HttpStorage`],
/// everything else is local.
pub struct StorageFactory;

impl StorageFactory {
    pub async fn from_path(path: &str) -> StorageResult<Storage> {
        if Self::is_s3_path(path) {
            let s3_storage = S3Storage::new().await?;
            Ok(Storage::S3(s3_storage))
        } else if Self::is_http_path(path) {
            Ok(Storage::Http(HttpStorage::new()))
        } else {
            Ok(Storage::Local(LocalStorage))
        }
    }

    pub fn is_s3_path(path: &str) -> bool {
        path.starts_with("s3://")
    }

    pub fn is_http_path(path: &str) -> bool {
        path.starts_with("http://") || path.starts_with("https://")
    }

    /// True for THREDDS/Hyrax OPeNDAP endpoints, which libnetcdf opens directly.
    pub fn is_opendap_url(path: &str) -> bool {
        Self::is_http_path(path) && path.contains("/dodsC/")
    }

    pub fn is_local_path(path: &str) -> bool {
        !Self::is_s3_path(path) && !Self::is_http_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_storage_write_read() -> Result<(), Box<dyn std::error::Error>> {
        let storage = LocalStorage;
        let temp_dir = TempDir::new()?;
        let file_path = temp_dir.path().join("nested").join("figure.png");
        let file_path_str = file_path.to_str().unwrap();

        let test_data = b"\x89PNG fake figure bytes";

        storage.write(file_path_str, test_data).await?;
        let read_data = storage.read(file_path_str).await?;
        assert_eq!(read_data, test_data);
        assert!(storage.exists(file_path_str).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_local_storage_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let storage = LocalStorage;

        let result = storage.read("/nonexistent/path/adcp.nc").await;
        assert!(matches!(result, Err(StorageError::PathNotFound(_))));
        assert!(!storage.exists("/nonexistent/path/adcp.nc").await?);

        Ok(())
    }

    #[test]
    fn test_s3_path_parsing() {
        let (bucket, key) = S3Storage::parse_s3_path("s3://imos-data/IMOS/ANMN/adcp.nc").unwrap();
        assert_eq!(bucket, "imos-data");
        assert_eq!(key, "IMOS/ANMN/adcp.nc");

        assert!(S3Storage::parse_s3_path("http://bucket/file.nc").is_err());
        assert!(S3Storage::parse_s3_path("s3://").is_err());
        assert!(S3Storage::parse_s3_path("s3://bucket").is_err());
        assert!(S3Storage::parse_s3_path("s3:///file.nc").is_err());
    }

    #[tokio::test]
    async fn test_storage_factory_path_detection() -> Result<(), Box<dyn std::error::Error>> {
        assert!(StorageFactory::is_s3_path("s3://my-bucket/file.nc"));
        assert!(!StorageFactory::is_s3_path("/local/path/file.nc"));

        assert!(StorageFactory::is_http_path("https://thredds.aodn.org.au/thredds/fileServer/a.nc"));
        assert!(StorageFactory::is_http_path("http://example.org/a.nc"));
        assert!(!StorageFactory::is_http_path("relative/path/file.nc"));

        assert!(StorageFactory::is_opendap_url(
            "http://thredds.aodn.org.au/thredds/dodsC/IMOS/a.nc"
        ));
        assert!(!StorageFactory::is_opendap_url(
            "http://thredds.aodn.org.au/thredds/fileServer/IMOS/a.nc"
        ));

        assert!(StorageFactory::is_local_path("relative/path/file.nc"));
        assert!(!StorageFactory::is_local_path("s3://my-bucket/file.nc"));
        assert!(!StorageFactory::is_local_path("https://example.org/file.nc"));

        let local_storage = StorageFactory::from_path("/local/path/file.nc").await?;
        assert!(matches!(local_storage, Storage::Local(_)));
        let http_storage = StorageFactory::from_path("https://example.org/file.nc").await?;
        assert!(matches!(http_storage, Storage::Http(_)));

        Ok(())
    }

    #[tokio::test]
    async fn test_http_storage_rejects_writes() {
        let storage = Storage::Http(HttpStorage::new());
        let result = storage.write("https://example.org/out.png", b"data").await;
        assert!(matches!(
            result,
            Err(StorageError::Unsupported { backend: "HTTP", operation: "write" })
        ));
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires AWS credentials and an S3 bucket in TEST_S3_BUCKET
    async fn test_s3_storage_real_aws() -> Result<(), Box<dyn std::error::Error>> {
        let test_bucket = match std::env::var("TEST_S3_BUCKET") {
            Ok(bucket) => bucket,
            Err(_) => {
                println!("Skipping S3 integration test - set TEST_S3_BUCKET environment variable");
                return Ok(());
            }
        };

        let storage = StorageFactory::from_path(&format!("s3://{}/probe", test_bucket)).await?;
        assert!(matches!(storage, Storage::S3(_)));

        let test_data = b"adcp-qcplot S3 round trip";
        let s3_path = format!("s3://{}/adcp-qcplot-test/figure.png", test_bucket);

        storage.write(&s3_path, test_data).await?;
        assert!(storage.exists(&s3_path).await?);
        assert_eq!(storage.read(&s3_path).await?, test_data);

        Ok(())
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_http_storage_real_server() -> Result<(), Box<dyn std::error::Error>> {
        let storage = HttpStorage::new();
        let result = storage
            .read("https://thredds.aodn.org.au/thredds/fileServer/does-not-exist.nc")
            .await;
        assert!(result.is_err());
        Ok(())
    }
}
