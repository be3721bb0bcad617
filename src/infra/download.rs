//! HTTP download functionality
//!
//! Handles downloading artifacts with checksum verification and retry with
//! exponential backoff. Files are streamed into a `.part` file next to the
//! destination and renamed into place once complete.

use futures::StreamExt;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::defaults;
use crate::core::lock::FileHash;
use crate::error::DownloadError;
use crate::registry::credentials::Credentials;

/// Streaming hasher for the algorithms we can verify locally
#[derive(Clone)]
pub enum Checksum {
    /// sha224
    Sha224(Sha224),
    /// sha256
    Sha256(Sha256),
    /// sha384
    Sha384(Sha384),
    /// sha512
    Sha512(Sha512),
}

impl Checksum {
    /// Hasher for an index algorithm name, `None` if unsupported
    pub fn for_algorithm(algorithm: &str) -> Option<Self> {
        match algorithm {
            "sha224" => Some(Self::Sha224(Sha224::new())),
            "sha256" => Some(Self::Sha256(Sha256::new())),
            "sha384" => Some(Self::Sha384(Sha384::new())),
            "sha512" => Some(Self::Sha512(Sha512::new())),
            _ => None,
        }
    }

    /// Feed data
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha224(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Algorithm name
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Sha224(_) => "sha224",
            Self::Sha256(_) => "sha256",
            Self::Sha384(_) => "sha384",
            Self::Sha512(_) => "sha512",
        }
    }

    /// Lowercase hex digest
    pub fn finalize(self) -> String {
        match self {
            Self::Sha224(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha384(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Download result containing file path and metadata
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Digest of the downloaded content
    pub checksum: FileHash,
}

/// Download manager for fetching files with retry support
#[derive(Debug, Clone)]
pub struct DownloadManager {
    /// HTTP client
    client: reqwest::Client,
    /// Maximum retry attempts
    max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds)
    base_delay_ms: u64,
}

impl DownloadManager {
    /// Create a new download manager
    pub fn new() -> Self {
        Self::with_config(defaults::MAX_DOWNLOAD_RETRIES, 1000)
    }

    /// Create a download manager with custom settings
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .connect_timeout(Duration::from_secs(30))
                .user_agent(defaults::USER_AGENT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            max_retries: max_retries.max(1),
            base_delay_ms,
        }
    }

    /// Get max retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Download a file with retry logic
    ///
    /// The digest is computed with `algorithm` when supported, sha256
    /// otherwise.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        credentials: Option<&Credentials>,
        algorithm: &str,
    ) -> Result<DownloadResult, DownloadError> {
        let mut attempts = 0;
        let mut last_error = None;
        let mut delay_ms = self.base_delay_ms;

        while attempts < self.max_retries {
            attempts += 1;

            match self.download_once(url, dest, credentials, algorithm).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::debug!("Attempt {attempts} for {url} failed: {e}");
                    last_error = Some(e);

                    if attempts < self.max_retries {
                        // Exponential backoff with cap at 30 seconds
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(30_000);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DownloadError::MaxRetriesExceeded {
            url: url.to_string(),
            retries: self.max_retries,
        }))
    }

    /// Single download attempt without retry
    async fn download_once(
        &self,
        url: &str,
        dest: &Path,
        credentials: Option<&Credentials>,
        algorithm: &str,
    ) -> Result<DownloadResult, DownloadError> {
        let mut request = self.client.get(url);
        if let Some(credentials) = credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_ref());
        }

        let response = request.send().await.map_err(|e| DownloadError::NetworkError {
            url: url.to_string(),
            error: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(DownloadError::NetworkError {
                url: url.to_string(),
                error: format!("HTTP {}", response.status()),
            });
        }

        // Create parent directories if needed
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::IoError {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
        }

        let partial = PartialFile::new(dest);
        let (size, checksum) = stream_to_file(response, url, partial.path(), algorithm).await?;
        partial.persist(dest).await?;

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            size,
            checksum,
        })
    }

    /// Download a file and verify it against the expected hash
    ///
    /// A mismatching file is deleted. Hashes with an algorithm we cannot
    /// compute locally are not checked.
    pub async fn download_verified(
        &self,
        url: &str,
        dest: &Path,
        credentials: Option<&Credentials>,
        expected: &FileHash,
    ) -> Result<DownloadResult, DownloadError> {
        let result = self
            .download(url, dest, credentials, &expected.algorithm)
            .await?;

        if result.checksum.algorithm == expected.algorithm && result.checksum.digest != expected.digest {
            // Delete corrupted download
            let _ = tokio::fs::remove_file(dest).await;

            return Err(DownloadError::ChecksumMismatch {
                file: dest.display().to_string(),
                expected: expected.to_string(),
                actual: result.checksum.to_string(),
            });
        }

        Ok(result)
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// In-progress `.part` file, removed on drop unless persisted
///
/// Dropping covers both failed attempts and cancelled download tasks.
struct PartialFile {
    path: PathBuf,
    persisted: bool,
}

impl PartialFile {
    fn new(dest: &Path) -> Self {
        Self {
            path: partial_path(dest),
            persisted: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Rename into place
    async fn persist(mut self, dest: &Path) -> Result<(), DownloadError> {
        tokio::fs::rename(&self.path, dest)
            .await
            .map_err(|e| DownloadError::IoError {
                path: dest.to_path_buf(),
                error: e.to_string(),
            })?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    url: &str,
    path: &Path,
    algorithm: &str,
) -> Result<(u64, FileHash), DownloadError> {
    let io_error = |e: std::io::Error| DownloadError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let mut file = File::create(path).await.map_err(io_error)?;
    let mut hasher = Checksum::for_algorithm(algorithm).unwrap_or_else(|| Checksum::Sha256(Sha256::new()));
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::NetworkError {
            url: url.to_string(),
            error: e.to_string(),
        })?;

        file.write_all(&chunk).await.map_err(io_error)?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
    }

    file.flush().await.map_err(io_error)?;

    let checksum = FileHash {
        algorithm: hasher.algorithm().to_string(),
        digest: hasher.finalize(),
    };
    Ok((downloaded, checksum))
}

/// Verify an existing file against a hash
///
/// Returns `Ok(None)` when the algorithm cannot be computed locally. Reads
/// block; async callers go through [`verify_existing`].
pub fn verify_file(path: &Path, expected: &FileHash) -> Result<Option<bool>, DownloadError> {
    let Some(mut hasher) = Checksum::for_algorithm(&expected.algorithm) else {
        return Ok(None);
    };

    let io_error = |e: std::io::Error| DownloadError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(io_error)?;
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).map_err(io_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(Some(hasher.finalize() == expected.digest.to_lowercase()))
}

/// [`verify_file`] on the blocking thread pool
pub async fn verify_existing(path: PathBuf, expected: FileHash) -> Result<Option<bool>, DownloadError> {
    let display = path.clone();
    tokio::task::spawn_blocking(move || verify_file(&path, &expected))
        .await
        .map_err(|e| DownloadError::IoError {
            path: display,
            error: e.to_string(),
        })?
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
