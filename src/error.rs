//! Error types for lockfetch
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Lock file discovery and parsing errors
#[derive(Error, Debug)]
pub enum LockError {
    /// Explicitly requested lock file does not exist
    #[error("The source file \"{path}\" does not exist.")]
    NotFound { path: PathBuf },

    /// File name does not match any supported lock format
    #[error("The source file {path} is not supported.")]
    Unsupported { path: PathBuf },

    /// No supported lock file in the search directory
    #[error("No supported lock file (poetry.lock, pdm.lock) found in {dir}.")]
    NoneFound { dir: PathBuf },

    /// IO error while reading the lock file
    #[error("Failed to read lock file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Lock file is not valid TOML or misses required fields
    #[error("Failed to parse lock file '{path}': {error}")]
    Parse { path: PathBuf, error: String },
}

/// Target platform errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlatformError {
    /// Python version is not `X.Y` or `X.Y.Z`
    #[error("Unknown python version '{0}'")]
    InvalidPythonVersion(String),

    /// Unknown interpreter abbreviation
    #[error("Unknown python implementation '{0}' (expected cp, pp, ip or jy)")]
    InvalidImplementation(String),

    /// Empty or malformed platform tag
    #[error("Invalid platform tag '{0}'")]
    InvalidPlatform(String),

    /// `requires-python` expression that cannot be evaluated
    #[error("Invalid python version constraint '{0}'")]
    InvalidSpecifier(String),
}

/// Package index errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Metadata request failed
    #[error("Can not download metadata for package {package}: {error}")]
    Metadata { package: String, error: String },

    /// Metadata body could not be decoded
    #[error("Invalid metadata for package {package}: {error}")]
    InvalidMetadata { package: String, error: String },

    /// Repository URL is not a valid URL
    #[error("Invalid repository URL '{url}': {error}")]
    InvalidUrl { url: String, error: String },

    /// Credentials file could not be parsed
    #[error("Failed to parse credentials file '{path}': {error}")]
    Credentials { path: PathBuf, error: String },
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Can not download package {url}: {error}")]
    NetworkError { url: String, error: String },

    /// Checksum verification failed
    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Max retries exceeded
    #[error("Download failed after {retries} retries: {url}")]
    MaxRetriesExceeded { url: String, retries: u32 },
}

/// Per-package failures
///
/// These abort the run unless `--ignore-missing` is given, in which case
/// they are attached to the package row instead.
#[derive(Error, Debug)]
pub enum PackageError {
    /// Index digest differs from the lock file hash
    #[error("Unmatch package \"{file}\" hash {expected} != {algorithm}:{actual}.")]
    HashMismatch {
        file: String,
        expected: String,
        algorithm: String,
        actual: String,
    },

    /// No candidate file could be resolved to a URL
    #[error(
        "The source lock file does not contain a correct reference for package {name} \
         with required python version and CPU architecture."
    )]
    NoArtifact { name: String },

    /// Source type that cannot be fetched from an index
    #[error("Package {name} uses unsupported source type '{kind}'")]
    UnsupportedSource { name: String, kind: String },

    /// Index lookup failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Artifact download failed
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Target directory could not be created
    #[error("Failed to create target directory '{path}': {error}")]
    TargetDir { path: PathBuf, error: String },

    /// A package failed and missing packages are not ignored
    #[error("{0}")]
    Package(#[from] PackageError),

    /// A download task panicked or was cancelled
    #[error("Download task failed: {0}")]
    Task(String),
}
