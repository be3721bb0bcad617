//! Lock file handling
//!
//! Reads `poetry.lock` and `pdm.lock` files into a common model. Both are
//! TOML documents with a `[[package]]` array pinning every distribution to
//! an exact version together with the hashes of its release files.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::LockError;

/// Supported lock file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockFormat {
    /// Poetry's `poetry.lock`
    Poetry,
    /// PDM's `pdm.lock`
    Pdm,
}

impl LockFormat {
    /// All formats in discovery order
    pub const ALL: [Self; 2] = [Self::Poetry, Self::Pdm];

    /// File name the package manager writes
    pub fn filename(self) -> &'static str {
        match self {
            Self::Poetry => "poetry.lock",
            Self::Pdm => "pdm.lock",
        }
    }

    /// Group that is always selected
    pub fn default_group(self) -> &'static str {
        match self {
            Self::Poetry => "main",
            Self::Pdm => "default",
        }
    }

    /// Detect the format from a file name
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::ALL.into_iter().find(|f| name.ends_with(f.filename()))
    }
}

impl fmt::Display for LockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

/// `algorithm:digest` hash recorded for a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHash {
    /// Algorithm name as used by package indexes (`sha256`, `md5`, ...)
    pub algorithm: String,
    /// Lowercase hex digest
    pub digest: String,
}

impl FileHash {
    /// Parse `sha256:abcd...`
    pub fn parse(value: &str) -> Option<Self> {
        let (algorithm, digest) = value.trim().split_once(':')?;
        if algorithm.is_empty() || digest.is_empty() {
            return None;
        }
        Some(Self {
            algorithm: algorithm.to_ascii_lowercase(),
            digest: digest.to_ascii_lowercase(),
        })
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

/// A release file listed for a locked package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedFile {
    /// File name
    pub filename: String,
    /// Expected hash
    pub hash: Option<FileHash>,
    /// Direct URL, when the lock file records one
    pub url: Option<String>,
}

/// How a package source is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// PEP 503 simple index (`type = "legacy"`)
    Legacy,
    /// Index speaking the PyPI JSON API
    Json,
    /// Direct link to a single artifact (`type = "url"`)
    Url,
    /// `git`, `directory` and `file` sources
    Unsupported(String),
}

impl SourceKind {
    fn from_type(kind: Option<&str>) -> Self {
        match kind.unwrap_or_default() {
            "legacy" => Self::Legacy,
            "url" => Self::Url,
            kind @ ("git" | "directory" | "file") => Self::Unsupported(kind.to_string()),
            _ => Self::Json,
        }
    }
}

/// Explicit package source (poetry `[package.source]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    /// Source type
    pub kind: SourceKind,
    /// Source URL, possibly carrying credentials
    pub url: String,
    /// Repository name the source refers to
    pub reference: Option<String>,
}

/// A pinned package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedPackage {
    /// Distribution name
    pub name: String,
    /// Exact version
    pub version: String,
    /// `requires-python` constraint
    pub python_versions: Option<String>,
    /// Dependency groups the package belongs to
    pub groups: Vec<String>,
    /// Release files
    pub files: Vec<LockedFile>,
    /// Explicit source, `None` for the default index
    pub source: Option<PackageSource>,
}

/// Parsed lock file
#[derive(Debug, Clone)]
pub struct LockFile {
    /// Where the lock file was read from
    pub path: PathBuf,
    /// Format
    pub format: LockFormat,
    /// Packages in file order
    pub packages: Vec<LockedPackage>,
}

#[derive(Debug, Deserialize)]
struct RawLock {
    #[serde(default)]
    package: Vec<RawPackage>,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    files: HashMap<String, Vec<RawFile>>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    name: String,
    version: String,
    #[serde(rename = "python-versions", alias = "requires_python")]
    python_versions: Option<String>,
    category: Option<String>,
    groups: Option<Vec<String>>,
    files: Option<Vec<RawFile>>,
    source: Option<RawSource>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFile {
    file: Option<String>,
    url: Option<String>,
    hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
    reference: Option<String>,
}

impl RawFile {
    fn into_locked(self) -> Option<LockedFile> {
        let filename = match (self.file, self.url.as_deref()) {
            (Some(file), _) => file,
            (None, Some(url)) => filename_from_url(url)?,
            (None, None) => return None,
        };
        Some(LockedFile {
            filename,
            hash: self.hash.as_deref().and_then(FileHash::parse),
            url: self.url,
        })
    }
}

/// Last path segment of a URL, without query or fragment
pub fn filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

impl LockFile {
    /// Find the lock file to use
    ///
    /// An explicit path must exist and have a supported name. Without one,
    /// `dir` is searched for `poetry.lock` and then `pdm.lock`.
    pub fn locate(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf, LockError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(LockError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            if LockFormat::detect(path).is_none() {
                return Err(LockError::Unsupported {
                    path: path.to_path_buf(),
                });
            }
            return Ok(path.to_path_buf());
        }

        LockFormat::ALL
            .into_iter()
            .map(|f| dir.join(f.filename()))
            .find(|p| p.is_file())
            .ok_or_else(|| LockError::NoneFound {
                dir: dir.to_path_buf(),
            })
    }

    /// Load and parse a lock file
    pub fn load(path: &Path) -> Result<Self, LockError> {
        let format = LockFormat::detect(path).ok_or_else(|| LockError::Unsupported {
            path: path.to_path_buf(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| LockError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content, format, path)
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str, format: LockFormat, path: &Path) -> Result<Self, LockError> {
        let raw: RawLock = toml::from_str(content).map_err(|e| LockError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let RawLock {
            package,
            mut metadata,
        } = raw;

        let packages = package
            .into_iter()
            .map(|record| {
                let files = record
                    .files
                    .or_else(|| metadata.files.remove(&record.name))
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(RawFile::into_locked)
                    .collect();

                let groups = match (record.groups, record.category) {
                    (Some(groups), _) if !groups.is_empty() => groups,
                    (_, Some(category)) => vec![category],
                    _ => vec![format.default_group().to_string()],
                };

                let source = record.source.and_then(|s| {
                    Some(PackageSource {
                        kind: SourceKind::from_type(s.kind.as_deref()),
                        url: s.url?,
                        reference: s.reference,
                    })
                });

                LockedPackage {
                    name: record.name,
                    version: record.version,
                    python_versions: record.python_versions,
                    groups,
                    files,
                    source,
                }
            })
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            format,
            packages,
        })
    }

    /// Packages in the default group or any of `extra_groups`
    pub fn select(&self, extra_groups: &[String]) -> Vec<&LockedPackage> {
        let default = self.format.default_group();
        self.packages
            .iter()
            .filter(|p| {
                p.groups
                    .iter()
                    .any(|g| g == default || extra_groups.iter().any(|e| e == g))
            })
            .collect()
    }
}
