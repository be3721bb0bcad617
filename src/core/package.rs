//! Per-package artifact selection
//!
//! A [`Package`] holds the files of one locked package that can be installed
//! on the target, best candidate first: compatible wheels ranked by
//! [`Compatibility`], then the first source distribution as a fallback.
//! Index metadata later attaches download URLs to those candidates; the
//! selected artifact is the first candidate that has one.
//!
//! [`Compatibility`]: crate::core::wheel::Compatibility

use std::sync::Arc;

use crate::core::lock::{filename_from_url, FileHash, LockedPackage};
use crate::core::platform::TargetPlatform;
use crate::core::version::RequiresPython;
use crate::core::wheel::{ArtifactKind, WheelName};
use crate::error::PackageError;
use crate::registry::client::IndexFile;
use crate::registry::repository::{IndexKind, Repository};

/// Logged when the target python is outside the package's constraint
pub const UNSUPPORTED_PYTHON: &str = "The python version is not supported by this package.";

/// Logged when only a source distribution is left for a binary package
pub const REQUIRES_BUILD: &str = "This package will require a build.";

/// A downloadable file of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    /// File name
    pub filename: String,
    /// Hash recorded in the lock file
    pub hash: Option<FileHash>,
    /// Download URL, once known
    pub url: Option<String>,
    /// Wheel or source distribution
    pub kind: ArtifactKind,
    /// The index published a different digest, already logged
    pub hash_mismatch: bool,
}

/// A locked package prepared for download to one target platform
#[derive(Debug, Clone)]
pub struct Package {
    /// Distribution name
    pub name: String,
    /// Pinned version
    pub version: String,
    /// Repository the package is fetched from
    pub repository: Arc<Repository>,
    /// Notes shown under the package row
    pub logs: Vec<String>,
    /// Set when the package failed and the run continued
    pub fatal: bool,
    candidates: Vec<ArtifactFile>,
    requires_build: bool,
}

impl Package {
    /// Select the candidate files of `locked` for `target`
    pub fn new(locked: &LockedPackage, target: &TargetPlatform, repository: Arc<Repository>) -> Self {
        let mut wheels = Vec::new();
        let mut sdist = None;
        let mut has_binary = false;

        for (position, file) in locked.files.iter().enumerate() {
            match ArtifactKind::from_filename(&file.filename) {
                Some(ArtifactKind::Wheel) => {
                    let Some(wheel) = WheelName::parse(&file.filename) else {
                        tracing::debug!("{}: skipping malformed wheel {}", locked.name, file.filename);
                        continue;
                    };
                    has_binary |= wheel.is_platform_specific();
                    match wheel.compatibility(target) {
                        Some(score) => wheels.push((score, position, file)),
                        None => tracing::debug!("{}: {} does not fit {target}", locked.name, file.filename),
                    }
                }
                Some(ArtifactKind::Sdist) if sdist.is_none() => sdist = Some(file),
                _ => {}
            }
        }

        // Best score first; among equal scores the later lock entry wins
        wheels.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));

        let mut candidates: Vec<ArtifactFile> = wheels
            .into_iter()
            .map(|(_, _, file)| ArtifactFile {
                filename: file.filename.clone(),
                hash: file.hash.clone(),
                url: file.url.clone(),
                kind: ArtifactKind::Wheel,
                hash_mismatch: false,
            })
            .collect();

        if let Some(file) = sdist {
            candidates.push(ArtifactFile {
                filename: file.filename.clone(),
                hash: file.hash.clone(),
                url: file.url.clone(),
                kind: ArtifactKind::Sdist,
                hash_mismatch: false,
            });
        }

        if repository.kind == IndexKind::Direct {
            let direct_name = filename_from_url(&repository.url);
            for candidate in &mut candidates {
                if candidate.url.is_none() && direct_name.as_deref() == Some(candidate.filename.as_str()) {
                    candidate.url = Some(repository.url.clone());
                }
            }
        }

        let requires_build = has_binary
            && candidates.len() == 1
            && candidates[0].kind == ArtifactKind::Sdist;

        let mut package = Self {
            name: locked.name.clone(),
            version: locked.version.clone(),
            repository,
            logs: Vec::new(),
            fatal: false,
            candidates,
            requires_build,
        };

        if !package.supports_python(locked.python_versions.as_deref(), target) {
            package.logs.push(UNSUPPORTED_PYTHON.to_string());
        }

        package
    }

    fn supports_python(&self, constraint: Option<&str>, target: &TargetPlatform) -> bool {
        let Some(constraint) = constraint else {
            return true;
        };
        match RequiresPython::parse(constraint) {
            Ok(requires) => requires.contains(&target.python),
            Err(e) => {
                tracing::debug!("{}: {e}", self.name);
                false
            }
        }
    }

    /// Candidate files, best first
    pub fn candidates(&self) -> &[ArtifactFile] {
        &self.candidates
    }

    /// Whether only a source distribution fits while wheels exist elsewhere
    pub fn requires_build(&self) -> bool {
        self.requires_build
    }

    /// Whether any candidate still needs a URL from the package index
    pub fn needs_index(&self) -> bool {
        self.repository.kind != IndexKind::Direct && self.candidates.iter().any(|c| c.url.is_none())
    }

    /// Attach index URLs to the candidates
    ///
    /// An index file is used when its digest for the lock file's algorithm
    /// equals the lock hash, or when the index does not publish that
    /// algorithm. With `ignore_hash` a mismatch is logged instead of
    /// failing and the URL is still used. With `no_binary` wheels are
    /// dropped from the candidates.
    pub fn apply_index(
        &mut self,
        files: &[IndexFile],
        ignore_hash: bool,
        no_binary: bool,
    ) -> Result<(), PackageError> {
        if no_binary {
            self.candidates.retain(|c| c.kind == ArtifactKind::Sdist);
        }

        for file in files {
            let Some(candidate) = self.candidates.iter_mut().find(|c| c.filename == file.filename) else {
                continue;
            };

            if let Some(hash) = &candidate.hash {
                match file.digests.get(&hash.algorithm) {
                    Some(digest) if digest.eq_ignore_ascii_case(&hash.digest) => {}
                    Some(digest) => {
                        let mismatch = PackageError::HashMismatch {
                            file: candidate.filename.clone(),
                            expected: hash.to_string(),
                            algorithm: hash.algorithm.clone(),
                            actual: digest.clone(),
                        };
                        if !ignore_hash {
                            return Err(mismatch);
                        }
                        tracing::warn!("{mismatch}");
                        self.logs.push(mismatch.to_string());
                        candidate.hash_mismatch = true;
                    }
                    None => tracing::debug!(
                        "{}: index has no {} digest, checking after download",
                        candidate.filename,
                        hash.algorithm
                    ),
                }
            }

            if candidate.url.is_none() {
                candidate.url = Some(file.url.clone());
            }
        }

        if !self.is_wheel() && self.requires_build {
            self.logs.push(REQUIRES_BUILD.to_string());
        }

        Ok(())
    }

    /// The artifact to download: the first candidate with a URL
    pub fn selected(&self) -> Result<&ArtifactFile, PackageError> {
        self.candidates
            .iter()
            .find(|c| c.url.is_some())
            .ok_or_else(|| PackageError::NoArtifact {
                name: self.name.clone(),
            })
    }

    /// Whether the selected artifact is a wheel
    pub fn is_wheel(&self) -> bool {
        self.selected()
            .is_ok_and(|artifact| artifact.kind == ArtifactKind::Wheel)
    }

    /// File name of the selected artifact, empty if none
    pub fn filename(&self) -> &str {
        self.selected().map_or("", |artifact| artifact.filename.as_str())
    }

    /// Record an error and mark the package as failed
    pub fn fail(&mut self, error: &PackageError) {
        self.logs.push(error.to_string());
        self.fatal = true;
    }
}
