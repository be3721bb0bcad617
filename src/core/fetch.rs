//! Package fetch logic
//!
//! Drives the pipeline for one lock file: select packages by group, resolve
//! their index metadata, pick the artifact for the target platform and
//! download it into the target directory. Packages are processed in
//! parallel but reported in lock file order.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::defaults;
use crate::core::lock::LockFile;
use crate::core::package::{ArtifactFile, Package};
use crate::core::platform::TargetPlatform;
use crate::error::{FetchError, PackageError};
use crate::infra::download::{verify_existing, DownloadManager};
use crate::registry::client::IndexClient;
use crate::registry::repository::RepositoryRegistry;

/// Options for fetching packages
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct FetchOptions {
    /// Download directory
    pub target: PathBuf,
    /// Groups selected in addition to the lock format's default group
    pub groups: Vec<String>,
    /// Resolve artifacts without downloading
    pub dry_run: bool,
    /// Report failing packages and continue
    pub ignore_missing: bool,
    /// Log hash mismatches instead of failing
    pub ignore_hash: bool,
    /// Never select wheels
    pub no_binary: bool,
    /// Download even if a verified file is already present
    pub force: bool,
    /// Number of packages processed concurrently
    pub parallel: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            target: PathBuf::from(defaults::DEFAULT_TARGET),
            groups: Vec::new(),
            dry_run: false,
            ignore_missing: false,
            ignore_hash: false,
            no_binary: false,
            force: false,
            parallel: defaults::DEFAULT_PARALLEL_DOWNLOADS,
        }
    }
}

/// Fetch every selected package of `lock`
///
/// `observer` sees each finished package in lock file order. Without
/// `ignore_missing` the first package error aborts the run; with it the
/// error is attached to the package, which is marked fatal.
pub async fn fetch_packages<F>(
    lock: &LockFile,
    registry: &mut RepositoryRegistry,
    target: &TargetPlatform,
    options: &FetchOptions,
    index: &IndexClient,
    downloads: &DownloadManager,
    mut observer: F,
) -> Result<Vec<Package>, FetchError>
where
    F: FnMut(&Package),
{
    let mut prepared = Vec::new();
    for locked in lock.select(&options.groups) {
        match registry.for_source(&locked.name, locked.source.as_ref()) {
            Ok(repository) => prepared.push((Package::new(locked, target, repository), None)),
            Err(e) if options.ignore_missing => {
                let package = Package::new(locked, target, registry.default_repository());
                prepared.push((package, Some(e)));
            }
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!(
        "{} packages selected from {} for {target}",
        prepared.len(),
        lock.path.display()
    );

    if !options.dry_run {
        tokio::fs::create_dir_all(&options.target)
            .await
            .map_err(|e| FetchError::TargetDir {
                path: options.target.clone(),
                error: e.to_string(),
            })?;
    }

    let semaphore = Arc::new(Semaphore::new(options.parallel.max(1)));
    let shared = Arc::new(options.clone());

    let handles: Vec<_> = prepared
        .into_iter()
        .map(|(mut package, error)| {
            let sem = Arc::clone(&semaphore);
            let options = Arc::clone(&shared);
            let index = index.clone();
            let downloads = downloads.clone();

            tokio::spawn(async move {
                let result = match error {
                    Some(e) => Err(e),
                    None => {
                        let _permit = sem.acquire().await.ok();
                        process(&mut package, &index, &downloads, &options).await
                    }
                };
                (package, result)
            })
        })
        .collect();

    let mut packages = Vec::with_capacity(handles.len());
    let mut pending = handles.into_iter();
    while let Some(handle) = pending.next() {
        let (mut package, result) = match handle.await {
            Ok(done) => done,
            Err(e) => {
                cancel(pending).await;
                return Err(FetchError::Task(e.to_string()));
            }
        };

        if let Err(e) = result {
            if !options.ignore_missing {
                cancel(pending).await;
                return Err(e.into());
            }
            tracing::warn!("{}: {e}", package.name);
            package.fail(&e);
        }

        observer(&package);
        packages.push(package);
    }

    Ok(packages)
}

/// Abort the remaining tasks
///
/// Returns once every task has been dropped, so cancelled downloads have
/// removed their partial files.
async fn cancel<T>(pending: impl Iterator<Item = JoinHandle<T>>) {
    let pending: Vec<_> = pending.collect();
    for handle in &pending {
        handle.abort();
    }
    for handle in pending {
        let _ = handle.await;
    }
}

/// Resolve and download a single package
async fn process(
    package: &mut Package,
    index: &IndexClient,
    downloads: &DownloadManager,
    options: &FetchOptions,
) -> Result<(), PackageError> {
    let files = if package.needs_index() {
        index
            .files(&package.repository, &package.name, &package.version)
            .await?
    } else {
        Vec::new()
    };

    package.apply_index(&files, options.ignore_hash, options.no_binary)?;
    let artifact = package.selected()?.clone();
    tracing::debug!("{} {}: selected {}", package.name, package.version, artifact.filename);

    if options.dry_run {
        return Ok(());
    }
    download_artifact(package, &artifact, downloads, options).await
}

async fn download_artifact(
    package: &mut Package,
    artifact: &ArtifactFile,
    downloads: &DownloadManager,
    options: &FetchOptions,
) -> Result<(), PackageError> {
    let url = artifact.url.as_deref().ok_or_else(|| PackageError::NoArtifact {
        name: package.name.clone(),
    })?;
    let dest = options.target.join(&artifact.filename);

    if !options.force && dest.exists() {
        if let Some(hash) = &artifact.hash {
            if verify_existing(dest.clone(), hash.clone()).await? == Some(true) {
                tracing::info!("{} already present, skipping", artifact.filename);
                return Ok(());
            }
        }
    }

    let credentials = package.repository.credentials_for(url).cloned();
    match &artifact.hash {
        Some(hash) if !options.ignore_hash => {
            downloads
                .download_verified(url, &dest, credentials.as_ref(), hash)
                .await?;
        }
        Some(hash) => {
            let result = downloads
                .download(url, &dest, credentials.as_ref(), &hash.algorithm)
                .await?;
            let differs = result.checksum.algorithm == hash.algorithm && result.checksum.digest != hash.digest;
            if differs && !artifact.hash_mismatch {
                let mismatch = PackageError::HashMismatch {
                    file: artifact.filename.clone(),
                    expected: hash.to_string(),
                    algorithm: result.checksum.algorithm,
                    actual: result.checksum.digest,
                };
                tracing::warn!("{mismatch}");
                package.logs.push(mismatch.to_string());
            }
        }
        None => {
            downloads
                .download(url, &dest, credentials.as_ref(), "sha256")
                .await?;
        }
    }

    tracing::info!("Downloaded {}", dest.display());
    Ok(())
}
