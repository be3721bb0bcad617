//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser};

use crate::config::settings::GlobalConfig;
use crate::core::fetch::{fetch_packages, FetchOptions};
use crate::core::lock::{LockFile, LockFormat};
use crate::core::platform::{Implementation, PlatformTag, TargetPlatform};
use crate::core::version::PythonVersion;
use crate::infra::dirs::LockfetchDirs;
use crate::infra::download::DownloadManager;
use crate::infra::host::HostPlatform;
use crate::registry::credentials::{load_poetry_auth, CredentialStore};
use crate::registry::{IndexClient, RepositoryRegistry};

use output::{column_widths, create_package_bar, format_row, to_json, OutputConfig};

/// Lockfetch - download locked Python packages for a target platform
///
/// Reads poetry.lock or pdm.lock and downloads the matching wheels or
/// source distributions into a directory.
#[derive(Parser, Debug)]
#[command(name = "lockfetch")]
#[command(author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Lock file to read (default: poetry.lock or pdm.lock in the current directory)
    #[arg(short, long, value_name = "FILE")]
    pub sourcefile: Option<PathBuf>,

    /// Download directory [default: ./wheels]
    #[arg(short, long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Additional dependency group to download (repeatable)
    #[arg(short, long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Target python version, X.Y or X.Y.Z (default: the local python3)
    #[arg(short, long, value_name = "VERSION")]
    pub python_version: Option<String>,

    /// Target platform tag, e.g. manylinux_2_17_x86_64 or win_amd64 (default: this machine)
    #[arg(long, value_name = "TAG")]
    pub platform: Option<String>,

    /// Target python implementation
    #[arg(long, default_value = "cp", value_parser = ["cp", "pp", "ip", "jy"])]
    pub python_implementation: String,

    /// Report packages that cannot be fetched and continue
    #[arg(long)]
    pub ignore_missing: bool,

    /// Log hash mismatches instead of failing
    #[arg(long)]
    pub ignore_hash: bool,

    /// Only download source distributions
    #[arg(long)]
    pub no_binary: bool,

    /// Resolve artifacts without downloading
    #[arg(long)]
    pub dryrun: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Download even if a verified file already exists
    #[arg(long)]
    pub force: bool,

    /// Default package index URL [default: https://pypi.org]
    #[arg(long, env = "LOCKFETCH_INDEX_URL", value_name = "URL")]
    pub index_url: Option<String>,

    /// Number of parallel downloads
    #[arg(short = 'j', long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parse arguments, showing the detected host in the help text
    pub fn parse_with_host(host: &HostPlatform) -> Self {
        let formats: Vec<&str> = LockFormat::ALL.iter().map(|f| f.filename()).collect();
        let command = Self::command().after_help(format!(
            "Current platform: {}\nCurrent python version: {}\nSupported lock files: {}",
            host.platform,
            host.python,
            formats.join(", ")
        ));
        let matches = command.get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    /// Output preferences from the flags alone
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::new(self.quiet, self.json, self.verbose, !self.no_color)
    }

    /// Execute the fetch
    pub async fn run(self, host: HostPlatform) -> Result<()> {
        let dirs = LockfetchDirs::new();
        let settings = GlobalConfig::load(&dirs)?;

        let output = OutputConfig {
            color: !self.no_color && settings.color(),
            ..self.output_config()
        };
        output.apply_global();

        let target = self.target_platform(&host)?;
        tracing::debug!("Host is {} with python {}", host.platform, host.python);

        let cwd = std::env::current_dir().context("Failed to read the current directory")?;
        let path = LockFile::locate(self.sourcefile.as_deref(), &cwd)?;
        let lock = LockFile::load(&path)?;
        tracing::info!("Using {} ({})", path.display(), lock.format);

        let auth = load_poetry_auth(&dirs.poetry_auth_path())?;
        let index_url = self.index_url.as_deref().unwrap_or(settings.index_url());
        let mut registry = RepositoryRegistry::new(index_url, CredentialStore::from_process_env(auth))?;

        let options = FetchOptions {
            target: self.target.clone().unwrap_or_else(|| settings.target()),
            groups: self.groups.clone(),
            dry_run: self.dryrun,
            ignore_missing: self.ignore_missing,
            ignore_hash: self.ignore_hash,
            no_binary: self.no_binary,
            force: self.force,
            parallel: self.parallel.unwrap_or(settings.parallel()),
        };
        let downloads = DownloadManager::with_config(settings.retries(), 1000);

        let selected = lock.select(&options.groups);
        let widths = column_widths(selected.iter().map(|p| (p.name.as_str(), p.version.as_str())));
        let bar = if output.shows_table() {
            create_package_bar(selected.len() as u64)
        } else {
            indicatif::ProgressBar::hidden()
        };

        let result = fetch_packages(
            &lock,
            &mut registry,
            &target,
            &options,
            &IndexClient::new(),
            &downloads,
            |package| {
                bar.inc(1);
                if output.shows_table() {
                    bar.suspend(|| {
                        for line in format_row(package, widths) {
                            println!("{line}");
                        }
                    });
                }
            },
        )
        .await;
        bar.finish_and_clear();
        let packages = result?;

        if output.json {
            println!("{}", to_json(&packages)?);
        }
        Ok(())
    }

    /// Target from the flags, falling back to the host
    fn target_platform(&self, host: &HostPlatform) -> Result<TargetPlatform> {
        let python: PythonVersion = match &self.python_version {
            Some(version) => version.parse()?,
            None => host.python,
        };
        let implementation: Implementation = self.python_implementation.parse()?;
        let platform: PlatformTag = self.platform.as_deref().unwrap_or(&host.platform).parse()?;
        Ok(TargetPlatform::new(python, implementation, platform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostPlatform {
        HostPlatform {
            python: PythonVersion::new(3, 12),
            platform: "manylinux_2_35_x86_64".to_string(),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "lockfetch",
            "-s",
            "pdm.lock",
            "-t",
            "out",
            "-g",
            "dev",
            "-g",
            "test",
            "-p",
            "3.9",
            "--platform",
            "win_amd64",
            "--python-implementation",
            "pp",
            "--ignore-missing",
            "--dryrun",
            "-j",
            "8",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.sourcefile, Some(PathBuf::from("pdm.lock")));
        assert_eq!(cli.target, Some(PathBuf::from("out")));
        assert_eq!(cli.groups, vec!["dev", "test"]);
        assert_eq!(cli.parallel, Some(8));
        assert_eq!(cli.verbose, 2);
        assert!(cli.ignore_missing && cli.dryrun);
        assert!(!cli.ignore_hash && !cli.no_binary && !cli.force);

        let target = cli.target_platform(&host()).unwrap();
        assert_eq!(target.to_string(), "pp39-win_amd64");
    }

    #[test]
    fn test_rejects_unknown_implementation() {
        assert!(Cli::try_parse_from(["lockfetch", "--python-implementation", "xx"]).is_err());
    }

    #[test]
    fn test_target_defaults_to_host() {
        let cli = Cli::try_parse_from(["lockfetch"]).unwrap();
        let target = cli.target_platform(&host()).unwrap();
        assert_eq!(target.to_string(), "cp312-manylinux_2_35_x86_64");
    }

    #[test]
    fn test_legacy_platform_alias() {
        let cli = Cli::try_parse_from(["lockfetch", "-p", "3.11", "--platform", "manylinux2014_aarch64"]).unwrap();
        let target = cli.target_platform(&host()).unwrap();
        assert_eq!(target.to_string(), "cp311-manylinux_2_17_aarch64");
    }

    #[test]
    fn test_invalid_python_version() {
        let cli = Cli::try_parse_from(["lockfetch", "-p", "three"]).unwrap();
        assert!(cli.target_platform(&host()).is_err());
    }
}
