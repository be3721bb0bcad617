//! Host platform detection
//!
//! Determines the default download target: the interpreter version of the
//! `python3` on `PATH` and the platform tag of the running machine. Linux
//! hosts are told apart by their C library (`ldd --version`), macOS hosts
//! by `sw_vers`.

use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::defaults;
use crate::core::version::PythonVersion;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex"));

/// C library of a Linux host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Libc {
    /// GNU libc with its version
    Glibc(u32, u32),
    /// musl with its version
    Musl(u32, u32),
}

/// Detected host defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    /// Version of the local interpreter
    pub python: PythonVersion,
    /// Platform tag of this machine
    pub platform: String,
}

impl HostPlatform {
    /// Detect the current host
    pub fn detect() -> Self {
        Self {
            python: detect_python(),
            platform: detect_platform(),
        }
    }
}

/// Run `program args..` and return stdout and stderr combined
///
/// musl's `ldd` prints its version to stderr and exits non-zero, so the
/// exit status is not checked.
fn command_output(program: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Some(format!("{stdout}{stderr}"))
}

fn version_pair(text: &str) -> Option<(u32, u32)> {
    let caps = VERSION_RE.captures(text)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Parse `Python 3.11.4`
pub fn parse_python_version(output: &str) -> Option<PythonVersion> {
    let caps = VERSION_RE.captures(output.trim().strip_prefix("Python")?)?;
    Some(PythonVersion {
        major: caps[1].parse().ok()?,
        minor: caps[2].parse().ok()?,
        micro: caps.get(3).and_then(|m| m.as_str().parse().ok()),
    })
}

/// Parse the output of `ldd --version`
///
/// glibc prints `ldd (GNU libc) 2.38` (distributions vary the parenthesis)
/// with the version last on the first line; musl prints a banner followed
/// by `Version 1.2.4`.
pub fn parse_ldd_version(output: &str) -> Option<Libc> {
    if output.to_ascii_lowercase().contains("musl") {
        let line = output.lines().find(|l| l.trim_start().starts_with("Version"))?;
        let (major, minor) = version_pair(line)?;
        return Some(Libc::Musl(major, minor));
    }

    let first = output.lines().next()?;
    if !first.contains("libc") && !first.contains("GLIBC") {
        return None;
    }
    let last = first.split_whitespace().last()?;
    let (major, minor) = version_pair(last)?;
    Some(Libc::Glibc(major, minor))
}

/// Parse `sw_vers -productVersion` into the version used in wheel tags
///
/// From macOS 11 on only the major version is part of the tag.
pub fn parse_macos_version(output: &str) -> Option<(u32, u32)> {
    let (major, minor) = version_pair(output.trim())?;
    Some(if major >= 11 { (major, 0) } else { (major, minor) })
}

/// Build the platform tag for an OS/arch pair as named by `std::env::consts`
pub fn platform_tag(os: &str, arch: &str, libc: Option<Libc>, macos: Option<(u32, u32)>) -> String {
    match os {
        "linux" => {
            let arch = match arch {
                "x86" => "i686",
                "arm" => "armv7l",
                "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
                other => other,
            };
            match libc {
                Some(Libc::Musl(major, minor)) => format!("musllinux_{major}_{minor}_{arch}"),
                Some(Libc::Glibc(major, minor)) => format!("manylinux_{major}_{minor}_{arch}"),
                None => {
                    let (major, minor) = defaults::DEFAULT_GLIBC_VERSION;
                    format!("manylinux_{major}_{minor}_{arch}")
                }
            }
        }
        "macos" => {
            let arch = if arch == "aarch64" { "arm64" } else { arch };
            let (major, minor) = macos.unwrap_or(if arch == "arm64" { (11, 0) } else { (10, 9) });
            format!("macosx_{major}_{minor}_{arch}")
        }
        "windows" => match arch {
            "x86" => "win32".to_string(),
            "aarch64" => "win_arm64".to_string(),
            _ => "win_amd64".to_string(),
        },
        other => format!("{other}_{arch}"),
    }
}

/// Platform tag of the running machine
pub fn detect_platform() -> String {
    let os = std::env::consts::OS;
    let libc = if os == "linux" {
        which::which("ldd")
            .ok()
            .and_then(|ldd| command_output(&ldd, &["--version"]))
            .and_then(|out| parse_ldd_version(&out))
    } else {
        None
    };
    let macos = if os == "macos" {
        command_output(Path::new("sw_vers"), &["-productVersion"])
            .and_then(|out| parse_macos_version(&out))
    } else {
        None
    };

    let tag = platform_tag(os, std::env::consts::ARCH, libc, macos);
    tracing::debug!("Detected host platform {tag}");
    tag
}

/// Version of the `python3` (or `python`) on `PATH`
pub fn detect_python() -> PythonVersion {
    let detected = ["python3", "python"]
        .iter()
        .find_map(|name| which::which(name).ok())
        .and_then(|python| command_output(&python, &["--version"]))
        .and_then(|out| parse_python_version(&out));

    match detected {
        Some(version) => {
            tracing::debug!("Detected python {version}");
            version
        }
        None => {
            tracing::debug!(
                "No python interpreter found, assuming {}",
                defaults::DEFAULT_PYTHON_VERSION
            );
            defaults::DEFAULT_PYTHON_VERSION
                .parse()
                .unwrap_or(PythonVersion::new(3, 12))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python_version() {
        let version = parse_python_version("Python 3.11.4\n").unwrap();
        assert_eq!((version.major, version.minor, version.micro), (3, 11, Some(4)));

        let version = parse_python_version("Python 3.13.0rc1").unwrap();
        assert_eq!((version.major, version.minor), (3, 13));

        assert!(parse_python_version("bash: python3: command not found").is_none());
    }

    #[test]
    fn test_parse_ldd_glibc() {
        let gnu = "ldd (GNU libc) 2.38\nCopyright (C) 2023 Free Software Foundation, Inc.\n";
        assert_eq!(parse_ldd_version(gnu), Some(Libc::Glibc(2, 38)));

        let ubuntu = "ldd (Ubuntu GLIBC 2.35-0ubuntu3.1) 2.35\nCopyright (C) 2022\n";
        assert_eq!(parse_ldd_version(ubuntu), Some(Libc::Glibc(2, 35)));
    }

    #[test]
    fn test_parse_ldd_musl() {
        let musl = "musl libc (x86_64)\nVersion 1.2.4\nDynamic Program Loader\n";
        assert_eq!(parse_ldd_version(musl), Some(Libc::Musl(1, 2)));
    }

    #[test]
    fn test_parse_ldd_unknown() {
        assert_eq!(parse_ldd_version(""), None);
        assert_eq!(parse_ldd_version("something else 1.0"), None);
    }

    #[test]
    fn test_parse_macos_version() {
        assert_eq!(parse_macos_version("14.2.1\n"), Some((14, 0)));
        assert_eq!(parse_macos_version("10.15.7"), Some((10, 15)));
        assert_eq!(parse_macos_version("garbage"), None);
    }

    #[test]
    fn test_platform_tag_linux() {
        assert_eq!(
            platform_tag("linux", "x86_64", Some(Libc::Glibc(2, 31)), None),
            "manylinux_2_31_x86_64"
        );
        assert_eq!(
            platform_tag("linux", "aarch64", Some(Libc::Musl(1, 2)), None),
            "musllinux_1_2_aarch64"
        );
        assert_eq!(platform_tag("linux", "x86", None, None), "manylinux_2_17_i686");
    }

    #[test]
    fn test_platform_tag_macos() {
        assert_eq!(platform_tag("macos", "aarch64", None, Some((14, 0))), "macosx_14_0_arm64");
        assert_eq!(platform_tag("macos", "aarch64", None, None), "macosx_11_0_arm64");
        assert_eq!(platform_tag("macos", "x86_64", None, None), "macosx_10_9_x86_64");
    }

    #[test]
    fn test_platform_tag_windows() {
        assert_eq!(platform_tag("windows", "x86_64", None, None), "win_amd64");
        assert_eq!(platform_tag("windows", "x86", None, None), "win32");
        assert_eq!(platform_tag("windows", "aarch64", None, None), "win_arm64");
    }

    #[test]
    fn test_detected_platform_parses() {
        let host = HostPlatform::detect();
        assert!(host.platform.parse::<crate::core::platform::PlatformTag>().is_ok());
        assert_eq!(host.python.major, 3);
    }
}
