//! Target platform description
//!
//! A [`TargetPlatform`] is the combination of interpreter implementation,
//! python version and platform tag that downloaded artifacts must match.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::version::PythonVersion;
use crate::error::PlatformError;

static VERSIONED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(manylinux|musllinux|macosx)_(\d+)_(\d+)_(.+)$").expect("valid regex")
});

/// Legacy manylinux names and the glibc version they stand for
const LEGACY_MANYLINUX: &[(&str, &str)] = &[
    ("manylinux1_", "manylinux_2_5_"),
    ("manylinux2010_", "manylinux_2_12_"),
    ("manylinux2014_", "manylinux_2_17_"),
];

/// Rewrite `manylinux1`/`manylinux2010`/`manylinux2014` tags to their
/// `manylinux_X_Y` equivalent.
pub fn normalize_legacy_tag(tag: &str) -> String {
    for (legacy, modern) in LEGACY_MANYLINUX {
        if let Some(arch) = tag.strip_prefix(legacy) {
            return format!("{modern}{arch}");
        }
    }
    tag.to_string()
}

/// Python interpreter implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Implementation {
    /// `cp`
    CPython,
    /// `pp`
    PyPy,
    /// `ip`
    IronPython,
    /// `jy`
    Jython,
}

impl Implementation {
    /// Short tag used in wheel file names
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::CPython => "cp",
            Self::PyPy => "pp",
            Self::IronPython => "ip",
            Self::Jython => "jy",
        }
    }
}

impl FromStr for Implementation {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cp" => Ok(Self::CPython),
            "pp" => Ok(Self::PyPy),
            "ip" => Ok(Self::IronPython),
            "jy" => Ok(Self::Jython),
            _ => Err(PlatformError::InvalidImplementation(s.to_string())),
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Platform part of a compatibility tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformTag {
    /// glibc based linux (PEP 600)
    Manylinux { glibc: (u32, u32), arch: String },
    /// musl based linux (PEP 656)
    Musllinux { musl: (u32, u32), arch: String },
    /// macOS with a minimum deployment target
    Macos { version: (u32, u32), arch: String },
    /// Plain `linux_<arch>` without libc information
    Linux { arch: String },
    /// Anything else, matched verbatim (`win_amd64`, `win32`, ...)
    Other(String),
}

impl PlatformTag {
    /// CPU architecture, if the tag carries one
    pub fn arch(&self) -> Option<&str> {
        match self {
            Self::Manylinux { arch, .. }
            | Self::Musllinux { arch, .. }
            | Self::Macos { arch, .. }
            | Self::Linux { arch } => Some(arch),
            Self::Other(_) => None,
        }
    }

    /// Whether this is any flavour of linux
    pub fn is_linux(&self) -> bool {
        matches!(
            self,
            Self::Manylinux { .. } | Self::Musllinux { .. } | Self::Linux { .. }
        )
    }
}

impl FromStr for PlatformTag {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlatformError::InvalidPlatform(s.to_string());
        let tag = s.trim().replace(['-', '.'], "_");
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }
        let tag = normalize_legacy_tag(&tag);

        if let Some(caps) = VERSIONED_RE.captures(&tag) {
            let major = caps[2].parse().map_err(|_| invalid())?;
            let minor = caps[3].parse().map_err(|_| invalid())?;
            let arch = caps[4].to_string();
            return Ok(match &caps[1] {
                "manylinux" => Self::Manylinux {
                    glibc: (major, minor),
                    arch,
                },
                "musllinux" => Self::Musllinux {
                    musl: (major, minor),
                    arch,
                },
                _ => Self::Macos {
                    version: (major, minor),
                    arch,
                },
            });
        }

        if let Some(arch) = tag.strip_prefix("linux_") {
            if arch.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::Linux {
                arch: arch.to_string(),
            });
        }

        Ok(Self::Other(tag))
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manylinux { glibc, arch } => write!(f, "manylinux_{}_{}_{arch}", glibc.0, glibc.1),
            Self::Musllinux { musl, arch } => write!(f, "musllinux_{}_{}_{arch}", musl.0, musl.1),
            Self::Macos { version, arch } => write!(f, "macosx_{}_{}_{arch}", version.0, version.1),
            Self::Linux { arch } => write!(f, "linux_{arch}"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// Interpreter, version and platform that artifacts are selected for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlatform {
    /// Python version
    pub python: PythonVersion,
    /// Interpreter implementation
    pub implementation: Implementation,
    /// Platform tag
    pub platform: PlatformTag,
}

impl TargetPlatform {
    /// Create a target description
    pub fn new(python: PythonVersion, implementation: Implementation, platform: PlatformTag) -> Self {
        Self {
            python,
            implementation,
            platform,
        }
    }

    /// Interpreter tag such as `cp311`
    pub fn interpreter_tag(&self) -> String {
        format!(
            "{}{}{}",
            self.implementation.abbreviation(),
            self.python.major,
            self.python.minor
        )
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.interpreter_tag(), self.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> PlatformTag {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_manylinux() {
        assert_eq!(
            tag("manylinux_2_17_x86_64"),
            PlatformTag::Manylinux {
                glibc: (2, 17),
                arch: "x86_64".to_string()
            }
        );
    }

    #[test]
    fn test_parse_legacy_aliases() {
        assert_eq!(tag("manylinux1_i686").to_string(), "manylinux_2_5_i686");
        assert_eq!(tag("manylinux2010_x86_64").to_string(), "manylinux_2_12_x86_64");
        assert_eq!(
            tag("manylinux2014_ppc64le"),
            PlatformTag::Manylinux {
                glibc: (2, 17),
                arch: "ppc64le".to_string()
            }
        );
    }

    #[test]
    fn test_parse_musllinux() {
        assert_eq!(
            tag("musllinux_1_1_x86_64"),
            PlatformTag::Musllinux {
                musl: (1, 1),
                arch: "x86_64".to_string()
            }
        );
    }

    #[test]
    fn test_parse_macos_and_distutils_spelling() {
        let expected = PlatformTag::Macos {
            version: (11, 0),
            arch: "arm64".to_string(),
        };
        assert_eq!(tag("macosx_11_0_arm64"), expected);
        assert_eq!(tag("macosx-11.0-arm64"), expected);
    }

    #[test]
    fn test_parse_linux_and_other() {
        assert_eq!(
            tag("linux-x86_64"),
            PlatformTag::Linux {
                arch: "x86_64".to_string()
            }
        );
        assert_eq!(tag("win_amd64"), PlatformTag::Other("win_amd64".to_string()));
        assert!(tag("win_amd64").arch().is_none());
        assert!(!tag("win_amd64").is_linux());
        assert!(tag("musllinux_1_2_aarch64").is_linux());
    }

    #[test]
    fn test_parse_invalid_platform() {
        assert!("".parse::<PlatformTag>().is_err());
        assert!("linux_".parse::<PlatformTag>().is_err());
        assert!("win amd64".parse::<PlatformTag>().is_err());
    }

    #[test]
    fn test_implementation_round_trip() {
        for abbr in ["cp", "pp", "ip", "jy"] {
            let imp: Implementation = abbr.parse().unwrap();
            assert_eq!(imp.to_string(), abbr);
        }
        assert!("cpython".parse::<Implementation>().is_err());
    }

    #[test]
    fn test_target_display() {
        let target = TargetPlatform::new(
            PythonVersion::new(3, 11),
            Implementation::CPython,
            tag("manylinux2014_x86_64"),
        );
        assert_eq!(target.interpreter_tag(), "cp311");
        assert_eq!(target.to_string(), "cp311-manylinux_2_17_x86_64");
    }
}
