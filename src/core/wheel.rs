//! Artifact file names and compatibility tags
//!
//! Wheels encode their compatibility in the file name
//! (`{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`, each tag
//! possibly a `.` separated set). Source distributions carry no tags and
//! are compatible everywhere, but need a build step on install.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::platform::{normalize_legacy_tag, Implementation, PlatformTag, TargetPlatform};

static WHEEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[\w.\-]+?)-(?P<version>\d[^-]*)-(?:(?P<build>\d[^-]*)-)?(?P<python>[^-]+)-(?P<abi>[^-]+)-(?P<platform>[^-]+)\.whl$",
    )
    .expect("valid regex")
});

/// Source distribution archive extensions
const SDIST_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar.bz2", ".tar.xz", ".zip"];

/// Kind of downloadable artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Built distribution (`.whl`)
    Wheel,
    /// Source distribution
    Sdist,
}

impl ArtifactKind {
    /// Classify a file name, `None` for anything that is neither
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".whl") {
            Some(Self::Wheel)
        } else if filename.contains('-') && SDIST_EXTENSIONS.iter().any(|ext| filename.ends_with(ext)) {
            Some(Self::Sdist)
        } else {
            None
        }
    }
}

/// Parsed wheel file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelName {
    /// Distribution name as written in the file name
    pub name: String,
    /// Version
    pub version: String,
    /// Optional build tag
    pub build: Option<String>,
    /// Python tags (`py3`, `cp311`, ...)
    pub python_tags: Vec<String>,
    /// ABI tags (`none`, `abi3`, `cp311`, ...)
    pub abi_tags: Vec<String>,
    /// Platform tags (`any`, `manylinux_2_17_x86_64`, ...)
    pub platform_tags: Vec<String>,
}

/// How well a wheel fits the target; larger is better.
///
/// Field order matters: interpreter specificity wins over platform
/// specificity, which wins over the libc/OS version the wheel targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Compatibility {
    interpreter: u8,
    platform: u8,
    platform_version: (u32, u32),
}

impl WheelName {
    /// Parse a wheel file name
    pub fn parse(filename: &str) -> Option<Self> {
        let caps = WHEEL_RE.captures(filename)?;
        let split = |group: &str| -> Vec<String> {
            caps[group].split('.').map(str::to_string).collect()
        };

        Some(Self {
            name: caps["name"].to_string(),
            version: caps["version"].to_string(),
            build: caps.name("build").map(|m| m.as_str().to_string()),
            python_tags: split("python"),
            abi_tags: split("abi"),
            platform_tags: split("platform"),
        })
    }

    /// Whether the wheel is built for specific platforms rather than `any`
    pub fn is_platform_specific(&self) -> bool {
        self.platform_tags.iter().any(|t| t != "any")
    }

    /// Compatibility with the target, `None` if the wheel cannot be installed
    pub fn compatibility(&self, target: &TargetPlatform) -> Option<Compatibility> {
        let interpreter = self.interpreter_score(target)?;
        let (platform, platform_version) = self
            .platform_tags
            .iter()
            .filter_map(|tag| platform_score(tag, &target.platform))
            .max()?;

        Some(Compatibility {
            interpreter,
            platform,
            platform_version,
        })
    }

    fn interpreter_score(&self, target: &TargetPlatform) -> Option<u8> {
        let stable_abi = self.abi_tags.iter().any(|t| t == "abi3");
        let python = target.python;

        self.python_tags
            .iter()
            .filter_map(|tag| {
                if let Some((major, minor)) = tag.strip_prefix("py").and_then(split_version) {
                    return match minor {
                        None if major == python.major => Some(1),
                        Some(minor) if major == python.major && minor <= python.minor => Some(2),
                        _ => None,
                    };
                }

                let abbreviation = target.implementation.abbreviation();
                let (major, minor) = tag.strip_prefix(abbreviation).and_then(split_version)?;
                let minor = minor?;
                if major != python.major {
                    return None;
                }
                if minor == python.minor {
                    Some(4)
                } else if stable_abi
                    && target.implementation == Implementation::CPython
                    && minor < python.minor
                {
                    Some(3)
                } else {
                    None
                }
            })
            .max()
    }
}

/// Split `"311"` into `(3, Some(11))` and `"3"` into `(3, None)`
fn split_version(digits: &str) -> Option<(u32, Option<u32>)> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (major, minor) = digits.split_at(1);
    let major = major.parse().ok()?;
    if minor.is_empty() {
        Some((major, None))
    } else {
        Some((major, Some(minor.parse().ok()?)))
    }
}

/// Score one platform sub-tag of a wheel against the target platform
fn platform_score(tag: &str, target: &PlatformTag) -> Option<(u8, (u32, u32))> {
    if tag == "any" {
        return Some((0, (0, 0)));
    }

    let tag = normalize_legacy_tag(tag);
    if target.is_linux() {
        if let Some(arch) = target.arch() {
            if tag == format!("linux_{arch}") {
                return Some((1, (0, 0)));
            }
        }
    }

    let parsed: PlatformTag = tag.parse().ok()?;
    match (target, parsed) {
        (
            PlatformTag::Manylinux { glibc, arch },
            PlatformTag::Manylinux {
                glibc: wheel_glibc,
                arch: wheel_arch,
            },
        ) if *arch == wheel_arch && wheel_glibc <= *glibc => Some((2, wheel_glibc)),
        (
            PlatformTag::Musllinux { musl, arch },
            PlatformTag::Musllinux {
                musl: wheel_musl,
                arch: wheel_arch,
            },
        ) if *arch == wheel_arch && wheel_musl <= *musl => Some((2, wheel_musl)),
        (
            PlatformTag::Macos { version, arch },
            PlatformTag::Macos {
                version: wheel_version,
                arch: wheel_arch,
            },
        ) if wheel_version <= *version && macos_arch_covers(&wheel_arch, arch) => {
            let exact = if wheel_arch == *arch { 3 } else { 2 };
            Some((exact, wheel_version))
        }
        (PlatformTag::Other(expected), PlatformTag::Other(actual)) if *expected == actual => {
            Some((2, (0, 0)))
        }
        _ => None,
    }
}

/// Whether a macOS wheel architecture (possibly a fat binary) runs on `arch`
fn macos_arch_covers(wheel_arch: &str, arch: &str) -> bool {
    match wheel_arch {
        "universal2" => matches!(arch, "x86_64" | "arm64"),
        "intel" => matches!(arch, "x86_64" | "i386"),
        "universal" => matches!(arch, "x86_64" | "i386" | "ppc" | "ppc64"),
        other => other == arch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(python: &str, implementation: &str, platform: &str) -> TargetPlatform {
        TargetPlatform::new(
            python.parse().unwrap(),
            implementation.parse().unwrap(),
            platform.parse().unwrap(),
        )
    }

    fn compatible(filename: &str, target: &TargetPlatform) -> bool {
        WheelName::parse(filename).unwrap().compatibility(target).is_some()
    }

    #[test]
    fn test_parse_wheel_name() {
        let wheel =
            WheelName::parse("cffi-1.15.1-cp311-cp311-manylinux_2_17_ppc64le.manylinux2014_ppc64le.whl")
                .unwrap();
        assert_eq!(wheel.name, "cffi");
        assert_eq!(wheel.version, "1.15.1");
        assert_eq!(wheel.build, None);
        assert_eq!(wheel.python_tags, vec!["cp311"]);
        assert_eq!(wheel.abi_tags, vec!["cp311"]);
        assert_eq!(
            wheel.platform_tags,
            vec!["manylinux_2_17_ppc64le", "manylinux2014_ppc64le"]
        );
        assert!(wheel.is_platform_specific());
    }

    #[test]
    fn test_parse_wheel_with_build_tag() {
        let wheel = WheelName::parse("pkg-1.0-1-py2.py3-none-any.whl").unwrap();
        assert_eq!(wheel.build.as_deref(), Some("1"));
        assert_eq!(wheel.python_tags, vec!["py2", "py3"]);
        assert!(!wheel.is_platform_specific());
    }

    #[test]
    fn test_parse_rejects_non_wheels() {
        assert!(WheelName::parse("cffi-1.15.1.tar.gz").is_none());
        assert!(WheelName::parse("broken.whl").is_none());
    }

    #[test]
    fn test_artifact_kind() {
        assert_eq!(ArtifactKind::from_filename("a-1.0-py3-none-any.whl"), Some(ArtifactKind::Wheel));
        assert_eq!(ArtifactKind::from_filename("cffi-1.15.1.tar.gz"), Some(ArtifactKind::Sdist));
        assert_eq!(ArtifactKind::from_filename("pkg-2.0.zip"), Some(ArtifactKind::Sdist));
        assert_eq!(ArtifactKind::from_filename("pkg-2.0.egg"), None);
    }

    #[test]
    fn test_pure_python_wheels() {
        let t = target("3.11", "cp", "win_amd64");
        assert!(compatible("six-1.16.0-py2.py3-none-any.whl", &t));
        assert!(compatible("attrs-23.1.0-py3-none-any.whl", &t));
        assert!(compatible("x-1.0-py38-none-any.whl", &t));
        assert!(!compatible("x-1.0-py312-none-any.whl", &t));
        assert!(!compatible("x-1.0-py2-none-any.whl", &t));
    }

    #[test]
    fn test_interpreter_must_match() {
        let t = target("3.10", "cp", "win_amd64");
        assert!(compatible("cffi-1.15.1-cp310-cp310-win_amd64.whl", &t));
        assert!(!compatible("cffi-1.15.1-cp311-cp311-win_amd64.whl", &t));
        assert!(!compatible("cffi-1.15.1-pp310-pypy310_pp73-win_amd64.whl", &t));
    }

    #[test]
    fn test_stable_abi_wheels() {
        let t = target("3.12", "cp", "manylinux_2_28_x86_64");
        assert!(compatible("cryptography-41.0.0-cp37-abi3-manylinux_2_28_x86_64.whl", &t));
        assert!(!compatible("cryptography-41.0.0-cp313-abi3-manylinux_2_28_x86_64.whl", &t));

        let pypy = target("3.12", "pp", "manylinux_2_28_x86_64");
        assert!(!compatible("cryptography-41.0.0-cp37-abi3-manylinux_2_28_x86_64.whl", &pypy));
    }

    #[test]
    fn test_manylinux_glibc_ordering() {
        let t = target("3.11", "cp", "manylinux_2_17_x86_64");
        assert!(compatible("a-1-cp311-cp311-manylinux_2_5_x86_64.manylinux1_x86_64.whl", &t));
        assert!(compatible("a-1-cp311-cp311-manylinux2014_x86_64.whl", &t));
        assert!(!compatible("a-1-cp311-cp311-manylinux_2_28_x86_64.whl", &t));
        assert!(!compatible("a-1-cp311-cp311-manylinux_2_17_aarch64.whl", &t));
        assert!(!compatible("a-1-cp311-cp311-musllinux_1_1_x86_64.whl", &t));
        assert!(compatible("a-1-cp311-cp311-linux_x86_64.whl", &t));
    }

    #[test]
    fn test_musllinux_matching() {
        let t = target("3.10", "cp", "musllinux_1_1_x86_64");
        assert!(compatible("cffi-1.15.1-cp310-cp310-musllinux_1_1_x86_64.whl", &t));
        assert!(!compatible("cffi-1.15.1-cp310-cp310-musllinux_1_2_x86_64.whl", &t));
        assert!(!compatible("cffi-1.15.1-cp310-cp310-manylinux_2_17_x86_64.whl", &t));
    }

    #[test]
    fn test_macos_matching() {
        let t = target("3.9", "cp", "macosx_11_0_arm64");
        assert!(compatible("cffi-1.15.1-cp39-cp39-macosx_11_0_arm64.whl", &t));
        assert!(compatible("x-1.0-cp39-cp39-macosx_10_9_universal2.whl", &t));
        assert!(!compatible("x-1.0-cp39-cp39-macosx_10_9_x86_64.whl", &t));
        assert!(!compatible("x-1.0-cp39-cp39-macosx_12_0_arm64.whl", &t));
    }

    #[test]
    fn test_scores_prefer_specific_wheels() {
        let t = target("3.11", "cp", "manylinux_2_28_x86_64");
        let score = |f: &str| WheelName::parse(f).unwrap().compatibility(&t).unwrap();

        let pure = score("x-1.0-py3-none-any.whl");
        let abi3 = score("x-1.0-cp37-abi3-manylinux_2_17_x86_64.whl");
        let exact_old = score("x-1.0-cp311-cp311-manylinux_2_17_x86_64.whl");
        let exact_new = score("x-1.0-cp311-cp311-manylinux_2_28_x86_64.whl");

        assert!(pure < abi3);
        assert!(abi3 < exact_old);
        assert!(exact_old < exact_new);
    }

    #[test]
    fn test_split_version() {
        assert_eq!(split_version("3"), Some((3, None)));
        assert_eq!(split_version("311"), Some((3, Some(11))));
        assert_eq!(split_version(""), None);
        assert_eq!(split_version("3x"), None);
    }
}
