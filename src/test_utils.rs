//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest, plus a
//! misbehaving HTTP server for download tests.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a distribution name as found in wheel file names
    pub fn distribution_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,20}"
    }

    /// Generate a release version string
    pub fn release_version() -> impl Strategy<Value = String> {
        (0u32..50, 0u32..50, 0u32..50)
            .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
    }

    /// Generate a python version `(major, minor)`
    pub fn python_version() -> impl Strategy<Value = (u32, u32)> {
        (2u32..4, 0u32..20)
    }

    /// Generate a valid SHA256 hash (64 hex characters)
    pub fn sha256_hash() -> impl Strategy<Value = String> {
        "[0-9a-f]{64}"
    }

    /// Generate a platform tag a wheel may carry
    pub fn platform_tag() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("any".to_string()),
            Just("win_amd64".to_string()),
            Just("win32".to_string()),
            (5u32..40, prop_oneof!["x86_64", "aarch64", "i686"])
                .prop_map(|(glibc, arch)| format!("manylinux_2_{glibc}_{arch}")),
            (1u32..3, prop_oneof!["x86_64", "aarch64"])
                .prop_map(|(musl, arch)| format!("musllinux_1_{musl}_{arch}")),
            (10u32..15, prop_oneof!["x86_64", "arm64", "universal2"])
                .prop_map(|(major, arch)| format!("macosx_{major}_0_{arch}")),
        ]
    }

    /// Generate a wheel file name
    pub fn wheel_filename() -> impl Strategy<Value = String> {
        (
            distribution_name(),
            release_version(),
            python_version(),
            platform_tag(),
        )
            .prop_map(|(name, version, (major, minor), platform)| {
                format!("{name}-{version}-cp{major}{minor}-cp{major}{minor}-{platform}.whl")
            })
    }
}

#[cfg(test)]
pub mod http {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Start a server whose responses send `prefix` and then stall
    ///
    /// Returns the base URL. Every request gets a 200 with a much larger
    /// `Content-Length` than what is ever written.
    pub async fn stalled_server(prefix: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = [0u8; 4096];
                    let _ = socket.read(&mut request).await;
                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n",
                        prefix.len() + 1_000_000
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(prefix).await;
                    let _ = socket.flush().await;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                });
            }
        });

        format!("http://{addr}")
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use crate::core::lock::FileHash;
    use crate::core::platform::TargetPlatform;
    use crate::core::version::{PythonVersion, RequiresPython};
    use crate::core::wheel::WheelName;
    use crate::registry::client::normalize_name;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_sha256_hash_generator(hash in sha256_hash()) {
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        }

        /// Every generated wheel name parses back into its parts
        #[test]
        fn prop_wheel_filename_parses(
            name in distribution_name(),
            version in release_version(),
            platform in platform_tag(),
        ) {
            let filename = format!("{name}-{version}-py3-none-{platform}.whl");
            let wheel = WheelName::parse(&filename).unwrap();
            prop_assert_eq!(wheel.name, name);
            prop_assert_eq!(wheel.version, version);
            prop_assert_eq!(wheel.platform_tags, vec![platform]);
        }

        /// A wheel built for exactly the target is always compatible
        #[test]
        fn prop_exact_target_is_compatible(filename in wheel_filename()) {
            let wheel = WheelName::parse(&filename).unwrap();
            let python = &wheel.python_tags[0][2..];
            let (major, minor) = python.split_at(1);
            let platform = if wheel.platform_tags[0] == "any" {
                "win_amd64".to_string()
            } else if wheel.platform_tags[0].contains("universal2") {
                wheel.platform_tags[0].replace("universal2", "arm64")
            } else {
                wheel.platform_tags[0].clone()
            };
            let target = TargetPlatform::new(
                format!("{major}.{minor}").parse().unwrap(),
                "cp".parse().unwrap(),
                platform.parse().unwrap(),
            );
            prop_assert!(wheel.compatibility(&target).is_some());
        }

        /// `>=X.Y` holds exactly for versions not older than X.Y
        #[test]
        fn prop_lower_bound_constraint(bound in python_version(), version in python_version()) {
            let requires = RequiresPython::parse(&format!(">={}.{}", bound.0, bound.1)).unwrap();
            let version = PythonVersion::new(version.0, version.1);
            prop_assert_eq!(requires.contains(&version), (version.major, version.minor) >= bound);
        }

        /// Hash parsing lowercases the digest and keeps the algorithm
        #[test]
        fn prop_file_hash_parse(digest in sha256_hash()) {
            let hash = FileHash::parse(&format!("sha256:{}", digest.to_uppercase())).unwrap();
            prop_assert_eq!(hash.algorithm, "sha256");
            prop_assert_eq!(hash.digest, digest);
        }

        /// Name normalization is idempotent
        #[test]
        fn prop_normalize_name_idempotent(name in "[A-Za-z][A-Za-z0-9._-]{0,20}") {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once.clone());
            prop_assert!(!once.contains(['_', '.']));
        }
    }
}
