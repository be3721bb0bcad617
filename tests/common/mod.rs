//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Output;

use lockfetch::infra::download::compute_checksum;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Wheel published for `demo`
pub const DEMO_WHEEL: &str = "demo-1.0.0-py3-none-any.whl";
/// Contents of [`DEMO_WHEEL`]
pub const DEMO_WHEEL_BODY: &[u8] = b"demo wheel";
/// Source distribution of `demo`
pub const DEMO_SDIST: &str = "demo-1.0.0.tar.gz";
/// Contents of [`DEMO_SDIST`]
pub const DEMO_SDIST_BODY: &[u8] = b"demo sdist";
/// Source distribution of `native`, whose wheels are all Linux only
pub const NATIVE_SDIST: &str = "native-2.0.tar.gz";
/// Contents of [`NATIVE_SDIST`]
pub const NATIVE_SDIST_BODY: &[u8] = b"native sdist";
/// Linux wheel of `native`
pub const NATIVE_WHEEL: &str = "native-2.0-cp311-cp311-manylinux_2_17_x86_64.whl";
/// Contents of [`NATIVE_WHEEL`]
pub const NATIVE_WHEEL_BODY: &[u8] = b"native wheel";
/// Wheel of the dev-only `pytest`
pub const PYTEST_WHEEL: &str = "pytest-8.0.0-py3-none-any.whl";
/// Contents of [`PYTEST_WHEEL`]
pub const PYTEST_WHEEL_BODY: &[u8] = b"pytest wheel";

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        project.create_dir(".config/lockfetch");
        project.create_dir(".config/pypoetry");
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project as bytes
    pub fn read_bytes(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run lockfetch in the project directory with isolated config directories
    pub async fn run(&self, args: &[&str]) -> Output {
        tokio::process::Command::new(env!("CARGO_BIN_EXE_lockfetch"))
            .current_dir(self.path())
            .env("LOCKFETCH_CONFIG_DIR", self.dir.path().join(".config/lockfetch"))
            .env("POETRY_CONFIG_DIR", self.dir.path().join(".config/pypoetry"))
            .env_remove("LOCKFETCH_INDEX_URL")
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .await
            .expect("Failed to execute lockfetch")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// `sha256:<hex>` of some content
pub fn sha256(body: &[u8]) -> String {
    format!("sha256:{}", compute_checksum(body))
}

/// Sample poetry.lock with a pure package, a native package and a dev tool
pub fn sample_poetry_lock() -> String {
    format!(
        r#"
[[package]]
name = "demo"
version = "1.0.0"
description = "Demo package"
optional = false
python-versions = ">=3.8"
groups = ["main"]
files = [
    {{file = "{DEMO_WHEEL}", hash = "{}"}},
    {{file = "{DEMO_SDIST}", hash = "{}"}},
]

[[package]]
name = "native"
version = "2.0"
description = "Package with compiled extensions"
optional = false
python-versions = "*"
groups = ["main"]
files = [
    {{file = "{NATIVE_WHEEL}", hash = "{}"}},
    {{file = "{NATIVE_SDIST}", hash = "{}"}},
]

[[package]]
name = "pytest"
version = "8.0.0"
description = "Testing framework"
optional = false
python-versions = ">=3.8"
groups = ["dev"]
files = [
    {{file = "{PYTEST_WHEEL}", hash = "{}"}},
]

[metadata]
lock-version = "2.0"
python-versions = "^3.8"
content-hash = "0000"
"#,
        sha256(DEMO_WHEEL_BODY),
        sha256(DEMO_SDIST_BODY),
        sha256(NATIVE_WHEEL_BODY),
        sha256(NATIVE_SDIST_BODY),
        sha256(PYTEST_WHEEL_BODY),
    )
}

/// Mount the JSON API and file endpoints for one release
pub async fn mount_release(server: &MockServer, name: &str, version: &str, files: &[(&str, &[u8])]) {
    let urls: Vec<_> = files
        .iter()
        .map(|(filename, body)| {
            serde_json::json!({
                "filename": filename,
                "url": format!("{}/files/{filename}", server.uri()),
                "digests": {"sha256": compute_checksum(body)},
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/pypi/{name}/{version}/json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "urls": urls })))
        .mount(server)
        .await;

    for (filename, body) in files {
        Mock::given(method("GET"))
            .and(path(format!("/files/{filename}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
    }
}

/// Mock index serving every release of [`sample_poetry_lock`]
pub async fn sample_index() -> MockServer {
    let server = MockServer::start().await;
    mount_release(
        &server,
        "demo",
        "1.0.0",
        &[(DEMO_WHEEL, DEMO_WHEEL_BODY), (DEMO_SDIST, DEMO_SDIST_BODY)],
    )
    .await;
    mount_release(
        &server,
        "native",
        "2.0",
        &[(NATIVE_WHEEL, NATIVE_WHEEL_BODY), (NATIVE_SDIST, NATIVE_SDIST_BODY)],
    )
    .await;
    mount_release(&server, "pytest", "8.0.0", &[(PYTEST_WHEEL, PYTEST_WHEEL_BODY)]).await;
    server
}

/// Combined stdout and stderr of a run
pub fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
